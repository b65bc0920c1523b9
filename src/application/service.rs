use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{
    BillingError, Currency, DwellingKind, EntityKind, InvoiceId, Lease, Payment, PaymentReceipt,
    RENT_SERVICE, Service, Site, Tenant, Term, UTILITY_SERVICE,
};
use crate::storage::{EntityStore, Predicate, Predicates, Store, StoreError};

use super::{AppError, Channel, Notifier};

/// Application service providing the leasing use-cases.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
///
/// Uniqueness and conflict rules are checked here before any mutation so that
/// a rejected request leaves the store untouched; the store re-checks them on
/// write.
pub struct LeasingService<S = Store, N = Channel> {
    store: S,
    notifier: N,
}

impl LeasingService<Store, Channel> {
    /// Open the configured store and notifier.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let store = Store::open(&config.store)
            .await
            .map_err(|e| AppError::store("open")(StoreError::Backend(e)))?;
        Ok(Self::new(store, Channel::from(config.notifier.channel)))
    }
}

impl<S: EntityStore, N: Notifier> LeasingService<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    // ========================
    // Tenant operations
    // ========================

    /// Register a new tenant. Names must be non-empty and unique.
    pub async fn register_tenant(
        &self,
        name: impl Into<String>,
        contact: impl Into<String>,
    ) -> Result<Tenant, AppError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::EmptyTenantName);
        }

        // Check if tenant already exists
        if self.find_tenant(&name).await.is_some() {
            return Err(AppError::TenantAlreadyExists(name));
        }

        let tenant = Tenant::new(name, contact);
        self.store
            .create(tenant.clone().into())
            .await
            .map_err(AppError::store("register_tenant"))?;

        info!(tenant = %tenant.name, "tenant registered");
        Ok(tenant)
    }

    /// Get a tenant by name.
    pub async fn get_tenant(&self, name: &str) -> Result<Tenant, AppError> {
        self.find_tenant(name)
            .await
            .ok_or_else(|| AppError::TenantNotFound(name.to_string()))
    }

    /// List all tenants in storage order.
    pub async fn list_tenants(&self) -> Vec<Tenant> {
        self.store
            .list(&Predicate::of_kind(EntityKind::Tenant).into())
            .await
            .into_iter()
            .filter_map(|entity| entity.into_tenant())
            .collect()
    }

    async fn find_tenant(&self, name: &str) -> Option<Tenant> {
        self.store
            .query(&Predicate::tenant_named(name).into())
            .await
            .and_then(|entity| entity.into_tenant())
    }

    // ========================
    // Site operations
    // ========================

    /// List a new site. Site numbers must be non-empty and unique.
    pub async fn list_site(
        &self,
        number: impl Into<String>,
        dwelling: DwellingKind,
    ) -> Result<Site, AppError> {
        let number = number.into();
        if number.trim().is_empty() {
            return Err(AppError::EmptySiteNumber);
        }

        if self.find_site(&number).await.is_some() {
            return Err(AppError::SiteAlreadyExists(number));
        }

        let site = Site::new(number, dwelling);
        self.store
            .create(site.clone().into())
            .await
            .map_err(AppError::store("list_site"))?;

        info!(site = %site.number, dwelling = %site.dwelling, "site listed");
        Ok(site)
    }

    /// Get a site by number.
    pub async fn get_site(&self, number: &str) -> Result<Site, AppError> {
        self.find_site(number)
            .await
            .ok_or_else(|| AppError::SiteNotFound(number.to_string()))
    }

    /// List all sites in storage order.
    pub async fn list_sites(&self) -> Vec<Site> {
        self.store
            .list(&Predicate::of_kind(EntityKind::Site).into())
            .await
            .into_iter()
            .filter_map(|entity| entity.into_site())
            .collect()
    }

    async fn find_site(&self, number: &str) -> Option<Site> {
        self.store
            .query(&Predicate::site_numbered(number).into())
            .await
            .and_then(|entity| entity.into_site())
    }

    // ========================
    // Lease operations
    // ========================

    /// Create a lease with empty "rent" and "utility" ledgers.
    ///
    /// A site may not carry two leases with an identical term. Terms that
    /// merely overlap are accepted.
    pub async fn create_lease(
        &self,
        tenant_name: &str,
        site_number: &str,
        term: Term,
        rent: Currency,
    ) -> Result<Lease, AppError> {
        let tenant = self.get_tenant(tenant_name).await?;
        let site = self.get_site(site_number).await?;

        let conflict = Predicates::new()
            .and(Predicate::lease_on_site(site.number.clone()))
            .and(Predicate::lease_with_term(term));
        if self.store.query(&conflict).await.is_some() {
            return Err(AppError::LeaseConflict {
                site: site.number,
                term,
            });
        }

        let lease = Lease::new(tenant.name, site.number, term, rent);
        self.store
            .create(lease.clone().into())
            .await
            .map_err(AppError::store("create_lease"))?;

        info!(lease = %lease.id, tenant = %lease.tenant, site = %lease.site, term = %lease.term, "lease created");
        Ok(lease)
    }

    /// List leases, optionally only those held by one tenant.
    pub async fn list_leases(&self, tenant_name: Option<&str>) -> Vec<Lease> {
        let mut predicates = Predicates::new().and(Predicate::of_kind(EntityKind::Lease));
        if let Some(name) = tenant_name {
            predicates.push(Predicate::lease_for_tenant(name));
        }

        self.store
            .list(&predicates)
            .await
            .into_iter()
            .filter_map(|entity| entity.into_lease())
            .collect()
    }

    /// The single lease held by `tenant_name` on `site_number`.
    pub async fn find_lease(&self, tenant_name: &str, site_number: &str) -> Result<Lease, AppError> {
        let predicates = Predicates::new()
            .and(Predicate::lease_for_tenant(tenant_name))
            .and(Predicate::lease_on_site(site_number));
        let mut leases: Vec<Lease> = self
            .store
            .list(&predicates)
            .await
            .into_iter()
            .filter_map(|entity| entity.into_lease())
            .collect();

        match leases.len() {
            0 => Err(AppError::LeaseNotFound {
                tenant: tenant_name.to_string(),
                site: site_number.to_string(),
            }),
            1 => Ok(leases.remove(0)),
            count => Err(AppError::AmbiguousLease {
                tenant: tenant_name.to_string(),
                site: site_number.to_string(),
                count,
            }),
        }
    }

    // ========================
    // Billing operations
    // ========================

    /// Open a rent invoice for the lease's rent amount.
    pub async fn bill_rent(
        &self,
        tenant_name: &str,
        site_number: &str,
        at: DateTime<Utc>,
    ) -> Result<InvoiceId, AppError> {
        let lease = self.find_lease(tenant_name, site_number).await?;
        let rent = lease.rent;
        self.apply_to_service("bill_rent", lease, RENT_SERVICE, |service| {
            service.issue_invoice(rent, at)
        })
        .await
    }

    /// Open an invoice on any service of the lease.
    pub async fn issue_invoice(
        &self,
        tenant_name: &str,
        site_number: &str,
        service_name: &str,
        amount: Currency,
        at: DateTime<Utc>,
    ) -> Result<InvoiceId, AppError> {
        let lease = self.find_lease(tenant_name, site_number).await?;
        self.apply_to_service("issue_invoice", lease, service_name, |service| {
            service.issue_invoice(amount, at)
        })
        .await
    }

    /// Record a raw charge against a service (no invoice).
    pub async fn charge_service(
        &self,
        tenant_name: &str,
        site_number: &str,
        service_name: &str,
        amount: Currency,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let lease = self.find_lease(tenant_name, site_number).await?;
        self.apply_to_service("charge_service", lease, service_name, |service| {
            service.charge(amount, at)
        })
        .await
    }

    /// Apply a payment to one invoice of a service.
    pub async fn record_payment(
        &self,
        tenant_name: &str,
        site_number: &str,
        service_name: &str,
        invoice_id: InvoiceId,
        payment: Payment,
    ) -> Result<PaymentReceipt, AppError> {
        let lease = self.find_lease(tenant_name, site_number).await?;
        let receipt = self
            .apply_to_service("record_payment", lease, service_name, |service| {
                service.pay(invoice_id, payment)
            })
            .await?;

        info!(
            tenant = tenant_name,
            site = site_number,
            service = service_name,
            invoice = %invoice_id,
            amount = %payment.amount,
            settled = receipt.settled,
            "payment recorded"
        );
        Ok(receipt)
    }

    /// Current balance of a service (negative means the tenant owes money).
    pub async fn service_balance(
        &self,
        tenant_name: &str,
        site_number: &str,
        service_name: &str,
    ) -> Result<Currency, AppError> {
        let lease = self.find_lease(tenant_name, site_number).await?;
        lease
            .service(service_name)
            .map(Service::balance)
            .ok_or_else(|| AppError::ServiceNotFound(service_name.to_string()))
    }

    /// Tell the tenant what they owe for utilities on the site.
    ///
    /// Returns the delivered message, or `None` when the utility balance is
    /// not negative and nothing was sent.
    pub async fn send_invoice(
        &self,
        tenant_name: &str,
        site_number: &str,
    ) -> Result<Option<String>, AppError> {
        let lease = self.find_lease(tenant_name, site_number).await?;
        let balance = lease
            .service(UTILITY_SERVICE)
            .map(Service::balance)
            .ok_or_else(|| AppError::ServiceNotFound(UTILITY_SERVICE.to_string()))?;
        if !balance.is_negative() {
            return Ok(None);
        }

        let tenant = self.get_tenant(&lease.tenant).await?;
        let owed = -balance;
        let message = format!(
            "Hello {}, you owe {} in utilities for site {}.",
            tenant.name, owed, lease.site
        );
        let recipient = tenant.recipient();

        if let Err(source) = self.notifier.notify(recipient, &message).await {
            warn!(recipient, error = %source, "invoice delivery failed");
            return Err(AppError::Notify {
                recipient: recipient.to_string(),
                source,
            });
        }

        info!(recipient, owed = %owed, "utility invoice sent");
        Ok(Some(message))
    }

    /// Run a ledger change on one service of the lease and persist the lease.
    async fn apply_to_service<T>(
        &self,
        operation: &'static str,
        mut lease: Lease,
        service_name: &str,
        change: impl FnOnce(&mut Service) -> Result<T, BillingError>,
    ) -> Result<T, AppError> {
        let service = lease
            .service_mut(service_name)
            .ok_or_else(|| AppError::ServiceNotFound(service_name.to_string()))?;
        let outcome = change(service).map_err(AppError::billing(operation))?;

        self.store
            .update(lease.into())
            .await
            .map_err(AppError::store(operation))?;
        Ok(outcome)
    }
}
