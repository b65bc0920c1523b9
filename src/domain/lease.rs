use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Currency, Service, Term};

pub type LeaseId = Uuid;

/// Service ledger opened on every lease for rent invoices.
pub const RENT_SERVICE: &str = "rent";

/// Service ledger opened on every lease for utility charges.
pub const UTILITY_SERVICE: &str = "utility";

/// A tenant's right to occupy a site for a term, with its billing ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub id: LeaseId,
    /// Name of the tenant holding the lease
    pub tenant: String,
    /// Number of the leased site
    pub site: String,
    pub term: Term,
    /// Rent billed per invoice
    pub rent: Currency,
    /// Service name -> ledger
    pub services: BTreeMap<String, Service>,
    pub created_at: DateTime<Utc>,
}

impl Lease {
    /// Create a lease with empty "rent" and "utility" ledgers.
    pub fn new(
        tenant: impl Into<String>,
        site: impl Into<String>,
        term: Term,
        rent: Currency,
    ) -> Self {
        let services = [RENT_SERVICE, UTILITY_SERVICE]
            .into_iter()
            .map(|name| (name.to_string(), Service::default()))
            .collect();

        Self {
            id: Uuid::new_v4(),
            tenant: tenant.into(),
            site: site.into(),
            term,
            rent,
            services,
            created_at: Utc::now(),
        }
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn service_mut(&mut self, name: &str) -> Option<&mut Service> {
        self.services.get_mut(name)
    }

    /// True when `other` is a different lease for the same site and the same term.
    pub fn conflicts_with(&self, other: &Lease) -> bool {
        self.id != other.id && self.site == other.site && self.term == other.term
    }
}
