use thiserror::Error;

use crate::domain::{BillingError, Term};
use crate::storage::StoreError;

use super::NotifyError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Tenant name must not be empty")]
    EmptyTenantName,

    #[error("Site number must not be empty")]
    EmptySiteNumber,

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Tenant already exists: {0}")]
    TenantAlreadyExists(String),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Site already exists: {0}")]
    SiteAlreadyExists(String),

    #[error("Site {site} already has a lease for term {term}")]
    LeaseConflict { site: String, term: Term },

    #[error("No lease for tenant {tenant} on site {site}")]
    LeaseNotFound { tenant: String, site: String },

    #[error("{count} leases for tenant {tenant} on site {site}; expected one")]
    AmbiguousLease {
        tenant: String,
        site: String,
        count: usize,
    },

    #[error("Lease has no service named {0}")]
    ServiceNotFound(String),

    #[error("{operation}: {source}")]
    Billing {
        operation: &'static str,
        #[source]
        source: BillingError,
    },

    #[error("{operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Failed to notify {recipient}: {source}")]
    Notify {
        recipient: String,
        #[source]
        source: NotifyError,
    },
}

impl AppError {
    /// Wrap a store failure with the name of the use-case that hit it.
    pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::Store { operation, source }
    }

    /// Wrap a ledger failure with the name of the use-case that hit it.
    pub fn billing(operation: &'static str) -> impl FnOnce(BillingError) -> AppError {
        move |source| AppError::Billing { operation, source }
    }
}
