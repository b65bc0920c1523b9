// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use leasehold::application::{LeasingService, Notifier, NotifyError};
use leasehold::domain::{Currency, DwellingKind, Lease, Term};
use leasehold::storage::{JsonStore, MemoryStore, SqliteStore};
use tempfile::TempDir;

/// Notifier that remembers every delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), message.to_string()));
        Ok(())
    }
}

/// Notifier whose deliveries always fail.
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    async fn notify(&self, _recipient: &str, _message: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("mailbox full".into()))
    }
}

pub type MemoryService = LeasingService<MemoryStore, RecordingNotifier>;

/// Helper to create a service over an in-memory store
pub fn memory_service() -> MemoryService {
    leasehold::logging::init();
    LeasingService::new(MemoryStore::new(), RecordingNotifier::default())
}

/// Helper to create a service over a JSON file in a temporary directory
pub fn json_service() -> Result<(LeasingService<JsonStore, RecordingNotifier>, TempDir)> {
    leasehold::logging::init();
    let temp_dir = TempDir::new()?;
    let store = JsonStore::new(temp_dir.path().join("leasehold.json"));
    Ok((
        LeasingService::new(store, RecordingNotifier::default()),
        temp_dir,
    ))
}

/// Helper to create a service over a temporary SQLite database
pub async fn sqlite_service() -> Result<(LeasingService<SqliteStore, RecordingNotifier>, TempDir)> {
    leasehold::logging::init();
    let temp_dir = TempDir::new()?;
    let store = sqlite_store(&temp_dir).await?;
    Ok((
        LeasingService::new(store, RecordingNotifier::default()),
        temp_dir,
    ))
}

/// Open (or reopen) the SQLite database kept in `temp_dir`
pub async fn sqlite_store(temp_dir: &TempDir) -> Result<SqliteStore> {
    let db_path = temp_dir.path().join("leasehold.db");
    SqliteStore::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// A one-year term starting on the given date
pub fn year_from(date_str: &str) -> Term {
    Term::new(parse_date(date_str), 365)
}

pub fn dollars(amount: i64) -> Currency {
    Currency::from_dollars(amount)
}

/// Test fixture: two tenants, three sites, one lease
pub struct StandardLeases;

impl StandardLeases {
    /// Register Ada and Bob, list sites A-1, B-2, C-3
    pub async fn create_parties<S, N>(service: &LeasingService<S, N>) -> Result<()>
    where
        S: leasehold::storage::EntityStore,
        N: Notifier,
    {
        service.register_tenant("Ada", "ada@example.org").await?;
        service.register_tenant("Bob", "").await?;
        service.list_site("A-1", DwellingKind::Cabin).await?;
        service.list_site("B-2", DwellingKind::Flat).await?;
        service.list_site("C-3", DwellingKind::House).await?;
        Ok(())
    }

    /// Parties plus Ada's 2024 lease on A-1 at $200 rent
    pub async fn create_basic<S, N>(service: &LeasingService<S, N>) -> Result<Lease>
    where
        S: leasehold::storage::EntityStore,
        N: Notifier,
    {
        Self::create_parties(service).await?;
        let lease = service
            .create_lease("Ada", "A-1", year_from("2024-01-01"), dollars(200))
            .await?;
        Ok(lease)
    }
}
