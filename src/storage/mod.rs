mod catalog;
mod json;
mod memory;
mod predicate;
mod sqlite;

pub use catalog::*;
pub use json::*;
pub use memory::*;
pub use predicate::*;
pub use sqlite::*;

use anyhow::Result;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::domain::{Entity, EntityKey, Term};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entity not found: {0}")]
    NotFound(EntityKey),

    #[error("Entity already exists: {0}")]
    Duplicate(EntityKey),

    #[error("Site {site} already has a lease for term {term}")]
    Conflict { site: String, term: Term },

    #[error("Storage error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// The authoritative holder of all entities.
///
/// `query` and `list` never fail: a backend that cannot read treats the store
/// as empty and logs a warning. Mutations surface every failure.
#[allow(async_fn_in_trait)]
pub trait EntityStore {
    /// First entity matching every predicate, in storage order.
    async fn query(&self, predicates: &Predicates) -> Option<Entity>;

    /// Every entity matching every predicate, in storage order.
    async fn list(&self, predicates: &Predicates) -> Vec<Entity>;

    /// Add a new identity. Fails on duplicate identity or lease conflict.
    async fn create(&self, entity: Entity) -> Result<(), StoreError>;

    /// Replace an existing identity. Fails when the identity is missing.
    async fn update(&self, entity: Entity) -> Result<(), StoreError>;

    /// Replace by identity if present, append otherwise.
    async fn save(&self, entity: Entity) -> Result<(), StoreError>;

    /// Remove the entity with the same identity. Fails when it is missing.
    async fn delete(&self, entity: &Entity) -> Result<(), StoreError>;
}

/// A store backend selected at runtime.
pub enum Store {
    Memory(MemoryStore),
    Json(JsonStore),
    Sqlite(SqliteStore),
}

impl Store {
    /// Open the backend described by the configuration.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        Ok(match config {
            StoreConfig::Memory => Store::Memory(MemoryStore::new()),
            StoreConfig::Json { path } => Store::Json(JsonStore::new(path)),
            StoreConfig::Sqlite { path } => Store::Sqlite(SqliteStore::open(path).await?),
        })
    }
}

impl EntityStore for Store {
    async fn query(&self, predicates: &Predicates) -> Option<Entity> {
        match self {
            Store::Memory(store) => store.query(predicates).await,
            Store::Json(store) => store.query(predicates).await,
            Store::Sqlite(store) => store.query(predicates).await,
        }
    }

    async fn list(&self, predicates: &Predicates) -> Vec<Entity> {
        match self {
            Store::Memory(store) => store.list(predicates).await,
            Store::Json(store) => store.list(predicates).await,
            Store::Sqlite(store) => store.list(predicates).await,
        }
    }

    async fn create(&self, entity: Entity) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.create(entity).await,
            Store::Json(store) => store.create(entity).await,
            Store::Sqlite(store) => store.create(entity).await,
        }
    }

    async fn update(&self, entity: Entity) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.update(entity).await,
            Store::Json(store) => store.update(entity).await,
            Store::Sqlite(store) => store.update(entity).await,
        }
    }

    async fn save(&self, entity: Entity) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.save(entity).await,
            Store::Json(store) => store.save(entity).await,
            Store::Sqlite(store) => store.save(entity).await,
        }
    }

    async fn delete(&self, entity: &Entity) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.delete(entity).await,
            Store::Json(store) => store.delete(entity).await,
            Store::Sqlite(store) => store.delete(entity).await,
        }
    }
}
