use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::Entity;

use super::{Catalog, EntityStore, Predicates, StoreError};

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing entities, kept in the given order.
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            catalog: RwLock::new(entities.into_iter().collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.catalog.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.catalog.read().await.is_empty()
    }
}

impl EntityStore for MemoryStore {
    async fn query(&self, predicates: &Predicates) -> Option<Entity> {
        self.catalog.read().await.find(predicates).cloned()
    }

    async fn list(&self, predicates: &Predicates) -> Vec<Entity> {
        self.catalog.read().await.filter(predicates)
    }

    async fn create(&self, entity: Entity) -> Result<(), StoreError> {
        debug!(key = %entity.key(), "memory store create");
        self.catalog.write().await.insert(entity)
    }

    async fn update(&self, entity: Entity) -> Result<(), StoreError> {
        debug!(key = %entity.key(), "memory store update");
        self.catalog.write().await.update(entity)
    }

    async fn save(&self, entity: Entity) -> Result<(), StoreError> {
        self.catalog.write().await.upsert(entity)
    }

    async fn delete(&self, entity: &Entity) -> Result<(), StoreError> {
        debug!(key = %entity.key(), "memory store delete");
        self.catalog.write().await.remove(&entity.key()).map(|_| ())
    }
}
