//! File-backed store: one JSON document mapping a bucket (kind name) to the
//! array of raw records of that kind.
//!
//! ```text
//! { "lease": [ {...}, ... ], "site": [ {...} ], "tenant": [ {...} ] }
//! ```
//!
//! Every operation reloads the whole document, and every mutation rewrites it
//! through a temp file and a rename. A per-store mutex serialises the
//! read-modify-write cycle; separate processes sharing one file are not
//! coordinated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{Entity, EntityKind};

use super::{Catalog, EntityStore, Predicates, StoreError};

type Buckets = BTreeMap<String, Vec<Value>>;

/// Document contents split into records we can decode and buckets we carry along.
struct Snapshot {
    catalog: Catalog,
    foreign: Buckets,
}

pub struct JsonStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing file is an empty store.
    async fn read_buckets(&self) -> Result<Buckets> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Buckets::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read store file {}", self.path.display())
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(Buckets::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse store file {}", self.path.display()))
    }

    async fn load(&self) -> Result<Snapshot> {
        let buckets = self.read_buckets().await?;
        let mut entities = Vec::new();
        let mut foreign = Buckets::new();

        for (name, records) in buckets {
            let Some(kind) = EntityKind::from_str(&name) else {
                debug!(bucket = %name, records = records.len(), "keeping unknown bucket");
                foreign.insert(name, records);
                continue;
            };
            for (index, record) in records.into_iter().enumerate() {
                let entity = kind
                    .decode(record)
                    .with_context(|| format!("Failed to decode {} record {}", name, index))?;
                entities.push(entity);
            }
        }

        Ok(Snapshot {
            catalog: entities.into_iter().collect(),
            foreign,
        })
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let mut buckets = snapshot.foreign.clone();
        for entity in snapshot.catalog.entities() {
            let record = entity
                .encode()
                .with_context(|| format!("Failed to serialize {}", entity.key()))?;
            buckets
                .entry(entity.kind().as_str().to_string())
                .or_default()
                .push(record);
        }

        let json = serde_json::to_string_pretty(&buckets).context("Failed to serialize store")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create store directory")?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write store file {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace store file {}", self.path.display()))?;
        Ok(())
    }

    /// Load, apply `change`, and write back. Nothing is written when `change` fails.
    async fn mutate(
        &self,
        operation: &'static str,
        change: impl FnOnce(&mut Catalog) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self
            .load()
            .await
            .with_context(|| format!("Failed to load store for {}", operation))?;
        change(&mut snapshot.catalog)?;
        self.write(&snapshot)
            .await
            .with_context(|| format!("Failed to persist store for {}", operation))?;
        debug!(path = %self.path.display(), operation, "store file rewritten");
        Ok(())
    }

    /// Load for a read. Failures are logged and read as an empty store.
    async fn load_for_read(&self) -> Catalog {
        let _guard = self.lock.lock().await;
        match self.load().await {
            Ok(snapshot) => snapshot.catalog,
            Err(e) => {
                warn!(path = %self.path.display(), error = %format!("{:#}", e), "treating unreadable store as empty");
                Catalog::new()
            }
        }
    }
}

impl EntityStore for JsonStore {
    async fn query(&self, predicates: &Predicates) -> Option<Entity> {
        self.load_for_read().await.find(predicates).cloned()
    }

    async fn list(&self, predicates: &Predicates) -> Vec<Entity> {
        self.load_for_read().await.filter(predicates)
    }

    async fn create(&self, entity: Entity) -> Result<(), StoreError> {
        self.mutate("create", |catalog| catalog.insert(entity)).await
    }

    async fn update(&self, entity: Entity) -> Result<(), StoreError> {
        self.mutate("update", |catalog| catalog.update(entity)).await
    }

    async fn save(&self, entity: Entity) -> Result<(), StoreError> {
        self.mutate("save", |catalog| catalog.upsert(entity)).await
    }

    async fn delete(&self, entity: &Entity) -> Result<(), StoreError> {
        let key = entity.key();
        self.mutate("delete", |catalog| catalog.remove(&key).map(|_| ()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{DwellingKind, Site, Tenant};
    use crate::storage::Predicate;

    #[tokio::test]
    async fn test_file_shape_is_bucket_to_records() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path().join("store.json"));
        store.create(Tenant::new("Ada", "ada@x").into()).await.unwrap();
        store.create(Site::new("A-1", DwellingKind::Cabin).into()).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["tenant"][0]["name"], "Ada");
        assert_eq!(value["site"][0]["number"], "A-1");
        assert_eq!(value["site"][0]["dwelling"], "cabin");
    }

    #[tokio::test]
    async fn test_unknown_buckets_survive_rewrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        std::fs::write(&path, r#"{"parking": [{"bay": 7}], "tenant": []}"#).unwrap();

        let store = JsonStore::new(&path);
        store.save(Tenant::new("Ada", "").into()).await.unwrap();

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["parking"][0]["bay"], 7);
        assert_eq!(value["tenant"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_unreadable_file_reads_empty_but_save_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonStore::new(&path);

        assert!(store.query(&Predicates::any()).await.is_none());
        assert!(store.list(&Predicate::of_kind(EntityKind::Tenant).into()).await.is_empty());

        let result = store.save(Tenant::new("Ada", "").into()).await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path().join("nested").join("store.json"));

        assert!(store.list(&Predicates::any()).await.is_empty());
        store.create(Tenant::new("Ada", "").into()).await.unwrap();
        assert_eq!(store.list(&Predicates::any()).await.len(), 1);
    }
}
