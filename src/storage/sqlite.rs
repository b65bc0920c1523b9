use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{Entity, EntityKind};

use super::{Catalog, EntityStore, Predicates, StoreError};

/// SQL migration for the entity table
pub const MIGRATION_001_ENTITIES: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    key TEXT NOT NULL,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (kind, key)
)
"#;

/// Embedded database store. One row per entity, holding the same JSON record
/// the file-backed store writes, ordered by insertion sequence.
pub struct SqliteStore {
    pool: SqlitePool,
    /// Serialises check-then-write so invariant checks see a stable table
    writer: Mutex<()>,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writer: Mutex::new(()),
        }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Open (creating if missing) and migrate the database file at `path`.
    /// The path is passed through as a filename, never spliced into a URL.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_ENTITIES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Load every entity in insertion order.
    async fn load(&self) -> Result<Catalog> {
        let rows = sqlx::query("SELECT kind, key, body FROM entities ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list entities")?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            let kind_str: String = row.get("kind");
            let key: String = row.get("key");
            let Some(kind) = EntityKind::from_str(&kind_str) else {
                warn!(kind = %kind_str, key = %key, "skipping row of unknown kind");
                continue;
            };
            let body: String = row.get("body");
            let record = serde_json::from_str(&body)
                .with_context(|| format!("Invalid JSON for {} {}", kind, key))?;
            let entity = kind
                .decode(record)
                .with_context(|| format!("Failed to decode {} {}", kind, key))?;
            entities.push(entity);
        }
        Ok(entities.into_iter().collect())
    }

    async fn load_for_read(&self) -> Catalog {
        match self.load().await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "treating unreadable database as empty");
                Catalog::new()
            }
        }
    }

    async fn load_for_write(&self, operation: &str) -> Result<Catalog> {
        self.load()
            .await
            .with_context(|| format!("Failed to load entities for {}", operation))
    }

    async fn insert_row(&self, entity: &Entity) -> Result<()> {
        let body = serde_json::to_string(&entity.encode()?)?;
        sqlx::query(
            r#"
            INSERT INTO entities (kind, key, body, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (kind, key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(entity.kind().as_str())
        .bind(entity.key().value())
        .bind(&body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save entity")?;
        Ok(())
    }
}

impl EntityStore for SqliteStore {
    async fn query(&self, predicates: &Predicates) -> Option<Entity> {
        self.load_for_read().await.find(predicates).cloned()
    }

    async fn list(&self, predicates: &Predicates) -> Vec<Entity> {
        self.load_for_read().await.filter(predicates)
    }

    async fn create(&self, entity: Entity) -> Result<(), StoreError> {
        let _guard = self.writer.lock().await;
        self.load_for_write("create").await?.check_insert(&entity)?;
        self.insert_row(&entity).await?;
        debug!(key = %entity.key(), "database create");
        Ok(())
    }

    async fn update(&self, entity: Entity) -> Result<(), StoreError> {
        let _guard = self.writer.lock().await;
        self.load_for_write("update").await?.check_update(&entity)?;
        self.insert_row(&entity).await?;
        debug!(key = %entity.key(), "database update");
        Ok(())
    }

    async fn save(&self, entity: Entity) -> Result<(), StoreError> {
        let _guard = self.writer.lock().await;
        self.load_for_write("save").await?.check_conflicts(&entity)?;
        self.insert_row(&entity).await?;
        debug!(key = %entity.key(), "database save");
        Ok(())
    }

    async fn delete(&self, entity: &Entity) -> Result<(), StoreError> {
        let _guard = self.writer.lock().await;
        let key = entity.key();
        let result = sqlx::query("DELETE FROM entities WHERE kind = ? AND key = ?")
            .bind(key.kind().as_str())
            .bind(key.value())
            .execute(&self.pool)
            .await
            .context("Failed to delete entity")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(key));
        }
        debug!(key = %key, "database delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{DwellingKind, Site, Tenant};
    use crate::storage::Predicate;

    async fn test_store() -> Result<(SqliteStore, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let store = SqliteStore::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;
        Ok((store, temp_dir))
    }

    #[tokio::test]
    async fn test_save_replace_keeps_insertion_order() -> Result<()> {
        let (store, _temp) = test_store().await?;
        for number in ["1", "2", "3"] {
            store.create(Site::new(number, DwellingKind::Flat).into()).await?;
        }
        store.save(Site::new("1", DwellingKind::House).into()).await?;

        let sites: Vec<_> = store
            .list(&Predicate::of_kind(EntityKind::Site).into())
            .await
            .into_iter()
            .filter_map(Entity::into_site)
            .collect();
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[0].number, "1");
        assert_eq!(sites[0].dwelling, DwellingKind::House);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected() -> Result<()> {
        let (store, _temp) = test_store().await?;
        store.create(Tenant::new("Ada", "").into()).await?;

        let result = store.create(Tenant::new("Ada", "other").into()).await;

        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_kind_rows_are_skipped() -> Result<()> {
        let (store, _temp) = test_store().await?;
        sqlx::query("INSERT INTO entities (kind, key, body, updated_at) VALUES ('parking', '7', '{}', '')")
            .execute(&store.pool)
            .await?;
        store.create(Tenant::new("Ada", "").into()).await?;

        assert_eq!(store.list(&Predicates::any()).await.len(), 1);
        Ok(())
    }
}
