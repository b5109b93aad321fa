// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`TicketStore`] trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use deskmail_config::model::StorageConfig;
use deskmail_core::{
    AdapterType, ConversationEntry, DeskmailError, HealthStatus, IngestOutcome, IngestUnit,
    OutboundEmail, PluginAdapter, ReferenceCode, StatusChange, StatusCounts, Ticket, TicketFilter,
    TicketStatus, TicketStore,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed ticket store.
///
/// The database is opened lazily by [`TicketStore::initialize`]; every other
/// operation fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, DeskmailError> {
        self.db.get().ok_or_else(|| DeskmailError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), DeskmailError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, DeskmailError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DeskmailError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TicketStore for SqliteStorage {
    async fn initialize(&self) -> Result<(), DeskmailError> {
        let db = Database::open(&self.config).await?;
        self.db.set(db).map_err(|_| DeskmailError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite ticket store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), DeskmailError> {
        Self::checkpoint(self.db()?).await
    }

    async fn run_ingest(&self, unit: IngestUnit) -> Result<IngestOutcome, DeskmailError> {
        queries::ingest::run_ingest(self.db()?, unit).await
    }

    async fn get_ticket(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Option<Ticket>, DeskmailError> {
        queries::tickets::get_ticket(self.db()?, reference).await
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, DeskmailError> {
        queries::tickets::list_tickets(self.db()?, filter).await
    }

    async fn status_counts(&self) -> Result<StatusCounts, DeskmailError> {
        queries::tickets::status_counts(self.db()?).await
    }

    async fn list_entries(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Vec<ConversationEntry>, DeskmailError> {
        queries::entries::list_entries(self.db()?, reference).await
    }

    async fn update_status(
        &self,
        reference: &ReferenceCode,
        status: TicketStatus,
        actor: &str,
    ) -> Result<StatusChange, DeskmailError> {
        queries::tickets::update_status(self.db()?, reference, status, actor).await
    }

    async fn assign(
        &self,
        reference: &ReferenceCode,
        assignee: Option<String>,
        actor: &str,
    ) -> Result<Ticket, DeskmailError> {
        queries::tickets::assign(self.db()?, reference, assignee, actor).await
    }

    async fn add_note(
        &self,
        reference: &ReferenceCode,
        body: &str,
        actor: &str,
    ) -> Result<ConversationEntry, DeskmailError> {
        queries::entries::add_note(self.db()?, reference, body, actor).await
    }

    async fn record_outbound_email(
        &self,
        reference: &ReferenceCode,
        email: &OutboundEmail,
        actor: &str,
    ) -> Result<ConversationEntry, DeskmailError> {
        queries::entries::record_outbound_email(self.db()?, reference, email, actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: path.display().to_string(),
            wal_mode: true,
            busy_timeout_ms: 1000,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("test.db")));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(&db_path));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("double.db")));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("no_init.db")));

        assert!(storage.health_check().await.is_err());
        let err = storage.status_counts().await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
        // Shutdown of a never-opened store is a no-op.
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn health_check_and_close() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("health.db")));

        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        assert_eq!(storage.status_counts().await.unwrap(), StatusCounts::default());
        storage.close().await.unwrap();
        storage.shutdown().await.unwrap();
    }
}
