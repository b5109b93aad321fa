// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end ingestion tests.
//!
//! `IngestHarness` assembles a temp SQLite store, an [`Ingestor`] and a
//! [`MockNotifier`]. Its `ingest*` methods wait for the notification task so
//! assertions on the notifier are deterministic.

use std::sync::Arc;
use std::time::Duration;

use deskmail_config::model::StorageConfig;
use deskmail_core::{
    ConversationEntry, DeskmailError, IncomingMessage, IngestOutcome, ReferenceCode, Ticket,
    TicketStore,
};
use deskmail_ingest::{InboundEmailPayload, IngestSettings, Ingestor};
use deskmail_storage::SqliteStorage;

use crate::mock_notifier::MockNotifier;

/// Builder for [`IngestHarness`].
pub struct IngestHarnessBuilder {
    settings: IngestSettings,
    notifier: MockNotifier,
}

impl IngestHarnessBuilder {
    fn new() -> Self {
        Self {
            settings: IngestSettings {
                notify_timeout: Duration::from_secs(2),
                ..IngestSettings::default()
            },
            notifier: MockNotifier::new(),
        }
    }

    /// Use a different reference prefix.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.settings.reference_prefix = prefix.to_string();
        self
    }

    /// Make every notification delivery fail.
    pub fn with_failing_notifier(mut self) -> Self {
        self.notifier = MockNotifier::failing();
        self
    }

    pub async fn build(self) -> Result<IngestHarness, DeskmailError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| DeskmailError::Storage { source: e.into() })?;
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }));
        storage.initialize().await?;

        let notifier = Arc::new(self.notifier);
        let ingestor = Ingestor::new(storage.clone(), self.settings)?.with_notifier(notifier.clone());

        Ok(IngestHarness {
            storage,
            ingestor: Arc::new(ingestor),
            notifier,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete ingestion stack over a throwaway database.
pub struct IngestHarness {
    /// SQLite store (temp DB, removed on drop).
    pub storage: Arc<SqliteStorage>,
    pub ingestor: Arc<Ingestor>,
    pub notifier: Arc<MockNotifier>,
    _temp_dir: tempfile::TempDir,
}

impl IngestHarness {
    pub fn builder() -> IngestHarnessBuilder {
        IngestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, DeskmailError> {
        Self::builder().build().await
    }

    /// The store as the trait object the rest of the stack expects.
    pub fn store(&self) -> Arc<dyn TicketStore> {
        self.storage.clone()
    }

    /// Ingest a message and wait for its notification to be delivered.
    pub async fn ingest(&self, message: IncomingMessage) -> Result<IngestOutcome, DeskmailError> {
        let (outcome, handle) = self.ingestor.ingest_and_notify(message).await?;
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| DeskmailError::Internal(format!("notification task panicked: {e}")))?;
        }
        Ok(outcome)
    }

    /// Ingest from the webhook's JSON shape.
    pub async fn ingest_payload(
        &self,
        payload: InboundEmailPayload,
    ) -> Result<IngestOutcome, DeskmailError> {
        self.ingest(payload.into_message()).await
    }

    /// Build and ingest an email from `jane@uni.edu`.
    pub async fn ingest_email(
        &self,
        subject: &str,
        body: &str,
        message_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<IngestOutcome, DeskmailError> {
        self.ingest(IncomingMessage::new(
            subject,
            body,
            "Jane Doe <jane@uni.edu>",
            Some(message_id.to_string()),
            conversation_id.map(str::to_string),
            "2026-03-01T09:30:00.000Z",
        ))
        .await
    }

    pub async fn ticket(&self, reference: &str) -> Result<Option<Ticket>, DeskmailError> {
        self.storage.get_ticket(&ReferenceCode::parse(reference)?).await
    }

    pub async fn entries(&self, reference: &str) -> Result<Vec<ConversationEntry>, DeskmailError> {
        self.storage.list_entries(&ReferenceCode::parse(reference)?).await
    }
}
