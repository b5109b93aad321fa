// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the deskmail ingestion engine.

use thiserror::Error;

/// The primary error type used across all deskmail adapter traits and core operations.
#[derive(Debug, Error)]
pub enum DeskmailError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Two deliveries tried to bind the same external conversation id to
    /// different tickets. Raised by the storage uniqueness constraint.
    #[error("conversation key `{key}` is already bound to a ticket")]
    ConversationConflict { key: String },

    /// The ingest could not complete but a redelivery is expected to succeed.
    #[error("transient ingestion failure: {0}")]
    Transient(String),

    /// No ticket carries the given reference code.
    #[error("ticket not found: {reference}")]
    NotFound { reference: String },

    /// Caller supplied a value that cannot be accepted (bad status, bad reference).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Notification delivery errors (webhook rejected, SMTP failure).
    #[error("notification error: {message}")]
    Notification {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeskmailError {
    /// Whether the upstream sender should retry the whole delivery.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeskmailError::Storage { .. }
                | DeskmailError::Transient(_)
                | DeskmailError::ConversationConflict { .. }
        )
    }
}
