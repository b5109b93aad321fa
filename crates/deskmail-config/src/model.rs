// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level deskmail configuration.
///
/// Every section is optional and falls back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeskmailConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name reported by `/health` and in log lines.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "deskmail".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a writer waits on a locked database before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("deskmail").join("deskmail.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("deskmail.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret expected in `X-API-Key` or `Authorization: Bearer`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Accept requests without a key when none is configured.
    /// Off by default: a gateway without a key rejects every protected call.
    #[serde(default)]
    pub allow_unauthenticated: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
            allow_unauthenticated: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Ingestion behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Alphabetic prefix of ticket references, e.g. `ACCT` in `ACCT-0001`.
    #[serde(default = "default_reference_prefix")]
    pub reference_prefix: String,

    /// Upper bound, in characters, for any single extracted field.
    #[serde(default = "default_max_field_len")]
    pub max_field_len: usize,

    /// Request type recorded when the email does not state one.
    #[serde(default = "default_request_type")]
    pub default_request_type: String,

    /// Budget for a single notification dispatch.
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            reference_prefix: default_reference_prefix(),
            max_field_len: default_max_field_len(),
            default_request_type: default_request_type(),
            notify_timeout_secs: default_notify_timeout_secs(),
        }
    }
}

fn default_reference_prefix() -> String {
    "ACCT".to_string()
}

fn default_max_field_len() -> usize {
    500
}

fn default_request_type() -> String {
    "Account Request".to_string()
}

fn default_notify_timeout_secs() -> u64 {
    10
}

/// Where staff notifications go. Every enabled target receives every event.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Emit notifications as `info` log lines.
    #[serde(default = "default_notify_log")]
    pub log: bool,

    /// Microsoft Teams incoming-webhook URL.
    #[serde(default)]
    pub teams_webhook_url: Option<String>,

    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            log: default_notify_log(),
            teams_webhook_url: None,
            smtp: None,
        }
    }
}

fn default_notify_log() -> bool {
    true
}

/// Outbound SMTP relay for staff notifications and for email sent from tickets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Sender mailbox, e.g. `Support Desk <desk@example.org>`.
    pub from: String,

    /// Staff mailboxes that receive notifications.
    #[serde(default)]
    pub to: Vec<String>,
}

fn default_smtp_port() -> u16 {
    587
}
