// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./deskmail.toml` > `~/.config/deskmail/deskmail.toml` >
//! `/etc/deskmail/deskmail.toml`, with `DESKMAIL_*` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DeskmailConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/deskmail/deskmail.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "deskmail.toml";

/// Per-user config file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("deskmail").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/deskmail/deskmail.toml`
/// 3. `~/.config/deskmail/deskmail.toml`
/// 4. `./deskmail.toml`
/// 5. `DESKMAIL_*` environment variables
pub fn load_config() -> Result<DeskmailConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<DeskmailConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskmailConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DeskmailConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskmailConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full provider stack before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DeskmailConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `DESKMAIL_INGEST_REFERENCE_PREFIX` must become
/// `ingest.reference_prefix`, not `ingest.reference.prefix`.
fn env_provider() -> Env {
    Env::prefixed("DESKMAIL_").map(|key| env_key_to_path(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub fn env_key_to_path(key: &str) -> String {
    const SECTIONS: &[(&str, &str)] = &[
        ("notify_smtp_", "notify.smtp."),
        ("service_", "service."),
        ("storage_", "storage."),
        ("gateway_", "gateway."),
        ("ingest_", "ingest."),
        ("notify_", "notify."),
    ];

    for (env_prefix, path_prefix) in SECTIONS {
        if let Some(rest) = key.strip_prefix(env_prefix) {
            return format!("{path_prefix}{rest}");
        }
    }
    key.to_string()
}
