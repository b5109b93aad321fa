// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. All problems are
//! collected so the operator sees every mistake in one run.

use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostic::ConfigError;
use crate::model::DeskmailConfig;

static REFERENCE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]+$").unwrap());

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
pub fn validate_config(config: &DeskmailConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of: {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_ip && !is_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if let Some(key) = &config.gateway.api_key {
        if key.trim().is_empty() {
            fail("gateway.api_key must not be empty when set".to_string());
        }
    }

    if !REFERENCE_PREFIX.is_match(&config.ingest.reference_prefix) {
        fail(format!(
            "ingest.reference_prefix `{}` must be upper-case letters only (e.g. ACCT)",
            config.ingest.reference_prefix
        ));
    }

    if config.ingest.max_field_len == 0 {
        fail("ingest.max_field_len must be at least 1".to_string());
    }

    if config.ingest.notify_timeout_secs == 0 {
        fail("ingest.notify_timeout_secs must be at least 1".to_string());
    }

    if let Some(url) = &config.notify.teams_webhook_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            fail(format!(
                "notify.teams_webhook_url `{url}` must be an http(s) URL"
            ));
        }
    }

    if let Some(smtp) = &config.notify.smtp {
        if smtp.host.trim().is_empty() {
            fail("notify.smtp.host must not be empty".to_string());
        }
        if smtp.to.is_empty() {
            fail("notify.smtp.to must list at least one recipient".to_string());
        }
        if smtp.username.is_some() != smtp.password.is_some() {
            fail("notify.smtp.username and notify.smtp.password must be set together".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SmtpConfig;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&DeskmailConfig::default()).is_ok());
    }

    #[test]
    fn lowercase_prefix_is_rejected() {
        let mut config = DeskmailConfig::default();
        config.ingest.reference_prefix = "acct".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("reference_prefix"));
    }

    #[test]
    fn collects_every_problem() {
        let mut config = DeskmailConfig::default();
        config.ingest.reference_prefix = "AC-1".to_string();
        config.ingest.max_field_len = 0;
        config.gateway.host = String::new();
        config.notify.smtp = Some(SmtpConfig {
            host: "smtp.example.org".to_string(),
            port: 587,
            username: Some("desk".to_string()),
            password: None,
            from: "desk@example.org".to_string(),
            to: vec![],
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
    }
}
