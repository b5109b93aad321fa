// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier that writes each event to the log.

use async_trait::async_trait;
use deskmail_core::{AdapterType, DeskmailError, HealthStatus, Notification, Notifier, PluginAdapter};
use tracing::info;

/// Emits one `info` line per notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl PluginAdapter for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, DeskmailError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DeskmailError> {
        Ok(())
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), DeskmailError> {
        info!(
            reference = %notification.ticket_reference,
            event = %notification.event,
            summary = %notification.summary,
            "{}",
            notification.title()
        );
        Ok(())
    }
}
