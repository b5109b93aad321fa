// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivers each notification to several notifiers at once.

use std::sync::Arc;

use async_trait::async_trait;
use deskmail_core::{AdapterType, DeskmailError, HealthStatus, Notification, Notifier, PluginAdapter};
use futures::future::join_all;
use tracing::warn;

/// Sends to every target concurrently. One failing target does not stop the
/// others; the combined failure is reported once all have finished.
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[async_trait]
impl PluginAdapter for FanoutNotifier {
    fn name(&self) -> &str {
        "fanout"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    /// The worst status among the targets.
    async fn health_check(&self) -> Result<HealthStatus, DeskmailError> {
        let results = join_all(self.targets.iter().map(|t| t.health_check())).await;
        let mut overall = HealthStatus::Healthy;
        for (target, result) in self.targets.iter().zip(results) {
            match result {
                Ok(HealthStatus::Healthy) => {}
                Ok(HealthStatus::Degraded(reason)) => {
                    if overall == HealthStatus::Healthy {
                        overall = HealthStatus::Degraded(format!("{}: {reason}", target.name()));
                    }
                }
                Ok(HealthStatus::Unhealthy(reason)) => {
                    return Ok(HealthStatus::Unhealthy(format!("{}: {reason}", target.name())));
                }
                Err(e) => {
                    return Ok(HealthStatus::Unhealthy(format!("{}: {e}", target.name())));
                }
            }
        }
        Ok(overall)
    }

    async fn shutdown(&self) -> Result<(), DeskmailError> {
        for target in &self.targets {
            target.shutdown().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), DeskmailError> {
        let results = join_all(self.targets.iter().map(|t| t.notify(notification))).await;

        let failures: Vec<String> = self
            .targets
            .iter()
            .zip(results)
            .filter_map(|(target, result)| {
                result.err().map(|e| {
                    warn!(
                        notifier = target.name(),
                        reference = %notification.ticket_reference,
                        error = %e,
                        "notification target failed"
                    );
                    format!("{}: {e}", target.name())
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DeskmailError::Notification {
                message: failures.join("; "),
                source: None,
            })
        }
    }
}
