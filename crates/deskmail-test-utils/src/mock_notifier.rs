// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notifier for deterministic testing.
//!
//! `MockNotifier` captures every notification it receives and can be told to
//! fail, so tests can check that notification problems never leak into the
//! ingest result.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use deskmail_core::{
    AdapterType, DeskmailError, HealthStatus, Notification, NotificationEvent, Notifier,
    PluginAdapter,
};

/// A capturing notifier.
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: AtomicBool::new(false),
        }
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        let notifier = Self::new();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All notifications received so far, including failed deliveries.
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Number of captured notifications of the given kind.
    pub async fn count_of(&self, event: NotificationEvent) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.event == event)
            .count()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
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
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), DeskmailError> {
        self.sent.lock().await.push(notification.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeskmailError::Notification {
                message: "mock notifier configured to fail".into(),
                source: None,
            });
        }
        Ok(())
    }
}
