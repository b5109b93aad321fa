// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Microsoft Teams incoming-webhook notifier.
//!
//! Posts a legacy `MessageCard`, which every Teams connector and
//! Power Automate "post to channel" flow accepts.

use std::time::Duration;

use async_trait::async_trait;
use deskmail_core::{AdapterType, DeskmailError, HealthStatus, Notification, Notifier, PluginAdapter};
use serde::Serialize;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct MessageCard<'a> {
    #[serde(rename = "@type")]
    type_: &'static str,
    #[serde(rename = "@context")]
    context: &'static str,
    summary: &'a str,
    title: &'a str,
    text: &'a str,
}

/// Posts notifications to a Teams channel webhook.
#[derive(Debug, Clone)]
pub struct TeamsWebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl TeamsWebhookNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, DeskmailError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeskmailError::Notification {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for TeamsWebhookNotifier {
    fn name(&self) -> &str {
        "teams"
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
impl Notifier for TeamsWebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), DeskmailError> {
        let title = notification.title();
        let card = MessageCard {
            type_: "MessageCard",
            context: "https://schema.org/extensions",
            summary: &title,
            title: &title,
            text: &notification.summary,
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&card)
            .send()
            .await
            .map_err(|e| DeskmailError::Notification {
                message: format!("Teams webhook request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, reference = %notification.ticket_reference, "Teams webhook responded");
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeskmailError::Notification {
            message: format!("Teams webhook returned {status}: {body}"),
            source: None,
        })
    }
}
