// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff replies to requesters, sent over the `[notify.smtp]` relay.

use async_trait::async_trait;
use deskmail_config::model::SmtpConfig;
use deskmail_core::{
    AdapterType, DeskmailError, HealthStatus, Mailer, OutboundEmail, PluginAdapter,
};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::smtp::{parse_mailbox, relay_health, relay_transport};

/// Sends [`OutboundEmail`]s from the configured `from` address.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, DeskmailError> {
        Ok(Self {
            transport: relay_transport(config)?,
            from: parse_mailbox("from", &config.from)?,
        })
    }

    /// The message for `email`. A malformed recipient is the caller's error.
    pub fn build_message(&self, email: &OutboundEmail) -> Result<Message, DeskmailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for raw in &email.to {
            let recipient: Mailbox = raw.parse().map_err(|e| {
                DeskmailError::InvalidInput(format!("invalid recipient `{raw}`: {e}"))
            })?;
            builder = builder.to(recipient);
        }
        builder
            .body(email.body.clone())
            .map_err(|e| DeskmailError::Notification {
                message: format!("failed to build email: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

#[async_trait]
impl PluginAdapter for SmtpMailer {
    fn name(&self) -> &str {
        "smtp-mailer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mailer
    }

    async fn health_check(&self) -> Result<HealthStatus, DeskmailError> {
        Ok(relay_health(&self.transport).await)
    }

    async fn shutdown(&self) -> Result<(), DeskmailError> {
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeskmailError> {
        let message = self.build_message(email)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| DeskmailError::Notification {
                message: format!("SMTP delivery failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!(
            recipients = email.to.len(),
            code = %response.code(),
            "outbound email accepted"
        );
        Ok(())
    }
}
