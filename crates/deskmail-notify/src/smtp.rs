// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP notifier using lettre's async transport.

use async_trait::async_trait;
use deskmail_config::model::SmtpConfig;
use deskmail_core::{AdapterType, DeskmailError, HealthStatus, Notification, Notifier, PluginAdapter};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

/// Mails each notification to a fixed list of staff recipients.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

pub(crate) fn parse_mailbox(field: &str, raw: &str) -> Result<Mailbox, DeskmailError> {
    raw.parse().map_err(|e| {
        DeskmailError::Config(format!("notify.smtp.{field}: invalid address `{raw}`: {e}"))
    })
}

/// STARTTLS relay on the configured port, with credentials when both are set.
/// No connection is made until the first send.
pub(crate) fn relay_transport(
    config: &SmtpConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeskmailError> {
    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        .map_err(|e| DeskmailError::Config(format!("notify.smtp.host: {e}")))?
        .port(config.port);
    if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }
    Ok(builder.build())
}

/// Report the relay's NOOP answer as adapter health.
pub(crate) async fn relay_health(
    transport: &AsyncSmtpTransport<Tokio1Executor>,
) -> HealthStatus {
    match transport.test_connection().await {
        Ok(true) => HealthStatus::Healthy,
        Ok(false) => HealthStatus::Degraded("SMTP relay refused NOOP".into()),
        Err(e) => {
            warn!(error = %e, "SMTP health check failed");
            HealthStatus::Unhealthy(e.to_string())
        }
    }
}

impl SmtpNotifier {
    /// Validate the addresses and build the relay transport.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, DeskmailError> {
        let from = parse_mailbox("from", &config.from)?;
        let to = config
            .to
            .iter()
            .map(|raw| parse_mailbox("to", raw))
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(DeskmailError::Config(
                "notify.smtp.to must list at least one recipient".into(),
            ));
        }

        Ok(Self {
            transport: relay_transport(config)?,
            from,
            to,
        })
    }

    /// The email sent for `notification`.
    pub fn build_message(&self, notification: &Notification) -> Result<Message, DeskmailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notification.title())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        builder
            .body(format!(
                "{}\n\nTicket: {}\n",
                notification.summary, notification.ticket_reference
            ))
            .map_err(|e| DeskmailError::Notification {
                message: format!("failed to build notification email: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

#[async_trait]
impl PluginAdapter for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, DeskmailError> {
        Ok(relay_health(&self.transport).await)
    }

    async fn shutdown(&self) -> Result<(), DeskmailError> {
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), DeskmailError> {
        let message = self.build_message(notification)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| DeskmailError::Notification {
                message: format!("SMTP delivery failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!(
            reference = %notification.ticket_reference,
            code = %response.code(),
            "notification email accepted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskmail_core::{NotificationEvent, ReferenceCode};

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.org".into(),
            port: 587,
            username: Some("desk".into()),
            password: Some("secret".into()),
            from: "Support Desk <desk@example.org>".into(),
            to: vec!["staff@example.org".into(), "lead@example.org".into()],
        }
    }

    #[tokio::test]
    async fn message_carries_title_and_all_recipients() {
        let notifier = SmtpNotifier::from_config(&config()).unwrap();
        let message = notifier
            .build_message(&Notification {
                ticket_reference: ReferenceCode::new("ACCT", 7),
                event: NotificationEvent::ReplyReceived,
                summary: "Jane Doe replied".into(),
            })
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: [ACCT-0007] New reply"));
        assert!(raw.contains("staff@example.org"));
        assert!(raw.contains("lead@example.org"));
        assert!(raw.contains("Jane Doe replied"));
    }

    #[tokio::test]
    async fn invalid_sender_is_a_config_error() {
        let mut cfg = config();
        cfg.from = "not an address".into();
        let err = SmtpNotifier::from_config(&cfg).err().unwrap();
        assert!(matches!(err, DeskmailError::Config(_)));
    }

    #[tokio::test]
    async fn empty_recipient_list_is_rejected() {
        let mut cfg = config();
        cfg.to.clear();
        assert!(SmtpNotifier::from_config(&cfg).is_err());
    }
}
