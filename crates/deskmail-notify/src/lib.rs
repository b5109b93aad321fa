// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff notification adapters for deskmail.
//!
//! Every notification adapter implements [`deskmail_core::Notifier`].
//! [`from_config`] assembles the targets enabled in `[notify]` into a single
//! notifier. [`mailer_from_config`] builds the [`deskmail_core::Mailer`] staff
//! use to write to requesters, which needs `[notify.smtp]`.

pub mod fanout;
pub mod log;
pub mod mailer;
pub mod smtp;
pub mod teams;

use std::sync::Arc;

use deskmail_config::model::NotifyConfig;
use deskmail_core::{DeskmailError, Mailer, Notifier};
use tracing::info;

pub use fanout::FanoutNotifier;
pub use log::LogNotifier;
pub use mailer::SmtpMailer;
pub use smtp::SmtpNotifier;
pub use teams::TeamsWebhookNotifier;

/// Build the notifier described by `config`, or `None` when every target is
/// disabled.
pub fn from_config(config: &NotifyConfig) -> Result<Option<Arc<dyn Notifier>>, DeskmailError> {
    let mut targets: Vec<Arc<dyn Notifier>> = Vec::new();
    if config.log {
        targets.push(Arc::new(LogNotifier));
    }
    if let Some(url) = &config.teams_webhook_url {
        targets.push(Arc::new(TeamsWebhookNotifier::new(url.clone())?));
    }
    if let Some(smtp) = &config.smtp {
        targets.push(Arc::new(SmtpNotifier::from_config(smtp)?));
    }

    let names: Vec<&str> = targets.iter().map(|t| t.name()).collect();
    info!(targets = ?names, "notification targets configured");

    Ok(match targets.len() {
        0 => None,
        1 => targets.pop(),
        _ => Some(Arc::new(FanoutNotifier::new(targets))),
    })
}

/// Build the outbound mailer, or `None` when `[notify.smtp]` is absent.
pub fn mailer_from_config(
    config: &NotifyConfig,
) -> Result<Option<Arc<dyn Mailer>>, DeskmailError> {
    match &config.smtp {
        Some(smtp) => Ok(Some(Arc::new(SmtpMailer::from_config(smtp)?))),
        None => {
            info!("no [notify.smtp] section; sending email from tickets is disabled");
            Ok(None)
        }
    }
}
