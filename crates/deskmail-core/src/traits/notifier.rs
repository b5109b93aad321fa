// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification collaborator trait.

use async_trait::async_trait;

use crate::error::DeskmailError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Notification;

/// Delivers ticket events to staff.
///
/// Callers dispatch notifications after the ingest has committed and treat
/// any error as non-fatal.
#[async_trait]
pub trait Notifier: PluginAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), DeskmailError>;
}
