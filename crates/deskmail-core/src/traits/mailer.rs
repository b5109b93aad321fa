// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound mail trait used when staff write to a requester.

use async_trait::async_trait;

use crate::error::DeskmailError;
use crate::traits::adapter::PluginAdapter;
use crate::types::OutboundEmail;

/// Sends staff-written email. Unlike [`crate::Notifier`], a failure here is
/// reported to the caller and nothing is recorded on the ticket.
#[async_trait]
pub trait Mailer: PluginAdapter {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeskmailError>;
}
