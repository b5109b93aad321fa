// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod mailer;
pub mod notifier;
pub mod store;

pub use adapter::PluginAdapter;
pub use mailer::Mailer;
pub use notifier::Notifier;
pub use store::{ConversationLookup, IngestTransaction, IngestUnit, TicketStore};
