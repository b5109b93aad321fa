// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the deskmail ingestion engine.
//!
//! This crate provides the error type, the domain types and the adapter
//! traits used throughout the deskmail workspace. Storage backends and
//! notifiers implement traits defined here.

pub mod error;
pub mod status;
pub mod traits;
pub mod types;

pub use error::DeskmailError;
pub use status::{ClosedReason, InProgressReason, StatusCategory, StatusChange, TicketStatus};
pub use types::{
    AdapterType, AppendOutcome, ConversationEntry, EntryKind, ExtractedFields, HealthStatus,
    IncomingMessage, IngestAction, IngestOutcome, NewEntry, Notification, NotificationEvent,
    OutboundEmail, ReferenceCode, ResolutionDecision, StatusCounts, ThreadSignal, Ticket,
    TicketDetail, TicketFilter, now_timestamp,
};

pub use traits::{
    ConversationLookup, IngestTransaction, IngestUnit, Mailer, Notifier, PluginAdapter,
    TicketStore,
};
