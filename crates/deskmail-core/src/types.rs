// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the extractor, the ingest pipeline, storage and the gateway.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DeskmailError;
use crate::status::{StatusCategory, TicketStatus};

/// Canonical timestamp format used for every persisted time value.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time in the canonical timestamp format.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Notifier,
    Mailer,
}

/// Human-facing ticket identifier such as `ACCT-0042`.
///
/// The numeric part is zero-padded to at least four digits and grows past
/// four digits once the counter does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceCode(String);

impl ReferenceCode {
    /// Format a reference from an already validated prefix and a sequence number.
    pub fn new(prefix: &str, sequence: u64) -> Self {
        Self(format!("{prefix}-{sequence:04}"))
    }

    /// Parse `PREFIX-NNNN`, upper-casing the input first.
    pub fn parse(raw: &str) -> Result<Self, DeskmailError> {
        let upper = raw.trim().to_ascii_uppercase();
        let valid = match upper.split_once('-') {
            Some((prefix, digits)) => {
                !prefix.is_empty()
                    && prefix.chars().all(|c| c.is_ascii_uppercase())
                    && digits.len() >= 4
                    && digits.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        };
        if valid {
            Ok(Self(upper))
        } else {
            Err(DeskmailError::InvalidInput(format!(
                "`{raw}` is not a ticket reference (expected PREFIX-NNNN)"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The alphabetic part before the dash.
    pub fn prefix(&self) -> &str {
        self.0.split_once('-').map(|(p, _)| p).unwrap_or(&self.0)
    }
}

impl fmt::Display for ReferenceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ReferenceCode {
    type Error = DeskmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReferenceCode> for String {
    fn from(code: ReferenceCode) -> Self {
        code.0
    }
}

/// One inbound email as delivered by the mail-automation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub subject: String,
    pub body: String,
    /// Raw `from` value; may be a bare address or `Name <addr>`.
    pub sender_email: String,
    pub external_message_id: Option<String>,
    pub external_conversation_id: Option<String>,
    pub received_at: String,
}

impl IncomingMessage {
    /// Build a message, treating empty or whitespace-only ids as absent.
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        sender_email: impl Into<String>,
        external_message_id: Option<String>,
        external_conversation_id: Option<String>,
        received_at: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            sender_email: sender_email.into(),
            external_message_id: non_blank(external_message_id),
            external_conversation_id: non_blank(external_conversation_id),
            received_at: received_at.into(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Best-effort structured view of an email body. `None` means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
    pub organization: Option<String>,
    pub lab_name: Option<String>,
    pub request_type: Option<String>,
    pub request_time: Option<String>,
    pub link: Option<String>,
    pub raw_body: String,
}

impl ExtractedFields {
    /// Every field unknown, keeping the body for the audit trail.
    pub fn unknown(raw_body: impl Into<String>) -> Self {
        Self {
            raw_body: raw_body.into(),
            ..Self::default()
        }
    }
}

/// A support ticket. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub reference: ReferenceCode,
    pub conversation_key: Option<String>,
    pub status: TicketStatus,
    pub assignee: Option<String>,
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
    pub organization: Option<String>,
    pub lab_name: Option<String>,
    pub request_type: Option<String>,
    pub link: Option<String>,
    pub original_subject: String,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
}

/// What produced a conversation entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    InboundEmail,
    OutboundEmail,
    InternalNote,
    SystemEvent,
}

/// A persisted entry in a ticket's conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: i64,
    pub ticket_reference: ReferenceCode,
    pub kind: EntryKind,
    pub body: String,
    pub author_identity: String,
    pub author_name: Option<String>,
    pub email_subject: Option<String>,
    pub external_message_id: Option<String>,
    pub created_at: String,
}

/// An entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub ticket_reference: ReferenceCode,
    pub kind: EntryKind,
    pub body: String,
    pub author_identity: String,
    pub author_name: Option<String>,
    pub email_subject: Option<String>,
    pub external_message_id: Option<String>,
    pub created_at: String,
}

/// Result of appending an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Stored with the given row id.
    Appended(i64),
    /// An entry with the same external message id already exists.
    Duplicate,
}

/// Which signal tied an email to an existing ticket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ThreadSignal {
    ConversationId,
    SubjectReference,
}

/// Output of the thread resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionDecision {
    /// Existing ticket to attach to, or `None` for a new ticket.
    pub attach_to: Option<Ticket>,
    pub signal: Option<ThreadSignal>,
}

impl ResolutionDecision {
    pub fn new_ticket() -> Self {
        Self {
            attach_to: None,
            signal: None,
        }
    }

    pub fn attach(ticket: Ticket, signal: ThreadSignal) -> Self {
        Self {
            attach_to: Some(ticket),
            signal: Some(signal),
        }
    }
}

/// What an ingest did.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IngestAction {
    Created,
    Attached,
    Duplicate,
}

/// Result returned to the webhook caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub reference: ReferenceCode,
    pub action: IngestAction,
    pub status: TicketStatus,
    pub signal: Option<ThreadSignal>,
}

/// Event carried by a notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    TicketCreated,
    ReplyReceived,
}

/// Message handed to the notification collaborator after a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub ticket_reference: ReferenceCode,
    pub event: NotificationEvent,
    pub summary: String,
}

impl Notification {
    /// One-line title, e.g. `[ACCT-0001] New request`.
    pub fn title(&self) -> String {
        let what = match self.event {
            NotificationEvent::TicketCreated => "New request",
            NotificationEvent::ReplyReceived => "New reply",
        };
        format!("[{}] {what}", self.ticket_reference)
    }
}

/// Operator-side ticket listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TicketFilter {
    pub status: Option<StatusCategory>,
    /// Substring matched against reference, requester email and requester name.
    pub search: Option<String>,
}

/// Number of tickets per top-level status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub open: u64,
    pub in_progress: u64,
    pub closed: u64,
    pub total: u64,
}

/// A ticket with its conversation in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub entries: Vec<ConversationEntry>,
}

/// Subject used when neither the caller nor the ticket supplies one.
pub const FALLBACK_EMAIL_SUBJECT: &str = "Your Account Request";

/// An email written by staff on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: Vec<String>,
    /// Empty until [`OutboundEmail::default_subject`] fills it.
    pub subject: String,
    pub body: String,
}

impl OutboundEmail {
    /// Trim and validate a staff email. Blank recipients are dropped; at least
    /// one must remain and the body must not be empty.
    pub fn new(
        to: Vec<String>,
        subject: Option<String>,
        body: impl Into<String>,
    ) -> Result<Self, DeskmailError> {
        if to.is_empty() {
            return Err(DeskmailError::InvalidInput(
                "at least one recipient is required".into(),
            ));
        }
        let to: Vec<String> = to
            .into_iter()
            .map(|addr| addr.trim().to_string())
            .filter(|addr| !addr.is_empty())
            .collect();
        if to.is_empty() {
            return Err(DeskmailError::InvalidInput(
                "at least one valid email recipient is required".into(),
            ));
        }
        let body = body.into().trim().to_string();
        if body.is_empty() {
            return Err(DeskmailError::InvalidInput("email body is required".into()));
        }
        Ok(Self {
            to,
            subject: subject.map(|s| s.trim().to_string()).unwrap_or_default(),
            body,
        })
    }

    /// Fill an empty subject with `Re: <original subject>`.
    pub fn default_subject(&mut self, original_subject: &str) {
        if !self.subject.is_empty() {
            return;
        }
        let original = original_subject.trim();
        self.subject = if original.is_empty() {
            FALLBACK_EMAIL_SUBJECT.to_string()
        } else {
            format!("Re: {original}")
        };
    }

    /// Body of the conversation entry that records this email.
    pub fn entry_body(&self) -> String {
        format!("Sent to: {}\n\n{}", self.to.join(", "), self.body)
    }
}
