// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store and notifier fakes for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use deskmail_core::{
    AdapterType, AppendOutcome, ConversationEntry, ConversationLookup, DeskmailError,
    HealthStatus, IncomingMessage, IngestOutcome, IngestTransaction, IngestUnit, NewEntry,
    Notification, Notifier, OutboundEmail, PluginAdapter, ReferenceCode, StatusChange,
    StatusCounts, Ticket, TicketFilter, TicketStatus, TicketStore, now_timestamp,
};

pub(crate) fn ticket(reference: &str) -> Ticket {
    let now = now_timestamp();
    Ticket {
        reference: ReferenceCode::parse(reference).unwrap(),
        conversation_key: None,
        status: TicketStatus::Open,
        assignee: None,
        requester_name: Some("Jane Doe".into()),
        requester_email: Some("jane@uni.edu".into()),
        organization: None,
        lab_name: None,
        request_type: None,
        link: None,
        original_subject: "New account request".into(),
        created_at: now.clone(),
        updated_at: now,
        closed_at: None,
    }
}

pub(crate) fn message(
    subject: &str,
    body: &str,
    message_id: Option<&str>,
    conversation_id: Option<&str>,
) -> IncomingMessage {
    IncomingMessage::new(
        subject,
        body,
        "jane@uni.edu",
        message_id.map(str::to_string),
        conversation_id.map(str::to_string),
        now_timestamp(),
    )
}

/// Tables of a store, usable directly as a transaction.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    pub tickets: Vec<Ticket>,
    pub entries: Vec<ConversationEntry>,
    pub sequences: HashMap<String, u64>,
}

impl MemoryState {
    fn ticket_mut(&mut self, reference: &ReferenceCode) -> Result<&mut Ticket, DeskmailError> {
        self.tickets
            .iter_mut()
            .find(|t| &t.reference == reference)
            .ok_or_else(|| DeskmailError::NotFound {
                reference: reference.to_string(),
            })
    }
}

impl ConversationLookup for MemoryState {
    fn find_ticket_by_conversation_key(&self, key: &str) -> Result<Option<Ticket>, DeskmailError> {
        Ok(self
            .tickets
            .iter()
            .find(|t| t.conversation_key.as_deref() == Some(key))
            .cloned())
    }

    fn find_ticket_by_reference(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Option<Ticket>, DeskmailError> {
        Ok(self.tickets.iter().find(|t| &t.reference == reference).cloned())
    }
}

impl IngestTransaction for MemoryState {
    fn find_entry_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<ReferenceCode>, DeskmailError> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.external_message_id.as_deref() == Some(message_id))
            .map(|e| e.ticket_reference.clone()))
    }

    fn next_sequence(&mut self, prefix: &str) -> Result<u64, DeskmailError> {
        let counter = self.sequences.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), DeskmailError> {
        if let Some(key) = &ticket.conversation_key {
            if self.find_ticket_by_conversation_key(key)?.is_some() {
                return Err(DeskmailError::ConversationConflict { key: key.clone() });
            }
        }
        self.tickets.push(ticket.clone());
        Ok(())
    }

    fn append_entry(&mut self, entry: &NewEntry) -> Result<AppendOutcome, DeskmailError> {
        if let Some(id) = &entry.external_message_id {
            if self.find_entry_by_message_id(id)?.is_some() {
                return Ok(AppendOutcome::Duplicate);
            }
        }
        let id = self.entries.len() as i64 + 1;
        self.entries.push(ConversationEntry {
            id,
            ticket_reference: entry.ticket_reference.clone(),
            kind: entry.kind,
            body: entry.body.clone(),
            author_identity: entry.author_identity.clone(),
            author_name: entry.author_name.clone(),
            email_subject: entry.email_subject.clone(),
            external_message_id: entry.external_message_id.clone(),
            created_at: entry.created_at.clone(),
        });
        Ok(AppendOutcome::Appended(id))
    }

    fn adopt_conversation_key(
        &mut self,
        reference: &ReferenceCode,
        key: &str,
    ) -> Result<(), DeskmailError> {
        let ticket = self.ticket_mut(reference)?;
        if ticket.conversation_key.is_none() {
            ticket.conversation_key = Some(key.to_string());
        }
        Ok(())
    }

    fn touch_ticket(&mut self, reference: &ReferenceCode, at: &str) -> Result<(), DeskmailError> {
        self.ticket_mut(reference)?.updated_at = at.to_string();
        Ok(())
    }
}

/// Copy-on-write transactional store: a unit runs against a snapshot that
/// replaces the state only when the unit succeeds.
#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<MemoryState>,
    /// Queued conflicts; `Some` commits a competing ticket first.
    conflicts: Mutex<VecDeque<Option<Ticket>>>,
}

impl MemoryStore {
    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().unwrap().clone()
    }

    pub fn insert(&self, ticket: Ticket) {
        self.state.lock().unwrap().tickets.push(ticket);
    }

    pub fn inject_conflict(&self, competitor: Option<Ticket>) {
        self.conflicts.lock().unwrap().push_back(competitor);
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, DeskmailError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DeskmailError> {
        Ok(())
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn initialize(&self) -> Result<(), DeskmailError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), DeskmailError> {
        Ok(())
    }

    async fn run_ingest(&self, unit: IngestUnit) -> Result<IngestOutcome, DeskmailError> {
        let injected = self.conflicts.lock().unwrap().pop_front();
        let mut state = self.state.lock().unwrap();
        if let Some(competitor) = injected {
            let key = match competitor {
                Some(ticket) => {
                    let key = ticket.conversation_key.clone().unwrap_or_default();
                    state.tickets.push(ticket);
                    key
                }
                None => "contended".to_string(),
            };
            return Err(DeskmailError::ConversationConflict { key });
        }

        let mut working = state.clone();
        let outcome = unit(&mut working)?;
        *state = working;
        Ok(outcome)
    }

    async fn get_ticket(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Option<Ticket>, DeskmailError> {
        self.state.lock().unwrap().find_ticket_by_reference(reference)
    }

    async fn list_tickets(&self, _filter: &TicketFilter) -> Result<Vec<Ticket>, DeskmailError> {
        Ok(self.snapshot().tickets)
    }

    async fn status_counts(&self) -> Result<StatusCounts, DeskmailError> {
        Ok(StatusCounts::default())
    }

    async fn list_entries(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Vec<ConversationEntry>, DeskmailError> {
        Ok(self
            .snapshot()
            .entries
            .into_iter()
            .filter(|e| &e.ticket_reference == reference)
            .collect())
    }

    async fn update_status(
        &self,
        reference: &ReferenceCode,
        status: TicketStatus,
        _actor: &str,
    ) -> Result<StatusChange, DeskmailError> {
        let mut state = self.state.lock().unwrap();
        let ticket = state.ticket_mut(reference)?;
        let change = ticket.status.transition_to(status);
        ticket.status = status;
        Ok(change)
    }

    async fn assign(
        &self,
        reference: &ReferenceCode,
        assignee: Option<String>,
        _actor: &str,
    ) -> Result<Ticket, DeskmailError> {
        let mut state = self.state.lock().unwrap();
        let ticket = state.ticket_mut(reference)?;
        ticket.assignee = assignee;
        Ok(ticket.clone())
    }

    async fn add_note(
        &self,
        reference: &ReferenceCode,
        body: &str,
        actor: &str,
    ) -> Result<ConversationEntry, DeskmailError> {
        let mut state = self.state.lock().unwrap();
        let entry = NewEntry {
            ticket_reference: reference.clone(),
            kind: deskmail_core::EntryKind::InternalNote,
            body: body.to_string(),
            author_identity: actor.to_string(),
            author_name: None,
            email_subject: None,
            external_message_id: None,
            created_at: now_timestamp(),
        };
        state.append_entry(&entry)?;
        state
            .entries
            .last()
            .cloned()
            .ok_or_else(|| DeskmailError::Internal("note not stored".into()))
    }

    async fn record_outbound_email(
        &self,
        reference: &ReferenceCode,
        email: &OutboundEmail,
        actor: &str,
    ) -> Result<ConversationEntry, DeskmailError> {
        let mut state = self.state.lock().unwrap();
        let entry = NewEntry {
            ticket_reference: reference.clone(),
            kind: deskmail_core::EntryKind::OutboundEmail,
            body: email.entry_body(),
            author_identity: actor.to_string(),
            author_name: None,
            email_subject: Some(email.subject.clone()),
            external_message_id: None,
            created_at: now_timestamp(),
        };
        state.append_entry(&entry)?;
        state
            .entries
            .last()
            .cloned()
            .ok_or_else(|| DeskmailError::Internal("email not stored".into()))
    }
}

/// Records every notification; optionally fails each one.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PluginAdapter for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
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
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), DeskmailError> {
        if self.fail {
            return Err(DeskmailError::Notification {
                message: "webhook rejected".into(),
                source: None,
            });
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
