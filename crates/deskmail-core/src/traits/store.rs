// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for tickets and their conversations.
//!
//! Ingestion runs as a single unit of work against an [`IngestTransaction`].
//! The store executes the unit inside one write transaction and commits only
//! when it returns `Ok`, so the duplicate check, the thread lookup and the
//! insert or append are atomic with respect to concurrent deliveries.

use async_trait::async_trait;

use crate::error::DeskmailError;
use crate::status::{StatusChange, TicketStatus};
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AppendOutcome, ConversationEntry, IngestOutcome, NewEntry, OutboundEmail, ReferenceCode,
    StatusCounts, Ticket, TicketFilter,
};

/// Read-only ticket lookups used by the thread resolver.
pub trait ConversationLookup {
    fn find_ticket_by_conversation_key(&self, key: &str) -> Result<Option<Ticket>, DeskmailError>;

    fn find_ticket_by_reference(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Option<Ticket>, DeskmailError>;
}

/// Operations available inside an ingest transaction.
pub trait IngestTransaction: ConversationLookup {
    /// Reference of the ticket that already holds an entry with this message id.
    fn find_entry_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<ReferenceCode>, DeskmailError>;

    /// Atomically increment and return the counter for `prefix`.
    fn next_sequence(&mut self, prefix: &str) -> Result<u64, DeskmailError>;

    /// Insert a new ticket.
    ///
    /// Fails with [`DeskmailError::ConversationConflict`] when another ticket
    /// already owns the conversation key.
    fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), DeskmailError>;

    fn append_entry(&mut self, entry: &NewEntry) -> Result<AppendOutcome, DeskmailError>;

    /// Bind a conversation key to a ticket that has none. A ticket that
    /// already carries a key is left untouched.
    fn adopt_conversation_key(
        &mut self,
        reference: &ReferenceCode,
        key: &str,
    ) -> Result<(), DeskmailError>;

    /// Bump `updated_at`.
    fn touch_ticket(&mut self, reference: &ReferenceCode, at: &str) -> Result<(), DeskmailError>;
}

/// A unit of ingest work run inside one transaction.
pub type IngestUnit = Box<
    dyn FnOnce(&mut dyn IngestTransaction) -> Result<IngestOutcome, DeskmailError> + Send,
>;

/// Ticket persistence backend.
#[async_trait]
pub trait TicketStore: PluginAdapter {
    /// Opens the backend and applies migrations.
    async fn initialize(&self) -> Result<(), DeskmailError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), DeskmailError>;

    /// Run `unit` inside one write transaction; commit on `Ok`, roll back on `Err`.
    async fn run_ingest(&self, unit: IngestUnit) -> Result<IngestOutcome, DeskmailError>;

    async fn get_ticket(&self, reference: &ReferenceCode)
    -> Result<Option<Ticket>, DeskmailError>;

    /// Tickets matching `filter`, newest first.
    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, DeskmailError>;

    async fn status_counts(&self) -> Result<StatusCounts, DeskmailError>;

    /// Entries of a ticket ordered by creation time, then insertion order.
    async fn list_entries(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Vec<ConversationEntry>, DeskmailError>;

    /// Apply an agent status change and record it as a system event.
    async fn update_status(
        &self,
        reference: &ReferenceCode,
        status: TicketStatus,
        actor: &str,
    ) -> Result<StatusChange, DeskmailError>;

    /// Set or clear the assignee and record it as a system event.
    async fn assign(
        &self,
        reference: &ReferenceCode,
        assignee: Option<String>,
        actor: &str,
    ) -> Result<Ticket, DeskmailError>;

    /// Append an internal note.
    async fn add_note(
        &self,
        reference: &ReferenceCode,
        body: &str,
        actor: &str,
    ) -> Result<ConversationEntry, DeskmailError>;

    /// Record an email that `actor` has already sent from the ticket.
    async fn record_outbound_email(
        &self,
        reference: &ReferenceCode,
        email: &OutboundEmail,
        actor: &str,
    ) -> Result<ConversationEntry, DeskmailError>;
}
