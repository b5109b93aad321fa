// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion orchestrator.
//!
//! One call per delivered email: extract fields, then in a single store
//! transaction check for a duplicate delivery, resolve the thread and either
//! append to the matched ticket or create a new one. Notification happens on
//! a spawned task after the transaction commits and cannot fail the ingest.

use std::sync::Arc;
use std::time::Duration;

use deskmail_config::model::IngestConfig;
use deskmail_core::{
    AppendOutcome, DeskmailError, EntryKind, ExtractedFields, IncomingMessage, IngestAction,
    IngestOutcome, IngestTransaction, IngestUnit, NewEntry, Notification, NotificationEvent,
    Notifier, ReferenceCode, Ticket, TicketStatus, TicketStore, now_timestamp,
};
use deskmail_extract::{FieldExtractor, display_name_from_address, sender_address};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::reference::ReferenceGenerator;
use crate::resolver;

/// Identity recorded when a sender address cannot be recovered.
pub const UNKNOWN_SENDER: &str = "unknown@unknown.com";

/// Tunables for [`Ingestor`].
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub reference_prefix: String,
    pub max_field_len: usize,
    pub default_request_type: String,
    pub notify_timeout: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for IngestSettings {
    fn from(config: &IngestConfig) -> Self {
        Self {
            reference_prefix: config.reference_prefix.clone(),
            max_field_len: config.max_field_len,
            default_request_type: config.default_request_type.clone(),
            notify_timeout: Duration::from_secs(config.notify_timeout_secs),
        }
    }
}

/// Turns delivered emails into tickets and conversation entries.
pub struct Ingestor {
    store: Arc<dyn TicketStore>,
    notifier: Option<Arc<dyn Notifier>>,
    extractor: FieldExtractor,
    references: ReferenceGenerator,
    default_request_type: String,
    notify_timeout: Duration,
}

impl Ingestor {
    pub fn new(store: Arc<dyn TicketStore>, settings: IngestSettings) -> Result<Self, DeskmailError> {
        Ok(Self {
            store,
            notifier: None,
            extractor: FieldExtractor::new(settings.max_field_len),
            references: ReferenceGenerator::new(settings.reference_prefix)?,
            default_request_type: settings.default_request_type,
            notify_timeout: settings.notify_timeout,
        })
    }

    /// Attach a notifier; without one, ingests are silent.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }

    /// Ingest one email.
    ///
    /// Replaying the same `(message id, conversation id, subject, body)` is
    /// safe: the second call reports [`IngestAction::Duplicate`] and changes
    /// nothing. A conversation-key race with a concurrent delivery is retried
    /// once in a fresh transaction; a second conflict is reported as
    /// [`DeskmailError::Transient`] so the sender retries.
    pub async fn ingest(&self, message: IncomingMessage) -> Result<IngestOutcome, DeskmailError> {
        let (outcome, _notification) = self.ingest_inner(message).await?;
        Ok(outcome)
    }

    /// Like [`Ingestor::ingest`], also returning the handle of the spawned
    /// notification task, if one was started.
    pub async fn ingest_and_notify(
        &self,
        message: IncomingMessage,
    ) -> Result<(IngestOutcome, Option<JoinHandle<()>>), DeskmailError> {
        self.ingest_inner(message).await
    }

    async fn ingest_inner(
        &self,
        message: IncomingMessage,
    ) -> Result<(IngestOutcome, Option<JoinHandle<()>>), DeskmailError> {
        let fields = deskmail_extract::with_sender_fallback(
            self.extractor.extract(&message.subject, &message.body),
            &message.sender_email,
        );
        let plan = Arc::new(IngestPlan {
            message,
            fields,
            references: self.references.clone(),
            default_request_type: self.default_request_type.clone(),
        });

        let outcome = match self.store.run_ingest(plan.unit()).await {
            Err(DeskmailError::ConversationConflict { key }) => {
                debug!(conversation_id = %key, "conversation claimed concurrently; retrying ingest");
                match self.store.run_ingest(plan.unit()).await {
                    Err(DeskmailError::ConversationConflict { key }) => {
                        Err(DeskmailError::Transient(format!(
                            "conversation `{key}` is still contended after retry"
                        )))
                    }
                    other => other,
                }
            }
            other => other,
        }?;

        info!(
            reference = %outcome.reference,
            action = %outcome.action,
            signal = ?outcome.signal,
            message_id = plan.message.external_message_id.as_deref(),
            "email ingested"
        );

        let handle = self.dispatch(&outcome, &plan);
        Ok((outcome, handle))
    }

    fn dispatch(&self, outcome: &IngestOutcome, plan: &IngestPlan) -> Option<JoinHandle<()>> {
        let notifier = self.notifier.clone()?;
        let event = match outcome.action {
            IngestAction::Created => NotificationEvent::TicketCreated,
            IngestAction::Attached => NotificationEvent::ReplyReceived,
            IngestAction::Duplicate => return None,
        };
        let notification = Notification {
            ticket_reference: outcome.reference.clone(),
            event,
            summary: plan.summary(event),
        };
        let timeout = self.notify_timeout;

        Some(tokio::spawn(async move {
            match tokio::time::timeout(timeout, notifier.notify(&notification)).await {
                Ok(Ok(())) => debug!(
                    reference = %notification.ticket_reference,
                    notifier = notifier.name(),
                    "notification sent"
                ),
                Ok(Err(e)) => warn!(
                    reference = %notification.ticket_reference,
                    notifier = notifier.name(),
                    error = %e,
                    "notification failed"
                ),
                Err(_) => warn!(
                    reference = %notification.ticket_reference,
                    notifier = notifier.name(),
                    timeout_secs = timeout.as_secs(),
                    "notification timed out"
                ),
            }
        }))
    }
}

/// Everything the transactional unit needs, shared between attempts.
struct IngestPlan {
    message: IncomingMessage,
    fields: ExtractedFields,
    references: ReferenceGenerator,
    default_request_type: String,
}

impl IngestPlan {
    fn unit(self: &Arc<Self>) -> IngestUnit {
        let plan = Arc::clone(self);
        Box::new(move |tx: &mut dyn IngestTransaction| plan.apply(tx))
    }

    fn apply(&self, tx: &mut dyn IngestTransaction) -> Result<IngestOutcome, DeskmailError> {
        let message_id = self.message.external_message_id.as_deref();
        let conversation_id = self.message.external_conversation_id.as_deref();

        if let Some(id) = message_id {
            if let Some(reference) = tx.find_entry_by_message_id(id)? {
                return self.duplicate(tx, reference);
            }
        }

        let decision = resolver::resolve(conversation_id, message_id, &self.message.subject, &*tx)?;
        match decision.attach_to {
            Some(ticket) => {
                let reference = ticket.reference.clone();
                let entry = self.inbound_entry(Some(&ticket), &reference);
                if let AppendOutcome::Duplicate = tx.append_entry(&entry)? {
                    return self.duplicate(tx, reference);
                }
                tx.touch_ticket(&reference, &now_timestamp())?;
                if let (None, Some(key)) = (&ticket.conversation_key, conversation_id) {
                    tx.adopt_conversation_key(&reference, key)?;
                }
                Ok(IngestOutcome {
                    reference,
                    action: IngestAction::Attached,
                    status: ticket.status,
                    signal: decision.signal,
                })
            }
            None => {
                let reference = self.references.next(tx)?;
                let ticket = self.new_ticket(reference.clone());
                tx.insert_ticket(&ticket)?;
                tx.append_entry(&self.inbound_entry(None, &reference))?;
                Ok(IngestOutcome {
                    reference,
                    action: IngestAction::Created,
                    status: ticket.status,
                    signal: None,
                })
            }
        }
    }

    fn duplicate(
        &self,
        tx: &mut dyn IngestTransaction,
        reference: ReferenceCode,
    ) -> Result<IngestOutcome, DeskmailError> {
        let status = tx
            .find_ticket_by_reference(&reference)?
            .map(|t| t.status)
            .unwrap_or_default();
        Ok(IngestOutcome {
            reference,
            action: IngestAction::Duplicate,
            status,
            signal: None,
        })
    }

    fn sender(&self) -> String {
        sender_address(&self.message.sender_email).unwrap_or_else(|| UNKNOWN_SENDER.to_string())
    }

    fn new_ticket(&self, reference: ReferenceCode) -> Ticket {
        let now = now_timestamp();
        let fields = &self.fields;
        Ticket {
            reference,
            conversation_key: self.message.external_conversation_id.clone(),
            status: TicketStatus::Open,
            assignee: None,
            requester_name: fields.requester_name.clone(),
            requester_email: fields.requester_email.clone(),
            organization: fields.organization.clone(),
            lab_name: fields.lab_name.clone(),
            request_type: Some(
                fields
                    .request_type
                    .clone()
                    .unwrap_or_else(|| self.default_request_type.clone()),
            ),
            link: fields.link.clone(),
            original_subject: self.message.subject.clone(),
            created_at: now.clone(),
            updated_at: now,
            closed_at: None,
        }
    }

    /// The email as a conversation entry. On an existing ticket, mail from
    /// the requester is attributed to the requester's recorded name.
    fn inbound_entry(&self, existing: Option<&Ticket>, reference: &ReferenceCode) -> NewEntry {
        let sender = self.sender();
        let author_name = match existing {
            Some(ticket) if ticket.requester_email.as_deref() == Some(sender.as_str()) => ticket
                .requester_name
                .clone()
                .unwrap_or_else(|| display_name_from_address(&sender)),
            Some(_) => display_name_from_address(&sender),
            None => self
                .fields
                .requester_name
                .clone()
                .unwrap_or_else(|| display_name_from_address(&sender)),
        };

        NewEntry {
            ticket_reference: reference.clone(),
            kind: EntryKind::InboundEmail,
            body: self.message.body.clone(),
            author_identity: sender,
            author_name: Some(author_name),
            email_subject: Some(self.message.subject.clone()).filter(|s| !s.is_empty()),
            external_message_id: self.message.external_message_id.clone(),
            created_at: self.message.received_at.clone(),
        }
    }

    fn summary(&self, event: NotificationEvent) -> String {
        let who = self
            .fields
            .requester_name
            .clone()
            .or_else(|| self.fields.requester_email.clone())
            .unwrap_or_else(|| "unknown requester".to_string());
        match event {
            NotificationEvent::TicketCreated => {
                format!("New request from {who}: {}", self.message.subject)
            }
            NotificationEvent::ReplyReceived => {
                format!("Reply from {}: {}", self.sender(), self.message.subject)
            }
        }
    }
}
