// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation entry queries.

use deskmail_core::{
    AppendOutcome, ConversationEntry, DeskmailError, EntryKind, NewEntry, OutboundEmail,
    ReferenceCode, now_timestamp,
};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::queries::ingest::insert_entry;
use crate::queries::rows::{self, ENTRY_COLUMNS};

/// All entries of a ticket in display order.
pub async fn list_entries(
    db: &Database,
    reference: &ReferenceCode,
) -> Result<Vec<ConversationEntry>, DeskmailError> {
    let reference = reference.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM entries
                 WHERE ticket_reference = ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![reference], rows::entry_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Append an internal note written by `actor`.
pub async fn add_note(
    db: &Database,
    reference: &ReferenceCode,
    body: &str,
    actor: &str,
) -> Result<ConversationEntry, DeskmailError> {
    let body = body.trim().to_string();
    if body.is_empty() {
        return Err(DeskmailError::InvalidInput("note body is empty".into()));
    }
    append_staff_entry(db, reference, EntryKind::InternalNote, body, None, actor).await
}

/// Record an email `actor` sent to the requester.
pub async fn record_outbound_email(
    db: &Database,
    reference: &ReferenceCode,
    email: &OutboundEmail,
    actor: &str,
) -> Result<ConversationEntry, DeskmailError> {
    append_staff_entry(
        db,
        reference,
        EntryKind::OutboundEmail,
        email.entry_body(),
        Some(email.subject.clone()),
        actor,
    )
    .await
}

/// Insert a staff-authored entry and bump the ticket's `updated_at`.
async fn append_staff_entry(
    db: &Database,
    reference: &ReferenceCode,
    kind: EntryKind,
    body: String,
    email_subject: Option<String>,
    actor: &str,
) -> Result<ConversationEntry, DeskmailError> {
    let reference = reference.clone();
    let actor = actor.to_string();

    db.connection()
        .call(move |conn| -> Result<Result<ConversationEntry, DeskmailError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            if rows::select_ticket_by_reference(&tx, reference.as_str())?.is_none() {
                return Ok(Err(DeskmailError::NotFound {
                    reference: reference.to_string(),
                }));
            }

            let now = now_timestamp();
            let entry = NewEntry {
                ticket_reference: reference.clone(),
                kind,
                body,
                author_identity: actor,
                author_name: None,
                email_subject,
                external_message_id: None,
                created_at: now.clone(),
            };
            let id = match insert_entry(&tx, &entry)? {
                AppendOutcome::Appended(id) => id,
                AppendOutcome::Duplicate => {
                    return Ok(Err(DeskmailError::Internal(format!(
                        "{kind} entry without message id reported as duplicate"
                    ))));
                }
            };
            tx.execute(
                "UPDATE tickets SET updated_at = ?2 WHERE reference = ?1",
                params![reference.as_str(), now],
            )?;
            let stored = rows::select_entry(&tx, id)?;
            tx.commit()?;
            Ok(Ok(stored))
        })
        .await
        .map_err(map_tr_err)?
}
