// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transactional ingest unit.
//!
//! Each ingest runs inside one `BEGIN IMMEDIATE` transaction on the single
//! connection thread: the write lock is taken up front, so the duplicate
//! check, the thread lookup and the insert see a stable database. The UNIQUE
//! constraints on `tickets.reference`, `tickets.conversation_key` and
//! `entries.external_message_id` hold the same guarantees against writers in
//! other processes.

use deskmail_core::{
    AppendOutcome, ConversationLookup, DeskmailError, IngestOutcome, IngestTransaction,
    IngestUnit, NewEntry, ReferenceCode, Ticket,
};
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior, params};
use tracing::debug;

use crate::database::{Database, is_unique_violation, map_sql_err, map_tr_err};
use crate::queries::rows;

/// Run `unit` in an immediate transaction; commit on `Ok`, roll back on `Err`.
pub async fn run_ingest(db: &Database, unit: IngestUnit) -> Result<IngestOutcome, DeskmailError> {
    db.connection()
        .call(move |conn| -> Result<Result<IngestOutcome, DeskmailError>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let result = unit(&mut SqliteIngestTx { tx: &tx });
            match result {
                Ok(outcome) => {
                    tx.commit()?;
                    Ok(Ok(outcome))
                }
                Err(e) => {
                    debug!(error = %e, "ingest unit failed; rolling back");
                    Ok(Err(e))
                }
            }
        })
        .await
        .map_err(map_tr_err)?
}

/// [`IngestTransaction`] over an open rusqlite transaction.
pub struct SqliteIngestTx<'a> {
    tx: &'a Transaction<'a>,
}

impl ConversationLookup for SqliteIngestTx<'_> {
    fn find_ticket_by_conversation_key(&self, key: &str) -> Result<Option<Ticket>, DeskmailError> {
        rows::select_ticket_by_conversation_key(self.tx, key).map_err(map_sql_err)
    }

    fn find_ticket_by_reference(
        &self,
        reference: &ReferenceCode,
    ) -> Result<Option<Ticket>, DeskmailError> {
        rows::select_ticket_by_reference(self.tx, reference.as_str()).map_err(map_sql_err)
    }
}

impl IngestTransaction for SqliteIngestTx<'_> {
    fn find_entry_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<ReferenceCode>, DeskmailError> {
        let found: Option<String> = self
            .tx
            .query_row(
                "SELECT ticket_reference FROM entries WHERE external_message_id = ?1",
                params![message_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_err)?;
        found.map(|raw| ReferenceCode::parse(&raw)).transpose()
    }

    fn next_sequence(&mut self, prefix: &str) -> Result<u64, DeskmailError> {
        let value: i64 = self
            .tx
            .query_row(
                "INSERT INTO ticket_sequences (prefix, last_value) VALUES (?1, 1)
                 ON CONFLICT(prefix) DO UPDATE SET last_value = last_value + 1
                 RETURNING last_value",
                params![prefix],
                |row| row.get(0),
            )
            .map_err(map_sql_err)?;
        u64::try_from(value).map_err(|_| {
            DeskmailError::Internal(format!("sequence for `{prefix}` is negative: {value}"))
        })
    }

    fn insert_ticket(&mut self, ticket: &Ticket) -> Result<(), DeskmailError> {
        insert_ticket(self.tx, ticket).map_err(|e| {
            match (&ticket.conversation_key, is_unique_violation(&e, "tickets.conversation_key")) {
                (Some(key), true) => DeskmailError::ConversationConflict { key: key.clone() },
                _ => map_sql_err(e),
            }
        })
    }

    fn append_entry(&mut self, entry: &NewEntry) -> Result<AppendOutcome, DeskmailError> {
        insert_entry(self.tx, entry).map_err(map_sql_err)
    }

    fn adopt_conversation_key(
        &mut self,
        reference: &ReferenceCode,
        key: &str,
    ) -> Result<(), DeskmailError> {
        self.tx
            .execute(
                "UPDATE tickets SET conversation_key = ?2
                 WHERE reference = ?1 AND conversation_key IS NULL",
                params![reference.as_str(), key],
            )
            .map_err(|e| {
                if is_unique_violation(&e, "tickets.conversation_key") {
                    DeskmailError::ConversationConflict {
                        key: key.to_string(),
                    }
                } else {
                    map_sql_err(e)
                }
            })?;
        Ok(())
    }

    fn touch_ticket(&mut self, reference: &ReferenceCode, at: &str) -> Result<(), DeskmailError> {
        self.tx
            .execute(
                "UPDATE tickets SET updated_at = ?2 WHERE reference = ?1",
                params![reference.as_str(), at],
            )
            .map_err(map_sql_err)?;
        Ok(())
    }
}

pub(crate) fn insert_ticket(conn: &rusqlite::Connection, ticket: &Ticket) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO tickets (reference, conversation_key, status, assignee, requester_name,
             requester_email, organization, lab_name, request_type, link, original_subject,
             created_at, updated_at, closed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            ticket.reference.as_str(),
            ticket.conversation_key,
            ticket.status.to_string(),
            ticket.assignee,
            ticket.requester_name,
            ticket.requester_email,
            ticket.organization,
            ticket.lab_name,
            ticket.request_type,
            ticket.link,
            ticket.original_subject,
            ticket.created_at,
            ticket.updated_at,
            ticket.closed_at,
        ],
    )?;
    Ok(())
}

/// Insert an entry unless its external message id is already stored.
pub(crate) fn insert_entry(
    conn: &rusqlite::Connection,
    entry: &NewEntry,
) -> rusqlite::Result<AppendOutcome> {
    let inserted = conn.execute(
        "INSERT INTO entries (ticket_reference, kind, body, author_identity, author_name,
             email_subject, external_message_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(external_message_id) DO NOTHING",
        params![
            entry.ticket_reference.as_str(),
            entry.kind.to_string(),
            entry.body,
            entry.author_identity,
            entry.author_name,
            entry.email_subject,
            entry.external_message_id,
            entry.created_at,
        ],
    )?;
    if inserted == 0 {
        Ok(AppendOutcome::Duplicate)
    } else {
        Ok(AppendOutcome::Appended(conn.last_insert_rowid()))
    }
}
