// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping shared by the query modules.

use std::str::FromStr;

use deskmail_core::{ConversationEntry, ReferenceCode, Ticket};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};

pub(crate) const TICKET_COLUMNS: &str = "reference, conversation_key, status, assignee, \
     requester_name, requester_email, organization, lab_name, request_type, link, \
     original_subject, created_at, updated_at, closed_at";

pub(crate) const ENTRY_COLUMNS: &str = "id, ticket_reference, kind, body, author_identity, \
     author_name, email_subject, external_message_id, created_at";

/// Read a text column and parse it into a domain type.
fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn reference(row: &Row<'_>, idx: usize) -> rusqlite::Result<ReferenceCode> {
    let raw: String = row.get(idx)?;
    ReferenceCode::parse(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        reference: reference(row, 0)?,
        conversation_key: row.get(1)?,
        status: parsed(row, 2)?,
        assignee: row.get(3)?,
        requester_name: row.get(4)?,
        requester_email: row.get(5)?,
        organization: row.get(6)?,
        lab_name: row.get(7)?,
        request_type: row.get(8)?,
        link: row.get(9)?,
        original_subject: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        closed_at: row.get(13)?,
    })
}

pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationEntry> {
    Ok(ConversationEntry {
        id: row.get(0)?,
        ticket_reference: reference(row, 1)?,
        kind: parsed(row, 2)?,
        body: row.get(3)?,
        author_identity: row.get(4)?,
        author_name: row.get(5)?,
        email_subject: row.get(6)?,
        external_message_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub(crate) fn select_ticket_by_reference(
    conn: &Connection,
    reference: &str,
) -> rusqlite::Result<Option<Ticket>> {
    conn.query_row(
        &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE reference = ?1"),
        params![reference],
        ticket_from_row,
    )
    .optional()
}

pub(crate) fn select_ticket_by_conversation_key(
    conn: &Connection,
    key: &str,
) -> rusqlite::Result<Option<Ticket>> {
    conn.query_row(
        &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE conversation_key = ?1"),
        params![key],
        ticket_from_row,
    )
    .optional()
}

pub(crate) fn select_entry(conn: &Connection, id: i64) -> rusqlite::Result<ConversationEntry> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
        params![id],
        entry_from_row,
    )
}
