// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket queries and agent-side mutations.

use deskmail_core::{
    DeskmailError, EntryKind, NewEntry, ReferenceCode, StatusChange, StatusCounts, Ticket,
    TicketFilter, TicketStatus, now_timestamp,
};
use rusqlite::{Connection, params};

use crate::database::{Database, map_tr_err};
use crate::queries::ingest::insert_entry;
use crate::queries::rows::{self, TICKET_COLUMNS};

/// Fetch a ticket by reference code.
pub async fn get_ticket(
    db: &Database,
    reference: &ReferenceCode,
) -> Result<Option<Ticket>, DeskmailError> {
    let reference = reference.as_str().to_string();
    db.connection()
        .call(move |conn| rows::select_ticket_by_reference(conn, &reference))
        .await
        .map_err(map_tr_err)
}

/// List tickets newest first, optionally narrowed by status bucket and a
/// case-insensitive search over reference, requester email and name.
pub async fn list_tickets(
    db: &Database,
    filter: &TicketFilter,
) -> Result<Vec<Ticket>, DeskmailError> {
    let status = filter.status.map(|s| s.to_string());
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE (?1 IS NULL OR status = ?1 OR status LIKE ?1 || ':%')
                   AND (?2 IS NULL
                        OR instr(lower(reference), ?2) > 0
                        OR instr(lower(requester_email), ?2) > 0
                        OR instr(lower(requester_name), ?2) > 0)
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![status, search], rows::ticket_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Count tickets per status bucket.
pub async fn status_counts(db: &Database) -> Result<StatusCounts, DeskmailError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT
                     COALESCE(SUM(CASE WHEN status = 'open' THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN status LIKE 'in\\_progress:%' ESCAPE '\\' THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN status LIKE 'closed:%' THEN 1 ELSE 0 END), 0),
                     COUNT(*)
                 FROM tickets",
                [],
                |row| {
                    let count = |idx: usize| -> rusqlite::Result<u64> {
                        let value: i64 = row.get(idx)?;
                        Ok(value.max(0) as u64)
                    };
                    Ok(StatusCounts {
                        open: count(0)?,
                        in_progress: count(1)?,
                        closed: count(2)?,
                        total: count(3)?,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}

fn require_ticket(conn: &Connection, reference: &str) -> Result<Option<Ticket>, rusqlite::Error> {
    rows::select_ticket_by_reference(conn, reference)
}

fn not_found(reference: &str) -> DeskmailError {
    DeskmailError::NotFound {
        reference: reference.to_string(),
    }
}

fn system_event(reference: &ReferenceCode, body: String, actor: &str, at: &str) -> NewEntry {
    NewEntry {
        ticket_reference: reference.clone(),
        kind: EntryKind::SystemEvent,
        body,
        author_identity: actor.to_string(),
        author_name: None,
        email_subject: None,
        external_message_id: None,
        created_at: at.to_string(),
    }
}

/// Move a ticket to `status`, maintaining `closed_at` and recording the
/// change as a system event. Setting the current status again is a no-op.
pub async fn update_status(
    db: &Database,
    reference: &ReferenceCode,
    status: TicketStatus,
    actor: &str,
) -> Result<StatusChange, DeskmailError> {
    let reference = reference.clone();
    let actor = actor.to_string();

    db.connection()
        .call(move |conn| -> Result<Result<StatusChange, DeskmailError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(ticket) = require_ticket(&tx, reference.as_str())? else {
                return Ok(Err(not_found(reference.as_str())));
            };

            let change = ticket.status.transition_to(status);
            if !change.changed {
                return Ok(Ok(change));
            }

            let now = now_timestamp();
            let closed_at = if change.to.is_closed() {
                if change.from.is_closed() {
                    ticket.closed_at.clone().or_else(|| Some(now.clone()))
                } else {
                    Some(now.clone())
                }
            } else {
                None
            };

            tx.execute(
                "UPDATE tickets SET status = ?2, updated_at = ?3, closed_at = ?4
                 WHERE reference = ?1",
                params![reference.as_str(), change.to.to_string(), now, closed_at],
            )?;
            insert_entry(
                &tx,
                &system_event(
                    &reference,
                    format!("Changed status to: {}", change.to.label()),
                    &actor,
                    &now,
                ),
            )?;
            tx.commit()?;
            Ok(Ok(change))
        })
        .await
        .map_err(map_tr_err)?
}

/// Set or clear the assignee of a ticket.
pub async fn assign(
    db: &Database,
    reference: &ReferenceCode,
    assignee: Option<String>,
    actor: &str,
) -> Result<Ticket, DeskmailError> {
    let reference = reference.clone();
    let actor = actor.to_string();
    let assignee = assignee
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    db.connection()
        .call(move |conn| -> Result<Result<Ticket, DeskmailError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(ticket) = require_ticket(&tx, reference.as_str())? else {
                return Ok(Err(not_found(reference.as_str())));
            };
            if ticket.assignee == assignee {
                return Ok(Ok(ticket));
            }

            let now = now_timestamp();
            tx.execute(
                "UPDATE tickets SET assignee = ?2, updated_at = ?3 WHERE reference = ?1",
                params![reference.as_str(), assignee, now],
            )?;
            let body = match &assignee {
                Some(name) => format!("Assigned to: {name}"),
                None => "Unassigned".to_string(),
            };
            insert_entry(&tx, &system_event(&reference, body, &actor, &now))?;

            let updated = require_ticket(&tx, reference.as_str())?;
            tx.commit()?;
            Ok(updated.ok_or_else(|| not_found(reference.as_str())))
        })
        .await
        .map_err(map_tr_err)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::ingest::insert_ticket;
    use deskmail_config::model::StorageConfig;
    use deskmail_core::{ClosedReason, InProgressReason, StatusCategory};
    use tempfile::TempDir;

    async fn open() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&StorageConfig {
            database_path: dir.path().join("t.db").display().to_string(),
            wal_mode: true,
            busy_timeout_ms: 1000,
        })
        .await
        .unwrap();
        (dir, db)
    }

    fn ticket(seq: u64, name: &str, email: &str, created_at: &str) -> Ticket {
        Ticket {
            reference: ReferenceCode::new("ACCT", seq),
            conversation_key: Some(format!("conv-{seq}")),
            status: TicketStatus::Open,
            assignee: None,
            requester_name: Some(name.to_string()),
            requester_email: Some(email.to_string()),
            organization: Some("University".to_string()),
            lab_name: None,
            request_type: Some("Account Request".to_string()),
            link: None,
            original_subject: "Request".to_string(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            closed_at: None,
        }
    }

    async fn seed(db: &Database, tickets: Vec<Ticket>) {
        db.connection()
            .call(move |conn| {
                for t in &tickets {
                    insert_ticket(conn, t)?;
                }
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_orders_newest_first_and_filters() {
        let (_dir, db) = open().await;
        seed(
            &db,
            vec![
                ticket(1, "Jane Doe", "jane@uni.edu", "2026-01-01T00:00:00.000Z"),
                ticket(2, "Bob Smith", "bob@lab.org", "2026-01-02T00:00:00.000Z"),
                ticket(3, "Ann Lee", "ann@uni.edu", "2026-01-03T00:00:00.000Z"),
            ],
        )
        .await;

        let all = list_tickets(&db, &TicketFilter::default()).await.unwrap();
        let refs: Vec<_> = all.iter().map(|t| t.reference.to_string()).collect();
        assert_eq!(refs, vec!["ACCT-0003", "ACCT-0002", "ACCT-0001"]);

        let uni = list_tickets(
            &db,
            &TicketFilter {
                status: None,
                search: Some("UNI.EDU".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(uni.len(), 2);

        let by_ref = list_tickets(
            &db,
            &TicketFilter {
                status: None,
                search: Some("acct-0002".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(by_ref.len(), 1);
        assert_eq!(by_ref[0].requester_name.as_deref(), Some("Bob Smith"));
    }

    #[tokio::test]
    async fn status_update_records_event_and_closed_at() {
        let (_dir, db) = open().await;
        seed(&db, vec![ticket(1, "Jane", "jane@uni.edu", "2026-01-01T00:00:00.000Z")]).await;
        let reference = ReferenceCode::new("ACCT", 1);

        let closed = TicketStatus::Closed(ClosedReason::Resolved);
        let change = update_status(&db, &reference, closed, "agent@desk").await.unwrap();
        assert!(change.changed);
        assert!(change.closes());

        let t = get_ticket(&db, &reference).await.unwrap().unwrap();
        assert_eq!(t.status, closed);
        assert!(t.closed_at.is_some());

        let again = update_status(&db, &reference, closed, "agent@desk").await.unwrap();
        assert!(!again.changed);

        let reopened = update_status(
            &db,
            &reference,
            TicketStatus::InProgress(InProgressReason::ForSupport),
            "agent@desk",
        )
        .await
        .unwrap();
        assert!(reopened.reopens());
        let t = get_ticket(&db, &reference).await.unwrap().unwrap();
        assert!(t.closed_at.is_none());

        let entries = crate::queries::entries::list_entries(&db, &reference).await.unwrap();
        let bodies: Vec<_> = entries.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(
            bodies,
            vec![
                "Changed status to: Closed (resolved)",
                "Changed status to: In Progress (for support)"
            ]
        );
        assert!(entries.iter().all(|e| e.kind == EntryKind::SystemEvent));
    }

    #[tokio::test]
    async fn status_filter_matches_bucket() {
        let (_dir, db) = open().await;
        seed(
            &db,
            vec![
                ticket(1, "A", "a@x.org", "2026-01-01T00:00:00.000Z"),
                ticket(2, "B", "b@x.org", "2026-01-02T00:00:00.000Z"),
            ],
        )
        .await;
        update_status(
            &db,
            &ReferenceCode::new("ACCT", 2),
            TicketStatus::InProgress(InProgressReason::ApprovalNeeded),
            "agent",
        )
        .await
        .unwrap();

        let in_progress = list_tickets(
            &db,
            &TicketFilter {
                status: Some(StatusCategory::InProgress),
                search: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].reference.as_str(), "ACCT-0002");

        let counts = status_counts(&db).await.unwrap();
        assert_eq!(
            counts,
            StatusCounts {
                open: 1,
                in_progress: 1,
                closed: 0,
                total: 2
            }
        );
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let (_dir, db) = open().await;
        let err = update_status(&db, &ReferenceCode::new("ACCT", 9), TicketStatus::Open, "agent")
            .await
            .unwrap_err();
        assert!(matches!(err, DeskmailError::NotFound { .. }));
        let err = assign(&db, &ReferenceCode::new("ACCT", 9), None, "agent")
            .await
            .unwrap_err();
        assert!(matches!(err, DeskmailError::NotFound { .. }));
    }

    #[tokio::test]
    async fn assign_and_unassign() {
        let (_dir, db) = open().await;
        seed(&db, vec![ticket(1, "Jane", "jane@uni.edu", "2026-01-01T00:00:00.000Z")]).await;
        let reference = ReferenceCode::new("ACCT", 1);

        let t = assign(&db, &reference, Some(" Sam ".into()), "lead").await.unwrap();
        assert_eq!(t.assignee.as_deref(), Some("Sam"));
        let t = assign(&db, &reference, Some("Sam".into()), "lead").await.unwrap();
        assert_eq!(t.assignee.as_deref(), Some("Sam"));
        let t = assign(&db, &reference, None, "lead").await.unwrap();
        assert!(t.assignee.is_none());

        let entries = crate::queries::entries::list_entries(&db, &reference).await.unwrap();
        let bodies: Vec<_> = entries.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(bodies, vec!["Assigned to: Sam", "Unassigned"]);
    }
}
