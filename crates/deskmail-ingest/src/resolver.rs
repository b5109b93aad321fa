// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decides whether an email continues an existing ticket.
//!
//! Signals, strongest first:
//! 1. the upstream conversation id matches a ticket's conversation key;
//! 2. a reference code in the subject (`Re: [ACCT-0042] ...`) names an
//!    existing ticket, trying codes in order of appearance.
//!
//! Otherwise the email starts a new ticket. The resolver only reads.

use std::sync::LazyLock;

use deskmail_core::{
    ConversationLookup, DeskmailError, ReferenceCode, ResolutionDecision, ThreadSignal,
};
use regex::Regex;
use tracing::debug;

static SUBJECT_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z]+-\d{4,})\b").unwrap());

/// Reference codes mentioned in a subject, upper-cased, in order, without repeats.
pub fn subject_references(subject: &str) -> Vec<ReferenceCode> {
    let mut found: Vec<ReferenceCode> = Vec::new();
    for token in SUBJECT_REFERENCE.find_iter(subject) {
        if let Ok(code) = ReferenceCode::parse(token.as_str()) {
            if !found.contains(&code) {
                found.push(code);
            }
        }
    }
    found
}

/// Pick the ticket this email belongs to, if any.
///
/// The only error is a failed lookup.
pub fn resolve<L>(
    conversation_id: Option<&str>,
    message_id: Option<&str>,
    subject: &str,
    lookup: &L,
) -> Result<ResolutionDecision, DeskmailError>
where
    L: ConversationLookup + ?Sized,
{
    let mentioned = subject_references(subject);

    if let Some(key) = conversation_id {
        if let Some(ticket) = lookup.find_ticket_by_conversation_key(key)? {
            if !mentioned.is_empty() && !mentioned.contains(&ticket.reference) {
                debug!(
                    conversation_id = key,
                    message_id,
                    reference = %ticket.reference,
                    subject_refs = ?mentioned,
                    "subject references disagree with conversation id; conversation id wins"
                );
            }
            debug!(reference = %ticket.reference, message_id, "threaded by conversation id");
            return Ok(ResolutionDecision::attach(
                ticket,
                ThreadSignal::ConversationId,
            ));
        }
    }

    for code in &mentioned {
        if let Some(ticket) = lookup.find_ticket_by_reference(code)? {
            debug!(reference = %ticket.reference, message_id, "threaded by subject reference");
            return Ok(ResolutionDecision::attach(
                ticket,
                ThreadSignal::SubjectReference,
            ));
        }
    }

    debug!(message_id, "no thread signal matched; new ticket");
    Ok(ResolutionDecision::new_ticket())
}
