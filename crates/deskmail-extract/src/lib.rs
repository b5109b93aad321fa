// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort field extraction from semi-structured request emails.
//!
//! Bodies are scanned line by line for `Label: value` pairs using the table
//! in [`rules::RULES`]. Extraction never fails: anything that cannot be
//! recognised is left as `None`. The same input always produces the same
//! output.
//!
//! Quoted reply content (`> name: ...`) is scanned like any other line, so a
//! reply that quotes an older request may pick up the quoted values when the
//! new text does not state its own.

pub mod html;
pub mod rules;

use std::sync::LazyLock;

use deskmail_core::ExtractedFields;
use regex::Regex;

use crate::rules::{Cleanup, EMAIL, Field, LabelRule};

/// Default cap on the length of any extracted value, in characters.
pub const DEFAULT_MAX_FIELD_LEN: usize = 500;

static SUBJECT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(.+?)\s+is\s+requesting\s+an?\s+account").unwrap());

static DEFAULT_EXTRACTOR: LazyLock<FieldExtractor> = LazyLock::new(FieldExtractor::default);

/// Extract with the default extractor.
pub fn extract(subject: &str, body: &str) -> ExtractedFields {
    DEFAULT_EXTRACTOR.extract(subject, body)
}

/// Immutable label table plus the value length cap.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    aliases: Vec<(&'static str, &'static LabelRule)>,
    max_len: usize,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FIELD_LEN)
    }
}

impl FieldExtractor {
    pub fn new(max_len: usize) -> Self {
        Self {
            aliases: rules::alias_index(),
            max_len: max_len.max(1),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Extract structured fields from a subject and body.
    pub fn extract(&self, subject: &str, body: &str) -> ExtractedFields {
        let text = normalize_body(body);
        let lines: Vec<&str> = text.lines().map(unquote).collect();
        let mut slots: [Option<String>; Field::COUNT] = Default::default();

        for (idx, line) in lines.iter().enumerate() {
            let Some((rule, remainder)) = self.match_label(line) else {
                continue;
            };
            if slots[rule.field.slot()].is_some() {
                continue;
            }
            let mut candidate = rules::trim_value(remainder);
            if candidate.is_empty() && rule.cleanup == Cleanup::Url {
                candidate = url_on_next_line(&lines[idx + 1..]).unwrap_or_default();
            }
            slots[rule.field.slot()] = rules::clean(rule.cleanup, candidate, self.max_len);
        }

        let [
            requester_name,
            requester_email,
            organization,
            lab_name,
            request_type,
            request_time,
            link,
        ] = slots;

        let requester_email = requester_email.or_else(|| {
            EMAIL
                .find(&text)
                .map(|m| rules::cap(&m.as_str().to_ascii_lowercase(), self.max_len))
        });
        let requester_name = requester_name.or_else(|| self.name_from_subject(subject));

        ExtractedFields {
            requester_name,
            requester_email,
            organization,
            lab_name,
            request_type,
            request_time,
            link,
            raw_body: body.to_string(),
        }
    }

    /// The longest alias that labels `line`, with the text after its separator.
    fn match_label<'a>(&self, line: &'a str) -> Option<(&'static LabelRule, &'a str)> {
        self.aliases
            .iter()
            .find_map(|(alias, rule)| rules::strip_label(line, alias).map(|rest| (*rule, rest)))
    }

    fn name_from_subject(&self, subject: &str) -> Option<String> {
        let captures = SUBJECT_NAME.captures(subject)?;
        rules::clean(Cleanup::Text, captures.get(1)?.as_str(), self.max_len)
    }
}

fn normalize_body(body: &str) -> String {
    let body = body.replace("\r\n", "\n").replace('\r', "\n");
    if html::looks_like_html(&body) {
        html::strip_html(&body)
    } else {
        body
    }
}

fn unquote(line: &str) -> &str {
    line.trim_start_matches(|c: char| c == '>' || c.is_whitespace())
        .trim_end()
}

fn url_on_next_line<'a>(rest: &[&'a str]) -> Option<&'a str> {
    let next = rest.iter().find(|line| !line.is_empty())?;
    let lower = next.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(next)
    } else {
        None
    }
}

/// Bare lower-cased address from a `from` value such as `Jane <jane@x.org>`.
pub fn sender_address(sender: &str) -> Option<String> {
    let inner = match (sender.rfind('<'), sender.rfind('>')) {
        (Some(open), Some(close)) if open < close => &sender[open + 1..close],
        _ => sender,
    };
    EMAIL.find(inner).map(|m| m.as_str().to_ascii_lowercase())
}

/// Fill a missing requester email from the message sender.
pub fn with_sender_fallback(mut fields: ExtractedFields, sender: &str) -> ExtractedFields {
    if fields.requester_email.is_none() {
        fields.requester_email = sender_address(sender);
    }
    fields
}

/// Guess a display name from an address: `jane.doe@x.org` becomes `Jane Doe`.
pub fn display_name_from_address(address: &str) -> String {
    let local = address.split('@').next().unwrap_or_default();
    let name = local
        .split(['.', '_', '-'])
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        "Unknown".to_string()
    } else {
        name
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
