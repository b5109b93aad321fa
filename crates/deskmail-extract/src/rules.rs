// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The declarative label table and per-field value cleanup.

use std::sync::LazyLock;

use regex::Regex;

use crate::html;

/// An extractable field of [`deskmail_core::ExtractedFields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    RequesterName,
    RequesterEmail,
    Organization,
    LabName,
    RequestType,
    RequestTime,
    Link,
}

impl Field {
    pub const COUNT: usize = 7;

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// How a raw candidate is turned into a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    /// Free text: tags and control characters removed, whitespace collapsed.
    Text,
    /// First well-formed address in the candidate, lower-cased.
    Email,
    /// First `http(s)://` URL in the candidate.
    Url,
}

/// One row of the label table.
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub field: Field,
    /// Case-insensitive labels, matched at the start of a line.
    pub aliases: &'static [&'static str],
    pub cleanup: Cleanup,
}

/// Label table. Aliases are tried longest first across the whole table, so
/// `Lab Name:` is claimed by `lab name` before `lab` or `name` get a chance.
pub const RULES: &[LabelRule] = &[
    LabelRule {
        field: Field::RequesterName,
        aliases: &["requester name", "requestor name", "requester", "full name", "name"],
        cleanup: Cleanup::Text,
    },
    LabelRule {
        field: Field::RequesterEmail,
        aliases: &[
            "requester email",
            "requester e-mail",
            "requestor email",
            "email address",
            "e-mail",
            "email",
        ],
        cleanup: Cleanup::Email,
    },
    LabelRule {
        field: Field::Organization,
        aliases: &["organization", "organisation", "institution", "company"],
        cleanup: Cleanup::Text,
    },
    LabelRule {
        field: Field::LabName,
        aliases: &["lab name", "lab_name", "pi lab", "lab"],
        cleanup: Cleanup::Text,
    },
    LabelRule {
        field: Field::RequestType,
        aliases: &["request type", "type of request"],
        cleanup: Cleanup::Text,
    },
    LabelRule {
        field: Field::RequestTime,
        aliases: &["request time", "submitted at", "time"],
        cleanup: Cleanup::Text,
    },
    LabelRule {
        field: Field::Link,
        aliases: &["admin link", "link", "url"],
        cleanup: Cleanup::Url,
    },
];

/// Characters accepted between a label and its value.
const SEPARATORS: &[char] = &[':', '-', '\u{2013}', '\u{2014}', '='];

/// Trailing punctuation dropped from every value.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':'];

pub(crate) static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}").unwrap()
});

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s<>"]+"#).unwrap());

/// Every alias paired with its rule, longest alias first. Equal lengths keep
/// table order.
pub(crate) fn alias_index() -> Vec<(&'static str, &'static LabelRule)> {
    let mut index: Vec<_> = RULES
        .iter()
        .flat_map(|rule| rule.aliases.iter().map(move |alias| (*alias, rule)))
        .collect();
    index.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    index
}

/// If `line` starts with `alias` followed by optional whitespace and a
/// separator, return the text after the separator.
///
/// Known limitation: `-` is a separator, so a hyphenated label can be read
/// as a shorter alias. `Lab-Name: X` fills the lab with `Name: X` and a
/// `Time-sensitive` line fills the request time with `sensitive`.
pub(crate) fn strip_label<'a>(line: &'a str, alias: &str) -> Option<&'a str> {
    let head = line.get(..alias.len())?;
    if !head.eq_ignore_ascii_case(alias) {
        return None;
    }
    let rest = line[alias.len()..].trim_start();
    let sep = rest.chars().next().filter(|c| SEPARATORS.contains(c))?;
    Some(&rest[sep.len_utf8()..])
}

/// Trim whitespace and trailing punctuation.
pub(crate) fn trim_value(raw: &str) -> &str {
    raw.trim().trim_end_matches(TRAILING_PUNCTUATION).trim_end()
}

/// Apply `cleanup` and the length cap. `None` when nothing usable remains.
pub(crate) fn clean(cleanup: Cleanup, candidate: &str, max_len: usize) -> Option<String> {
    let text = sanitize(candidate);
    let value = match cleanup {
        Cleanup::Text => text,
        Cleanup::Email => EMAIL.find(&text)?.as_str().to_ascii_lowercase(),
        Cleanup::Url => trim_value(URL.find(&text)?.as_str()).to_string(),
    };
    let value = trim_value(&value);
    if value.is_empty() {
        None
    } else {
        Some(cap(value, max_len))
    }
}

fn sanitize(candidate: &str) -> String {
    html::strip_tags(candidate)
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to `max_len` characters on a char boundary.
pub(crate) fn cap(value: &str, max_len: usize) -> String {
    value.chars().take(max_len).collect()
}
