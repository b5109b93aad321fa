// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTML residue removal for email bodies.
//!
//! Mail pipelines often hand over the HTML part of a message. This is not an
//! HTML parser: it removes markup well enough for line-oriented label
//! matching and leaves anything that is not a tag alone, so bracketed
//! addresses such as `<jane@example.org>` survive.

use std::sync::LazyLock;

use regex::Regex;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static STYLE_OR_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>|<script\b[^>]*>.*?</script\s*>").unwrap()
});

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>|</div\s*>|</tr\s*>|</li\s*>").unwrap());

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-zA-Z][a-zA-Z0-9]*(?:\s[^>]*)?/?>").unwrap());

const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    // Last, so `&amp;lt;` decodes to `&lt;` and not `<`.
    ("&amp;", "&"),
];

/// Whether `text` contains anything that looks like markup.
pub fn looks_like_html(text: &str) -> bool {
    text.contains("<!--") || TAG.is_match(text)
}

/// Remove tags, comments, style and script blocks, then decode common entities.
///
/// Block-level closers and `<br>` become newlines; every resulting line is trimmed.
pub fn strip_html(text: &str) -> String {
    let text = COMMENT.replace_all(text, "");
    let text = STYLE_OR_SCRIPT.replace_all(&text, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    text.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

/// Remove inline tags without touching line structure.
pub(crate) fn strip_tags(text: &str) -> String {
    decode_entities(&TAG.replace_all(text, ""))
}

/// Decode the handful of entities mail clients actually emit.
pub fn decode_entities(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, plain)| acc.replace(entity, plain))
}
