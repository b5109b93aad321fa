// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket reference allocation.
//!
//! Numbers come from a durable per-prefix counter read and incremented inside
//! the ingest transaction, so a rolled-back ingest gives its number back and
//! no two committed tickets can share one.

use std::sync::LazyLock;

use deskmail_core::{DeskmailError, IngestTransaction, ReferenceCode};
use regex::Regex;

static PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]+$").unwrap());

/// Allocates `PREFIX-NNNN` references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceGenerator {
    prefix: String,
}

impl ReferenceGenerator {
    /// Fails unless `prefix` is one or more upper-case ASCII letters.
    pub fn new(prefix: impl Into<String>) -> Result<Self, DeskmailError> {
        let prefix = prefix.into();
        if !PREFIX.is_match(&prefix) {
            return Err(DeskmailError::Config(format!(
                "reference prefix `{prefix}` must be upper-case letters only"
            )));
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Take the next number for this prefix within `tx`.
    pub fn next(&self, tx: &mut dyn IngestTransaction) -> Result<ReferenceCode, DeskmailError> {
        let sequence = tx.next_sequence(&self.prefix)?;
        Ok(ReferenceCode::new(&self.prefix, sequence))
    }
}
