// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket status state machine.
//!
//! A ticket is `Open`, `InProgress` with a reason, or `Closed` with a reason.
//! Every state may move to every other state, but only through an explicit
//! agent action. Inbound mail never changes the status of a ticket, so a
//! closed ticket keeps accumulating correspondence until someone reopens it.
//!
//! The storage form is `open`, `in_progress:<reason>` or `closed:<reason>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

use crate::error::DeskmailError;

/// Why a ticket is being worked on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InProgressReason {
    ForSupport,
    InformationNeeded,
    ApprovalNeeded,
    Answered,
    InstitutionClarification,
}

/// Why a ticket was closed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClosedReason {
    Resolved,
    CustomerUnresponsive,
    Other,
}

/// Top-level status bucket, used for filtering and dashboard counts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Open,
    InProgress,
    Closed,
}

/// Current status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress(InProgressReason),
    Closed(ClosedReason),
}

impl TicketStatus {
    /// The top-level bucket of this status.
    pub fn category(&self) -> StatusCategory {
        match self {
            TicketStatus::Open => StatusCategory::Open,
            TicketStatus::InProgress(_) => StatusCategory::InProgress,
            TicketStatus::Closed(_) => StatusCategory::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TicketStatus::Closed(_))
    }

    /// Compute the effect of an agent moving the ticket to `next`.
    ///
    /// All transitions are permitted. Moving to the identical status is a
    /// no-op and reports `changed == false`.
    pub fn transition_to(self, next: TicketStatus) -> StatusChange {
        StatusChange {
            from: self,
            to: next,
            changed: self != next,
        }
    }

    /// Human-readable label for activity entries and notifications.
    pub fn label(&self) -> String {
        match self {
            TicketStatus::Open => "Open".to_string(),
            TicketStatus::InProgress(reason) => {
                format!("In Progress ({})", humanize((*reason).into()))
            }
            TicketStatus::Closed(reason) => format!("Closed ({})", humanize((*reason).into())),
        }
    }
}

fn humanize(snake: &'static str) -> String {
    snake.replace('_', " ")
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "open"),
            TicketStatus::InProgress(reason) => write!(f, "in_progress:{reason}"),
            TicketStatus::Closed(reason) => write!(f, "closed:{reason}"),
        }
    }
}

impl FromStr for TicketStatus {
    type Err = DeskmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let (head, reason) = match normalized.split_once(':') {
            Some((head, reason)) => (head.trim(), Some(reason.trim())),
            None => (normalized.as_str(), None),
        };

        match (head, reason) {
            ("open", None) => Ok(TicketStatus::Open),
            ("in_progress", Some(reason)) => InProgressReason::from_str(reason)
                .map(TicketStatus::InProgress)
                .map_err(|_| {
                    DeskmailError::InvalidInput(format!(
                        "unknown in-progress reason `{reason}`, expected one of: {}",
                        InProgressReason::VARIANTS.join(", ")
                    ))
                }),
            ("closed", Some(reason)) => ClosedReason::from_str(reason)
                .map(TicketStatus::Closed)
                .map_err(|_| {
                    DeskmailError::InvalidInput(format!(
                        "unknown closed reason `{reason}`, expected one of: {}",
                        ClosedReason::VARIANTS.join(", ")
                    ))
                }),
            ("in_progress", None) | ("closed", None) => Err(DeskmailError::InvalidInput(
                format!("status `{s}` needs a reason, e.g. `{head}:<reason>`"),
            )),
            _ => Err(DeskmailError::InvalidInput(format!("unknown status `{s}`"))),
        }
    }
}

impl From<TicketStatus> for String {
    fn from(status: TicketStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for TicketStatus {
    type Error = DeskmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Result of applying a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub from: TicketStatus,
    pub to: TicketStatus,
    pub changed: bool,
}

impl StatusChange {
    /// Leaving `Closed` for any other state.
    pub fn reopens(&self) -> bool {
        self.changed && self.from.is_closed() && !self.to.is_closed()
    }

    /// Entering `Closed` (from anywhere, including another closed reason).
    pub fn closes(&self) -> bool {
        self.changed && self.to.is_closed()
    }
}
