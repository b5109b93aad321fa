// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email ingestion for deskmail: reference allocation, thread resolution and
//! the orchestrator that ties extraction, storage and notification together.

pub mod orchestrator;
pub mod payload;
pub mod reference;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{IngestSettings, Ingestor, UNKNOWN_SENDER};
pub use payload::InboundEmailPayload;
pub use reference::ReferenceGenerator;
pub use resolver::{resolve, subject_references};
