// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for ticket, entry and ingest operations.

pub mod entries;
pub mod ingest;
pub(crate) mod rows;
pub mod tickets;
