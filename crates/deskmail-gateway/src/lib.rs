// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for deskmail.
//!
//! Receives inbound email from the mail-automation flow as a JSON webhook,
//! hands it to the [`deskmail_ingest::Ingestor`], and exposes the ticket
//! operations staff use to work the queue.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, ServerConfig, router, start_server};
