// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for deskmail integration tests.
//!
//! - [`MockNotifier`] - capturing notifier that can be told to fail
//! - [`MockMailer`] - capturing outbound mailer
//! - [`IngestHarness`] - temp SQLite store + ingestor + mock notifier

pub mod harness;
pub mod mock_mailer;
pub mod mock_notifier;

pub use harness::{IngestHarness, IngestHarnessBuilder};
pub use mock_mailer::MockMailer;
pub use mock_notifier::MockNotifier;
