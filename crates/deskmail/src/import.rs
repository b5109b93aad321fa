// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `deskmail ingest <payload.json>`: manual import through the same
//! pipeline the webhook uses.

use std::path::Path;

use deskmail_config::DeskmailConfig;
use deskmail_core::{DeskmailError, TicketStore};
use deskmail_ingest::InboundEmailPayload;
use tracing::info;

use crate::serve::build_ingestor;

/// A single payload object or an array of them.
pub(crate) fn parse_payloads(text: &str) -> Result<Vec<InboundEmailPayload>, DeskmailError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| DeskmailError::InvalidInput(format!("payload is not valid JSON: {e}")))?;
    let payloads = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>(),
        other => serde_json::from_value(other).map(|p| vec![p]),
    };
    payloads.map_err(|e| DeskmailError::InvalidInput(format!("invalid email payload: {e}")))
}

/// Runs the `deskmail ingest` command, printing one JSON outcome per email.
pub async fn run_ingest(config: DeskmailConfig, path: &Path) -> Result<(), DeskmailError> {
    crate::init_tracing(&config.service.log_level);

    let text = std::fs::read_to_string(path).map_err(|e| {
        DeskmailError::InvalidInput(format!("cannot read {}: {e}", path.display()))
    })?;
    let payloads = parse_payloads(&text)?;

    let (storage, ingestor) = build_ingestor(&config).await?;
    let total = payloads.len();
    for payload in payloads {
        let (outcome, notification) = ingestor.ingest_and_notify(payload.into_message()).await?;
        if let Some(handle) = notification {
            let _ = handle.await;
        }
        let line = serde_json::to_string(&outcome)
            .map_err(|e| DeskmailError::Internal(format!("failed to encode outcome: {e}")))?;
        println!("{line}");
    }

    info!(count = total, file = %path.display(), "manual import finished");
    storage.close().await
}
