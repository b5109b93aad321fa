// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `deskmail serve` command implementation.
//!
//! Opens the SQLite store, builds the notifier and the outbound mailer from
//! `[notify]`, and serves the gateway until SIGINT or SIGTERM.

use std::sync::Arc;

use deskmail_config::DeskmailConfig;
use deskmail_core::{DeskmailError, PluginAdapter, TicketStore};
use deskmail_gateway::{AuthConfig, GatewayState, ServerConfig};
use deskmail_ingest::{IngestSettings, Ingestor};
use deskmail_storage::SqliteStorage;
use tracing::{info, warn};

/// Build the ingestor over an initialized store.
pub(crate) async fn build_ingestor(
    config: &DeskmailConfig,
) -> Result<(Arc<SqliteStorage>, Ingestor), DeskmailError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let mut ingestor = Ingestor::new(storage.clone(), IngestSettings::from(&config.ingest))?;
    if let Some(notifier) = deskmail_notify::from_config(&config.notify)? {
        ingestor = ingestor.with_notifier(notifier);
    }
    Ok((storage, ingestor))
}

/// Runs the `deskmail serve` command.
pub async fn run_serve(config: DeskmailConfig) -> Result<(), DeskmailError> {
    crate::init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting deskmail serve");

    let (storage, ingestor) = build_ingestor(&config).await?;
    let auth = AuthConfig::from_gateway(&config.gateway);
    let mut state = GatewayState::new(Arc::new(ingestor), auth);
    if let Some(mailer) = deskmail_notify::mailer_from_config(&config.notify)? {
        state = state.with_mailer(mailer);
    }

    deskmail_gateway::start_server(&ServerConfig::from(&config.gateway), state, shutdown_signal())
        .await?;

    if let Err(e) = storage.close().await {
        warn!(error = %e, "failed to checkpoint database on shutdown");
    }
    storage.shutdown().await?;
    info!("deskmail stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                    _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = ctrl_c.await;
                info!("received SIGINT (Ctrl+C), initiating shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received Ctrl+C, initiating shutdown");
    }
}
