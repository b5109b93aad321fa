// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! deskmail - turns support-desk email into tracked tickets.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod import;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use deskmail_config::DeskmailConfig;

/// deskmail - turns support-desk email into tracked tickets.
#[derive(Parser, Debug)]
#[command(name = "deskmail", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook and ticket API server.
    Serve,
    /// Import one email (or a JSON array of emails) in webhook payload form.
    Ingest {
        /// Path to the JSON payload file.
        payload: PathBuf,
    },
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> DeskmailConfig {
    let loaded = match path {
        Some(path) => deskmail_config::load_and_validate_path(path),
        None => deskmail_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            deskmail_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("deskmail={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Ingest { payload }) => import::run_ingest(config, &payload).await,
        Some(Commands::CheckConfig) => {
            println!(
                "deskmail: config OK (service.name={}, database={}, gateway={}:{})",
                config.service.name,
                config.storage.database_path,
                config.gateway.host,
                config.gateway.port
            );
            Ok(())
        }
        None => {
            println!("deskmail: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("deskmail: {e}");
        std::process::exit(1);
    }
}
