// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use deskmail_config::model::GatewayConfig;
use deskmail_core::{DeskmailError, Mailer, TicketStore};
use deskmail_ingest::Ingestor;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub ingestor: Arc<Ingestor>,
    pub auth: AuthConfig,
    /// Outbound mail for staff replies; `None` disables send-email.
    pub mailer: Option<Arc<dyn Mailer>>,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(ingestor: Arc<Ingestor>, auth: AuthConfig) -> Self {
        Self {
            ingestor,
            auth,
            mailer: None,
            start_time: Instant::now(),
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn store(&self) -> &Arc<dyn TicketStore> {
        self.ingestor.store()
    }
}

/// Address the gateway binds to.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&GatewayConfig> for ServerConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Build the application router.
///
/// - `GET /health` (public)
/// - `POST /api/webhook/inbound-email` (API key)
/// - `GET /api/tickets`, `GET /api/tickets/counts`, `GET /api/tickets/{reference}` (API key)
/// - `POST /api/tickets/{reference}/status|assign|notes|send-email` (API key)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/webhook/inbound-email", post(handlers::post_inbound_email))
        .route("/api/tickets", get(handlers::list_tickets))
        .route("/api/tickets/counts", get(handlers::ticket_counts))
        .route("/api/tickets/{reference}", get(handlers::get_ticket))
        .route("/api/tickets/{reference}/status", post(handlers::post_status))
        .route("/api/tickets/{reference}/assign", post(handlers::post_assign))
        .route("/api/tickets/{reference}/notes", post(handlers::post_note))
        .route(
            "/api/tickets/{reference}/send-email",
            post(handlers::post_send_email),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind to `config.host:config.port` and serve until `shutdown` resolves.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: F,
) -> Result<(), DeskmailError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if state.auth.api_key.is_none() && !state.auth.allow_unauthenticated {
        tracing::warn!("no gateway.api_key configured; all /api requests will be rejected");
    }

    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DeskmailError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| DeskmailError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
