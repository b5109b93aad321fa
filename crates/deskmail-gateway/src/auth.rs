// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API-key middleware for the gateway.
//!
//! The key is accepted from either header (checked in order):
//! 1. `Authorization: Bearer <key>`
//! 2. `X-API-Key: <key>` (what the mail-automation flow sends)
//!
//! When no key is configured, every request is rejected (fail-closed) unless
//! `allow_unauthenticated` was set explicitly.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Authentication configuration for the gateway.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected API key. If `Some`, requests must present it.
    pub api_key: Option<String>,
    /// Let requests through when no key is configured (local development).
    pub allow_unauthenticated: bool,
}

impl AuthConfig {
    pub fn from_gateway(config: &deskmail_config::model::GatewayConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            allow_unauthenticated: config.allow_unauthenticated,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("allow_unauthenticated", &self.allow_unauthenticated)
            .finish()
    }
}

fn presented_key(request: &Request) -> Option<&str> {
    let headers = request.headers();
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()))
        .map(str::trim)
}

/// Middleware that validates the API key.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.api_key.as_deref() else {
        if auth.allow_unauthenticated {
            return Ok(next.run(request).await);
        }
        tracing::error!("gateway has no API key configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let presented = presented_key(&request).map(|key| key == expected);
    match presented {
        Some(true) => Ok(next.run(request).await),
        Some(false) => {
            tracing::warn!(path = %request.uri().path(), "rejected request with wrong API key");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::debug!(path = %request.uri().path(), "rejected request without API key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
