// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! `POST /api/webhook/inbound-email` feeds the ingest pipeline; the
//! `/api/tickets` routes are the operator surface, including email sent to
//! requesters; `GET /health` is public.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deskmail_core::{
    ConversationEntry, DeskmailError, HealthStatus, IngestAction, OutboundEmail, ReferenceCode,
    StatusCategory, StatusCounts, Ticket, TicketDetail, TicketFilter, TicketStatus,
};
use deskmail_ingest::InboundEmailPayload;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::server::GatewayState;

/// Actor recorded when a request does not name one.
const DEFAULT_ACTOR: &str = "api";

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// A [`DeskmailError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DeskmailError);

impl From<DeskmailError> for ApiError {
    fn from(e: DeskmailError) -> Self {
        Self(e)
    }
}

/// HTTP status for an error. Anything the sender may retry maps to 503 so
/// the mail-automation flow redelivers.
pub fn status_for(e: &DeskmailError) -> StatusCode {
    match e {
        DeskmailError::NotFound { .. } => StatusCode::NOT_FOUND,
        DeskmailError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        e if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(status = %status, error = %self.0, "request failed");
        } else {
            debug!(status = %status, error = %self.0, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                success: false,
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

fn parse_reference(raw: &str) -> Result<ReferenceCode, ApiError> {
    ReferenceCode::parse(raw).map_err(|_| {
        ApiError(DeskmailError::NotFound {
            reference: raw.to_string(),
        })
    })
}

fn actor_or_default(actor: Option<String>) -> String {
    actor
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| DEFAULT_ACTOR.to_string())
}

// --- Webhook ---

/// Response body for the inbound-email webhook.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub request_key: String,
    pub action: IngestAction,
    pub message: String,
}

/// POST /api/webhook/inbound-email
///
/// An empty request body reads as an empty payload; malformed JSON is a 400.
pub async fn post_inbound_email(
    State(state): State<GatewayState>,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let payload: InboundEmailPayload = if body.iter().all(u8::is_ascii_whitespace) {
        InboundEmailPayload::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "inbound email payload is not valid JSON");
            ApiError(DeskmailError::InvalidInput(format!("invalid JSON payload: {e}")))
        })?
    };

    let outcome = state.ingestor.ingest(payload.into_message()).await?;
    let message = match outcome.action {
        IngestAction::Created => format!("Created request {}", outcome.reference),
        IngestAction::Attached => {
            format!("Reply added to existing request {}", outcome.reference)
        }
        IngestAction::Duplicate => "Duplicate email, request already exists".to_string(),
    };

    Ok(Json(WebhookResponse {
        success: true,
        request_key: outcome.reference.to_string(),
        action: outcome.action,
        message,
    }))
}

// --- Tickets ---

/// Query string for GET /api/tickets.
#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

impl TicketQuery {
    fn into_filter(self) -> Result<TicketFilter, DeskmailError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(raw.to_ascii_lowercase().parse::<StatusCategory>().map_err(
                |_| {
                    DeskmailError::InvalidInput(format!(
                        "unknown status filter `{raw}`, expected open, in_progress or closed"
                    ))
                },
            )?),
        };
        Ok(TicketFilter {
            status,
            search: self.q,
        })
    }
}

/// GET /api/tickets
pub async fn list_tickets(
    State(state): State<GatewayState>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let filter = query.into_filter()?;
    Ok(Json(state.store().list_tickets(&filter).await?))
}

/// GET /api/tickets/counts
pub async fn ticket_counts(
    State(state): State<GatewayState>,
) -> Result<Json<StatusCounts>, ApiError> {
    Ok(Json(state.store().status_counts().await?))
}

/// GET /api/tickets/{reference}
pub async fn get_ticket(
    State(state): State<GatewayState>,
    Path(reference): Path<String>,
) -> Result<Json<TicketDetail>, ApiError> {
    let reference = parse_reference(&reference)?;
    let store = state.store();
    let ticket = store
        .get_ticket(&reference)
        .await?
        .ok_or_else(|| DeskmailError::NotFound {
            reference: reference.to_string(),
        })?;
    let entries = store.list_entries(&reference).await?;
    Ok(Json(TicketDetail { ticket, entries }))
}

/// Request body for POST /api/tickets/{reference}/status.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub reference: ReferenceCode,
    pub changed: bool,
    pub from: TicketStatus,
    pub to: TicketStatus,
}

/// POST /api/tickets/{reference}/status
pub async fn post_status(
    State(state): State<GatewayState>,
    Path(reference): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let reference = parse_reference(&reference)?;
    let status: TicketStatus = body.status.parse()?;
    let actor = actor_or_default(body.actor);
    let change = state
        .store()
        .update_status(&reference, status, &actor)
        .await?;
    if change.changed {
        info!(
            reference = %reference,
            from = %change.from,
            to = %change.to,
            actor = %actor,
            "ticket status changed"
        );
    }
    Ok(Json(StatusResponse {
        success: true,
        reference,
        changed: change.changed,
        from: change.from,
        to: change.to,
    }))
}

/// Request body for POST /api/tickets/{reference}/assign. A missing or
/// empty `assignee` clears the assignment.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

/// POST /api/tickets/{reference}/assign
pub async fn post_assign(
    State(state): State<GatewayState>,
    Path(reference): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Ticket>, ApiError> {
    let reference = parse_reference(&reference)?;
    let actor = actor_or_default(body.actor);
    Ok(Json(
        state
            .store()
            .assign(&reference, body.assignee, &actor)
            .await?,
    ))
}

/// Request body for POST /api/tickets/{reference}/notes.
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub actor: Option<String>,
}

/// POST /api/tickets/{reference}/notes
pub async fn post_note(
    State(state): State<GatewayState>,
    Path(reference): Path<String>,
    Json(body): Json<NoteRequest>,
) -> Result<(StatusCode, Json<ConversationEntry>), ApiError> {
    let reference = parse_reference(&reference)?;
    let actor = actor_or_default(body.actor);
    let entry = state
        .store()
        .add_note(&reference, &body.body, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Request body for POST /api/tickets/{reference}/send-email.
#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub to_list: Vec<String>,
    /// Defaults to `Re: <original subject>`.
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub actor: Option<String>,
}

/// POST /api/tickets/{reference}/send-email
///
/// Sends first and records an `outbound_email` entry only once the relay
/// has accepted the message.
pub async fn post_send_email(
    State(state): State<GatewayState>,
    Path(reference): Path<String>,
    Json(request): Json<SendEmailRequest>,
) -> Result<(StatusCode, Json<ConversationEntry>), ApiError> {
    let mut email = OutboundEmail::new(request.to_list, request.subject, request.body)?;
    let reference = parse_reference(&reference)?;
    let actor = actor_or_default(request.actor);
    let store = state.store();

    let ticket = store
        .get_ticket(&reference)
        .await?
        .ok_or_else(|| DeskmailError::NotFound {
            reference: reference.to_string(),
        })?;
    email.default_subject(&ticket.original_subject);

    let mailer = state.mailer.as_ref().ok_or_else(|| {
        DeskmailError::Config("sending email requires a [notify.smtp] section".into())
    })?;
    if let Err(e) = mailer.send(&email).await {
        warn!(reference = %reference, actor = %actor, error = %e, "outbound email failed");
        return Err(e.into());
    }

    let entry = store
        .record_outbound_email(&reference, &email, &actor)
        .await?;
    info!(
        reference = %reference,
        actor = %actor,
        recipients = email.to.len(),
        "outbound email sent"
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

// --- Health ---

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub storage: String,
}

/// GET /health
///
/// Public liveness check. Returns 503 when the store is unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, storage) = match state.store().health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "healthy".to_string()),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, format!("degraded: {reason}")),
        Ok(HealthStatus::Unhealthy(reason)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("unhealthy: {reason}"),
        ),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {e}")),
    };
    (
        status,
        Json(HealthResponse {
            status: if status.is_success() { "ok" } else { "unavailable" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.start_time.elapsed().as_secs(),
            storage,
        }),
    )
}
