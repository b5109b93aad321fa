// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route-level tests driving the axum router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use deskmail_config::model::StorageConfig;
use deskmail_core::EntryKind;
use deskmail_gateway::{AuthConfig, GatewayState, router};
use deskmail_ingest::{IngestSettings, Ingestor};
use deskmail_storage::SqliteStorage;
use deskmail_test_utils::{IngestHarness, MockMailer};
use serde_json::{Value, json};
use tower::ServiceExt;

const API_KEY: &str = "test-key";

const ILAB_BODY: &str = "Requester Name: Jane Doe\nRequester Email: jane@uni.edu\nOrganization: State University\nLab Name: Smith Lab\nRequest Type: Account Request";

fn auth() -> AuthConfig {
    AuthConfig {
        api_key: Some(API_KEY.into()),
        allow_unauthenticated: false,
    }
}

async fn app() -> (IngestHarness, Router) {
    let harness = IngestHarness::new().await.unwrap();
    let state = GatewayState::new(harness.ingestor.clone(), auth());
    (harness, router(state))
}

async fn app_with_mailer(mailer: Arc<MockMailer>) -> (IngestHarness, Router) {
    let harness = IngestHarness::new().await.unwrap();
    let state = GatewayState::new(harness.ingestor.clone(), auth()).with_mailer(mailer);
    (harness, router(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn inbound(subject: &str, body: &str, message_id: &str, conversation_id: &str) -> Value {
    json!({
        "subject": subject,
        "body": body,
        "from": "support@ilabsolutions.com",
        "messageId": message_id,
        "conversationId": conversation_id,
        "receivedDateTime": "2026-03-01T09:30:00Z"
    })
}

#[tokio::test]
async fn webhook_creates_then_threads_then_deduplicates() {
    let (_harness, app) = app().await;

    let (status, created) = send(
        &app,
        "POST",
        "/api/webhook/inbound-email",
        Some(inbound("New account request", ILAB_BODY, "m-1", "conv-1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["success"], true);
    assert_eq!(created["request_key"], "ACCT-0001");
    assert_eq!(created["action"], "created");

    let (_, reply) = send(
        &app,
        "POST",
        "/api/webhook/inbound-email",
        Some(inbound("RE: New account request", "Any news?", "m-2", "conv-1")),
    )
    .await;
    assert_eq!(reply["request_key"], "ACCT-0001");
    assert_eq!(reply["action"], "attached");

    let (status, duplicate) = send(
        &app,
        "POST",
        "/api/webhook/inbound-email",
        Some(inbound("RE: New account request", "Any news?", "m-2", "conv-1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(duplicate["action"], "duplicate");
    assert_eq!(duplicate["request_key"], "ACCT-0001");

    let (_, detail) = send(&app, "GET", "/api/tickets/ACCT-0001", None).await;
    assert_eq!(detail["ticket"]["requester_name"], "Jane Doe");
    assert_eq!(detail["ticket"]["lab_name"], "Smith Lab");
    assert_eq!(detail["entries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn webhook_requires_api_key() {
    let (_harness, app) = app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhook/inbound-email")
        .header("content-type", "application/json")
        .body(Body::from(inbound("s", "b", "m-1", "c-1").to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_webhook_body_still_creates_a_ticket() {
    let (_harness, app) = app().await;
    let (status, created) = send(&app, "POST", "/api/webhook/inbound-email", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["action"], "created");

    let (_, detail) = send(&app, "GET", "/api/tickets/ACCT-0001", None).await;
    assert_eq!(detail["ticket"]["requester_email"], Value::Null);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (_harness, app) = app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhook/inbound-email")
        .header("x-api-key", API_KEY)
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_reports_unavailable_storage_as_retryable() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    // Never initialized, so every query fails with a storage error.
    let storage = SqliteStorage::new(StorageConfig {
        database_path: temp_dir.path().join("down.db").to_string_lossy().into_owned(),
        wal_mode: true,
        busy_timeout_ms: 5000,
    });
    let ingestor = Ingestor::new(Arc::new(storage), IngestSettings::default()).unwrap();
    let app = router(GatewayState::new(Arc::new(ingestor), auth()));

    let (status, body) = send(
        &app,
        "POST",
        "/api/webhook/inbound-email",
        Some(inbound("New account request", ILAB_BODY, "m-1", "conv-1")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("storage"));
}

#[tokio::test]
async fn webhook_succeeds_when_notifier_fails() {
    let harness = IngestHarness::builder()
        .with_failing_notifier()
        .build()
        .await
        .unwrap();
    let app = router(GatewayState::new(harness.ingestor.clone(), auth()));

    let (status, created) = send(
        &app,
        "POST",
        "/api/webhook/inbound-email",
        Some(inbound("New account request", ILAB_BODY, "m-1", "conv-1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["success"], true);
    assert_eq!(created["action"], "created");
    assert_eq!(created["request_key"], "ACCT-0001");
    assert!(harness.ticket("ACCT-0001").await.unwrap().is_some());
}

#[tokio::test]
async fn operator_workflow() {
    let (harness, app) = app().await;
    harness
        .ingest_email("Account request", ILAB_BODY, "m-1", Some("conv-1"))
        .await
        .unwrap();

    let (status, change) = send(
        &app,
        "POST",
        "/api/tickets/acct-0001/status",
        Some(json!({"status": "in_progress:information_needed", "actor": "sam@desk"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["changed"], true);
    assert_eq!(change["to"], "in_progress:information_needed");

    let (status, ticket) = send(
        &app,
        "POST",
        "/api/tickets/ACCT-0001/assign",
        Some(json!({"assignee": "Sam", "actor": "lead@desk"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["assignee"], "Sam");

    let (status, note) = send(
        &app,
        "POST",
        "/api/tickets/ACCT-0001/notes",
        Some(json!({"body": "Waiting on PI approval", "actor": "sam@desk"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["kind"], "internal_note");

    let (status, _) = send(
        &app,
        "POST",
        "/api/tickets/ACCT-0001/notes",
        Some(json!({"body": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, counts) = send(&app, "GET", "/api/tickets/counts", None).await;
    assert_eq!(counts["in_progress"], 1);
    assert_eq!(counts["total"], 1);

    let (_, listed) = send(&app, "GET", "/api/tickets?status=in_progress&q=jane", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let (_, listed) = send(&app, "GET", "/api/tickets?status=closed", None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (_, detail) = send(&app, "GET", "/api/tickets/ACCT-0001", None).await;
    let kinds: Vec<&str> = detail["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec!["inbound_email", "system_event", "system_event", "internal_note"]
    );
}

#[tokio::test]
async fn bad_status_and_unknown_ticket() {
    let (harness, app) = app().await;
    harness
        .ingest_email("Account request", ILAB_BODY, "m-1", None)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/tickets/ACCT-0001/status",
        Some(json!({"status": "closed"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "GET", "/api/tickets/ACCT-0042", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", "/api/tickets/not-a-ref", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", "/api/tickets?status=pending", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_is_public() {
    let (_harness, app) = app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "healthy");
}

// ---- Outbound email ----

#[tokio::test]
async fn send_email_delivers_then_records_entry() {
    let mailer = Arc::new(MockMailer::new());
    let (harness, app) = app_with_mailer(mailer.clone()).await;
    harness
        .ingest_email("Account request", ILAB_BODY, "m-1", Some("conv-1"))
        .await
        .unwrap();
    let before = harness.ticket("ACCT-0001").await.unwrap().unwrap();

    let (status, entry) = send(
        &app,
        "POST",
        "/api/tickets/ACCT-0001/send-email",
        Some(json!({
            "to_list": ["jane@uni.edu", " ", "pi@uni.edu "],
            "body": "Your account is ready.",
            "actor": "sam@desk"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["kind"], "outbound_email");
    assert_eq!(
        entry["body"],
        "Sent to: jane@uni.edu, pi@uni.edu\n\nYour account is ready."
    );
    assert_eq!(entry["email_subject"], "Re: Account request");
    assert_eq!(entry["author_identity"], "sam@desk");

    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["jane@uni.edu", "pi@uni.edu"]);
    assert_eq!(sent[0].subject, "Re: Account request");

    let after = harness.ticket("ACCT-0001").await.unwrap().unwrap();
    assert!(after.updated_at >= before.updated_at);
    let entries = harness.entries("ACCT-0001").await.unwrap();
    assert_eq!(entries.last().unwrap().kind, EntryKind::OutboundEmail);
}

#[tokio::test]
async fn send_email_keeps_explicit_subject() {
    let mailer = Arc::new(MockMailer::new());
    let (harness, app) = app_with_mailer(mailer.clone()).await;
    harness
        .ingest_email("Account request", ILAB_BODY, "m-1", None)
        .await
        .unwrap();

    let (status, entry) = send(
        &app,
        "POST",
        "/api/tickets/ACCT-0001/send-email",
        Some(json!({"to_list": ["jane@uni.edu"], "subject": "Access granted", "body": "Done"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["email_subject"], "Access granted");
    assert_eq!(entry["author_identity"], "api");
}

#[tokio::test]
async fn send_email_rejects_missing_recipients_or_body() {
    let mailer = Arc::new(MockMailer::new());
    let (harness, app) = app_with_mailer(mailer.clone()).await;
    harness
        .ingest_email("Account request", ILAB_BODY, "m-1", None)
        .await
        .unwrap();

    for request in [
        json!({"to_list": [], "body": "hello"}),
        json!({"to_list": ["", "  "], "body": "hello"}),
        json!({"body": "hello"}),
        json!({"to_list": ["jane@uni.edu"], "body": ""}),
        json!({"to_list": ["jane@uni.edu"]}),
    ] {
        let (status, body) =
            send(&app, "POST", "/api/tickets/ACCT-0001/send-email", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    assert!(mailer.sent().await.is_empty());
    assert_eq!(harness.entries("ACCT-0001").await.unwrap().len(), 1);
}

#[tokio::test]
async fn send_email_failure_appends_nothing() {
    let (harness, app) = app_with_mailer(Arc::new(MockMailer::failing())).await;
    harness
        .ingest_email("Account request", ILAB_BODY, "m-1", None)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/tickets/ACCT-0001/send-email",
        Some(json!({"to_list": ["jane@uni.edu"], "body": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let entries = harness.entries("ACCT-0001").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries.iter().all(|e| e.kind != EntryKind::OutboundEmail));
}

#[tokio::test]
async fn send_email_unknown_ticket_or_no_mailer() {
    let mailer = Arc::new(MockMailer::new());
    let (_harness, app) = app_with_mailer(mailer.clone()).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/tickets/ACCT-0042/send-email",
        Some(json!({"to_list": ["jane@uni.edu"], "body": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(mailer.sent().await.is_empty());

    let (harness, app) = crate::app().await;
    harness
        .ingest_email("Account request", ILAB_BODY, "m-1", None)
        .await
        .unwrap();
    let (status, _) = send(
        &app,
        "POST",
        "/api/tickets/ACCT-0001/send-email",
        Some(json!({"to_list": ["jane@uni.edu"], "body": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(harness.entries("ACCT-0001").await.unwrap().len(), 1);
}
