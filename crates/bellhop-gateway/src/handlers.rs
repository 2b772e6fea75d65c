// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook and health handlers.
//!
//! Delivery handling always answers 200 once the body parsed; a non-2xx
//! would make the platform redeliver, and redeliveries are exactly what the
//! dedup table is there to absorb. Only a malformed body gets a 400, and in
//! that case nothing has been written.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bellhop_batcher::InboundFragment;
use bellhop_storage::queries::events;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::payload::{extract_text_messages, WebhookPayload};
use crate::server::GatewayState;

const CHANNEL: &str = "whatsapp";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub database: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /webhook: the platform's subscription handshake. Echo the challenge
/// when the verify token matches any configured account, otherwise 403.
pub async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str).unwrap_or("");
    let token = params
        .get("hub.verify_token")
        .map(String::as_str)
        .unwrap_or("");
    let challenge = params
        .get("hub.challenge")
        .map(String::as_str)
        .unwrap_or("");

    if mode == "subscribe"
        && !challenge.is_empty()
        && state.verify_tokens.iter().any(|t| t == token)
    {
        debug!("webhook verification handshake accepted");
        (StatusCode::OK, challenge.to_string()).into_response()
    } else {
        warn!(mode, "webhook verification rejected");
        StatusCode::FORBIDDEN.into_response()
    }
}

/// POST /webhook: one delivery payload, possibly carrying several messages.
pub async fn receive_webhook(
    State(state): State<GatewayState>,
    body: Result<Json<WebhookPayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match body {
        Ok(json) => json,
        Err(rejection) => {
            warn!(error = %rejection, "rejecting malformed webhook body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: rejection.to_string(),
                }),
            )
                .into_response();
        }
    };

    for message in extract_text_messages(&payload) {
        match events::mark_processed(&state.db, &message.provider_message_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    message_id = message.provider_message_id.as_str(),
                    "redelivered message ignored"
                );
                continue;
            }
            Err(e) => {
                // Dedup unavailable: drop rather than risk double-processing.
                error!(error = %e, "webhook dedup check failed, dropping message");
                let metadata = format!(r#"{{"message_id":"{}"}}"#, message.provider_message_id);
                if let Err(log_err) =
                    events::record_error(&state.db, "gateway", "error", &e.to_string(), Some(&metadata))
                        .await
                {
                    error!(error = %log_err, "failed to append to the error log");
                }
                continue;
            }
        }

        state.batcher.enqueue(
            &message.sender_id,
            InboundFragment {
                channel: CHANNEL.to_string(),
                account_id: message.account_id,
                sender_name: message.sender_name,
                provider_message_id: message.provider_message_id,
                text: message.text,
            },
        );
    }

    StatusCode::OK.into_response()
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let database = match events::recent_errors(&state.db, 1).await {
        Ok(_) => "ok".to_string(),
        Err(e) => {
            warn!(error = %e, "health probe failed to reach the database");
            "error".to_string()
        }
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        database,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use bellhop_batcher::{BatchHandler, BatchedTurn, MessageBatcher};
    use bellhop_config::model::{WhatsAppAccount, WhatsAppConfig};
    use bellhop_storage::Database;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use crate::server::{router, GatewayState};

    struct RecordingHandler {
        turns: Mutex<Vec<BatchedTurn>>,
    }

    impl RecordingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                turns: Mutex::new(Vec::new()),
            })
        }

        async fn turns(&self) -> Vec<BatchedTurn> {
            self.turns.lock().await.clone()
        }
    }

    #[async_trait]
    impl BatchHandler for RecordingHandler {
        async fn handle_turn(&self, turn: BatchedTurn) {
            self.turns.lock().await.push(turn);
        }
    }

    async fn state(handler: Arc<RecordingHandler>) -> GatewayState {
        let db = Database::open_in_memory().await.unwrap();
        let batcher = MessageBatcher::new(Duration::from_millis(50), handler);
        let whatsapp = WhatsAppConfig {
            api_base: "http://unused.invalid".to_string(),
            accounts: vec![WhatsAppAccount {
                phone_number_id: "1055".to_string(),
                access_token: "token".to_string(),
                verify_token: "verify-me".to_string(),
            }],
        };
        GatewayState::new(batcher, db, &whatsapp)
    }

    fn delivery(message_id: &str) -> String {
        format!(
            r#"{{"object": "whatsapp_business_account", "entry": [{{"changes": [{{"value": {{
                "metadata": {{"phone_number_id": "1055"}},
                "contacts": [{{"profile": {{"name": "Nimal"}}, "wa_id": "+9477001"}}],
                "messages": [{{"from": "+9477001", "id": "{message_id}", "type": "text",
                               "text": {{"body": "hello"}}}}]
            }}}}]}}]}}"#
        )
    }

    #[tokio::test]
    async fn handshake_echoes_challenge_on_matching_token() {
        let state = state(RecordingHandler::new()).await;
        let response = router(state)
            .oneshot(
                Request::get("/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=12345")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"12345");
    }

    #[tokio::test]
    async fn handshake_rejects_wrong_token() {
        let state = state(RecordingHandler::new()).await;
        let response = router(state)
            .oneshot(
                Request::get("/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=12345")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn handshake_rejects_wrong_mode() {
        let state = state(RecordingHandler::new()).await;
        let response = router(state)
            .oneshot(
                Request::get("/webhook?hub.mode=unsubscribe&hub.verify_token=verify-me&hub.challenge=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn delivery_enqueues_text_message() {
        let handler = RecordingHandler::new();
        let gateway = state(handler.clone()).await;
        let batcher = gateway.batcher.clone();

        let response = router(gateway)
            .oneshot(
                Request::post("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(delivery("wamid.1")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        batcher.flush("+9477001").await;
        let turns = handler.turns().await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "hello");
        assert_eq!(turns[0].account_id, "1055");
        assert_eq!(turns[0].sender_name.as_deref(), Some("Nimal"));
    }

    #[tokio::test]
    async fn redelivered_message_is_dropped() {
        let handler = RecordingHandler::new();
        let gateway = state(handler.clone()).await;
        let batcher = gateway.batcher.clone();
        let app = router(gateway);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    Request::post("/webhook")
                        .header("content-type", "application/json")
                        .body(Body::from(delivery("wamid.same")))
                        .unwrap(),
                )
                .await
                .unwrap();
            // Redelivery still gets a 200 so the platform stops retrying.
            assert_eq!(response.status(), StatusCode::OK);
        }

        batcher.flush("+9477001").await;
        assert_eq!(handler.turns().await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_without_state_changes() {
        let handler = RecordingHandler::new();
        let gateway = state(handler.clone()).await;
        let batcher = gateway.batcher.clone();

        let response = router(gateway)
            .oneshot(
                Request::post("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(batcher.pending_senders().is_empty());
        assert!(handler.turns().await.is_empty());
    }

    #[tokio::test]
    async fn status_only_delivery_is_a_no_op() {
        let handler = RecordingHandler::new();
        let gateway = state(handler.clone()).await;

        let body = r#"{"object": "whatsapp_business_account", "entry": [{"changes": [{"value": {
            "metadata": {"phone_number_id": "1055"},
            "statuses": [{"id": "wamid.1", "status": "read"}]
        }}]}]}"#;
        let response = router(gateway)
            .oneshot(
                Request::post("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(handler.turns().await.is_empty());
    }

    #[tokio::test]
    async fn health_reports_version_and_database() {
        let gateway = state(RecordingHandler::new()).await;
        let response = router(gateway)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["database"], "ok");
        assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
    }
}
