// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use bellhop_batcher::MessageBatcher;
use bellhop_config::model::{GatewayConfig, WhatsAppConfig};
use bellhop_core::BellhopError;
use bellhop_storage::Database;
use tower_http::cors::CorsLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub batcher: Arc<MessageBatcher>,
    pub db: Database,
    /// Verify tokens of every configured account; the handshake accepts any.
    pub verify_tokens: Arc<Vec<String>>,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(batcher: Arc<MessageBatcher>, db: Database, whatsapp: &WhatsAppConfig) -> Self {
        let verify_tokens = whatsapp
            .accounts
            .iter()
            .map(|a| a.verify_token.clone())
            .collect();
        Self {
            batcher,
            db,
            verify_tokens: Arc::new(verify_tokens),
            start_time: Instant::now(),
        }
    }
}

/// The gateway's route table.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/webhook",
            get(handlers::verify_webhook).post(handlers::receive_webhook),
        )
        .route("/health", get(handlers::get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn start_server(config: &GatewayConfig, state: GatewayState) -> Result<(), BellhopError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BellhopError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| BellhopError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
