// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bellhop serve` command implementation.
//!
//! Wires the whole pipeline together: SQLite storage with migrations,
//! hybrid knowledge retrieval over the Gemini embedder, the prompt
//! contract, order tracker, ticket issuer, WhatsApp sender, per-sender
//! batcher, and the webhook gateway. Serves until ctrl-c, then flushes
//! any buffered turns before exiting.

use std::sync::Arc;
use std::time::Duration;

use bellhop_agent::TurnEngine;
use bellhop_batcher::MessageBatcher;
use bellhop_channels::{ResponseFormatter, WhatsAppSender};
use bellhop_config::BellhopConfig;
use bellhop_context::ContextAssembler;
use bellhop_core::BellhopError;
use bellhop_gateway::{start_server, GatewayState};
use bellhop_knowledge::{KnowledgeRetriever, KnowledgeStore};
use bellhop_model::GeminiClient;
use bellhop_orders::OrderTracker;
use bellhop_prompt::PromptContract;
use bellhop_storage::queries::events;
use bellhop_storage::Database;
use bellhop_tickets::TicketIssuer;
use tracing::{info, warn};

/// Dedup entries older than this are pruned at startup; the platform
/// stops redelivering long before.
const PROCESSED_EVENTS_MAX_AGE_HOURS: u32 = 48;

pub async fn run_serve(config: BellhopConfig) -> Result<(), BellhopError> {
    init_tracing(&config.agent.log_level);

    info!(agent = config.agent.name.as_str(), "starting bellhop serve");

    let db = Database::open(&config.storage).await?;
    match events::prune_processed_events(&db, PROCESSED_EVENTS_MAX_AGE_HOURS).await {
        Ok(pruned) if pruned > 0 => info!(pruned, "pruned stale webhook dedup entries"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "failed to prune webhook dedup entries"),
    }

    let gemini = GeminiClient::new(&config.model)?;

    let store = KnowledgeStore::new(db.clone());
    let (knowledge_count, product_count) = store.counts().await?;
    info!(
        knowledge = knowledge_count,
        products = product_count,
        "knowledge base loaded"
    );

    let retriever = KnowledgeRetriever::new(
        store.clone(),
        Arc::new(gemini.clone()),
        config.retrieval.clone(),
    );

    let engine = TurnEngine::new(
        db.clone(),
        ContextAssembler::new(db.clone(), retriever),
        PromptContract::new(
            Arc::new(gemini),
            config.agent.clone(),
            Duration::from_secs(config.model.request_timeout_secs),
        ),
        OrderTracker::new(db.clone(), store),
        TicketIssuer::new(db.clone()),
        ResponseFormatter::from_config(&config.templates),
        Arc::new(WhatsAppSender::new(&config.whatsapp)?),
        config.context.clone(),
    );

    let batcher = MessageBatcher::new(
        Duration::from_millis(config.batching.window_ms),
        Arc::new(engine),
    );

    let state = GatewayState::new(batcher.clone(), db.clone(), &config.whatsapp);

    tokio::select! {
        result = start_server(&config.gateway, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    // Deliver anything still buffered so no customer text is dropped.
    for sender_id in batcher.pending_senders() {
        info!(sender = sender_id.as_str(), "flushing buffered turn on shutdown");
        batcher.flush(&sender_id).await;
    }

    if let Err(e) = db.close().await {
        warn!(error = %e, "failed to checkpoint database on shutdown");
    }
    info!("bellhop stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let directives = [
        "bellhop",
        "bellhop_agent",
        "bellhop_batcher",
        "bellhop_channels",
        "bellhop_context",
        "bellhop_gateway",
        "bellhop_knowledge",
        "bellhop_model",
        "bellhop_orders",
        "bellhop_prompt",
        "bellhop_storage",
        "bellhop_tickets",
    ]
    .map(|target| format!("{target}={log_level}"))
    .join(",");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{directives}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
