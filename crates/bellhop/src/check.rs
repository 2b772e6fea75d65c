// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bellhop check` command implementation.
//!
//! A preflight for operators: the configuration already validated by the
//! time we get here, so this opens the database (running any pending
//! migrations), reports knowledge base counts, and confirms which WhatsApp
//! accounts are configured. No network calls are made.

use bellhop_config::BellhopConfig;
use bellhop_core::BellhopError;
use bellhop_knowledge::KnowledgeStore;
use bellhop_storage::Database;

pub async fn run_check(config: BellhopConfig) -> Result<(), BellhopError> {
    println!("config: ok (agent.name={})", config.agent.name);

    if config.model.api_key.is_none() {
        println!("model: warning, model.api_key is not set; serve will fail");
    } else {
        println!(
            "model: ok (generation={}, embedding={})",
            config.model.generation_model, config.model.embedding_model
        );
    }

    let db = Database::open(&config.storage).await?;
    println!(
        "storage: ok ({}, wal={})",
        config.storage.database_path, config.storage.wal_mode
    );

    let store = KnowledgeStore::new(db.clone());
    let (knowledge, products) = store.counts().await?;
    println!("knowledge: {knowledge} entries, {products} products");

    if config.whatsapp.accounts.is_empty() {
        println!("whatsapp: warning, no accounts configured; the webhook will reject verification");
    } else {
        for account in &config.whatsapp.accounts {
            println!("whatsapp: account {} configured", account.phone_number_id);
        }
    }

    db.close().await?;
    println!("check complete");
    Ok(())
}
