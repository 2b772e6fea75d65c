// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full-pipeline test harness.
//!
//! `TestHarness` assembles the complete turn engine over a temp SQLite
//! database with mock model and channel adapters, then drives it one
//! batched turn at a time via [`TestHarness::send_inbound`]. The batcher
//! itself has its own timer tests; the harness skips it so tests stay
//! synchronous.

use std::sync::Arc;
use std::time::Duration;

use bellhop_agent::TurnEngine;
use bellhop_batcher::BatchedTurn;
use bellhop_channels::ResponseFormatter;
use bellhop_config::model::{AgentConfig, ContextConfig, RetrievalConfig, StorageConfig, TemplateConfig};
use bellhop_context::ContextAssembler;
use bellhop_core::BellhopError;
use bellhop_knowledge::{KnowledgeEntry, KnowledgeRetriever, KnowledgeStore, Product};
use bellhop_orders::OrderTracker;
use bellhop_prompt::PromptContract;
use bellhop_storage::Database;
use bellhop_tickets::TicketIssuer;
use chrono::Utc;
use uuid::Uuid;

use crate::mock_channel::MockSender;
use crate::mock_provider::{MockModel, StubEmbedder};

const TEST_CHANNEL: &str = "whatsapp";
const TEST_ACCOUNT: &str = "1055";

/// Builder for a complete test pipeline.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    products: Vec<Product>,
    knowledge: Vec<String>,
    templates: Vec<TemplateConfig>,
    agent: AgentConfig,
    failing_sender: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            products: Vec::new(),
            knowledge: Vec::new(),
            templates: Vec::new(),
            agent: AgentConfig::default(),
            failing_sender: false,
        }
    }

    /// Queue raw model replies, consumed in order.
    pub fn with_replies(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    /// Seed a catalog product. The embedding matches [`StubEmbedder`].
    pub fn with_product(mut self, title: &str, price: Option<f64>, discount: Option<f64>) -> Self {
        self.products.push(Product {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: format!("{title} (test catalog entry)"),
            price,
            discount,
            embedding: StubEmbedder::vector(),
            created_at: Utc::now().to_rfc3339(),
        });
        self
    }

    /// Seed a knowledge base entry.
    pub fn with_knowledge(mut self, content: &str) -> Self {
        self.knowledge.push(content.to_string());
        self
    }

    /// Install response templates.
    pub fn with_templates(mut self, templates: Vec<TemplateConfig>) -> Self {
        self.templates = templates;
        self
    }

    /// Override the agent persona config.
    pub fn with_agent(mut self, agent: AgentConfig) -> Self {
        self.agent = agent;
        self
    }

    /// Make every outbound send fail, to exercise the degraded path.
    pub fn with_failing_sender(mut self) -> Self {
        self.failing_sender = true;
        self
    }

    pub async fn build(self) -> Result<TestHarness, BellhopError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| BellhopError::Storage {
            source: Box::new(e),
        })?;
        let storage = StorageConfig {
            database_path: temp_dir
                .path()
                .join("test.db")
                .to_string_lossy()
                .to_string(),
            wal_mode: true,
        };
        let db = Database::open(&storage).await?;

        let store = KnowledgeStore::new(db.clone());
        for product in &self.products {
            store.upsert_product(product).await?;
        }
        for content in &self.knowledge {
            store
                .upsert_knowledge(&KnowledgeEntry {
                    id: Uuid::new_v4().to_string(),
                    content: content.clone(),
                    embedding: StubEmbedder::vector(),
                    created_at: Utc::now().to_rfc3339(),
                })
                .await?;
        }

        let retriever = KnowledgeRetriever::new(
            store.clone(),
            Arc::new(StubEmbedder),
            RetrievalConfig::default(),
        );

        let model = Arc::new(MockModel::with_replies(self.replies));
        let sender = Arc::new(if self.failing_sender {
            MockSender::failing()
        } else {
            MockSender::new()
        });

        let engine = TurnEngine::new(
            db.clone(),
            ContextAssembler::new(db.clone(), retriever),
            PromptContract::new(model.clone(), self.agent, Duration::from_secs(5)),
            OrderTracker::new(db.clone(), store.clone()),
            TicketIssuer::new(db.clone()),
            ResponseFormatter::from_config(&self.templates),
            sender.clone(),
            ContextConfig::default(),
        );

        Ok(TestHarness {
            db,
            store,
            model,
            sender,
            engine: Arc::new(engine),
            _temp_dir: temp_dir,
        })
    }
}

/// A fully wired pipeline over a temp database.
pub struct TestHarness {
    pub db: Database,
    pub store: KnowledgeStore,
    pub model: Arc<MockModel>,
    pub sender: Arc<MockSender>,
    pub engine: Arc<TurnEngine>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Drive one already-batched turn through the engine, as the batcher
    /// would after its debounce window. Returns the reply that was sent.
    pub async fn send_inbound(
        &self,
        sender_id: &str,
        text: &str,
        provider_message_id: &str,
    ) -> Result<Option<String>, BellhopError> {
        self.engine
            .handle_inbound(&BatchedTurn {
                sender_id: sender_id.to_string(),
                channel: TEST_CHANNEL.to_string(),
                account_id: TEST_ACCOUNT.to_string(),
                sender_name: Some("Test Customer".to_string()),
                provider_message_id: provider_message_id.to_string(),
                text: text.to_string(),
            })
            .await
    }
}
