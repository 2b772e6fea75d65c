// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the per-turn context handed to the prompt layer: a bounded
//! history window and a rendered knowledge block.
//!
//! Assembly is read-only. `last_context_update` is bumped by the agent
//! after a successful turn, never here, so a failed turn does not push the
//! reset horizon forward.

use bellhop_core::{BellhopError, KnowledgeMatch, MatchSource, ModelTurn};
use bellhop_knowledge::KnowledgeRetriever;
use bellhop_storage::models::{Conversation, DIRECTION_RECEIVED};
use bellhop_storage::queries::messages;
use bellhop_storage::Database;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Bounds for the per-conversation memory settings. Rows written by older
/// versions or edited by hand are clamped into range on load.
const MEMORY_LENGTH_MAX: u32 = 5;
const TIMEOUT_HOURS_MIN: u32 = 1;
const TIMEOUT_HOURS_MAX: u32 = 6;

/// Everything the prompt layer needs about the current turn.
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Rendered knowledge section, empty when nothing matched.
    pub knowledge_block: String,
    /// History window, oldest first, at most 2 x memory_length turns.
    pub history: Vec<ModelTurn>,
    /// The raw matches behind the knowledge block.
    pub matches: Vec<KnowledgeMatch>,
}

/// Assembles [`TurnContext`]s from the message log and the knowledge base.
pub struct ContextAssembler {
    db: Database,
    retriever: KnowledgeRetriever,
}

impl ContextAssembler {
    pub fn new(db: Database, retriever: KnowledgeRetriever) -> Self {
        Self { db, retriever }
    }

    /// Assemble the context for one incoming message.
    ///
    /// History is empty when the conversation's memory length is zero or
    /// when it has been idle past its timeout; the timeout models "the
    /// customer is starting over". Retrieval failure degrades to an empty
    /// knowledge block so the turn can proceed.
    pub async fn assemble(
        &self,
        conversation: &Conversation,
        incoming_text: &str,
    ) -> Result<TurnContext, BellhopError> {
        let memory_length = conversation.memory_length.min(MEMORY_LENGTH_MAX);
        let timeout_hours = conversation
            .memory_timeout_hours
            .clamp(TIMEOUT_HOURS_MIN, TIMEOUT_HOURS_MAX);

        let history = if memory_length == 0 || self.context_expired(conversation, timeout_hours) {
            Vec::new()
        } else {
            let window = (memory_length as usize) * 2;
            messages::recent_messages(&self.db, &conversation.id, window)
                .await?
                .into_iter()
                .map(|m| {
                    if m.direction == DIRECTION_RECEIVED {
                        ModelTurn::user(m.body)
                    } else {
                        ModelTurn::model(m.body)
                    }
                })
                .collect()
        };

        let matches = match self.retriever.retrieve(incoming_text).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, conversation = %conversation.id,
                    "knowledge retrieval failed; continuing without context");
                Vec::new()
            }
        };
        let knowledge_block = render_knowledge_block(&matches);

        Ok(TurnContext {
            knowledge_block,
            history,
            matches,
        })
    }

    /// True when the conversation has been idle longer than its timeout.
    /// An unparseable timestamp counts as expired.
    fn context_expired(&self, conversation: &Conversation, timeout_hours: u32) -> bool {
        match DateTime::parse_from_rfc3339(&conversation.last_context_update) {
            Ok(last) => {
                Utc::now().signed_duration_since(last) > Duration::hours(timeout_hours as i64)
            }
            Err(_) => true,
        }
    }
}

/// Render matches into the labelled knowledge section of the instruction.
///
/// Knowledge entries are passed through as-is; products get their pricing
/// attached, including the discounted price when a discount applies.
pub fn render_knowledge_block(matches: &[KnowledgeMatch]) -> String {
    let mut knowledge_lines = Vec::new();
    let mut product_lines = Vec::new();

    for m in matches {
        match m.source {
            MatchSource::Knowledge => knowledge_lines.push(format!("- {}", m.content)),
            MatchSource::Product => product_lines.push(render_product_line(m)),
        }
    }

    let mut sections = Vec::new();
    if !knowledge_lines.is_empty() {
        sections.push(format!(
            "Relevant store information:\n{}",
            knowledge_lines.join("\n")
        ));
    }
    if !product_lines.is_empty() {
        sections.push(format!("Matching products:\n{}", product_lines.join("\n")));
    }
    sections.join("\n\n")
}

fn render_product_line(m: &KnowledgeMatch) -> String {
    let (title, description) = match m.content.split_once('\n') {
        Some((t, d)) => (t.to_string(), d.to_string()),
        None => (m.content.clone(), String::new()),
    };
    let title = m.metadata.title.clone().unwrap_or(title);

    let pricing = match (m.metadata.price, m.metadata.discount) {
        (Some(price), Some(discount)) if discount > 0.0 => {
            let discounted = price * (1.0 - discount / 100.0);
            format!(" (price {price:.2}, discounted price {discounted:.2})")
        }
        (Some(price), _) => format!(" (price {price:.2})"),
        (None, _) => String::new(),
    };

    if description.is_empty() {
        format!("- {title}{pricing}")
    } else {
        format!("- {title}: {description}{pricing}")
    }
}
