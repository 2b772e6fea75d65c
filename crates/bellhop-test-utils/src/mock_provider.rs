// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock model and embedding providers for deterministic tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bellhop_core::{BellhopError, EmbeddingProvider, ModelProvider, ModelTurn};
use tokio::sync::Mutex;

/// Raw model replies a test expects the contract to see, in FIFO order.
///
/// When the queue runs dry the mock returns a benign, contract-valid
/// general-query reply, so tests only script the turns they care about.
pub struct MockModel {
    replies: Arc<Mutex<VecDeque<String>>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
        }
    }

    /// Queue another raw reply.
    pub async fn push_reply(&self, raw: impl Into<String>) {
        self.replies.lock().await.push_back(raw.into());
    }

    fn default_reply() -> String {
        r#"{"intent": "GENERAL_QUERY", "confidence": 0.9, "response": "mock reply",
            "requires_escalation": false, "detected_entities": {}}"#
            .to_string()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for MockModel {
    async fn generate(
        &self,
        _system_instruction: &str,
        _turns: &[ModelTurn],
    ) -> Result<String, BellhopError> {
        Ok(self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(Self::default_reply))
    }
}

/// Fixed-vector embedder. Pairs with corpus entries seeded with the same
/// vector so every retrieval scores a perfect cosine match.
pub struct StubEmbedder;

impl StubEmbedder {
    pub fn vector() -> Vec<f32> {
        vec![1.0, 0.0]
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, BellhopError> {
        Ok(Self::vector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_come_back_in_order_then_default() {
        let model = MockModel::with_replies(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(model.generate("", &[]).await.unwrap(), "first");
        assert_eq!(model.generate("", &[]).await.unwrap(), "second");
        assert!(model.generate("", &[]).await.unwrap().contains("GENERAL_QUERY"));
    }

    #[tokio::test]
    async fn pushed_reply_is_served() {
        let model = MockModel::new();
        model.push_reply("queued").await;
        assert_eq!(model.generate("", &[]).await.unwrap(), "queued");
    }
}
