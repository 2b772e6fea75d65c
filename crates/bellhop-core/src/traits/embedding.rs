// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::BellhopError;

/// A text embedding backend used by the semantic retrieval channel.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one piece of text into a dense vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BellhopError>;
}
