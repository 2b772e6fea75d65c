// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge base domain types and vector helpers.

use serde::{Deserialize, Serialize};

/// A free-form knowledge base entry (policies, FAQ answers, store info).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub content: String,
    /// Embedding for the semantic channel; empty when not yet embedded.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub created_at: String,
}

/// A product catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    /// Discount percentage in [0, 100].
    pub discount: Option<f64>,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub created_at: String,
}

impl Product {
    /// The text that gets embedded and matched for this product.
    pub fn searchable_text(&self) -> String {
        format!("{}\n{}", self.title, self.description)
    }
}

/// Convert an f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a SQLite BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// Cosine similarity between two vectors.
///
/// Embedding APIs do not guarantee L2-normalized output, so this divides by
/// both norms rather than assuming a plain dot product. Returns 0.0 when
/// either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vectors must have same length");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
