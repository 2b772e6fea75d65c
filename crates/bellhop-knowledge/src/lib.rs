// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge base and product catalog retrieval for Bellhop.
//!
//! Entries live in SQLite alongside the conversation store: text in
//! ordinary columns mirrored into FTS5 tables for BM25, embeddings as
//! little-endian f32 BLOBs for cosine similarity. Queries run both
//! channels and merge them with weighted reciprocal rank fusion.
//!
//! ## Architecture
//!
//! - **KnowledgeStore**: upserts and raw per-channel queries
//! - **KnowledgeRetriever**: hybrid search producing [`bellhop_core::KnowledgeMatch`]es
//! - **Types**: KnowledgeEntry, Product, vector BLOB codecs

pub mod retriever;
pub mod store;
pub mod types;

pub use retriever::{weighted_rank_fusion, KnowledgeRetriever};
pub use store::{sanitize_match_query, KnowledgeStore};
pub use types::{blob_to_vec, cosine_similarity, vec_to_blob, KnowledgeEntry, Product};
