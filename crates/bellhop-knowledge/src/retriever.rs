// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid retriever combining BM25 keyword search and embedding similarity
//! via weighted reciprocal rank fusion.
//!
//! Both corpora (knowledge entries and products) are searched through both
//! channels, fused per corpus, then merged into one ranked list. The
//! semantic channel degrades gracefully: if the embedding call fails, the
//! query continues text-only instead of failing the turn.

use std::collections::HashMap;
use std::sync::Arc;

use bellhop_config::model::RetrievalConfig;
use bellhop_core::{clamp_unit, BellhopError, EmbeddingProvider, KnowledgeMatch, MatchMetadata, MatchSource};
use tracing::warn;

use crate::store::KnowledgeStore;
use crate::types::cosine_similarity;

/// Hybrid retriever over the knowledge base and product catalog.
pub struct KnowledgeRetriever {
    store: KnowledgeStore,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

struct Candidate {
    source: MatchSource,
    id: String,
    fused: f64,
    similarity: f32,
}

impl KnowledgeRetriever {
    pub fn new(
        store: KnowledgeStore,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Retrieve the best-matching knowledge for a customer query.
    ///
    /// 1. Embed the query (skipped on failure; text channel still runs)
    /// 2. Per corpus: BM25 ranks, and similarity ranks with cosine below
    ///    `match_threshold` dropped before fusion
    /// 3. Fuse the channels with weighted RRF and merge corpora
    /// 4. Return the top `match_count` as [`KnowledgeMatch`]es
    pub async fn retrieve(&self, query: &str) -> Result<Vec<KnowledgeMatch>, BellhopError> {
        // Each channel contributes up to twice the final count so fusion has
        // something to reorder.
        let candidate_limit = self.config.match_count.saturating_mul(2).max(1);

        let query_embedding = match self.embedder.embed(query).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "query embedding failed; retrieval degrades to text-only");
                None
            }
        };

        let mut candidates = Vec::new();

        let knowledge_text = self
            .store
            .search_knowledge_bm25(query, candidate_limit)
            .await?;
        let knowledge_vector = match &query_embedding {
            Some(q) => rank_by_similarity(
                q,
                self.store.knowledge_embeddings().await?,
                self.config.match_threshold,
                candidate_limit,
            ),
            None => vec![],
        };
        self.collect_candidates(
            MatchSource::Knowledge,
            &knowledge_vector,
            &knowledge_text,
            &mut candidates,
        );

        let product_text = self
            .store
            .search_products_bm25(query, candidate_limit)
            .await?;
        let product_vector = match &query_embedding {
            Some(q) => rank_by_similarity(
                q,
                self.store.product_embeddings().await?,
                self.config.match_threshold,
                candidate_limit,
            ),
            None => vec![],
        };
        self.collect_candidates(
            MatchSource::Product,
            &product_vector,
            &product_text,
            &mut candidates,
        );

        candidates.sort_by(|a, b| b.fused.partial_cmp(&a.fused).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(self.config.match_count);

        self.hydrate(candidates).await
    }

    fn collect_candidates(
        &self,
        source: MatchSource,
        vector: &[(String, f32)],
        text: &[(String, f64)],
        out: &mut Vec<Candidate>,
    ) {
        let similarity_by_id: HashMap<&str, f32> =
            vector.iter().map(|(id, sim)| (id.as_str(), *sim)).collect();
        for (id, fused) in weighted_rank_fusion(
            vector,
            text,
            self.config.full_text_weight,
            self.config.semantic_weight,
            self.config.fusion_constant,
        ) {
            let similarity = similarity_by_id.get(id.as_str()).copied().unwrap_or(0.0);
            out.push(Candidate {
                source,
                id,
                fused,
                similarity,
            });
        }
    }

    /// Fetch full rows for the surviving candidates, preserving fused order.
    async fn hydrate(&self, candidates: Vec<Candidate>) -> Result<Vec<KnowledgeMatch>, BellhopError> {
        let knowledge_ids: Vec<String> = candidates
            .iter()
            .filter(|c| c.source == MatchSource::Knowledge)
            .map(|c| c.id.clone())
            .collect();
        let product_ids: Vec<String> = candidates
            .iter()
            .filter(|c| c.source == MatchSource::Product)
            .map(|c| c.id.clone())
            .collect();

        let knowledge_rows = self.store.knowledge_by_ids(&knowledge_ids).await?;
        let product_rows = self.store.products_by_ids(&product_ids).await?;

        let knowledge_by_id: HashMap<&str, &crate::types::KnowledgeEntry> =
            knowledge_rows.iter().map(|e| (e.id.as_str(), e)).collect();
        let products_by_id: HashMap<&str, &crate::types::Product> =
            product_rows.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut matches = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let built = match candidate.source {
                MatchSource::Knowledge => {
                    knowledge_by_id.get(candidate.id.as_str()).map(|entry| KnowledgeMatch {
                        id: entry.id.clone(),
                        content: entry.content.clone(),
                        similarity: clamp_unit(candidate.similarity as f64),
                        source: MatchSource::Knowledge,
                        metadata: MatchMetadata::default(),
                    })
                }
                MatchSource::Product => {
                    products_by_id.get(candidate.id.as_str()).map(|product| KnowledgeMatch {
                        id: product.id.clone(),
                        content: product.searchable_text(),
                        similarity: clamp_unit(candidate.similarity as f64),
                        source: MatchSource::Product,
                        metadata: MatchMetadata {
                            title: Some(product.title.clone()),
                            price: product.price,
                            discount: product.discount,
                        },
                    })
                }
            };
            if let Some(m) = built {
                matches.push(m);
            }
        }
        Ok(matches)
    }
}

/// Rank stored embeddings by cosine similarity to the query, descending.
/// Vectors whose dimensionality differs from the query are skipped, as are
/// similarities below `threshold`; an entry the semantic channel rejects can
/// still surface through a BM25 hit.
fn rank_by_similarity(
    query: &[f32],
    embeddings: Vec<(String, Vec<f32>)>,
    threshold: f64,
    limit: usize,
) -> Vec<(String, f32)> {
    let mut results: Vec<(String, f32)> = embeddings
        .into_iter()
        .filter_map(|(id, embedding)| {
            if embedding.len() != query.len() {
                return None;
            }
            let similarity = cosine_similarity(query, &embedding);
            if f64::from(similarity) < threshold {
                return None;
            }
            Some((id, similarity))
        })
        .collect();
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

/// Weighted reciprocal rank fusion of a similarity ranking and a BM25
/// ranking.
///
/// Score for document d = semantic_weight / (k + rank_vec(d)) +
/// full_text_weight / (k + rank_text(d)), summing only the lists that
/// contain d. Ranks are 1-based; k = 60 by default per the RRF literature.
/// Input lists must already be sorted most-relevant-first, which BM25's
/// ascending ORDER BY and the similarity sort both guarantee.
pub fn weighted_rank_fusion(
    vector_results: &[(String, f32)],
    text_results: &[(String, f64)],
    full_text_weight: f64,
    semantic_weight: f64,
    fusion_constant: u32,
) -> Vec<(String, f64)> {
    let k = fusion_constant as f64;
    let mut scores: HashMap<String, f64> = HashMap::new();

    for (rank, (id, _)) in vector_results.iter().enumerate() {
        *scores.entry(id.clone()).or_insert(0.0) += semantic_weight / (k + rank as f64 + 1.0);
    }
    for (rank, (id, _)) in text_results.iter().enumerate() {
        *scores.entry(id.clone()).or_insert(0.0) += full_text_weight / (k + rank as f64 + 1.0);
    }

    let mut fused: Vec<(String, f64)> = scores.into_iter().collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KnowledgeEntry, Product};
    use async_trait::async_trait;
    use bellhop_storage::Database;
    use chrono::Utc;

    #[test]
    fn fusion_rewards_presence_in_both_channels() {
        let vector = vec![("d1".to_string(), 0.9f32), ("d2".to_string(), 0.8f32)];
        let text = vec![("d1".to_string(), -5.0f64), ("d3".to_string(), -3.0f64)];

        let fused = weighted_rank_fusion(&vector, &text, 1.0, 1.0, 60);

        assert_eq!(fused[0].0, "d1");
        let expected_d1 = 2.0 / 61.0;
        assert!((fused[0].1 - expected_d1).abs() < 1e-9);

        let d2 = fused.iter().find(|(id, _)| id == "d2").unwrap().1;
        let d3 = fused.iter().find(|(id, _)| id == "d3").unwrap().1;
        assert!((d2 - d3).abs() < 1e-9, "same-rank single-channel docs tie");
    }

    #[test]
    fn fusion_weights_bias_the_channels() {
        let vector = vec![("semantic-doc".to_string(), 0.9f32)];
        let text = vec![("keyword-doc".to_string(), -5.0f64)];

        let fused = weighted_rank_fusion(&vector, &text, 2.0, 0.5, 60);
        assert_eq!(fused[0].0, "keyword-doc");
        assert!((fused[0].1 - 2.0 / 61.0).abs() < 1e-9);
        assert!((fused[1].1 - 0.5 / 61.0).abs() < 1e-9);
    }

    #[test]
    fn fusion_zero_weight_silences_a_channel() {
        let vector = vec![("v".to_string(), 0.99f32)];
        let text: Vec<(String, f64)> = vec![];
        let fused = weighted_rank_fusion(&vector, &text, 1.0, 0.0, 60);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].1, 0.0);
    }

    #[test]
    fn fusion_empty_inputs_empty_output() {
        let fused = weighted_rank_fusion(&[], &[], 1.0, 1.0, 60);
        assert!(fused.is_empty());
    }

    #[test]
    fn similarity_ranking_skips_mismatched_dimensions() {
        let query = vec![1.0, 0.0];
        let embeddings = vec![
            ("ok".to_string(), vec![1.0, 0.0]),
            ("bad-dims".to_string(), vec![1.0, 0.0, 0.0]),
        ];
        let ranked = rank_by_similarity(&query, embeddings, 0.0, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, "ok");
    }

    #[test]
    fn similarity_ranking_drops_entries_below_threshold() {
        let query = vec![1.0, 0.0];
        let embeddings = vec![
            ("aligned".to_string(), vec![1.0, 0.0]),
            ("orthogonal".to_string(), vec![0.0, 1.0]),
            ("opposed".to_string(), vec![-1.0, 0.0]),
        ];
        let ranked = rank_by_similarity(&query, embeddings, 0.01, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, "aligned");
    }

    struct FixedEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, BellhopError> {
            Ok(self.vector.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, BellhopError> {
            Err(BellhopError::Provider {
                message: "embedding backend down".to_string(),
                source: None,
            })
        }
    }

    fn entry(id: &str, content: &str, embedding: Vec<f32>) -> KnowledgeEntry {
        KnowledgeEntry {
            id: id.to_string(),
            content: content.to_string(),
            embedding,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    fn product(id: &str, title: &str, description: &str, embedding: Vec<f32>) -> Product {
        Product {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            price: Some(2400.0),
            discount: Some(10.0),
            embedding,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    async fn seeded_store() -> KnowledgeStore {
        let db = Database::open_in_memory().await.unwrap();
        let store = KnowledgeStore::new(db);
        store
            .upsert_knowledge(&entry("k-delivery", "Delivery takes 2 hours inside Colombo", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert_knowledge(&entry("k-hours", "The bakery is open 8am to 8pm", vec![0.0, 1.0]))
            .await
            .unwrap();
        store
            .upsert_product(&product("p-cake", "Chocolate Cake", "rich dark chocolate", vec![0.9, 0.1]))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn retrieve_merges_corpora_and_carries_product_metadata() {
        let store = seeded_store().await;
        let retriever = KnowledgeRetriever::new(
            store,
            Arc::new(FixedEmbedder { vector: vec![1.0, 0.0] }),
            RetrievalConfig::default(),
        );

        let matches = retriever.retrieve("chocolate cake delivery").await.unwrap();
        assert!(!matches.is_empty());

        let product_match = matches
            .iter()
            .find(|m| m.source == MatchSource::Product)
            .expect("product should match");
        assert_eq!(product_match.metadata.title.as_deref(), Some("Chocolate Cake"));
        assert_eq!(product_match.metadata.price, Some(2400.0));
        assert_eq!(product_match.metadata.discount, Some(10.0));

        let knowledge_match = matches
            .iter()
            .find(|m| m.source == MatchSource::Knowledge)
            .expect("knowledge should match");
        assert!(knowledge_match.content.contains("Delivery"));
        assert!(knowledge_match.similarity >= 0.0 && knowledge_match.similarity <= 1.0);
    }

    #[tokio::test]
    async fn retrieve_respects_match_count() {
        let store = seeded_store().await;
        let config = RetrievalConfig {
            match_count: 1,
            ..RetrievalConfig::default()
        };
        let retriever = KnowledgeRetriever::new(
            store,
            Arc::new(FixedEmbedder { vector: vec![1.0, 0.0] }),
            config,
        );
        let matches = retriever.retrieve("chocolate delivery hours").await.unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn retrieve_survives_embedding_failure() {
        let store = seeded_store().await;
        let retriever = KnowledgeRetriever::new(
            store,
            Arc::new(FailingEmbedder),
            RetrievalConfig::default(),
        );

        let matches = retriever.retrieve("delivery").await.unwrap();
        assert!(!matches.is_empty(), "text channel alone should still match");
        assert!(matches.iter().all(|m| m.similarity == 0.0));
    }

    #[tokio::test]
    async fn retrieve_excludes_dissimilar_entries_without_keyword_hits() {
        let store = seeded_store().await;
        let retriever = KnowledgeRetriever::new(
            store,
            Arc::new(FixedEmbedder { vector: vec![1.0, 0.0] }),
            RetrievalConfig::default(),
        );

        // "k-hours" shares no token with the query and its embedding is
        // orthogonal to it: neither channel may admit it.
        let matches = retriever.retrieve("delivery").await.unwrap();
        assert!(!matches.is_empty());
        assert!(
            matches.iter().all(|m| m.id != "k-hours"),
            "zero-similarity entry leaked through: {matches:?}"
        );
    }

    #[tokio::test]
    async fn retrieve_keeps_keyword_hits_below_the_similarity_threshold() {
        let store = seeded_store().await;
        // Query embedding is orthogonal to every stored vector, so the
        // semantic channel contributes nothing; BM25 still matches.
        let retriever = KnowledgeRetriever::new(
            store,
            Arc::new(FixedEmbedder { vector: vec![0.0, 0.0] }),
            RetrievalConfig::default(),
        );
        let matches = retriever.retrieve("bakery open").await.unwrap();
        assert!(matches.iter().any(|m| m.id == "k-hours"));
    }
}
