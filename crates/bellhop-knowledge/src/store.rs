// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed knowledge store with embedding BLOBs and FTS5 for BM25.
//!
//! Two corpora share one access pattern: free-form knowledge entries and
//! the product catalog. Each has an external-content FTS5 table kept in
//! sync by triggers (see the V3 migration in `bellhop-storage`).

use bellhop_core::BellhopError;
use bellhop_storage::{map_tr_err, Database};
use rusqlite::{params, OptionalExtension};

use crate::types::{blob_to_vec, vec_to_blob, KnowledgeEntry, Product};

/// Persistent store for the knowledge base.
#[derive(Clone)]
pub struct KnowledgeStore {
    db: Database,
}

impl KnowledgeStore {
    /// Wrap an already-opened database. The V3 migration must be applied,
    /// which `Database::open` guarantees.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace a knowledge entry. An empty embedding is stored as
    /// NULL so the semantic scan skips the row.
    pub async fn upsert_knowledge(&self, entry: &KnowledgeEntry) -> Result<(), BellhopError> {
        let entry = entry.clone();
        let blob = embedding_blob(&entry.embedding);
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO knowledge_entries (id, content, embedding, created_at) \
                     VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT(id) DO UPDATE SET \
                     content = excluded.content, embedding = excluded.embedding",
                    params![entry.id, entry.content, blob, entry.created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Insert or replace a product.
    pub async fn upsert_product(&self, product: &Product) -> Result<(), BellhopError> {
        let product = product.clone();
        let blob = embedding_blob(&product.embedding);
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO products \
                     (id, title, description, price, discount, embedding, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                     ON CONFLICT(id) DO UPDATE SET \
                     title = excluded.title, description = excluded.description, \
                     price = excluded.price, discount = excluded.discount, \
                     embedding = excluded.embedding",
                    params![
                        product.id,
                        product.title,
                        product.description,
                        product.price,
                        product.discount,
                        blob,
                        product.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// BM25 keyword search over knowledge entries.
    ///
    /// Returns (id, bm25_score) pairs, most relevant first. BM25 scores are
    /// negative; more negative is more relevant.
    pub async fn search_knowledge_bm25(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(String, f64)>, BellhopError> {
        let Some(match_expr) = sanitize_match_query(query) else {
            return Ok(vec![]);
        };
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT k.id, bm25(knowledge_fts) AS score FROM knowledge_fts \
                     JOIN knowledge_entries k ON k.rowid = knowledge_fts.rowid \
                     WHERE knowledge_fts MATCH ?1 \
                     ORDER BY bm25(knowledge_fts) LIMIT ?2",
                )?;
                let results = stmt
                    .query_map(params![match_expr, limit as i64], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(results)
            })
            .await
            .map_err(map_tr_err)
    }

    /// BM25 keyword search over the product catalog (title + description).
    pub async fn search_products_bm25(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(String, f64)>, BellhopError> {
        let Some(match_expr) = sanitize_match_query(query) else {
            return Ok(vec![]);
        };
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT p.id, bm25(products_fts) AS score FROM products_fts \
                     JOIN products p ON p.rowid = products_fts.rowid \
                     WHERE products_fts MATCH ?1 \
                     ORDER BY bm25(products_fts) LIMIT ?2",
                )?;
                let results = stmt
                    .query_map(params![match_expr, limit as i64], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(results)
            })
            .await
            .map_err(map_tr_err)
    }

    /// All knowledge embeddings as (id, vector) pairs for the semantic scan.
    /// Rows without an embedding are skipped.
    pub async fn knowledge_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>, BellhopError> {
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, embedding FROM knowledge_entries WHERE embedding IS NOT NULL",
                )?;
                let results = stmt
                    .query_map([], |row| {
                        let id: String = row.get(0)?;
                        let blob: Vec<u8> = row.get(1)?;
                        Ok((id, blob_to_vec(&blob)))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(results)
            })
            .await
            .map_err(map_tr_err)
    }

    /// All product embeddings as (id, vector) pairs.
    pub async fn product_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>, BellhopError> {
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT id, embedding FROM products WHERE embedding IS NOT NULL")?;
                let results = stmt
                    .query_map([], |row| {
                        let id: String = row.get(0)?;
                        let blob: Vec<u8> = row.get(1)?;
                        Ok((id, blob_to_vec(&blob)))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(results)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Fetch knowledge entries by id. Order follows the input ids.
    pub async fn knowledge_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<KnowledgeEntry>, BellhopError> {
        let ids = ids.to_vec();
        self.db
            .connection()
            .call(move |conn| {
                let mut entries = Vec::with_capacity(ids.len());
                let mut stmt = conn.prepare(
                    "SELECT id, content, embedding, created_at \
                     FROM knowledge_entries WHERE id = ?1",
                )?;
                for id in &ids {
                    let mut rows = stmt.query_map(params![id], |row| {
                        let blob: Option<Vec<u8>> = row.get(2)?;
                        Ok(KnowledgeEntry {
                            id: row.get(0)?,
                            content: row.get(1)?,
                            embedding: blob.map(|b| blob_to_vec(&b)).unwrap_or_default(),
                            created_at: row.get(3)?,
                        })
                    })?;
                    if let Some(entry) = rows.next() {
                        entries.push(entry?);
                    }
                }
                Ok(entries)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Fetch products by id. Order follows the input ids.
    pub async fn products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, BellhopError> {
        let ids = ids.to_vec();
        self.db
            .connection()
            .call(move |conn| {
                let mut products = Vec::with_capacity(ids.len());
                let mut stmt = conn.prepare(
                    "SELECT id, title, description, price, discount, embedding, created_at \
                     FROM products WHERE id = ?1",
                )?;
                for id in &ids {
                    let mut rows = stmt.query_map(params![id], |row| {
                        let blob: Option<Vec<u8>> = row.get(5)?;
                        Ok(Product {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            description: row.get(2)?,
                            price: row.get(3)?,
                            discount: row.get(4)?,
                            embedding: blob.map(|b| blob_to_vec(&b)).unwrap_or_default(),
                            created_at: row.get(6)?,
                        })
                    })?;
                    if let Some(product) = rows.next() {
                        products.push(product?);
                    }
                }
                Ok(products)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Resolve a product by name for order pricing.
    ///
    /// Tries an exact case-insensitive title match first, then falls back
    /// to the best BM25 hit so "choc cake" still finds "Chocolate Cake".
    pub async fn find_product_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Product>, BellhopError> {
        let exact = {
            let name = name.to_string();
            self.db
                .connection()
                .call(move |conn| {
                    let product = conn
                        .query_row(
                            "SELECT id, title, description, price, discount, embedding, created_at \
                             FROM products WHERE lower(title) = lower(?1)",
                            params![name],
                            |row| {
                                let blob: Option<Vec<u8>> = row.get(5)?;
                                Ok(Product {
                                    id: row.get(0)?,
                                    title: row.get(1)?,
                                    description: row.get(2)?,
                                    price: row.get(3)?,
                                    discount: row.get(4)?,
                                    embedding: blob.map(|b| blob_to_vec(&b)).unwrap_or_default(),
                                    created_at: row.get(6)?,
                                })
                            },
                        )
                        .optional()?;
                    Ok(product)
                })
                .await
                .map_err(map_tr_err)?
        };
        if exact.is_some() {
            return Ok(exact);
        }

        let ranked = self.search_products_bm25(name, 1).await?;
        match ranked.first() {
            Some((id, _)) => Ok(self.products_by_ids(&[id.clone()]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    /// Row counts for (knowledge_entries, products). Used by startup checks.
    pub async fn counts(&self) -> Result<(usize, usize), BellhopError> {
        self.db
            .connection()
            .call(|conn| {
                let knowledge: i64 =
                    conn.query_row("SELECT COUNT(*) FROM knowledge_entries", [], |r| r.get(0))?;
                let products: i64 =
                    conn.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))?;
                Ok((knowledge as usize, products as usize))
            })
            .await
            .map_err(map_tr_err)
    }
}

fn embedding_blob(embedding: &[f32]) -> Option<Vec<u8>> {
    if embedding.is_empty() {
        None
    } else {
        Some(vec_to_blob(embedding))
    }
}

/// Turn free text into a safe FTS5 MATCH expression.
///
/// Raw user text reaches this query; unbalanced quotes or operators would
/// be a syntax error inside MATCH. Each alphanumeric token is quoted and
/// the tokens are OR-joined so partial overlap still matches. Returns
/// `None` when no usable token remains.
pub fn sanitize_match_query(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn setup_store() -> KnowledgeStore {
        let db = Database::open_in_memory().await.unwrap();
        KnowledgeStore::new(db)
    }

    fn make_entry(id: &str, content: &str, embedding: Vec<f32>) -> KnowledgeEntry {
        KnowledgeEntry {
            id: id.to_string(),
            content: content.to_string(),
            embedding,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    fn make_product(id: &str, title: &str, description: &str) -> Product {
        Product {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            price: Some(1800.0),
            discount: None,
            embedding: vec![0.5, 0.5],
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn sanitize_quotes_and_joins_tokens() {
        assert_eq!(
            sanitize_match_query("delivery time?").as_deref(),
            Some("\"delivery\" OR \"time\"")
        );
        // Hostile input cannot break out of the quoting.
        assert_eq!(
            sanitize_match_query("\"cake\" NEAR(").as_deref(),
            Some("\"cake\" OR \"NEAR\"")
        );
        assert!(sanitize_match_query("?!* ()").is_none());
        assert!(sanitize_match_query("").is_none());
    }

    #[tokio::test]
    async fn bm25_finds_matching_entries() {
        let store = setup_store().await;
        store
            .upsert_knowledge(&make_entry("k1", "We deliver within Colombo in 2 hours", vec![]))
            .await
            .unwrap();
        store
            .upsert_knowledge(&make_entry("k2", "Our bakery opens at 8am daily", vec![]))
            .await
            .unwrap();

        let results = store.search_knowledge_bm25("delivery time", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "k1");
        assert!(results[0].1 < 0.0, "bm25 scores are negative");
    }

    #[tokio::test]
    async fn bm25_on_empty_query_returns_nothing() {
        let store = setup_store().await;
        store
            .upsert_knowledge(&make_entry("k1", "anything", vec![]))
            .await
            .unwrap();
        let results = store.search_knowledge_bm25("***", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_content_and_fts_row() {
        let store = setup_store().await;
        store
            .upsert_knowledge(&make_entry("k1", "old refund policy", vec![]))
            .await
            .unwrap();
        store
            .upsert_knowledge(&make_entry("k1", "new exchange policy", vec![]))
            .await
            .unwrap();

        let old = store.search_knowledge_bm25("refund", 10).await.unwrap();
        assert!(old.is_empty(), "stale FTS rows must not match");
        let new = store.search_knowledge_bm25("exchange", 10).await.unwrap();
        assert_eq!(new.len(), 1);

        let (knowledge, _) = store.counts().await.unwrap();
        assert_eq!(knowledge, 1);
    }

    #[tokio::test]
    async fn product_search_covers_title_and_description() {
        let store = setup_store().await;
        store
            .upsert_product(&make_product("p1", "Chocolate Cake", "rich dark layers"))
            .await
            .unwrap();
        store
            .upsert_product(&make_product("p2", "Fruit Tart", "seasonal fruit on custard"))
            .await
            .unwrap();

        let by_title = store.search_products_bm25("chocolate", 10).await.unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].0, "p1");

        let by_description = store.search_products_bm25("custard", 10).await.unwrap();
        assert_eq!(by_description.len(), 1);
        assert_eq!(by_description[0].0, "p2");
    }

    #[tokio::test]
    async fn embeddings_skip_rows_without_vectors() {
        let store = setup_store().await;
        store
            .upsert_knowledge(&make_entry("k1", "with vector", vec![0.1, 0.2]))
            .await
            .unwrap();
        store
            .upsert_knowledge(&make_entry("k2", "no vector yet", vec![]))
            .await
            .unwrap();

        let embeddings = store.knowledge_embeddings().await.unwrap();
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].0, "k1");
        assert_eq!(embeddings[0].1, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn fetch_by_ids_preserves_requested_order() {
        let store = setup_store().await;
        store
            .upsert_knowledge(&make_entry("k1", "first", vec![]))
            .await
            .unwrap();
        store
            .upsert_knowledge(&make_entry("k2", "second", vec![]))
            .await
            .unwrap();

        let entries = store
            .knowledge_by_ids(&["k2".to_string(), "k1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "k2");
        assert_eq!(entries[1].id, "k1");
    }

    #[tokio::test]
    async fn find_product_by_name_exact_then_fuzzy() {
        let store = setup_store().await;
        store
            .upsert_product(&make_product("p1", "Chocolate Cake", "rich dark layers"))
            .await
            .unwrap();

        let exact = store.find_product_by_name("chocolate cake").await.unwrap();
        assert_eq!(exact.unwrap().id, "p1");

        let fuzzy = store.find_product_by_name("chocolate").await.unwrap();
        assert_eq!(fuzzy.unwrap().id, "p1");

        let missing = store.find_product_by_name("submarine").await.unwrap();
        assert!(missing.is_none());
    }
}
