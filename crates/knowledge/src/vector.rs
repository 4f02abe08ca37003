//! Keyword-overlap vector store.

use agentmesh_core::error::KnowledgeError;
use agentmesh_core::knowledge::{Document, VectorStore};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::terms;

/// Stores documents in a Vec and ranks them by the fraction of query terms
/// they contain. The score is a placeholder confidence, not a distance.
pub struct InMemoryVectorStore {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn add(&self, document: Document) {
        self.documents.write().await.push(document);
    }

    pub async fn add_many(&self, documents: impl IntoIterator<Item = Document>) {
        self.documents.write().await.extend(documents);
    }

    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in_memory_vector"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Document>, KnowledgeError> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Err(KnowledgeError::QueryFailed(
                "query has no searchable terms".into(),
            ));
        }

        let documents = self.documents.read().await;
        let mut results: Vec<Document> = documents
            .iter()
            .filter_map(|doc| {
                let content = doc.content.to_lowercase();
                let matched = query_terms.iter().filter(|t| content.contains(t.as_str())).count();
                if matched == 0 {
                    return None;
                }
                let mut hit = doc.clone();
                hit.score = matched as f32 / query_terms.len() as f32;
                Some(hit)
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        debug!(query, hits = results.len(), "Vector search");
        Ok(results)
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.documents.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store
            .add_many([
                Document::new("Rust guarantees memory safety through ownership"),
                Document::new("Python is great for scripting"),
                Document::new("Ownership and borrowing are core Rust concepts")
                    .with_metadata("source", serde_json::json!("book")),
            ])
            .await;
        store
    }

    #[tokio::test]
    async fn ranks_by_term_overlap() {
        let store = seeded().await;
        let results = store.search("rust ownership borrowing", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.contains("borrowing"));
        assert!((results[0].score - 1.0).abs() < f32::EPSILON);
        assert!(results[1].score < results[0].score);
    }

    #[tokio::test]
    async fn respects_top_k() {
        let store = seeded().await;
        let results = store.search("rust ownership", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn no_match_is_empty() {
        let store = seeded().await;
        assert!(store.search("javascript browser", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_query_is_error() {
        let store = seeded().await;
        assert!(store.search("??", 5).await.is_err());
    }

    #[tokio::test]
    async fn count_and_clear() {
        let store = seeded().await;
        assert_eq!(store.count().await.unwrap(), 3);
        store.clear().await;
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
