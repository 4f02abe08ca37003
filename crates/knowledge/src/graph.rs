//! Edge-list graph store.

use agentmesh_core::error::KnowledgeError;
use agentmesh_core::knowledge::{GraphStore, GraphTriple};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct InMemoryGraphStore {
    triples: Arc<RwLock<Vec<GraphTriple>>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            triples: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn add(&self, triple: GraphTriple) {
        self.triples.write().await.push(triple);
    }

    pub async fn len(&self) -> usize {
        self.triples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.triples.read().await.is_empty()
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    fn name(&self) -> &str {
        "in_memory_graph"
    }

    /// Entity matching is case-insensitive on either end of the edge;
    /// relation matching is exact.
    async fn query(
        &self,
        entity: &str,
        relation: Option<&str>,
    ) -> Result<Vec<GraphTriple>, KnowledgeError> {
        let entity = entity.trim();
        if entity.is_empty() {
            return Err(KnowledgeError::QueryFailed("entity must not be empty".into()));
        }

        let triples = self.triples.read().await;
        Ok(triples
            .iter()
            .filter(|t| {
                t.source.eq_ignore_ascii_case(entity) || t.target.eq_ignore_ascii_case(entity)
            })
            .filter(|t| relation.is_none_or(|r| t.relation == r))
            .cloned()
            .collect())
    }
}
