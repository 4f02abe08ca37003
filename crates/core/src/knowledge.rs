//! Retrieval interfaces: vector similarity search and graph lookup.
//!
//! Storage itself is an external concern; the agentic loop reaches these
//! stores only through the retrieval tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;

/// A retrieved document chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,

    /// Placeholder confidence in `[0, 1]`, higher is more relevant
    #[serde(default)]
    pub score: f32,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            score: 0.0,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A `(source) -[relation]-> (target)` edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphTriple {
    pub source: String,
    pub relation: String,
    pub target: String,
}

impl GraphTriple {
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relation: relation.into(),
            target: target.into(),
        }
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `top_k` documents, most relevant first.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Document>, KnowledgeError>;

    async fn count(&self) -> Result<usize, KnowledgeError>;
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    fn name(&self) -> &str;

    /// Edges touching `entity`, optionally restricted to one relation type.
    async fn query(
        &self,
        entity: &str,
        relation: Option<&str>,
    ) -> Result<Vec<GraphTriple>, KnowledgeError>;
}
