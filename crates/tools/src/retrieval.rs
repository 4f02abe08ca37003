//! Retrieval tools over the vector and graph stores.
//!
//! Store failures are reported inside the payload (`error` plus empty
//! results) rather than as tool failures, so the reasoning backend can see
//! what happened and try another strategy.

use agentmesh_core::error::ToolError;
use agentmesh_core::knowledge::{Document, GraphStore, GraphTriple, VectorStore};
use agentmesh_core::tool::{Tool, ToolCategory, ToolParameter};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Upper bound on documents a single search may return.
pub const MAX_RESULTS: usize = 10;

/// Score given to graph edges in hybrid results.
const GRAPH_EDGE_SCORE: f64 = 0.7;

fn query_arg<'a>(args: &'a Value, names: &[&str]) -> Result<&'a str, ToolError> {
    names
        .iter()
        .find_map(|n| args[*n].as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{}' argument", names[0])))
}

/// First present numeric argument among `names`, accepting numeric strings.
fn count_arg(args: &Value, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|n| match &args[*n] {
        Value::Number(num) => num.as_f64().map(|f| f.max(0.0) as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let head: String = content.chars().take(max_chars).collect();
    format!("{head}...(truncated)")
}

fn document_json(doc: &Document, chunk_size: usize) -> Value {
    serde_json::json!({
        "content": truncate_content(&doc.content, chunk_size),
        "score": doc.score,
        "metadata": doc.metadata,
    })
}

fn triple_json(triple: &GraphTriple) -> Value {
    serde_json::json!({
        "source": triple.source,
        "relation": triple.relation,
        "target": triple.target,
    })
}

// ── search_vector ──────────────────────────────────────────────────────────

pub struct SearchVectorTool {
    store: Arc<dyn VectorStore>,
    chunk_size: usize,
    default_top_k: usize,
}

impl SearchVectorTool {
    pub fn new(store: Arc<dyn VectorStore>, chunk_size: usize, default_top_k: usize) -> Self {
        Self {
            store,
            chunk_size,
            default_top_k,
        }
    }
}

#[async_trait]
impl Tool for SearchVectorTool {
    fn name(&self) -> &str {
        "search_vector"
    }

    fn description(&self) -> &str {
        "Search for relevant documents using semantic vector similarity."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Retrieval
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::new("query", "string", "The search query or question"),
            ToolParameter::new("num_results", "integer", "Number of results to return (1-10)")
                .optional()
                .with_default(Value::from(self.default_top_k)),
        ]
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let query = query_arg(&arguments, &["query"])?;
        let top_k = count_arg(&arguments, &["num_results", "top_k"])
            .unwrap_or(self.default_top_k)
            .clamp(1, MAX_RESULTS);

        match self.store.search(query, top_k).await {
            Ok(docs) => {
                debug!(store = %self.store.name(), hits = docs.len(), "search_vector");
                let documents: Vec<Value> = docs
                    .iter()
                    .map(|d| document_json(d, self.chunk_size))
                    .collect();
                Ok(serde_json::json!({
                    "documents": documents,
                    "count": documents.len(),
                }))
            }
            Err(e) => {
                warn!(store = %self.store.name(), error = %e, "Vector search failed");
                Ok(serde_json::json!({
                    "error": e.to_string(),
                    "documents": [],
                    "count": 0,
                }))
            }
        }
    }
}

// ── query_graph ────────────────────────────────────────────────────────────

pub struct QueryGraphTool {
    store: Arc<dyn GraphStore>,
}

impl QueryGraphTool {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for QueryGraphTool {
    fn name(&self) -> &str {
        "query_graph"
    }

    fn description(&self) -> &str {
        "Look up structured relationships of an entity in the knowledge graph."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Retrieval
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::new("entity", "string", "The entity to look up"),
            ToolParameter::new("relationship_type", "string", "Only return this relation")
                .optional(),
        ]
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let entity = query_arg(&arguments, &["entity", "query"])?;
        let relation = arguments["relationship_type"].as_str().filter(|r| !r.is_empty());

        match self.store.query(entity, relation).await {
            Ok(triples) => {
                let relationships: Vec<Value> = triples.iter().map(triple_json).collect();
                Ok(serde_json::json!({
                    "entity": entity,
                    "relationships": relationships,
                    "count": relationships.len(),
                }))
            }
            Err(e) => {
                warn!(store = %self.store.name(), error = %e, "Graph query failed");
                Ok(serde_json::json!({
                    "error": e.to_string(),
                    "entity": entity,
                    "relationships": [],
                    "count": 0,
                }))
            }
        }
    }
}

// ── hybrid_search ──────────────────────────────────────────────────────────

pub struct HybridSearchTool {
    vector: Arc<dyn VectorStore>,
    graph: Arc<dyn GraphStore>,
    chunk_size: usize,
}

impl HybridSearchTool {
    pub fn new(vector: Arc<dyn VectorStore>, graph: Arc<dyn GraphStore>, chunk_size: usize) -> Self {
        Self {
            vector,
            graph,
            chunk_size,
        }
    }

    /// Edges for the whole query and for each of its words, deduplicated.
    async fn graph_hits(&self, query: &str) -> Result<Vec<GraphTriple>, String> {
        let mut entities = vec![query.to_string()];
        entities.extend(
            query
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| w.len() > 2)
                .map(str::to_string),
        );

        let mut hits: Vec<GraphTriple> = Vec::new();
        let mut last_error = None;
        for entity in &entities {
            match self.graph.query(entity, None).await {
                Ok(triples) => {
                    for t in triples {
                        if !hits.contains(&t) {
                            hits.push(t);
                        }
                    }
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        match last_error {
            Some(e) if hits.is_empty() => Err(e),
            _ => Ok(hits),
        }
    }
}

#[async_trait]
impl Tool for HybridSearchTool {
    fn name(&self) -> &str {
        "hybrid_search"
    }

    fn description(&self) -> &str {
        "Perform both vector and graph search and combine the results by weighted score."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Retrieval
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::new("query", "string", "The search query"),
            ToolParameter::new("vector_weight", "number", "Weight of vector results (0-1)")
                .optional()
                .with_default(serde_json::json!(0.6)),
            ToolParameter::new("max_results", "integer", "Maximum combined results")
                .optional()
                .with_default(serde_json::json!(5)),
        ]
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let query = query_arg(&arguments, &["query"])?;
        let vector_weight = arguments["vector_weight"]
            .as_f64()
            .unwrap_or(0.6)
            .clamp(0.0, 1.0);
        let max_results = count_arg(&arguments, &["max_results"])
            .unwrap_or(5)
            .clamp(1, MAX_RESULTS);

        let mut errors = Vec::new();
        let mut combined: Vec<(f64, Value)> = Vec::new();

        match self.vector.search(query, max_results).await {
            Ok(docs) => {
                for doc in &docs {
                    let mut item = document_json(doc, self.chunk_size);
                    item["type"] = Value::from("document");
                    combined.push((doc.score as f64 * vector_weight, item));
                }
            }
            Err(e) => errors.push(format!("vector: {e}")),
        }

        match self.graph_hits(query).await {
            Ok(triples) => {
                for t in &triples {
                    let mut item = triple_json(t);
                    item["type"] = Value::from("relationship");
                    combined.push((GRAPH_EDGE_SCORE * (1.0 - vector_weight), item));
                }
            }
            Err(e) => errors.push(format!("graph: {e}")),
        }

        // Stable sort keeps vector results ahead on equal scores.
        combined.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        combined.truncate(max_results);

        let results: Vec<Value> = combined
            .into_iter()
            .map(|(score, mut item)| {
                item["weighted_score"] = Value::from((score * 1000.0).round() / 1000.0);
                item
            })
            .collect();

        let mut payload = serde_json::json!({
            "query": query,
            "strategy": "hybrid",
            "vector_weight": vector_weight,
            "results": results,
            "count": results.len(),
        });
        if !errors.is_empty() {
            payload["errors"] = serde_json::json!(errors);
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmesh_core::error::KnowledgeError;
    use agentmesh_knowledge::{InMemoryGraphStore, InMemoryVectorStore};

    struct BrokenStore;

    #[async_trait]
    impl VectorStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn search(&self, _q: &str, _k: usize) -> Result<Vec<Document>, KnowledgeError> {
            Err(KnowledgeError::Storage("index offline".into()))
        }

        async fn count(&self) -> Result<usize, KnowledgeError> {
            Ok(0)
        }
    }

    async fn vector_store() -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .add_many((0..15).map(|i| Document::new(format!("rust fact number {i}"))))
            .await;
        store
    }

    async fn graph_store() -> Arc<InMemoryGraphStore> {
        let store = Arc::new(InMemoryGraphStore::new());
        store.add(GraphTriple::new("Rust", "INFLUENCED_BY", "OCaml")).await;
        store.add(GraphTriple::new("Tokio", "WRITTEN_IN", "Rust")).await;
        store
    }

    #[tokio::test]
    async fn search_vector_caps_results_at_ten() {
        let tool = SearchVectorTool::new(vector_store().await, 1000, 5);
        let out = tool
            .execute(serde_json::json!({"query": "rust", "num_results": 50}))
            .await
            .unwrap();
        assert_eq!(out["count"], 10);
    }

    #[tokio::test]
    async fn search_vector_accepts_top_k_alias() {
        let tool = SearchVectorTool::new(vector_store().await, 1000, 5);
        let out = tool
            .execute(serde_json::json!({"query": "rust", "top_k": 2}))
            .await
            .unwrap();
        assert_eq!(out["count"], 2);

        let default = tool.execute(serde_json::json!({"query": "rust"})).await.unwrap();
        assert_eq!(default["count"], 5);
    }

    #[tokio::test]
    async fn search_vector_truncates_long_content() {
        let store = Arc::new(InMemoryVectorStore::new());
        store.add(Document::new(format!("rust {}", "x".repeat(200)))).await;
        let tool = SearchVectorTool::new(store, 20, 5);

        let out = tool.execute(serde_json::json!({"query": "rust"})).await.unwrap();
        let content = out["documents"][0]["content"].as_str().unwrap();
        assert!(content.ends_with("...(truncated)"));
        assert_eq!(content.chars().count(), 20 + "...(truncated)".len());
        assert_eq!(truncate_content("abc", 3), "abc");
    }

    #[tokio::test]
    async fn search_vector_store_error_is_payload() {
        let tool = SearchVectorTool::new(Arc::new(BrokenStore), 1000, 5);
        let out = tool.execute(serde_json::json!({"query": "rust"})).await.unwrap();
        assert_eq!(out["count"], 0);
        assert_eq!(out["documents"], serde_json::json!([]));
        assert!(out["error"].as_str().unwrap().contains("index offline"));
    }

    #[tokio::test]
    async fn search_vector_requires_query() {
        let tool = SearchVectorTool::new(Arc::new(BrokenStore), 1000, 5);
        assert!(matches!(
            tool.execute(serde_json::json!({"query": "  "})).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn query_graph_filters_relation() {
        let tool = QueryGraphTool::new(graph_store().await);
        let all = tool.execute(serde_json::json!({"entity": "rust"})).await.unwrap();
        assert_eq!(all["count"], 2);

        let filtered = tool
            .execute(serde_json::json!({"entity": "Rust", "relationship_type": "WRITTEN_IN"}))
            .await
            .unwrap();
        assert_eq!(filtered["count"], 1);
        assert_eq!(filtered["relationships"][0]["source"], "Tokio");
    }

    #[tokio::test]
    async fn hybrid_combines_and_weights() {
        let tool = HybridSearchTool::new(vector_store().await, graph_store().await, 1000);
        let out = tool
            .execute(serde_json::json!({"query": "rust", "max_results": 4}))
            .await
            .unwrap();

        assert_eq!(out["strategy"], "hybrid");
        assert_eq!(out["count"], 4);
        let results = out["results"].as_array().unwrap();
        // Vector hits score 1.0 * 0.6, graph edges 0.7 * 0.4
        assert_eq!(results[0]["type"], "document");
        assert_eq!(results[0]["weighted_score"], 0.6);

        let graph_first = tool
            .execute(serde_json::json!({"query": "rust", "vector_weight": 0.1, "max_results": 2}))
            .await
            .unwrap();
        assert_eq!(graph_first["results"][0]["type"], "relationship");
        assert_eq!(graph_first["results"][1]["type"], "relationship");
    }

    #[tokio::test]
    async fn hybrid_reports_partial_failure() {
        let tool = HybridSearchTool::new(Arc::new(BrokenStore), graph_store().await, 1000);
        let out = tool.execute(serde_json::json!({"query": "Tokio"})).await.unwrap();
        assert_eq!(out["count"], 1);
        assert!(out["errors"][0].as_str().unwrap().starts_with("vector:"));
    }
}
