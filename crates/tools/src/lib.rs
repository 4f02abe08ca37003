//! Built-in tools for the agentic loop, plus the peer exchange client.
//!
//! [`default_registry`] assembles the registry the loop and the gateway
//! share. Retrieval tools are only registered when a store is supplied, and
//! the peer tool only when a peer directory is supplied.

pub mod analysis;
pub mod calculator;
pub mod clock;
pub mod delegate;
pub mod peer;
pub mod retrieval;

pub use peer::PeerClient;

use agentmesh_config::{AppConfig, PeersConfig};
use agentmesh_core::knowledge::{GraphStore, VectorStore};
use agentmesh_knowledge::{InMemoryGraphStore, InMemoryVectorStore};
use agentmesh_core::tool::ToolRegistry;
use std::sync::Arc;

/// What the built-in tools may reach.
#[derive(Clone)]
pub struct ToolContext {
    pub vector: Option<Arc<dyn VectorStore>>,
    pub graph: Option<Arc<dyn GraphStore>>,
    pub peers: Option<PeersConfig>,
    /// Retrieved content longer than this is truncated
    pub chunk_size: usize,
    /// Default `num_results` for vector search
    pub top_k: usize,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            vector: None,
            graph: None,
            peers: None,
            chunk_size: 1000,
            top_k: 5,
        }
    }
}

impl ToolContext {
    /// In-memory knowledge stores when `[knowledge]` is enabled, plus the
    /// configured peer directory.
    pub fn from_config(config: &AppConfig) -> Self {
        let (vector, graph) = if config.knowledge.enabled {
            (
                Some(Arc::new(InMemoryVectorStore::new()) as Arc<dyn VectorStore>),
                Some(Arc::new(InMemoryGraphStore::new()) as Arc<dyn GraphStore>),
            )
        } else {
            (None, None)
        };

        Self {
            vector,
            graph,
            peers: Some(config.peers.clone()),
            chunk_size: config.knowledge.chunk_size,
            top_k: config.knowledge.top_k,
        }
    }
}

/// Create a tool registry with every built-in tool the context allows.
pub fn default_registry(ctx: ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Box::new(calculator::CalculatorTool));
    registry.register(Box::new(clock::clock_tool()));
    for tool in analysis::analysis_tools() {
        registry.register(Box::new(tool));
    }

    if let Some(vector) = &ctx.vector {
        registry.register(Box::new(retrieval::SearchVectorTool::new(
            vector.clone(),
            ctx.chunk_size,
            ctx.top_k,
        )));
    }
    if let Some(graph) = &ctx.graph {
        registry.register(Box::new(retrieval::QueryGraphTool::new(graph.clone())));
    }
    if let (Some(vector), Some(graph)) = (&ctx.vector, &ctx.graph) {
        registry.register(Box::new(retrieval::HybridSearchTool::new(
            vector.clone(),
            graph.clone(),
            ctx.chunk_size,
        )));
    }

    if let Some(peers) = ctx.peers {
        registry.register(Box::new(delegate::AskPeerTool::new(peers)));
    }

    registry
}
