//! # agentmesh core
//!
//! Domain types, traits, and error definitions for the agentmesh task
//! orchestration engine. Every other crate in the workspace depends inward
//! on this one.
//!
//! ## Layout
//!
//! - [`task`] / [`message`]: the unit of work and the turns exchanged on it
//! - [`tool`]: the `Tool` trait and the `ToolRegistry` the agentic loop consults
//! - [`backend`]: the `ReasoningBackend` trait for text generation
//! - [`knowledge`]: vector and graph retrieval interfaces wrapped by tools
//! - [`rpc`] / [`card`]: the JSON-RPC wire contract and discovery document
//! - [`event`]: a broadcast bus for domain events

pub mod backend;
pub mod card;
pub mod error;
pub mod event;
pub mod knowledge;
pub mod message;
pub mod rpc;
pub mod task;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use backend::ReasoningBackend;
pub use card::AgentCard;
pub use event::{DomainEvent, EventBus};
pub use knowledge::{Document, GraphStore, GraphTriple, VectorStore};
pub use message::{Message, Part, Role};
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use task::{Artifact, Task, TaskState, TaskStatus};
pub use tool::{FnTool, Tool, ToolCategory, ToolDescriptor, ToolParameter, ToolRegistry, ToolResult};
