//! Task bookkeeping for agentmesh.
//!
//! [`TaskStore`] owns every task and enforces the state machine; the
//! [`TaskProcessor`] runs the agentic loop for a task in the background and
//! records the outcome.

pub mod store;
pub mod worker;

pub use store::{TaskStore, TransitionOutcome};
pub use worker::TaskProcessor;
