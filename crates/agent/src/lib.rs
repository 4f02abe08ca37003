//! The agentic loop: the heart of agentmesh.
//!
//! The loop follows a **Reason → Act → Observe** cycle:
//!
//! 1. **Prompt** the reasoning backend with the tool list, the context
//!    gathered so far and the user's question
//! 2. **Classify** the reply: a JSON tool invocation or a final answer
//! 3. **If a tool call**: execute it, append the result to the context,
//!    loop back to step 1
//! 4. **If text**: return it as the answer
//!
//! The loop continues until the backend answers in plain text or the
//! iteration cap is reached, in which case one synthesis call turns the
//! gathered context into an answer.

pub mod context;
pub mod loop_runner;
pub mod parser;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{ContextEntry, ContextSource, ContextWindow};
pub use loop_runner::{AgentOutcome, AgentResponse, AgenticLoop, ToolCallRecord};
pub use parser::{ParsedToolCall, parse_tool_call};
