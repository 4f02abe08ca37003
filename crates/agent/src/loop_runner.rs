//! The agentic loop implementation.

use crate::context::ContextWindow;
use crate::parser::parse_tool_call;
use agentmesh_config::AgentLoopConfig;
use agentmesh_core::backend::ReasoningBackend;
use agentmesh_core::error::BackendError;
use agentmesh_core::event::{DomainEvent, EventBus};
use agentmesh_core::tool::{Tool, ToolRegistry};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: u32 = 8;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_SYNTHESIS_CONTEXT_CHARS: usize = 8000;

const NO_CONTEXT: &str = "No additional context available.";

const INSTRUCTIONS: &str = "\
You are an autonomous assistant that answers questions, using tools when they help.

Available tools:
{tools}

Rules:
- To call a tool, reply with ONLY a JSON object and nothing else:
  {\"tool\": \"<tool_name>\", \"arguments\": {...}}
- Call one tool at a time. Its result will be added to the context below.
- When you can answer, reply in plain text without any JSON.

Current Context:
{context}

User Question: {query}

Your Response:";

/// One executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub success: bool,
    /// The payload on success, the error text on failure
    pub result: Value,
    pub execution_time_ms: u64,
}

/// How a loop run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentOutcome {
    /// The backend replied with a plain-text answer
    Answered,
    /// The iteration cap was hit and the answer was synthesized from context
    Synthesized,
    /// The backend failed; `answer` holds a readable error
    BackendFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    pub answer: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub reasoning_trace: String,
    pub iterations: u32,
    pub outcome: AgentOutcome,
}

impl AgentResponse {
    /// True when the iteration cap cut the reasoning short.
    pub fn is_incomplete(&self) -> bool {
        self.outcome == AgentOutcome::Synthesized
    }
}

/// Orchestrates backend calls and tool execution for a single question.
pub struct AgenticLoop {
    backend: Arc<dyn ReasoningBackend>,
    tools: Arc<ToolRegistry>,
    event_bus: Option<Arc<EventBus>>,
    temperature: f32,
    max_iterations: u32,
    synthesis_context_chars: usize,
}

impl AgenticLoop {
    pub fn new(backend: Arc<dyn ReasoningBackend>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            backend,
            tools,
            event_bus: None,
            temperature: DEFAULT_TEMPERATURE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            synthesis_context_chars: DEFAULT_SYNTHESIS_CONTEXT_CHARS,
        }
    }

    /// Apply the `[agent_loop]` config section.
    pub fn from_config(
        backend: Arc<dyn ReasoningBackend>,
        tools: Arc<ToolRegistry>,
        config: &AgentLoopConfig,
        temperature: f32,
    ) -> Self {
        Self::new(backend, tools)
            .with_max_iterations(config.max_iterations)
            .with_synthesis_context_chars(config.synthesis_context_chars)
            .with_temperature(temperature)
    }

    /// Set the iteration cap. Values below 1 are raised to 1.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_synthesis_context_chars(mut self, chars: usize) -> Self {
        self.synthesis_context_chars = chars;
        self
    }

    /// Publish backend and tool events on this bus.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer a question starting from an empty context.
    pub async fn run(&self, query: &str) -> AgentResponse {
        self.run_with_context(query, ContextWindow::new()).await
    }

    /// Answer a question, starting from the given context.
    pub async fn run_with_context(&self, query: &str, mut context: ContextWindow) -> AgentResponse {
        info!(
            backend = %self.backend.name(),
            max_iterations = self.max_iterations,
            "Agentic loop started"
        );

        let mut tool_calls: Vec<ToolCallRecord> = Vec::new();

        for iteration in 1..=self.max_iterations {
            let prompt = self.build_prompt(query, &context);
            let reply = match self.generate(&prompt).await {
                Ok(reply) => reply,
                Err(e) => return backend_failure(e, tool_calls, iteration),
            };

            let call = match parse_tool_call(&reply) {
                Some(call) if self.tools.contains(&call.name) => call,
                Some(call) => {
                    warn!(tool = %call.name, "Backend asked for an unregistered tool; treating reply as the answer");
                    return answered(reply, tool_calls, iteration);
                }
                None => return answered(reply, tool_calls, iteration),
            };

            debug!(iteration, tool = %call.name, "Executing tool");
            let result = self
                .tools
                .execute(&call.name, Value::Object(call.arguments.clone()))
                .await;
            self.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success: result.success,
                duration_ms: result.execution_time_ms,
                timestamp: Utc::now(),
            });

            context.push_tool_result(&call.name, result.render());
            tool_calls.push(ToolCallRecord {
                result: if result.success {
                    result.data.unwrap_or(Value::Null)
                } else {
                    Value::from(result.error.unwrap_or_default())
                },
                name: call.name,
                arguments: call.arguments,
                success: result.success,
                execution_time_ms: result.execution_time_ms,
            });
        }

        warn!(
            max_iterations = self.max_iterations,
            tool_calls = tool_calls.len(),
            "Iteration cap reached, synthesizing from gathered context"
        );
        self.synthesize(query, &context, tool_calls).await
    }

    async fn synthesize(
        &self,
        query: &str,
        context: &ContextWindow,
        tool_calls: Vec<ToolCallRecord>,
    ) -> AgentResponse {
        let context = context.truncated(self.synthesis_context_chars).render();
        let prompt = format!(
            "Synthesize immediate answer from context below for question: {query}\n\nContext:\n{context}"
        );

        match self.generate(&prompt).await {
            Ok(answer) => {
                info!(tool_calls = tool_calls.len(), "Agentic loop finished (synthesized)");
                AgentResponse {
                    answer,
                    reasoning_trace: incomplete_trace(&tool_calls),
                    tool_calls,
                    iterations: self.max_iterations,
                    outcome: AgentOutcome::Synthesized,
                }
            }
            Err(e) => backend_failure(e, tool_calls, self.max_iterations),
        }
    }

    fn build_prompt(&self, query: &str, context: &ContextWindow) -> String {
        let tools = self
            .tools
            .list(None)
            .into_iter()
            .map(describe_tool)
            .collect::<Vec<_>>()
            .join("\n");
        let context = if context.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            context.render()
        };

        INSTRUCTIONS
            .replace("{tools}", &tools)
            .replace("{context}", &context)
            .replace("{query}", query)
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let start = Instant::now();
        let result = self.backend.generate(prompt, self.temperature).await;
        self.publish(DomainEvent::BackendCalled {
            backend: self.backend.name().to_string(),
            success: result.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        result
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

/// `- name(param, optional?): description`
fn describe_tool(tool: &dyn Tool) -> String {
    let params = tool
        .parameters()
        .iter()
        .map(|p| {
            if p.required {
                p.name.clone()
            } else {
                format!("{}?", p.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("- {}({}): {}", tool.name(), params, tool.description())
}

fn answered(answer: String, tool_calls: Vec<ToolCallRecord>, iterations: u32) -> AgentResponse {
    info!(iterations, tool_calls = tool_calls.len(), "Agentic loop finished");
    AgentResponse {
        answer,
        reasoning_trace: answered_trace(&tool_calls),
        tool_calls,
        iterations,
        outcome: AgentOutcome::Answered,
    }
}

fn backend_failure(error: BackendError, tool_calls: Vec<ToolCallRecord>, iterations: u32) -> AgentResponse {
    warn!(error = %error, iterations, "Reasoning backend failed");
    AgentResponse {
        answer: format!("Error generating response: {error}"),
        reasoning_trace: answered_trace(&tool_calls),
        tool_calls,
        iterations,
        outcome: AgentOutcome::BackendFailed {
            error: error.to_string(),
        },
    }
}

/// `Reasoning: → calculate(expression=2+2) → get_current_time()`
fn answered_trace(calls: &[ToolCallRecord]) -> String {
    if calls.is_empty() {
        return String::new();
    }
    let steps = calls
        .iter()
        .map(|c| format!("→ {}({})", c.name, render_arguments(&c.arguments)))
        .collect::<Vec<_>>()
        .join(" ");
    format!("Reasoning: {steps}")
}

/// `Reasoning (incomplete): → calculate → get_current_time`
fn incomplete_trace(calls: &[ToolCallRecord]) -> String {
    let steps = calls
        .iter()
        .map(|c| format!("→ {}", c.name))
        .collect::<Vec<_>>()
        .join(" ");
    format!("Reasoning (incomplete): {steps}")
}

fn render_arguments(arguments: &Map<String, Value>) -> String {
    arguments
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{k}={s}"),
            other => format!("{k}={other}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
