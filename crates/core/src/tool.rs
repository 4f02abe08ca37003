//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what the agentic loop may invoke between reasoning steps:
//! arithmetic, retrieval, query analysis, delegation to a peer agent.
//! Every tool is described by an ordered parameter list from which the
//! JSON schema shown to the reasoning backend is derived.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::ToolError;

/// Broad grouping of tools, used for filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Retrieval,
    Computation,
    #[default]
    Utility,
    External,
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,

    /// JSON type name: "string", "integer", "number", "boolean", "object", "array"
    #[serde(rename = "type")]
    pub param_type: String,

    pub description: String,

    #[serde(default = "default_required")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

fn default_required() -> bool {
    true
}

impl ToolParameter {
    /// A required parameter.
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            enum_values: None,
            default: None,
        }
    }

    /// Mark the parameter optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Build the `{type: object, properties, required}` schema for a parameter list.
pub fn parameters_to_schema(parameters: &[ToolParameter]) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for p in parameters {
        let mut prop = serde_json::Map::new();
        prop.insert("type".into(), serde_json::Value::String(p.param_type.clone()));
        prop.insert(
            "description".into(),
            serde_json::Value::String(p.description.clone()),
        );
        if let Some(values) = &p.enum_values {
            prop.insert("enum".into(), serde_json::json!(values));
        }
        if let Some(default) = &p.default {
            prop.insert("default".into(), default.clone());
        }
        properties.insert(p.name.clone(), serde_json::Value::Object(prop));
        if p.required {
            required.push(serde_json::Value::String(p.name.clone()));
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Uniform outcome of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub execution_time_ms: u64,
}

impl ToolResult {
    pub fn ok(data: serde_json::Value, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            execution_time_ms,
        }
    }

    pub fn failure(error: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            execution_time_ms,
        }
    }

    /// Text fed back into the reasoning context: the payload on success,
    /// the error description on failure.
    pub fn render(&self) -> String {
        if self.success {
            match &self.data {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
                None => "null".into(),
            }
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"))
        }
    }
}

/// Name, description and schema of a tool, as shown to the reasoning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub parameters: serde_json::Value,
}

/// The core Tool trait.
///
/// Tools are registered in the [`ToolRegistry`] and made available to the
/// agentic loop. A tool returns its payload as JSON or a [`ToolError`]; the
/// registry turns either into a [`ToolResult`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculate", "search_vector").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the backend).
    fn description(&self) -> &str;

    fn category(&self) -> ToolCategory {
        ToolCategory::Utility
    }

    /// Ordered parameter declarations.
    fn parameters(&self) -> Vec<ToolParameter>;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value {
        parameters_to_schema(&self.parameters())
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            category: self.category(),
            parameters: self.parameters_schema(),
        }
    }
}

type SyncBody = Box<dyn Fn(serde_json::Value) -> Result<serde_json::Value, ToolError> + Send + Sync>;
type AsyncBody = Box<
    dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value, ToolError>>
        + Send
        + Sync,
>;

enum FnBody {
    Sync(SyncBody),
    Async(AsyncBody),
}

/// A tool built from a closure, synchronous or asynchronous.
pub struct FnTool {
    name: String,
    description: String,
    category: ToolCategory,
    parameters: Vec<ToolParameter>,
    body: FnBody,
}

impl FnTool {
    /// Wrap a synchronous closure.
    pub fn sync<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
        parameters: Vec<ToolParameter>,
        body: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> Result<serde_json::Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            parameters,
            body: FnBody::Sync(Box::new(body)),
        }
    }

    /// Wrap a closure returning a future.
    pub fn from_async<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
        parameters: Vec<ToolParameter>,
        body: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<serde_json::Value, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            parameters,
            body: FnBody::Async(Box::new(move |args| body(args).boxed())),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> ToolCategory {
        self.category
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        self.parameters.clone()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        match &self.body {
            FnBody::Sync(f) => f(arguments),
            FnBody::Async(f) => f(arguments).await,
        }
    }
}

/// A registry of available tools.
///
/// Built once at startup and then shared read-only (`Arc<ToolRegistry>`).
/// Registration order is preserved for listings and prompts.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name and
    /// returns the replaced one; a replaced tool keeps its listing slot.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Option<Box<dyn Tool>> {
        let name = tool.name().to_string();
        let replaced = self.tools.insert(name.clone(), tool);
        if replaced.is_some() {
            warn!(tool = %name, "Tool re-registered, previous definition replaced");
        } else {
            self.order.push(name);
        }
        replaced
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tools in registration order, optionally filtered by category.
    pub fn list(&self, category: Option<ToolCategory>) -> Vec<&dyn Tool> {
        self.order
            .iter()
            .filter_map(|name| self.get(name))
            .filter(|t| category.is_none_or(|c| t.category() == c))
            .collect()
    }

    /// Descriptors of all tools, in registration order.
    pub fn describe_all(&self) -> Vec<ToolDescriptor> {
        self.list(None).into_iter().map(|t| t.descriptor()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Execute a tool by name.
    ///
    /// Never fails: a missing tool, an error from the tool body and a panic
    /// inside it all come back as a `success: false` result.
    pub async fn execute(&self, name: &str, arguments: serde_json::Value) -> ToolResult {
        let start = Instant::now();

        let Some(tool) = self.tools.get(name) else {
            return ToolResult::failure(
                ToolError::NotFound(name.to_string()).to_string(),
                elapsed_ms(start),
            );
        };

        let outcome = AssertUnwindSafe(tool.execute(arguments))
            .catch_unwind()
            .await;
        let duration_ms = elapsed_ms(start);

        match outcome {
            Ok(Ok(data)) => {
                debug!(tool = %name, duration_ms, "Tool executed");
                ToolResult::ok(data, duration_ms)
            }
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool returned an error");
                ToolResult::failure(e.to_string(), duration_ms)
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!(tool = %name, reason = %reason, "Tool panicked");
                ToolResult::failure(format!("Tool '{name}' panicked: {reason}"), duration_ms)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
