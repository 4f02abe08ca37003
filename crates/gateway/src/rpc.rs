//! JSON-RPC dispatcher for the task protocol.
//!
//! Every request produces exactly one response object; failures are
//! reported through the JSON-RPC `error` member, never as transport errors.

use agentmesh_config::TasksConfig;
use agentmesh_core::error::RpcError;
use agentmesh_core::rpc::{
    JSONRPC_VERSION, JsonRpcResponse, MessageSendParams, RpcId, TaskIdParams, TaskListParams,
    TaskListResult, methods,
};
use agentmesh_core::task::{Task, TaskState};
use agentmesh_tasks::{TaskProcessor, TaskStore, TransitionOutcome};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Dispatcher {
    store: Arc<TaskStore>,
    processor: TaskProcessor,
    default_list_limit: usize,
    max_list_limit: usize,
}

impl Dispatcher {
    pub fn new(processor: TaskProcessor, tasks: &TasksConfig) -> Self {
        Self {
            store: processor.store().clone(),
            processor,
            default_list_limit: tasks.default_list_limit,
            max_list_limit: tasks.max_list_limit,
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Handle a raw request body.
    pub async fn handle_bytes(&self, body: &[u8]) -> JsonRpcResponse {
        match serde_json::from_slice::<Value>(body) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                debug!(error = %e, "Unparseable JSON-RPC body");
                failure(RpcId::Null, RpcError::Parse(e.to_string()))
            }
        }
    }

    /// Handle a parsed request envelope.
    pub async fn handle(&self, request: Value) -> JsonRpcResponse {
        let Value::Object(envelope) = request else {
            return failure(RpcId::Null, RpcError::Parse("request must be a JSON object".into()));
        };
        let id = RpcId::from_value(envelope.get("id"));

        let Some(method) = envelope.get("method").and_then(Value::as_str) else {
            return failure(id, RpcError::Parse("missing or non-string 'method'".into()));
        };

        if let Some(version) = envelope.get("jsonrpc")
            && version.as_str() != Some(JSONRPC_VERSION)
        {
            return failure(
                id,
                RpcError::InvalidRequest(format!("unsupported jsonrpc version {version}")),
            );
        }

        let params = match envelope.get("params") {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(params) => params.clone(),
        };

        info!(method, "JSON-RPC request");
        let result = match method {
            methods::MESSAGE_SEND => self.message_send(params).await,
            methods::TASKS_GET => self.tasks_get(params).await,
            methods::TASKS_LIST => self.tasks_list(params).await,
            methods::TASKS_CANCEL => self.tasks_cancel(params).await,
            other => Err(RpcError::MethodNotFound(other.to_string())),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                warn!(method, code = e.code(), error = %e, "JSON-RPC request failed");
                failure(id, e)
            }
        }
    }

    async fn message_send(&self, params: Value) -> Result<Value, RpcError> {
        let params: MessageSendParams = parse_params(params)?;
        let mut message = params
            .message
            .ok_or_else(|| RpcError::InvalidParams("'message' is required".into()))?;
        let query = message
            .text()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| RpcError::InvalidParams("message has no text parts".into()))?;

        let context_id = params.context_id.or_else(|| message.context_id.clone());
        let task = self.store.create(context_id).await;

        if message.message_id.is_empty() {
            message.message_id = uuid::Uuid::new_v4().to_string();
        }
        message.task_id = Some(task.id.clone());
        message.context_id = Some(task.context_id.clone());
        self.store.append_message(&task.id, message).await;
        self.store.transition(&task.id, TaskState::Working, None).await;

        let accepted = self.snapshot(&task.id).await?;
        self.processor.spawn(task.id.clone(), query);
        info!(task_id = %task.id, context_id = %task.context_id, "Task accepted");

        to_value(&accepted)
    }

    async fn tasks_get(&self, params: Value) -> Result<Value, RpcError> {
        let params: TaskIdParams = parse_params(params)?;
        let task = self.snapshot(&params.task_id).await?;
        to_value(&task)
    }

    async fn tasks_list(&self, params: Value) -> Result<Value, RpcError> {
        let params: TaskListParams = parse_params(params)?;
        let limit = params
            .limit
            .unwrap_or(self.default_list_limit)
            .min(self.max_list_limit);
        let tasks = self.store.list(limit).await;
        to_value(&TaskListResult { tasks })
    }

    async fn tasks_cancel(&self, params: Value) -> Result<Value, RpcError> {
        let params: TaskIdParams = parse_params(params)?;
        match self
            .store
            .transition(&params.task_id, TaskState::Cancelled, None)
            .await
        {
            TransitionOutcome::Applied { .. } => {
                info!(task_id = %params.task_id, "Task cancelled");
                to_value(&self.snapshot(&params.task_id).await?)
            }
            TransitionOutcome::UnknownTask => Err(RpcError::TaskNotFound(params.task_id)),
            TransitionOutcome::Rejected { current } => Err(RpcError::TaskNotCancelable {
                task_id: params.task_id,
                state: current.to_string(),
            }),
        }
    }

    async fn snapshot(&self, task_id: &str) -> Result<Task, RpcError> {
        self.store
            .get(task_id)
            .await
            .ok_or_else(|| RpcError::TaskNotFound(task_id.to_string()))
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}

fn failure(id: RpcId, error: RpcError) -> JsonRpcResponse {
    JsonRpcResponse::error(id, error.to_rpc_error())
}
