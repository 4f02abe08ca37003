//! Peer exchange client: JSON-RPC over HTTP to another agentmesh instance.

use agentmesh_core::card::{AgentCard, WELL_KNOWN_PATH};
use agentmesh_core::error::PeerError;
use agentmesh_core::message::Message;
use agentmesh_core::rpc::{
    JsonRpcRequest, JsonRpcResponse, RpcId, TaskListResult, methods,
};
use agentmesh_core::task::{Task, TaskState};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_ENDPOINT_PATH: &str = "/a2a";

pub struct PeerClient {
    base_url: String,
    endpoint_path: String,
    client: reqwest::Client,
}

impl PeerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("agentmesh-peer-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.into(),
            client,
        }
    }

    /// Post JSON-RPC calls to a path other than `/a2a`.
    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the peer's discovery document.
    pub async fn agent_card(&self) -> Result<AgentCard, PeerError> {
        let url = format!("{}{}", self.base_url, WELL_KNOWN_PATH);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PeerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PeerError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PeerError::InvalidResponse(e.to_string()))
    }

    /// `message/send`: start a task on the peer.
    pub async fn send(&self, message: Message, context_id: Option<&str>) -> Result<Task, PeerError> {
        let mut params = serde_json::json!({ "message": message });
        if let Some(ctx) = context_id {
            params["contextId"] = Value::from(ctx);
        }
        self.call(methods::MESSAGE_SEND, params).await
    }

    /// `tasks/get`
    pub async fn get(&self, task_id: &str) -> Result<Task, PeerError> {
        self.call(methods::TASKS_GET, serde_json::json!({ "taskId": task_id }))
            .await
    }

    /// `tasks/list`
    pub async fn list(&self, limit: usize) -> Result<Vec<Task>, PeerError> {
        let result: TaskListResult = self
            .call(methods::TASKS_LIST, serde_json::json!({ "limit": limit }))
            .await?;
        Ok(result.tasks)
    }

    /// `tasks/cancel`
    pub async fn cancel(&self, task_id: &str) -> Result<Task, PeerError> {
        self.call(methods::TASKS_CANCEL, serde_json::json!({ "taskId": task_id }))
            .await
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, PeerError> {
        let url = format!("{}{}", self.base_url, self.endpoint_path);
        let request = JsonRpcRequest::new(
            RpcId::String(uuid::Uuid::new_v4().to_string()),
            method,
            Some(params),
        );

        debug!(peer = %self.base_url, method, "Peer RPC call");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PeerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(peer = %self.base_url, status = status.as_u16(), "Peer returned HTTP error");
            return Err(PeerError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let rpc: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| PeerError::InvalidResponse(e.to_string()))?;

        if let Some(error) = rpc.error {
            return Err(PeerError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        let result = rpc
            .result
            .ok_or_else(|| PeerError::InvalidResponse("response has neither result nor error".into()))?;
        serde_json::from_value(result).map_err(|e| PeerError::InvalidResponse(e.to_string()))
    }

    /// Send a question, poll until the task settles, and return the answer
    /// text. Failures are folded into the returned string.
    pub async fn ask_and_wait(&self, question: &str, poll_interval: Duration, max_retries: u32) -> String {
        match self.try_ask_and_wait(question, poll_interval, max_retries).await {
            Ok(answer) => answer,
            Err(e) => format!("Failed to reach peer agent at {}: {e}", self.base_url),
        }
    }

    /// Like [`ask_and_wait`](Self::ask_and_wait) but transport and protocol
    /// failures come back as errors. Task outcomes (failed, cancelled, timed
    /// out) are still answers.
    pub async fn try_ask_and_wait(
        &self,
        question: &str,
        poll_interval: Duration,
        max_retries: u32,
    ) -> Result<String, PeerError> {
        let mut task = self.send(Message::user(question), None).await?;
        info!(peer = %self.base_url, task_id = %task.id, "Peer task started");

        for _ in 0..max_retries {
            tokio::time::sleep(poll_interval).await;
            task = self.get(&task.id).await?;

            let first_text = task
                .status
                .message
                .as_ref()
                .and_then(|m| m.first_text())
                .map(str::to_string);

            match task.state() {
                TaskState::Completed => {
                    return Ok(first_text
                        .unwrap_or_else(|| "Task completed but returned no content.".into()));
                }
                TaskState::Failed => {
                    return Ok(match first_text {
                        Some(reason) => format!("Task failed. Reason: {reason}"),
                        None => "Task failed.".into(),
                    });
                }
                TaskState::Cancelled => return Ok("Task was cancelled by the peer.".into()),
                _ => {}
            }
        }

        warn!(peer = %self.base_url, task_id = %task.id, max_retries, "Peer task did not settle");
        Ok("Task timed out waiting for response.".into())
    }
}
