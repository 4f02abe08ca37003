//! Error types for the agentmesh domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

use crate::rpc::{JsonRpcError, error_codes};

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned no usable text: {0}")]
    EmptyResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum PeerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Peer returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("A2A Error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Invalid response from peer: {0}")]
    InvalidResponse(String),
}

/// Errors raised while dispatching a JSON-RPC call.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task {task_id} cannot be canceled in state {state}")]
    TaskNotCancelable { task_id: String, state: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// The JSON-RPC error code for this error.
    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse(_) => error_codes::PARSE_ERROR,
            RpcError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            RpcError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            RpcError::TaskNotFound(_) => error_codes::TASK_NOT_FOUND,
            RpcError::TaskNotCancelable { .. } => error_codes::TASK_NOT_CANCELABLE,
            RpcError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Convert to a JSON-RPC error object.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_displays_correctly() {
        let err = BackendError::ApiError {
            status_code: 503,
            message: "Service Unavailable".into(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn tool_not_found_message_names_the_tool() {
        let err = ToolError::NotFound("teleport".into());
        assert_eq!(err.to_string(), "Tool 'teleport' not found");
    }

    #[test]
    fn peer_protocol_error_format() {
        let err = PeerError::Protocol {
            code: -32001,
            message: "Task not found".into(),
        };
        assert_eq!(err.to_string(), "A2A Error -32001: Task not found");
    }

    #[test]
    fn rpc_error_codes() {
        assert_eq!(RpcError::Parse("x".into()).code(), -32700);
        assert_eq!(RpcError::InvalidRequest("x".into()).code(), -32600);
        assert_eq!(RpcError::MethodNotFound("x".into()).code(), -32601);
        assert_eq!(RpcError::InvalidParams("x".into()).code(), -32602);
        assert_eq!(RpcError::Internal("x".into()).code(), -32603);
        assert_eq!(RpcError::TaskNotFound("x".into()).code(), -32001);
        let err = RpcError::TaskNotCancelable {
            task_id: "t".into(),
            state: "TASK_STATE_COMPLETED".into(),
        };
        assert_eq!(err.code(), -32002);
        assert!(err.to_rpc_error().message.contains("TASK_STATE_COMPLETED"));
    }
}
