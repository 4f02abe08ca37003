//! Reasoning backend implementations for agentmesh.
//!
//! All backends implement the `agentmesh_core::ReasoningBackend` trait.
//! [`router::build_from_config`] picks and wraps the right one.

pub mod cache;
pub mod fallback;
pub mod gemini;
pub mod offline;
pub mod openai_compat;
pub mod router;

pub use cache::CachedBackend;
pub use fallback::FallbackBackend;
pub use gemini::GeminiBackend;
pub use offline::OfflineBackend;
pub use openai_compat::OpenAiCompatBackend;
pub use router::build_from_config;

use agentmesh_core::error::BackendError;
use std::time::Duration;

/// Build an HTTP client with a request timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Map a non-success HTTP status to a backend error.
pub(crate) fn error_for_status(status: u16, body: String) -> BackendError {
    match status {
        429 => BackendError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => {
            BackendError::AuthenticationFailed("Invalid API key or insufficient permissions".into())
        }
        _ => BackendError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

/// Map a transport failure to a backend error.
pub(crate) fn error_for_transport(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(e.to_string())
    } else {
        BackendError::Network(e.to_string())
    }
}
