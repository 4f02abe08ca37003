//! Offline backend: deterministic replies with no network access.
//!
//! Selected when no API key is configured so the engine still runs end to
//! end. It never requests a tool, so every loop run ends after one call.

use agentmesh_core::ReasoningBackend;
use agentmesh_core::error::BackendError;
use async_trait::async_trait;

const QUESTION_MARKER: &str = "User Question:";
const RESPONSE_MARKER: &str = "Your Response:";

#[derive(Debug, Default)]
pub struct OfflineBackend;

impl OfflineBackend {
    pub fn new() -> Self {
        Self
    }

    /// Pull the user question out of a loop prompt, or fall back to the
    /// start of the prompt.
    fn question(prompt: &str) -> String {
        if let Some(start) = prompt.rfind(QUESTION_MARKER) {
            let rest = &prompt[start + QUESTION_MARKER.len()..];
            let end = rest.find(RESPONSE_MARKER).unwrap_or(rest.len());
            return rest[..end].trim().to_string();
        }
        prompt.chars().take(200).collect::<String>().trim().to_string()
    }
}

#[async_trait]
impl ReasoningBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String, BackendError> {
        Ok(format!(
            "Offline mode: no reasoning backend is configured, so this question was not analyzed: {}",
            Self::question(prompt)
        ))
    }
}
