//! Reasoning backend trait: the abstraction over text generation.
//!
//! The agentic loop only ever asks for "text given a prompt". Concrete
//! backends (OpenAI-compatible, Gemini, offline) live in the providers crate
//! and are selected at construction time.

use async_trait::async_trait;

use crate::error::BackendError;

#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// The model this backend generates with.
    fn model(&self) -> &str {
        self.name()
    }

    /// Produce text for `prompt`.
    ///
    /// Fails with [`BackendError`] when the backend is unavailable or
    /// returns no usable text.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, BackendError>;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<bool, BackendError> {
        Ok(true)
    }
}
