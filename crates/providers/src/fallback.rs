//! Backend fallback: ordered retry chain with per-backend timeouts.
//!
//! When a backend fails (timeout, rate limit, error), the next backend in
//! the configured chain is tried. The last error is returned if all fail.

use agentmesh_core::ReasoningBackend;
use agentmesh_core::error::BackendError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct FallbackBackend {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    backend: Arc<dyn ReasoningBackend>,
    timeout: Duration,
}

impl FallbackBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a backend to the chain with a custom timeout.
    pub fn add(mut self, backend: Arc<dyn ReasoningBackend>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { backend, timeout });
        self
    }

    /// Add a backend with the default timeout (120s).
    pub fn add_default(self, backend: Arc<dyn ReasoningBackend>) -> Self {
        self.add(backend, Duration::from_secs(120))
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl ReasoningBackend for FallbackBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        self.chain
            .first()
            .map(|e| e.backend.model())
            .unwrap_or(&self.name)
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, BackendError> {
        let mut last_error = BackendError::NotConfigured("No backends in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let backend_name = entry.backend.name().to_string();

            info!(
                backend = %backend_name,
                attempt = i + 1,
                total = self.chain.len(),
                "Fallback: trying backend"
            );

            match tokio::time::timeout(entry.timeout, entry.backend.generate(prompt, temperature))
                .await
            {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => {
                    warn!(
                        backend = %backend_name,
                        error = %e,
                        "Fallback: backend failed, trying next"
                    );
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        backend = %backend_name,
                        timeout_secs = entry.timeout.as_secs(),
                        "Fallback: backend timed out, trying next"
                    );
                    last_error = BackendError::Timeout(format!(
                        "Backend '{}' timed out after {}s",
                        backend_name,
                        entry.timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }

    async fn health_check(&self) -> Result<bool, BackendError> {
        for entry in &self.chain {
            if let Ok(true) = entry.backend.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
