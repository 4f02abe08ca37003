//! Backend router: builds the configured reasoning backend.
//!
//! The primary backend comes from `[backend]`; `[[backend.fallbacks]]`
//! entries wrap it in a [`FallbackBackend`] chain, and `backend.cache` wraps
//! the result in a [`CachedBackend`].

use agentmesh_config::AppConfig;
use agentmesh_core::ReasoningBackend;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::CachedBackend;
use crate::fallback::FallbackBackend;
use crate::gemini::GeminiBackend;
use crate::offline::OfflineBackend;
use crate::openai_compat::OpenAiCompatBackend;

/// Build the reasoning backend described by the config.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn ReasoningBackend> {
    let backend_cfg = &config.backend;
    let timeout = Duration::from_secs(backend_cfg.timeout_secs);

    let primary = build_one(
        &backend_cfg.provider,
        &backend_cfg.model,
        backend_cfg.api_url.as_deref(),
        config.backend_api_key(),
        timeout,
    );

    let mut backend: Arc<dyn ReasoningBackend> = if backend_cfg.fallbacks.is_empty() {
        primary
    } else {
        let mut chain = FallbackBackend::new("fallback").add(primary, timeout);
        for fb in &backend_cfg.fallbacks {
            let key = fb.api_key.as_deref().or(config.api_key.as_deref());
            let fb_timeout = Duration::from_secs(fb.timeout_secs);
            let next = build_one(&fb.provider, &fb.model, fb.api_url.as_deref(), key, fb_timeout);
            chain = chain.add(next, fb_timeout);
        }
        info!(backends = chain.len(), "Fallback chain configured");
        Arc::new(chain)
    };

    if backend_cfg.cache {
        backend = Arc::new(CachedBackend::new(backend, backend_cfg.cache_capacity));
    }

    info!(
        backend = %backend.name(),
        model = %backend.model(),
        cached = backend_cfg.cache,
        "Reasoning backend ready"
    );
    backend
}

fn build_one(
    provider: &str,
    model: &str,
    api_url: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> Arc<dyn ReasoningBackend> {
    if provider == "offline" {
        return Arc::new(OfflineBackend::new());
    }

    let key = match api_key {
        Some(k) if !k.is_empty() => k.to_string(),
        _ if needs_no_key(provider) => provider.to_string(),
        _ => {
            warn!(provider, "No API key configured, using the offline backend");
            return Arc::new(OfflineBackend::new());
        }
    };

    if provider == "gemini" {
        let backend = GeminiBackend::new(key, model, timeout);
        return match api_url {
            Some(url) => Arc::new(backend.with_base_url(url)),
            None => Arc::new(backend),
        };
    }

    let base_url = api_url
        .map(str::to_string)
        .unwrap_or_else(|| default_base_url(provider));
    Arc::new(OpenAiCompatBackend::new(
        provider, base_url, key, model, timeout,
    ))
}

/// Local servers accept any bearer token.
fn needs_no_key(provider: &str) -> bool {
    matches!(provider, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for a known OpenAI-compatible provider.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmesh_config::FallbackConfig;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn no_key_means_offline() {
        let mut config = AppConfig::default();
        config.backend.cache = false;
        let backend = build_from_config(&config);
        assert_eq!(backend.name(), "offline");
    }

    #[test]
    fn gemini_with_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("test-key".into());
        config.backend.cache = false;
        let backend = build_from_config(&config);
        assert_eq!(backend.name(), "gemini");
        assert_eq!(backend.model(), "gemini-2.0-flash-exp");
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut config = AppConfig::default();
        config.backend.provider = "ollama".into();
        config.backend.model = "llama3".into();
        config.backend.cache = false;
        let backend = build_from_config(&config);
        assert_eq!(backend.name(), "ollama");
    }

    #[test]
    fn cache_wraps_backend_transparently() {
        let mut config = AppConfig::default();
        config.api_key = Some("k".into());
        let backend = build_from_config(&config);
        assert_eq!(backend.name(), "gemini");
    }

    #[test]
    fn fallbacks_build_chain() {
        let mut config = AppConfig::default();
        config.api_key = Some("k".into());
        config.backend.cache = false;
        config.backend.fallbacks.push(FallbackConfig {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_url: None,
            api_key: None,
            timeout_secs: 30,
        });
        let backend = build_from_config(&config);
        assert_eq!(backend.name(), "fallback");
        assert_eq!(backend.model(), "gemini-2.0-flash-exp");
    }
}
