//! Configuration loading, validation, and management for agentmesh.
//!
//! Loads configuration from `~/.agentmesh/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agentmesh/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the reasoning backend (can be overridden per backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Identity advertised in the discovery document
    #[serde(default)]
    pub agent: AgentIdentityConfig,

    /// Reasoning backend selection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Agentic loop bounds
    #[serde(default)]
    pub agent_loop: AgentLoopConfig,

    /// Task store and processing limits
    #[serde(default)]
    pub tasks: TasksConfig,

    /// HTTP binding
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Peer exchange settings
    #[serde(default)]
    pub peers: PeersConfig,

    /// Retrieval tool settings
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("agent", &self.agent)
            .field("backend", &self.backend)
            .field("agent_loop", &self.agent_loop)
            .field("tasks", &self.tasks)
            .field("gateway", &self.gateway)
            .field("peers", &self.peers)
            .field("knowledge", &self.knowledge)
            .field("logging", &self.logging)
            .finish()
    }
}

// ── Agent identity ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentityConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    #[serde(default = "default_agent_description")]
    pub description: String,

    #[serde(default = "default_agent_version")]
    pub version: String,

    #[serde(default = "default_organization")]
    pub organization: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_url: Option<String>,

    /// Externally reachable base URL; the RPC path is appended for the card.
    /// When unset the card advertises the bare RPC path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    #[serde(default = "default_skills")]
    pub skills: Vec<SkillConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

fn default_agent_name() -> String {
    "agentmesh".into()
}
fn default_agent_description() -> String {
    "Knowledge agent that answers questions by reasoning over internal tools and peer agents".into()
}
fn default_agent_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}
fn default_organization() -> String {
    "agentmesh".into()
}
fn default_skills() -> Vec<SkillConfig> {
    vec![
        SkillConfig {
            id: "knowledge-query".into(),
            name: "Knowledge Query".into(),
            description: "Answer questions using retrieval, graph lookup and computation tools"
                .into(),
            tags: vec!["qa".into(), "retrieval".into()],
            examples: vec!["What is the relationship between X and Y?".into()],
        },
        SkillConfig {
            id: "document-analysis".into(),
            name: "Document Analysis".into(),
            description: "Summarize and analyze documents held in the knowledge base".into(),
            tags: vec!["analysis".into(), "summarization".into()],
            examples: vec!["Summarize what the knowledge base says about Z".into()],
        },
    ]
}

impl Default for AgentIdentityConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            description: default_agent_description(),
            version: default_agent_version(),
            organization: default_organization(),
            organization_url: None,
            public_url: None,
            skills: default_skills(),
        }
    }
}

// ── Backend ───────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// "gemini", "openai", "openrouter", "ollama", ... or "offline"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,

    /// Cache identical prompts in memory
    #[serde(default = "default_true")]
    pub cache: bool,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Tried in order when the primary backend fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<FallbackConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash-exp".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_backend_timeout() -> u64 {
    60
}
fn default_cache_capacity() -> usize {
    512
}
fn default_true() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_url: None,
            api_key: None,
            temperature: default_temperature(),
            timeout_secs: default_backend_timeout(),
            cache: true,
            cache_capacity: default_cache_capacity(),
            fallbacks: vec![],
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("cache", &self.cache)
            .field("cache_capacity", &self.cache_capacity)
            .field("fallbacks", &self.fallbacks)
            .finish()
    }
}

impl std::fmt::Debug for FallbackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ── Agentic loop ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLoopConfig {
    /// Hard cap on reasoning iterations per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Size of the trailing context window used for the synthesis call
    #[serde(default = "default_synthesis_chars")]
    pub synthesis_context_chars: usize,
}

fn default_max_iterations() -> u32 {
    8
}
fn default_synthesis_chars() -> usize {
    8000
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            synthesis_context_chars: default_synthesis_chars(),
        }
    }
}

// ── Tasks ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_list_limit")]
    pub default_list_limit: usize,

    #[serde(default = "default_max_list_limit")]
    pub max_list_limit: usize,

    /// Overall deadline for one task's processing; `None` disables it
    #[serde(default = "default_max_runtime", skip_serializing_if = "Option::is_none")]
    pub max_runtime_secs: Option<u64>,
}

fn default_list_limit() -> usize {
    10
}
fn default_max_list_limit() -> usize {
    100
}
fn default_max_runtime() -> Option<u64> {
    Some(300)
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_list_limit: default_list_limit(),
            max_list_limit: default_max_list_limit(),
            max_runtime_secs: default_max_runtime(),
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the JSON-RPC endpoint
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_rpc_path() -> String {
    "/a2a".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rpc_path: default_rpc_path(),
        }
    }
}

// ── Peers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeersConfig {
    /// Per-request timeout for peer calls
    #[serde(default = "default_peer_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Peer used when a domain has no directory entry
    #[serde(default = "default_peer_url")]
    pub default_url: String,

    /// Domain name → peer base URL
    #[serde(default)]
    pub directory: HashMap<String, String>,
}

fn default_peer_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    1000
}
fn default_max_retries() -> u32 {
    30
}
fn default_peer_url() -> String {
    "http://localhost:8001".into()
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_peer_timeout(),
            poll_interval_ms: default_poll_interval(),
            max_retries: default_max_retries(),
            default_url: default_peer_url(),
            directory: HashMap::new(),
        }
    }
}

impl PeersConfig {
    /// Resolve a domain to a peer URL, falling back to `default_url`.
    pub fn resolve(&self, domain: Option<&str>) -> &str {
        domain
            .and_then(|d| self.directory.get(d))
            .map(String::as_str)
            .unwrap_or(&self.default_url)
    }
}

// ── Knowledge ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Register the retrieval tools
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Retrieved content is truncated to this many characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_top_k() -> usize {
    5
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: default_chunk_size(),
            top_k: default_top_k(),
        }
    }
}

// ── Logging ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from the default path (~/.agentmesh/config.toml).
    ///
    /// Environment overrides are applied afterwards:
    /// - `AGENTMESH_API_KEY`, then `GEMINI_API_KEY`, then `OPENAI_API_KEY`
    /// - `AGENTMESH_PROVIDER`, `AGENTMESH_MODEL`, `AGENTMESH_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_path())
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("AGENTMESH_API_KEY")
                .or_else(|| lookup("GEMINI_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("AGENTMESH_PROVIDER") {
            self.backend.provider = provider;
        }

        if let Some(model) = lookup("AGENTMESH_MODEL") {
            self.backend.model = model;
        }

        if let Some(port) = lookup("AGENTMESH_PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentmesh")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            return Err(ConfigError::ValidationError(
                "backend.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent_loop.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent_loop.max_iterations must be at least 1".into(),
            ));
        }

        if self.tasks.default_list_limit == 0
            || self.tasks.max_list_limit < self.tasks.default_list_limit
        {
            return Err(ConfigError::ValidationError(
                "tasks: require max_list_limit >= default_list_limit >= 1".into(),
            ));
        }

        if self.backend.timeout_secs == 0
            || self.backend.fallbacks.iter().any(|f| f.timeout_secs == 0)
        {
            return Err(ConfigError::ValidationError(
                "backend timeout_secs must be > 0".into(),
            ));
        }

        if self.peers.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "peers.timeout_secs must be > 0".into(),
            ));
        }

        if self.peers.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "peers.poll_interval_ms must be > 0".into(),
            ));
        }

        if !self.gateway.rpc_path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "gateway.rpc_path must start with '/'".into(),
            ));
        }

        Ok(())
    }

    /// The API key for the primary backend: backend-level first, then global.
    pub fn backend_api_key(&self) -> Option<&str> {
        self.backend
            .api_key
            .as_deref()
            .or(self.api_key.as_deref())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.backend_api_key().is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            agent: AgentIdentityConfig::default(),
            backend: BackendConfig::default(),
            agent_loop: AgentLoopConfig::default(),
            tasks: TasksConfig::default(),
            gateway: GatewayConfig::default(),
            peers: PeersConfig::default(),
            knowledge: KnowledgeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.provider, "gemini");
        assert_eq!(config.backend.temperature, 0.2);
        assert_eq!(config.agent_loop.max_iterations, 8);
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.gateway.rpc_path, "/a2a");
        assert_eq!(config.peers.timeout_secs, 30);
        assert_eq!(config.tasks.default_list_limit, 10);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.backend.model, config.backend.model);
        assert_eq!(parsed.agent.skills.len(), 2);
        assert_eq!(parsed.tasks.max_runtime_secs, Some(300));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.backend.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.agent_loop.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn list_limits_must_be_ordered() {
        let mut config = AppConfig::default();
        config.tasks.max_list_limit = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeouts_rejected() {
        let mut config = AppConfig::default();
        config.backend.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.peers.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.backend.fallbacks.push(FallbackConfig {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_url: None,
            api_key: None,
            timeout_secs: 0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().backend.provider, "gemini");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[backend]
provider = "openai"
model = "gpt-4o-mini"

[peers.directory]
finance = "http://finance.internal:8001"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.backend.provider, "openai");
        assert_eq!(config.backend.temperature, 0.2);
        assert_eq!(config.peers.resolve(Some("finance")), "http://finance.internal:8001");
        assert_eq!(config.peers.resolve(Some("legal")), "http://localhost:8001");
        assert_eq!(config.peers.resolve(None), "http://localhost:8001");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = [not toml").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn overrides_apply_in_priority_order() {
        let mut config = AppConfig::default();
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "gem-key"),
            ("OPENAI_API_KEY", "oai-key"),
            ("AGENTMESH_MODEL", "gemini-1.5-pro"),
            ("AGENTMESH_PORT", "9100"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("gem-key"));
        assert_eq!(config.backend.model, "gemini-1.5-pro");
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.backend.provider, "gemini");
    }

    #[test]
    fn file_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_overrides(|k| (k == "AGENTMESH_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.backend.api_key = Some("sk-other".into());
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(!dbg.contains("sk-other"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini"));
        assert!(toml_str.contains("/a2a"));
    }
}
