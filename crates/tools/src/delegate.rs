//! `ask_peer_agent`: delegate a question to a peer agent.

use agentmesh_config::PeersConfig;
use agentmesh_core::error::ToolError;
use agentmesh_core::tool::{Tool, ToolCategory, ToolParameter};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::peer::PeerClient;

pub struct AskPeerTool {
    peers: PeersConfig,
}

impl AskPeerTool {
    pub fn new(peers: PeersConfig) -> Self {
        Self { peers }
    }
}

#[async_trait]
impl Tool for AskPeerTool {
    fn name(&self) -> &str {
        "ask_peer_agent"
    }

    fn description(&self) -> &str {
        "Request knowledge from a specialized peer agent. Use when the question is outside the local knowledge."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::External
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        let domain = ToolParameter::new("domain", "string", "Target knowledge domain").optional();
        let mut domains: Vec<&str> = self.peers.directory.keys().map(String::as_str).collect();
        domains.sort_unstable();

        vec![
            ToolParameter::new("query", "string", "The question to send to the peer agent"),
            if domains.is_empty() {
                domain
            } else {
                domain.with_enum(&domains)
            },
        ]
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let domain = arguments["domain"].as_str();
        let peer_url = self.peers.resolve(domain).to_string();

        info!(peer = %peer_url, domain = ?domain, "Delegating to peer agent");

        let client = PeerClient::new(&peer_url, Duration::from_secs(self.peers.timeout_secs));
        let poll_interval = Duration::from_millis(self.peers.poll_interval_ms);

        match client
            .try_ask_and_wait(query, poll_interval, self.peers.max_retries)
            .await
        {
            Ok(answer) => Ok(serde_json::json!({
                "success": true,
                "answer": answer,
                "peer_agent": peer_url,
                "protocol": "A2A",
            })),
            Err(e) => {
                warn!(peer = %peer_url, error = %e, "Peer agent unreachable");
                Ok(serde_json::json!({
                    "success": false,
                    "error": format!("Failed to reach peer agent at {peer_url}: {e}"),
                    "peer_agent": peer_url,
                    "protocol": "A2A",
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(default_url: &str) -> PeersConfig {
        let mut peers = PeersConfig {
            default_url: default_url.into(),
            timeout_secs: 2,
            poll_interval_ms: 10,
            max_retries: 2,
            ..PeersConfig::default()
        };
        peers
            .directory
            .insert("machine-learning".into(), "http://127.0.0.1:1".into());
        peers
    }

    #[test]
    fn domain_enum_lists_directory() {
        let tool = AskPeerTool::new(peers("http://localhost:8001"));
        let schema = tool.parameters_schema();
        assert_eq!(
            schema["properties"]["domain"]["enum"],
            serde_json::json!(["machine-learning"])
        );
        assert_eq!(schema["required"], serde_json::json!(["query"]));
    }

    #[tokio::test]
    async fn unreachable_peer_is_unsuccessful_payload() {
        let tool = AskPeerTool::new(peers("http://127.0.0.1:1"));
        let out = tool
            .execute(serde_json::json!({"query": "what is a transformer?", "domain": "machine-learning"}))
            .await
            .unwrap();
        assert_eq!(out["success"], false);
        assert_eq!(out["protocol"], "A2A");
        assert!(
            out["error"]
                .as_str()
                .unwrap()
                .starts_with("Failed to reach peer agent at http://127.0.0.1:1")
        );
    }

    #[tokio::test]
    async fn query_is_required() {
        let tool = AskPeerTool::new(PeersConfig::default());
        assert!(matches!(
            tool.execute(serde_json::json!({"domain": "x"})).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }
}
