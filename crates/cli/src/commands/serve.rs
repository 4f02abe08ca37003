//! `agentmesh serve`: Start the JSON-RPC gateway.

use agentmesh_config::AppConfig;
use agentmesh_gateway::GatewayState;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let state = Arc::new(GatewayState::from_config(&config));

    // Mirror domain events into the debug log.
    let mut events = state.events.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(
                    event = event.kind(),
                    payload = %serde_json::to_string(event.as_ref()).unwrap_or_default(),
                    "Domain event"
                ),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event log lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("agentmesh gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   JSON-RPC:  POST {}", config.gateway.rpc_path);
    println!("   Backend:   {} ({})", config.backend.provider, config.backend.model);
    println!("   Tools:     {}", state.tools.names().join(", "));
    if !config.has_api_key() {
        println!("   No API key configured; using the offline backend");
    }

    agentmesh_gateway::serve(&config, state).await
}
