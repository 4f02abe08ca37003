//! `agentmesh status`: Show the effective configuration.

use agentmesh_config::AppConfig;
use std::path::Path;

pub async fn run(config: &AppConfig, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("agentmesh status");
    println!("================");
    println!("  Config file:  {}", config_path.display());
    println!("  Agent:        {} v{}", config.agent.name, config.agent.version);
    println!("  Backend:      {} ({})", config.backend.provider, config.backend.model);
    println!("  Temperature:  {}", config.backend.temperature);
    println!("  API key:      {}", if config.has_api_key() { "configured" } else { "missing (offline backend)" });
    println!("  Fallbacks:    {}", config.backend.fallbacks.len());
    println!("  Cache:        {}", if config.backend.cache { "enabled" } else { "disabled" });
    println!("  Iterations:   {}", config.agent_loop.max_iterations);
    println!("  Gateway:      {}:{}{}", config.gateway.host, config.gateway.port, config.gateway.rpc_path);
    println!("  Knowledge:    {}", if config.knowledge.enabled { "enabled" } else { "disabled" });
    println!("  Peers:        {} (+{} in directory)", config.peers.default_url, config.peers.directory.len());

    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, run `agentmesh onboard` first");
    }

    Ok(())
}
