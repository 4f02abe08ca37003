//! `agentmesh tools`: List the tools the agentic loop can call.

use agentmesh_config::AppConfig;
use agentmesh_tools::{ToolContext, default_registry};

pub async fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = default_registry(ToolContext::from_config(config));

    println!("Registered tools ({}):\n", registry.len());
    for tool in registry.list(None) {
        let params = tool
            .parameters()
            .iter()
            .map(|p| if p.required { p.name.clone() } else { format!("{}?", p.name) })
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {:<18} [{:?}] ({params})", tool.name(), tool.category());
        println!("  {:<18} {}\n", "", tool.description());
    }

    Ok(())
}
