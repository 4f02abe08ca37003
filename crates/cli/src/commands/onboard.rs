//! `agentmesh onboard`: Write the default configuration file.

use agentmesh_config::AppConfig;
use std::path::Path;

pub async fn run(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("agentmesh: First-Time Setup");
    println!("============================\n");

    if let Some(dir) = config_path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)?;
        println!("Created config directory: {}", dir.display());
    }

    if config_path.exists() && !force {
        println!("Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    std::fs::write(config_path, AppConfig::default_toml())?;
    println!("Wrote config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Set AGENTMESH_API_KEY (or add api_key to the config)");
    println!("   2. Run: agentmesh ask \"What is 2+2?\"");
    println!("   3. Run: agentmesh serve\n");

    Ok(())
}
