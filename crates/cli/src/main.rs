//! agentmesh CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the JSON-RPC gateway
//! - `ask`: Run the agentic loop locally for one question
//! - `peer`: Talk to another agent (card, ask, get)
//! - `tools`: List the registered tools
//! - `status`: Show the effective configuration
//! - `onboard`: Write the default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "agentmesh",
    about = "agentmesh: task orchestration and autonomous tool-calling agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.agentmesh/config.toml)
    #[arg(short, long, global = true, env = "AGENTMESH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer one question with the local agentic loop
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Override agent_loop.max_iterations
        #[arg(long)]
        max_iterations: Option<u32>,
    },

    /// Talk to a peer agent
    Peer {
        #[command(subcommand)]
        action: commands::peer::PeerAction,
    },

    /// List the tools available to the agentic loop
    Tools,

    /// Show system status
    Status,

    /// Write the default configuration file
    Onboard {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(agentmesh_config::AppConfig::config_path);

    let config = agentmesh_config::AppConfig::load_with_env(&config_path);
    let (level, json) = match &config {
        Ok(c) => (c.logging.level.clone(), c.logging.json),
        Err(_) => ("info".to_string(), false),
    };
    init_tracing(cli.verbose, &level, json);

    if let Commands::Onboard { force } = cli.command {
        return commands::onboard::run(&config_path, force).await;
    }

    let config = config.map_err(|e| format!("Failed to load config: {e}"))?;
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Ask {
            question,
            max_iterations,
        } => commands::ask::run(config, &question.join(" "), max_iterations).await?,
        Commands::Peer { action } => commands::peer::run(&config, action).await?,
        Commands::Tools => commands::tools::run(&config).await?,
        Commands::Status => commands::status::run(&config, &config_path).await?,
        Commands::Onboard { .. } => {}
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` means debug, else the configured level.
fn init_tracing(verbose: bool, level: &str, json: bool) {
    let filter = if verbose { "debug" } else { level };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}
