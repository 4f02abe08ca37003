//! `agentmesh peer`: Talk to another agent over JSON-RPC.

use agentmesh_config::AppConfig;
use agentmesh_tools::PeerClient;
use clap::Subcommand;
use std::time::Duration;

#[derive(Subcommand)]
pub enum PeerAction {
    /// Fetch a peer's discovery document
    Card {
        /// Peer base URL, e.g. http://localhost:8001
        url: String,
    },

    /// Send a question and wait for the answer
    Ask {
        url: String,

        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Override peers.max_retries
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Show a task held by the peer
    Get { url: String, task_id: String },
}

pub async fn run(config: &AppConfig, action: PeerAction) -> Result<(), Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(config.peers.timeout_secs);
    let rpc_path = config.gateway.rpc_path.as_str();

    match action {
        PeerAction::Card { url } => {
            let card = PeerClient::new(url, timeout).agent_card().await?;
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
        PeerAction::Ask {
            url,
            question,
            retries,
        } => {
            let client = PeerClient::new(url, timeout).with_endpoint_path(rpc_path);
            let answer = client
                .try_ask_and_wait(
                    &question.join(" "),
                    Duration::from_millis(config.peers.poll_interval_ms),
                    retries.unwrap_or(config.peers.max_retries),
                )
                .await?;
            println!("{answer}");
        }
        PeerAction::Get { url, task_id } => {
            let task = PeerClient::new(url, timeout)
                .with_endpoint_path(rpc_path)
                .get(&task_id)
                .await?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
    }

    Ok(())
}
