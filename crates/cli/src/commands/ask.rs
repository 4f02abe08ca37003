//! `agentmesh ask`: Run the agentic loop locally for one question.

use agentmesh_agent::{AgentOutcome, AgenticLoop};
use agentmesh_config::AppConfig;
use agentmesh_tools::{ToolContext, default_registry};
use std::sync::Arc;

pub async fn run(
    config: AppConfig,
    question: &str,
    max_iterations: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.has_api_key() {
        eprintln!("  No API key configured; answering with the offline backend.");
        eprintln!("  Set AGENTMESH_API_KEY (or GEMINI_API_KEY / OPENAI_API_KEY) for real answers.\n");
    }

    let backend = agentmesh_providers::build_from_config(&config);
    let tools = Arc::new(default_registry(ToolContext::from_config(&config)));

    let mut agent = AgenticLoop::from_config(
        backend,
        tools,
        &config.agent_loop,
        config.backend.temperature,
    );
    if let Some(max) = max_iterations {
        agent = agent.with_max_iterations(max);
    }

    let response = agent.run(question).await;

    println!("{}", response.answer);
    if !response.reasoning_trace.is_empty() {
        println!("\n{}", response.reasoning_trace);
    }
    println!(
        "\n[{} iteration(s), {} tool call(s)]",
        response.iterations,
        response.tool_calls.len()
    );

    match response.outcome {
        AgentOutcome::BackendFailed { error } => Err(error.into()),
        _ => Ok(()),
    }
}
