//! End-to-end integration tests for the agentmesh engine.
//!
//! These tests exercise the full pipeline from a JSON-RPC request to a
//! settled task: dispatcher, task store, background processor, agentic
//! loop, tool registry and, for delegation, a second agent over HTTP.

use std::sync::Arc;
use std::time::Duration;

use agentmesh_config::AppConfig;
use agentmesh_core::backend::ReasoningBackend;
use agentmesh_core::error::BackendError;
use agentmesh_core::event::EventBus;
use agentmesh_core::rpc::{JsonRpcResponse, error_codes};
use agentmesh_core::task::{Task, TaskState};
use agentmesh_core::tool::ToolRegistry;
use agentmesh_core::{Document, GraphTriple};
use agentmesh_gateway::{GatewayState, build_router};
use agentmesh_knowledge::{InMemoryGraphStore, InMemoryVectorStore};
use agentmesh_providers::OpenAiCompatBackend;
use agentmesh_tools::{PeerClient, ToolContext, default_registry};
use serde_json::{Value, json};

// ── Mock Backend ─────────────────────────────────────────────────────────

/// A mock backend that returns scripted replies in sequence.
struct ScriptedBackend {
    replies: std::sync::Mutex<Vec<String>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: std::sync::Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl ReasoningBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String, BackendError> {
        let mut prompts = self.prompts.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        let call = prompts.len();
        prompts.push(prompt.to_string());
        match replies.get(call) {
            Some(reply) => Ok(reply.clone()),
            None => panic!("ScriptedBackend exhausted: call #{call}, have {}", replies.len()),
        }
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

fn gateway(backend: Arc<dyn ReasoningBackend>, tools: ToolRegistry) -> GatewayState {
    GatewayState::new(
        &AppConfig::default(),
        backend,
        Arc::new(tools),
        Arc::new(EventBus::default()),
    )
}

fn local_tools() -> ToolRegistry {
    default_registry(ToolContext::default())
}

async fn rpc(state: &GatewayState, method: &str, params: Value) -> JsonRpcResponse {
    state
        .dispatcher
        .handle(json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params}))
        .await
}

async fn send(state: &GatewayState, text: &str) -> Task {
    let response = rpc(
        state,
        "message/send",
        json!({"message": {"role": "ROLE_USER", "parts": [{"text": text}]}, "contextId": "e2e"}),
    )
    .await;
    serde_json::from_value(response.result.expect("message/send failed")).unwrap()
}

async fn wait_terminal(state: &GatewayState, task_id: &str) -> Task {
    for _ in 0..500 {
        let response = rpc(state, "tasks/get", json!({"taskId": task_id})).await;
        let task: Task = serde_json::from_value(response.result.unwrap()).unwrap();
        if task.is_terminal() {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} never reached a terminal state");
}

// ── Scenario A: tool call then answer ────────────────────────────────────

#[tokio::test]
async fn e2e_calculator_tool_invocation() {
    let backend = ScriptedBackend::new(&[
        r#"{"tool": "calculate", "arguments": {"expression": "2+2"}}"#,
        "2+2 equals 4.",
    ]);
    let state = gateway(backend.clone(), local_tools());

    let accepted = send(&state, "2+2").await;
    assert_eq!(accepted.state(), TaskState::Working);
    assert_eq!(accepted.context_id, "e2e");
    assert_eq!(accepted.history[0].first_text(), Some("2+2"));

    let task = wait_terminal(&state, &accepted.id).await;
    assert_eq!(task.state(), TaskState::Completed);

    let reply = task.status.message.as_ref().unwrap();
    assert!(reply.first_text().unwrap().contains('4'));
    let calls = reply.metadata["tool_calls"].as_array().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["name"], "calculate");
    assert_eq!(calls[0]["arguments"]["expression"], "2+2");
    assert_eq!(calls[0]["result"]["result"], 4);
    assert_eq!(
        reply.metadata["reasoning_trace"],
        "Reasoning: → calculate(expression=2+2)"
    );

    // The observation made it into the second prompt
    assert_eq!(backend.calls(), 2);
    assert!(backend.prompt(1).contains("[Tool: calculate] Result:"));

    // First history entry is the original request; the answer follows it
    assert_eq!(task.history[0], accepted.history[0]);
    assert_eq!(task.history.len(), 2);
    assert_eq!(task.artifacts[0].name.as_deref(), Some("answer"));
}

#[tokio::test]
async fn e2e_completed_task_is_stable() {
    let state = gateway(ScriptedBackend::new(&["Hello!"]), local_tools());
    let task = send(&state, "hi").await;
    wait_terminal(&state, &task.id).await;

    let first = rpc(&state, "tasks/get", json!({"taskId": task.id})).await.result;
    let second = rpc(&state, "tasks/get", json!({"taskId": task.id})).await.result;
    assert_eq!(first, second);
}

// ── Scenario B: unreachable backend ──────────────────────────────────────

#[tokio::test]
async fn e2e_unreachable_backend_fails_task() {
    let backend = Arc::new(OpenAiCompatBackend::new(
        "openai",
        "http://127.0.0.1:1/v1",
        "sk-test",
        "gpt-4o-mini",
        Duration::from_secs(5),
    ));
    let state = gateway(backend, local_tools());

    let task = send(&state, "anything").await;
    let task = wait_terminal(&state, &task.id).await;

    assert_eq!(task.state(), TaskState::Failed);
    let reason = task.status.message.as_ref().and_then(|m| m.first_text()).unwrap();
    assert!(reason.starts_with("Error generating response:"), "got: {reason}");

    // Never WORKING again
    tokio::time::sleep(Duration::from_millis(50)).await;
    let again = rpc(&state, "tasks/get", json!({"taskId": task.id})).await;
    assert_eq!(again.result.unwrap()["status"]["state"], "TASK_STATE_FAILED");
}

// ── Scenario C: cancel after completion ──────────────────────────────────

#[tokio::test]
async fn e2e_cancel_completed_task_is_rejected() {
    let state = gateway(ScriptedBackend::new(&["Done."]), local_tools());
    let task = send(&state, "quick question").await;
    wait_terminal(&state, &task.id).await;

    let response = rpc(&state, "tasks/cancel", json!({"taskId": task.id})).await;
    assert_eq!(response.error.unwrap().code, error_codes::TASK_NOT_CANCELABLE);

    let task = state.dispatcher.store().get(&task.id).await.unwrap();
    assert_eq!(task.state(), TaskState::Completed);
}

// ── Scenario D: unreachable peer ─────────────────────────────────────────

#[tokio::test]
async fn e2e_unreachable_peer_reports_connection_failure() {
    let client = PeerClient::new("http://127.0.0.1:1", Duration::from_secs(5));
    let started = std::time::Instant::now();
    let answer = client
        .ask_and_wait("hello?", Duration::from_millis(10), 3)
        .await;

    assert!(answer.starts_with("Failed to reach peer agent at http://127.0.0.1:1"));
    assert!(started.elapsed() < Duration::from_secs(6));
}

// ── Iteration cap ────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_endless_tool_requests_are_synthesized() {
    let call = r#"{"tool": "get_current_time", "arguments": {}}"#;
    let mut replies = vec![call; 8];
    replies.push("It is some time today.");
    let backend = ScriptedBackend::new(&replies);
    let state = gateway(backend.clone(), local_tools());

    let task = send(&state, "what time is it, really?").await;
    let task = wait_terminal(&state, &task.id).await;

    assert_eq!(task.state(), TaskState::Completed);
    let reply = task.status.message.unwrap();
    assert_eq!(reply.first_text(), Some("It is some time today."));
    assert_eq!(reply.metadata["incomplete"], true);
    assert_eq!(reply.metadata["iterations"], 8);
    assert!(
        reply.metadata["reasoning_trace"]
            .as_str()
            .unwrap()
            .starts_with("Reasoning (incomplete): → get_current_time")
    );
    assert_eq!(backend.calls(), 9);
}

// ── Retrieval tools ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_retrieval_feeds_the_answer() {
    let vector = Arc::new(InMemoryVectorStore::new());
    vector
        .add(Document::new("Tokio is an asynchronous runtime for Rust."))
        .await;
    let graph = Arc::new(InMemoryGraphStore::new());
    graph
        .add(GraphTriple::new("Tokio", "written_in", "Rust"))
        .await;

    let tools = default_registry(ToolContext {
        vector: Some(vector),
        graph: Some(graph),
        ..ToolContext::default()
    });
    let backend = ScriptedBackend::new(&[
        r#"{"tool": "hybrid_search", "arguments": {"query": "tokio runtime"}}"#,
        "Tokio is Rust's async runtime.",
    ]);
    let state = gateway(backend.clone(), tools);

    let task = send(&state, "What is Tokio?").await;
    let task = wait_terminal(&state, &task.id).await;

    assert_eq!(task.state(), TaskState::Completed);
    let observation = backend.prompt(1);
    assert!(observation.contains("[Tool: hybrid_search] Result:"));
    assert!(observation.contains("asynchronous runtime"));
    assert!(observation.contains("written_in"));
}

// ── Delegation between two agents over HTTP ──────────────────────────────

async fn spawn_peer(state: GatewayState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(Arc::new(state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn e2e_peer_delegation() {
    let peer_url = spawn_peer(gateway(
        ScriptedBackend::new(&["The finance team owns budget approvals."]),
        local_tools(),
    ))
    .await;

    let card = PeerClient::new(&peer_url, Duration::from_secs(5))
        .agent_card()
        .await
        .unwrap();
    assert_eq!(card.name, "agentmesh");

    let mut peers = AppConfig::default().peers;
    peers.poll_interval_ms = 20;
    peers.max_retries = 100;
    peers.directory.insert("finance".into(), peer_url.clone());

    let tools = default_registry(ToolContext {
        peers: Some(peers),
        ..ToolContext::default()
    });
    let backend = ScriptedBackend::new(&[
        r#"{"tool": "ask_peer_agent", "arguments": {"query": "Who approves budgets?", "domain": "finance"}}"#,
        "According to the finance agent, the finance team approves budgets.",
    ]);
    let state = gateway(backend.clone(), tools);

    let task = send(&state, "Who approves budgets?").await;
    let task = wait_terminal(&state, &task.id).await;

    assert_eq!(task.state(), TaskState::Completed);
    let calls = task.status.message.unwrap().metadata["tool_calls"].clone();
    assert_eq!(calls[0]["name"], "ask_peer_agent");
    assert_eq!(calls[0]["result"]["success"], true);
    assert_eq!(
        calls[0]["result"]["answer"],
        "The finance team owns budget approvals."
    );
    assert!(backend.prompt(1).contains("The finance team owns budget approvals."));
}

// ── HTTP surface ─────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_http_round_trip() {
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let state = Arc::new(gateway(ScriptedBackend::new(&["pong"]), local_tools()));
    let app = build_router(state.clone());

    let body = json!({
        "jsonrpc": "2.0",
        "id": 42,
        "method": "message/send",
        "params": {"message": {"parts": [{"text": "ping"}]}}
    });
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/a2a")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["id"], 42);

    let task_id = json["result"]["id"].as_str().unwrap();
    let task = wait_terminal(&state, task_id).await;
    assert_eq!(task.status.message.unwrap().first_text(), Some("pong"));
}
