//! HTTP gateway for agentmesh.
//!
//! Exposes the JSON-RPC task protocol, the agent discovery document, a
//! health check, the tool catalogue and a server-sent stream of domain
//! events.
//!
//! Built on Axum for high performance async HTTP.

pub mod card;
pub mod rpc;

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::http::{Method, header};
use axum::{
    Router,
    extract::State,
    response::Json,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use agentmesh_agent::AgenticLoop;
use agentmesh_config::AppConfig;
use agentmesh_core::backend::ReasoningBackend;
use agentmesh_core::card::{AgentCard, WELL_KNOWN_PATH};
use agentmesh_core::event::EventBus;
use agentmesh_core::rpc::JsonRpcResponse;
use agentmesh_core::tool::{ToolDescriptor, ToolRegistry};
use agentmesh_tasks::{TaskProcessor, TaskStore};
use agentmesh_tools::{ToolContext, default_registry};

pub use rpc::Dispatcher;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub dispatcher: Dispatcher,
    pub card: AgentCard,
    pub tools: Arc<ToolRegistry>,
    pub events: Arc<EventBus>,
    pub rpc_path: String,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Wire the loop, store and dispatcher around an existing backend and
    /// tool registry.
    pub fn new(
        config: &AppConfig,
        backend: Arc<dyn ReasoningBackend>,
        tools: Arc<ToolRegistry>,
        events: Arc<EventBus>,
    ) -> Self {
        let agent = AgenticLoop::from_config(
            backend,
            tools.clone(),
            &config.agent_loop,
            config.backend.temperature,
        )
        .with_event_bus(events.clone());

        let store = Arc::new(TaskStore::new(events.clone()));
        let processor = TaskProcessor::new(store, Arc::new(agent))
            .with_max_runtime(config.tasks.max_runtime_secs.map(Duration::from_secs));

        Self {
            dispatcher: Dispatcher::new(processor, &config.tasks),
            card: card::agent_card(config),
            tools,
            events,
            rpc_path: config.gateway.rpc_path.clone(),
        }
    }

    /// Build every subsystem from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let backend = agentmesh_providers::build_from_config(config);
        let tools = Arc::new(default_registry(ToolContext::from_config(config)));
        Self::new(config, backend, tools, Arc::new(EventBus::default()))
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS (any origin, GET and POST)
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route(&state.rpc_path, post(rpc_handler))
        .route(WELL_KNOWN_PATH, get(card_handler))
        .route("/health", get(health_handler))
        .route("/v1/tools", get(tools_handler))
        .route("/v1/events", get(events_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(GatewayState::from_config(&config));
    serve(&config, state).await
}

/// Serve an already-built state on the configured address.
pub async fn serve(config: &AppConfig, state: SharedState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    info!(
        addr = %addr,
        rpc_path = %state.rpc_path,
        tools = state.tools.len(),
        "Gateway starting"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

// --- Handlers ---

/// The body is taken as raw bytes so malformed JSON still gets a
/// JSON-RPC parse error rather than an HTTP rejection.
async fn rpc_handler(State(state): State<SharedState>, body: Bytes) -> Json<JsonRpcResponse> {
    Json(state.dispatcher.handle_bytes(&body).await)
}

async fn card_handler(State(state): State<SharedState>) -> Json<AgentCard> {
    Json(state.card.clone())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolDescriptor>,
    count: usize,
}

async fn tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools = state.tools.describe_all();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

async fn events_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event| {
            let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
            Ok(SseEvent::default().event(event.kind()).data(data))
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
