//! Background execution of the agentic loop for a task.

use crate::store::{TaskStore, TransitionOutcome};
use agentmesh_agent::{AgentOutcome, AgentResponse, AgenticLoop};
use agentmesh_core::event::DomainEvent;
use agentmesh_core::message::Message;
use agentmesh_core::task::{Artifact, TaskState};
use serde_json::Value;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const TOOL_JSON_PREFIX: &str =
    "I attempted to use a tool but encountered a parsing error. However, here is what I found: ";

/// Runs the loop for accepted tasks and records the outcome in the store.
#[derive(Clone)]
pub struct TaskProcessor {
    store: Arc<TaskStore>,
    agent: Arc<AgenticLoop>,
    max_runtime: Option<Duration>,
}

impl TaskProcessor {
    pub fn new(store: Arc<TaskStore>, agent: Arc<AgenticLoop>) -> Self {
        Self {
            store,
            agent,
            max_runtime: None,
        }
    }

    /// Fail tasks whose loop runs longer than this.
    pub fn with_max_runtime(mut self, limit: Option<Duration>) -> Self {
        self.max_runtime = limit;
        self
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Start processing without waiting for the outcome.
    pub fn spawn(&self, task_id: String, query: String) -> JoinHandle<()> {
        let processor = self.clone();
        tokio::spawn(async move { processor.process(task_id, query).await })
    }

    async fn process(self, task_id: String, query: String) {
        let agent = self.agent.clone();
        let run = tokio::spawn(async move { agent.run(&query).await });
        let abort = run.abort_handle();

        let joined = match self.max_runtime {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    warn!(task_id = %task_id, limit_secs = limit.as_secs(), "Task exceeded maximum runtime");
                    let reason = format!("Task exceeded maximum runtime of {}s", limit.as_secs());
                    self.report_error(&task_id, &reason);
                    self.finish(&task_id, TaskState::Failed, reason, Vec::new()).await;
                    return;
                }
            },
            None => run.await,
        };

        match joined {
            Ok(response) => self.record(&task_id, response).await,
            Err(e) => {
                error!(task_id = %task_id, error = %e, "Agentic loop aborted");
                self.report_error(&task_id, &e.to_string());
                self.finish(
                    &task_id,
                    TaskState::Failed,
                    "Internal error while processing task".into(),
                    Vec::new(),
                )
                .await;
            }
        }
    }

    async fn record(&self, task_id: &str, response: AgentResponse) {
        if let AgentOutcome::BackendFailed { error } = &response.outcome {
            warn!(task_id, error = %error, "Task failed in reasoning backend");
            self.report_error(task_id, error);
            self.finish(task_id, TaskState::Failed, response.answer, Vec::new())
                .await;
            return;
        }

        let answer = clean_answer(&response.answer);
        let message = Message::agent(answer.clone())
            .with_metadata("reasoning_trace", Value::from(response.reasoning_trace.clone()))
            .with_metadata(
                "tool_calls",
                serde_json::to_value(&response.tool_calls).unwrap_or_default(),
            )
            .with_metadata("iterations", Value::from(response.iterations))
            .with_metadata("incomplete", Value::from(response.is_incomplete()));

        self.apply(
            task_id,
            TaskState::Completed,
            message,
            vec![Artifact::text("answer", answer)],
        )
        .await;
    }

    fn report_error(&self, task_id: &str, message: &str) {
        self.store.events().publish(DomainEvent::ErrorOccurred {
            context: format!("task:{task_id}"),
            error_message: message.to_string(),
            timestamp: Utc::now(),
        });
    }

    async fn finish(&self, task_id: &str, state: TaskState, text: String, artifacts: Vec<Artifact>) {
        self.apply(task_id, state, Message::agent(text), artifacts).await;
    }

    async fn apply(&self, task_id: &str, state: TaskState, message: Message, artifacts: Vec<Artifact>) {
        match self
            .store
            .transition_with_artifacts(task_id, state, Some(message), artifacts)
            .await
        {
            TransitionOutcome::Applied { .. } => {}
            TransitionOutcome::Rejected { current } => {
                info!(task_id, %current, "Task already settled; discarding result");
            }
            TransitionOutcome::UnknownTask => {}
        }
    }
}

/// Replies that still look like a tool invocation get an explanatory prefix.
fn clean_answer(answer: &str) -> String {
    if answer.trim_start().starts_with('{') && answer.contains("\"tool\":") {
        format!("{TOOL_JSON_PREFIX}{answer}")
    } else {
        answer.to_string()
    }
}
