//! In-memory task store.
//!
//! All mutations go through one write lock, so the check-then-set of a
//! transition is atomic: a late completion can never overwrite `CANCELLED`.

use agentmesh_core::event::{DomainEvent, EventBus};
use agentmesh_core::message::Message;
use agentmesh_core::task::{Artifact, Task, TaskState, TaskStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Result of a [`TaskStore::transition`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied { from: TaskState },
    UnknownTask,
    Rejected { current: TaskState },
}

impl TransitionOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Default)]
struct Inner {
    tasks: HashMap<String, Task>,
    /// Task ids in creation order
    order: Vec<String>,
}

pub struct TaskStore {
    inner: RwLock<Inner>,
    events: Arc<EventBus>,
}

impl TaskStore {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            events,
        }
    }

    /// The bus task events are published on.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Create a task in `SUBMITTED`. A context id is generated when none is given.
    pub async fn create(&self, context_id: Option<String>) -> Task {
        let task = Task::new(context_id);
        {
            let mut inner = self.inner.write().await;
            inner.order.push(task.id.clone());
            inner.tasks.insert(task.id.clone(), task.clone());
        }

        debug!(task_id = %task.id, context_id = %task.context_id, "Task created");
        self.events.publish(DomainEvent::TaskCreated {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            timestamp: Utc::now(),
        });
        task
    }

    /// Append a message to a task's history, stamping the task and context ids.
    pub async fn append_message(&self, task_id: &str, mut message: Message) {
        let mut inner = self.inner.write().await;
        match inner.tasks.get_mut(task_id) {
            Some(task) => {
                stamp(task, &mut message);
                task.history.push(message);
            }
            None => debug!(task_id, "append_message on unknown task ignored"),
        }
    }

    pub async fn transition(
        &self,
        task_id: &str,
        new_state: TaskState,
        message: Option<Message>,
    ) -> TransitionOutcome {
        self.transition_with_artifacts(task_id, new_state, message, Vec::new())
            .await
    }

    /// Like [`transition`](Self::transition), attaching artifacts only if
    /// the transition is applied.
    pub async fn transition_with_artifacts(
        &self,
        task_id: &str,
        new_state: TaskState,
        message: Option<Message>,
        artifacts: Vec<Artifact>,
    ) -> TransitionOutcome {
        let outcome = {
            let mut inner = self.inner.write().await;
            let Some(task) = inner.tasks.get_mut(task_id) else {
                warn!(task_id, to = %new_state, "Transition requested for unknown task");
                return TransitionOutcome::UnknownTask;
            };

            let current = task.state();
            if !current.can_transition_to(new_state) {
                return TransitionOutcome::Rejected { current };
            }

            let message = message.map(|mut m| {
                stamp(task, &mut m);
                task.history.push(m.clone());
                m
            });
            task.status = TaskStatus {
                state: new_state,
                message,
                timestamp: Utc::now(),
            };
            task.artifacts.extend(artifacts);
            TransitionOutcome::Applied { from: current }
        };

        if let TransitionOutcome::Applied { from } = outcome {
            info!(task_id, %from, to = %new_state, "Task transitioned");
            self.events.publish(DomainEvent::TaskTransitioned {
                task_id: task_id.to_string(),
                from,
                to: new_state,
                timestamp: Utc::now(),
            });
        }
        outcome
    }

    pub async fn get(&self, task_id: &str) -> Option<Task> {
        self.inner.read().await.tasks.get(task_id).cloned()
    }

    /// The `limit` most recently created tasks, oldest first.
    pub async fn list(&self, limit: usize) -> Vec<Task> {
        let inner = self.inner.read().await;
        let skip = inner.order.len().saturating_sub(limit);
        inner.order[skip..]
            .iter()
            .filter_map(|id| inner.tasks.get(id).cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::default()))
    }
}

fn stamp(task: &Task, message: &mut Message) {
    message.task_id.get_or_insert_with(|| task.id.clone());
    message
        .context_id
        .get_or_insert_with(|| task.context_id.clone());
}
