//! Domain event system: decoupled communication between bounded contexts.
//!
//! Events are published when something interesting happens in the system:
//! a task changes state, a tool runs, the backend is called. Other
//! components subscribe to react without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::task::TaskState;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A task was accepted
    TaskCreated {
        task_id: String,
        context_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A task moved between states
    TaskTransitioned {
        task_id: String,
        from: TaskState,
        to: TaskState,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The reasoning backend was called
    BackendCalled {
        backend: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Short snake_case name, used as the SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::TaskCreated { .. } => "task_created",
            DomainEvent::TaskTransitioned { .. } => "task_transitioned",
            DomainEvent::ToolExecuted { .. } => "tool_executed",
            DomainEvent::BackendCalled { .. } => "backend_called",
            DomainEvent::ErrorOccurred { .. } => "error_occurred",
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
