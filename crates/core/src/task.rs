//! Task domain types and the task state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Message, Part};

/// Lifecycle state of a task.
///
/// ```text
/// SUBMITTED ──► WORKING ──► COMPLETED
///     │            │  ╲───► FAILED
///     │            │   ╲──► CANCELLED
///     │            ▼
///     │      INPUT_REQUIRED ──► WORKING | FAILED | CANCELLED
///     └──► FAILED | CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    #[serde(rename = "TASK_STATE_SUBMITTED")]
    Submitted,
    #[serde(rename = "TASK_STATE_WORKING")]
    Working,
    #[serde(rename = "TASK_STATE_INPUT_REQUIRED")]
    InputRequired,
    #[serde(rename = "TASK_STATE_COMPLETED")]
    Completed,
    #[serde(rename = "TASK_STATE_FAILED")]
    Failed,
    #[serde(rename = "TASK_STATE_CANCELLED")]
    Cancelled,
}

impl TaskState {
    /// Terminal states are never left.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        match self {
            Submitted => matches!(next, Working | Failed | Cancelled),
            Working => matches!(next, Completed | Failed | Cancelled | InputRequired),
            InputRequired => matches!(next, Working | Failed | Cancelled),
            Completed | Failed | Cancelled => false,
        }
    }

    /// The wire name, e.g. `TASK_STATE_WORKING`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "TASK_STATE_SUBMITTED",
            Self::Working => "TASK_STATE_WORKING",
            Self::InputRequired => "TASK_STATE_INPUT_REQUIRED",
            Self::Completed => "TASK_STATE_COMPLETED",
            Self::Failed => "TASK_STATE_FAILED",
            Self::Cancelled => "TASK_STATE_CANCELLED",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of a task plus when it was entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,

    /// Message attached to the most recent transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    pub timestamp: DateTime<Utc>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Utc::now(),
        }
    }
}

/// An output payload produced by a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub parts: Vec<Part>,
}

impl Artifact {
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            artifact_id: Uuid::new_v4().to_string(),
            name: Some(name.into()),
            parts: vec![Part::text(text)],
        }
    }
}

/// A unit of work tracked from submission to a terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    /// Correlation id grouping related tasks
    pub context_id: String,

    pub status: TaskStatus,

    /// Append-only; the first entry is the originating user message
    #[serde(default)]
    pub history: Vec<Message>,

    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    /// A fresh task in `SUBMITTED`. A context id is generated when none is given.
    pub fn new(context_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            context_id: context_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            status: TaskStatus::new(TaskState::Submitted),
            history: Vec::new(),
            artifacts: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn state(&self) -> TaskState {
        self.status.state
    }

    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskState; 6] = [
        TaskState::Submitted,
        TaskState::Working,
        TaskState::InputRequired,
        TaskState::Completed,
        TaskState::Failed,
        TaskState::Cancelled,
    ];

    #[test]
    fn terminal_states_are_never_left() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn happy_path_transitions() {
        assert!(TaskState::Submitted.can_transition_to(TaskState::Working));
        assert!(TaskState::Working.can_transition_to(TaskState::Completed));
        assert!(TaskState::Working.can_transition_to(TaskState::Failed));
        assert!(TaskState::Working.can_transition_to(TaskState::Cancelled));
    }

    #[test]
    fn cannot_skip_working() {
        assert!(!TaskState::Submitted.can_transition_to(TaskState::Completed));
        assert!(!TaskState::Working.can_transition_to(TaskState::Submitted));
    }

    #[test]
    fn state_wire_names_match_display() {
        for state in ALL {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json, state.as_str());
        }
    }

    #[test]
    fn new_task_is_submitted_with_context() {
        let task = Task::new(None);
        assert_eq!(task.state(), TaskState::Submitted);
        assert!(!task.context_id.is_empty());
        assert!(task.history.is_empty());

        let task = Task::new(Some("ctx-7".into()));
        assert_eq!(task.context_id, "ctx-7");
    }

    #[test]
    fn task_serializes_camel_case() {
        let task = Task::new(Some("c".into()));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["contextId"], "c");
        assert_eq!(json["status"]["state"], "TASK_STATE_SUBMITTED");
    }
}
