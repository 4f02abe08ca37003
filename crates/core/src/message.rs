//! Message domain types.
//!
//! A `Message` is one turn of an exchange on a task. It flows from the caller
//! into the task history, and from the agentic loop back out as the reply.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The caller submitting work
    #[default]
    #[serde(rename = "ROLE_USER", alias = "user")]
    User,
    /// The agent answering
    #[serde(rename = "ROLE_AGENT", alias = "agent")]
    Agent,
}

/// A unit of message content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Plain text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Structured content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }
}

/// A single turn of the exchange.
///
/// Inbound messages are accepted leniently: a missing `messageId` is filled
/// in by the dispatcher and a missing `role` defaults to `ROLE_USER`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub message_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// The task this message belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub parts: Vec<Part>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    fn with_role(role: Role, text: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            context_id: None,
            task_id: None,
            role,
            parts: vec![Part::text(text)],
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a new user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, text)
    }

    /// Create a new agent message with a single text part.
    pub fn agent(text: impl Into<String>) -> Self {
        Self::with_role(Role::Agent, text)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// All text parts joined by newlines. `None` when there are no text parts.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }

    /// The first text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| p.text.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_names() {
        assert_eq!(serde_json::to_value(Role::User).unwrap(), "ROLE_USER");
        assert_eq!(serde_json::to_value(Role::Agent).unwrap(), "ROLE_AGENT");
        let lower: Role = serde_json::from_value(serde_json::json!("agent")).unwrap();
        assert_eq!(lower, Role::Agent);
    }

    #[test]
    fn lenient_inbound_message() {
        let msg: Message =
            serde_json::from_value(serde_json::json!({"parts": [{"text": "2+2"}]})).unwrap();
        assert!(msg.message_id.is_empty());
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text().as_deref(), Some("2+2"));
    }

    #[test]
    fn text_joins_only_text_parts() {
        let mut msg = Message::user("first");
        msg.parts.push(Part::data(serde_json::json!({"k": 1})));
        msg.parts.push(Part::text("second"));
        assert_eq!(msg.text().as_deref(), Some("first\nsecond"));
        assert_eq!(msg.first_text(), Some("first"));
    }

    #[test]
    fn no_text_parts_yields_none() {
        let mut msg = Message::user("x");
        msg.parts = vec![Part::data(serde_json::json!(1))];
        assert!(msg.text().is_none());
    }

    #[test]
    fn camel_case_serialization() {
        let mut msg = Message::agent("hi");
        msg.task_id = Some("t-1".into());
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("messageId").is_some());
        assert_eq!(json["taskId"], "t-1");
        assert!(json.get("metadata").is_none());
    }
}
