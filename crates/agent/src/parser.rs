//! Classify a backend reply as a tool invocation or a final answer.
//!
//! A reply is a tool call only when it is a single JSON object of the form
//! `{"tool": "<name>", "arguments": {...}}`, optionally wrapped in a
//! ```` ```json ```` (or bare ```` ``` ````) fence. Anything else, including
//! JSON with extra keys or prose around the object, is a final answer.

use serde_json::{Map, Value};

/// A tool invocation extracted from a backend reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
}

const FENCE: &str = "```";

/// Returns `Some` only for a well-formed tool invocation.
pub fn parse_tool_call(response: &str) -> Option<ParsedToolCall> {
    let candidate = fenced_body(response).unwrap_or(response).trim();
    if !candidate.starts_with('{') {
        return None;
    }

    let Value::Object(mut object) = serde_json::from_str::<Value>(candidate).ok()? else {
        return None;
    };

    if object.keys().any(|k| k != "tool" && k != "arguments") {
        return None;
    }

    let name = match object.remove("tool")? {
        Value::String(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => return None,
    };

    let arguments = match object.remove("arguments") {
        None => Map::new(),
        Some(Value::Object(args)) => args,
        Some(_) => return None,
    };

    Some(ParsedToolCall { name, arguments })
}

/// Body of the first fenced block, if the reply contains one.
fn fenced_body(response: &str) -> Option<&str> {
    let start = response.find(FENCE)? + FENCE.len();
    let rest = &response[start..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find(FENCE).unwrap_or(rest.len());
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object_is_a_call() {
        let call = parse_tool_call(r#"{"tool": "calculate", "arguments": {"expression": "2+2"}}"#).unwrap();
        assert_eq!(call.name, "calculate");
        assert_eq!(call.arguments["expression"], "2+2");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let call = parse_tool_call("\n   {\"tool\": \"get_current_time\"}  \n").unwrap();
        assert_eq!(call.name, "get_current_time");
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn json_fence_is_unwrapped() {
        let reply = "```json\n{\"tool\": \"search_vector\", \"arguments\": {\"query\": \"rust\"}}\n```";
        let call = parse_tool_call(reply).unwrap();
        assert_eq!(call.name, "search_vector");
        assert_eq!(call.arguments["query"], "rust");
    }

    #[test]
    fn bare_fence_is_unwrapped() {
        let reply = "Let me check.\n```\n{\"tool\": \"get_current_time\", \"arguments\": {}}\n```";
        assert_eq!(parse_tool_call(reply).unwrap().name, "get_current_time");
    }

    #[test]
    fn prose_is_an_answer() {
        assert!(parse_tool_call("The answer is 4.").is_none());
        assert!(parse_tool_call("").is_none());
    }

    #[test]
    fn object_with_trailing_prose_is_an_answer() {
        assert!(parse_tool_call(r#"{"tool": "calculate"} and then some"#).is_none());
    }

    #[test]
    fn extra_keys_are_an_answer() {
        assert!(parse_tool_call(r#"{"tool": "calculate", "arguments": {}, "why": "math"}"#).is_none());
        assert!(parse_tool_call(r#"{"answer": "4"}"#).is_none());
    }

    #[test]
    fn malformed_fields_are_an_answer() {
        assert!(parse_tool_call(r#"{"tool": ""}"#).is_none());
        assert!(parse_tool_call(r#"{"tool": 42}"#).is_none());
        assert!(parse_tool_call(r#"{"tool": "calculate", "arguments": "2+2"}"#).is_none());
        assert!(parse_tool_call(r#"{"tool": "calculate", "arguments": {"#).is_none());
        assert!(parse_tool_call(r#"["tool", "calculate"]"#).is_none());
    }

    #[test]
    fn other_language_fence_is_an_answer() {
        assert!(parse_tool_call("```python\nprint('hi')\n```").is_none());
    }
}
