//! Current date and time (UTC).

use agentmesh_core::tool::{FnTool, ToolCategory};
use chrono::{DateTime, Utc};

pub fn clock_tool() -> FnTool {
    FnTool::sync(
        "get_current_time",
        "Get the current date and time in UTC.",
        ToolCategory::Utility,
        Vec::new(),
        |_args| Ok(describe(Utc::now())),
    )
}

fn describe(now: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "datetime": now.to_rfc3339(),
        "date": now.format("%Y-%m-%d").to_string(),
        "time": now.format("%H:%M:%S").to_string(),
        "day_of_week": now.format("%A").to_string(),
        "timezone": "UTC",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmesh_core::tool::Tool;
    use chrono::TimeZone;

    #[test]
    fn formats_fixed_instant() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 5).unwrap();
        let value = describe(instant);
        assert_eq!(value["date"], "2024-03-15");
        assert_eq!(value["time"], "09:30:05");
        assert_eq!(value["day_of_week"], "Friday");
        assert_eq!(value["timezone"], "UTC");
    }

    #[tokio::test]
    async fn tool_takes_no_arguments() {
        let tool = clock_tool();
        assert!(tool.parameters().is_empty());
        let value = tool.execute(serde_json::json!({})).await.unwrap();
        assert!(value["datetime"].as_str().unwrap().contains('T'));
    }
}
