//! Query analysis and planning tools.
//!
//! Rule-based heuristics the reasoning backend can consult before choosing a
//! retrieval strategy. None of them call the backend themselves. Scores are
//! placeholder confidences, not calibrated probabilities.

use agentmesh_core::error::ToolError;
use agentmesh_core::tool::{FnTool, ToolCategory, ToolParameter};
use serde::Serialize;
use serde_json::Value;

const FACTUAL_WORDS: &[&str] = &["what", "who", "when", "where"];
const EXPLANATORY_WORDS: &[&str] = &["how", "why", "explain"];
const COMPARATIVE_WORDS: &[&str] = &["compare", "difference", "vs"];

/// Domain label and the words that suggest it.
const DOMAINS: &[(&str, &[&str])] = &[
    ("learning", &["learn", "training", "education"]),
    ("engineering", &["code", "python", "java", "api"]),
    ("machine-learning", &["model", "ai", "ml", "network"]),
];

/// Domains better served by a peer agent than by local retrieval.
const EXTERNAL_DOMAINS: &[&str] = &["machine-learning", "artificial-intelligence"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    pub query_type: &'static str,
    pub complexity: &'static str,
    pub domains: Vec<&'static str>,
    pub word_count: usize,
    pub suggested_strategies: Vec<&'static str>,
    pub analysis_complete: bool,
}

pub fn analyze_query(query: &str) -> QueryAnalysis {
    let lower = query.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();
    let has_any = |set: &[&str]| words.iter().any(|w| set.contains(w));

    let query_type = if has_any(FACTUAL_WORDS) {
        "factual"
    } else if has_any(EXPLANATORY_WORDS) {
        "explanatory"
    } else if has_any(COMPARATIVE_WORDS) {
        "comparative"
    } else {
        "general"
    };

    let word_count = query.split_whitespace().count();
    let complexity = if word_count > 20 || words.contains(&"and") {
        "complex"
    } else {
        "simple"
    };

    let domains = DOMAINS
        .iter()
        .filter(|(_, keywords)| has_any(*keywords))
        .map(|(domain, _)| *domain)
        .collect();

    let suggested_strategies = if complexity == "complex" {
        vec!["vector", "graph"]
    } else {
        vec!["vector"]
    };

    QueryAnalysis {
        query_type,
        complexity,
        domains,
        word_count,
        suggested_strategies,
        analysis_complete: true,
    }
}

/// Score each strategy and pick the best; earlier strategies win ties.
pub fn select_strategy(query_type: &str, complexity: &str, domains: &[String]) -> Value {
    let mut scores: [(&str, f64); 4] = [
        ("vector", 0.5),
        ("graph", 0.3),
        ("hybrid", 0.4),
        ("cross-agent", 0.0),
    ];

    match query_type {
        "factual" => scores[0].1 += 0.3,
        "explanatory" | "comparative" => {
            scores[1].1 += 0.3;
            scores[2].1 += 0.2;
        }
        _ => {}
    }
    if complexity == "complex" {
        scores[1].1 += 0.2;
        scores[2].1 += 0.3;
    }
    if domains.iter().any(|d| EXTERNAL_DOMAINS.contains(&d.as_str())) {
        scores[3].1 += 0.8;
    }

    let mut best = scores[0];
    for candidate in &scores[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }

    let score_map: serde_json::Map<String, Value> = scores
        .iter()
        .map(|(name, score)| (name.to_string(), Value::from(round2(*score))))
        .collect();

    serde_json::json!({
        "selected_strategy": best.0,
        "scores": score_map,
        "rationale": format!("Selected '{}' for {}/{} query.", best.0, query_type, complexity),
        "fallback_strategy": "vector",
    })
}

pub fn evaluate_context(context_count: u64, avg_relevance: f64) -> Value {
    let is_sufficient = context_count >= 2 && avg_relevance >= 0.5;

    let (recommendation, action) = if context_count == 0 {
        ("no_results", "Try different keywords or broader query")
    } else if avg_relevance < 0.3 {
        ("low_relevance", "Refine query to be more specific")
    } else if context_count < 2 {
        ("few_results", "Try hybrid strategy or cross-agent")
    } else {
        ("sufficient", "Proceed to answer generation")
    };

    let quality = ((context_count as f64 / 5.0) * 0.5 + avg_relevance * 0.5).min(1.0);

    serde_json::json!({
        "is_sufficient": is_sufficient,
        "recommendation": recommendation,
        "action": action,
        "quality_score": round2(quality),
    })
}

pub fn refine_query(original: &str, issue: &str) -> Value {
    let (refined, suggestion) = match issue {
        "no_results" => (
            original.split_whitespace().take(5).collect::<Vec<_>>().join(" "),
            "Use broader terms",
        ),
        "low_relevance" => (
            format!("{original} definition explanation"),
            "Add context words",
        ),
        _ if original.to_lowercase().starts_with("explain") => {
            (original.to_string(), "Rephrase as explanation")
        }
        _ => (format!("explain {original}"), "Rephrase as explanation"),
    };

    serde_json::json!({
        "original_query": original,
        "refined_query": refined,
        "suggestion": suggestion,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ── Tool wrappers ─────────────────────────────────────────────────────────

fn str_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    args[name]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{name}' argument")))
}

/// Numbers sometimes arrive as strings from the backend.
fn num_arg(args: &Value, name: &str) -> Result<f64, ToolError> {
    match &args[name] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| ToolError::InvalidArguments(format!("'{name}' must be a number")))
}

fn string_list(args: &Value, name: &str) -> Vec<String> {
    args[name]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn analysis_tools() -> Vec<FnTool> {
    vec![
        FnTool::sync(
            "analyze_query",
            "Analyze the user's query to understand intent, complexity, and key domains.",
            ToolCategory::Computation,
            vec![ToolParameter::new("query", "string", "The user's input query")],
            |args| {
                let analysis = analyze_query(str_arg(&args, "query")?);
                serde_json::to_value(analysis).map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "analyze_query".into(),
                    reason: e.to_string(),
                })
            },
        ),
        FnTool::sync(
            "select_strategy",
            "Select the best retrieval strategy based on query analysis.",
            ToolCategory::Utility,
            vec![
                ToolParameter::new("query_type", "string", "Query type from analyze_query")
                    .with_enum(&["factual", "explanatory", "comparative", "general"]),
                ToolParameter::new("complexity", "string", "Query complexity")
                    .with_enum(&["simple", "complex"]),
                ToolParameter::new("domains", "array", "List of detected domains").optional(),
            ],
            |args| {
                Ok(select_strategy(
                    str_arg(&args, "query_type")?,
                    str_arg(&args, "complexity")?,
                    &string_list(&args, "domains"),
                ))
            },
        ),
        FnTool::sync(
            "evaluate_context",
            "Evaluate if the retrieved context is sufficient to answer the query.",
            ToolCategory::Utility,
            vec![
                ToolParameter::new("query", "string", "The original query").optional(),
                ToolParameter::new("context_count", "integer", "Number of context chunks retrieved"),
                ToolParameter::new("avg_relevance", "number", "Average relevance score (0-1)"),
            ],
            |args| {
                let count = num_arg(&args, "context_count")?.max(0.0) as u64;
                let relevance = num_arg(&args, "avg_relevance")?.clamp(0.0, 1.0);
                Ok(evaluate_context(count, relevance))
            },
        ),
        FnTool::sync(
            "refine_query",
            "Refine the query to improve retrieval results.",
            ToolCategory::Utility,
            vec![
                ToolParameter::new("original_query", "string", "The original query"),
                ToolParameter::new("issue", "string", "What went wrong with the last retrieval")
                    .with_enum(&["no_results", "low_relevance", "few_results"]),
            ],
            |args| {
                Ok(refine_query(
                    str_arg(&args, "original_query")?,
                    str_arg(&args, "issue")?,
                ))
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentmesh_core::tool::Tool;

    #[test]
    fn classifies_query_types() {
        assert_eq!(analyze_query("What is Rust?").query_type, "factual");
        assert_eq!(analyze_query("Explain ownership").query_type, "explanatory");
        assert_eq!(analyze_query("Rust vs Go").query_type, "comparative");
        assert_eq!(analyze_query("Tell me a story").query_type, "general");
    }

    #[test]
    fn domain_words_match_whole_words() {
        let analysis = analyze_query("Explain how to train a model with python");
        assert_eq!(analysis.domains, vec!["engineering", "machine-learning"]);

        // "explain" contains "ai" but is not the word "ai"
        assert!(analyze_query("explain").domains.is_empty());
    }

    #[test]
    fn conjunction_makes_query_complex() {
        let analysis = analyze_query("Compare tokio and async-std");
        assert_eq!(analysis.complexity, "complex");
        assert_eq!(analysis.suggested_strategies, vec!["vector", "graph"]);
        assert_eq!(analysis.word_count, 4);

        let simple = analyze_query("What is tokio?");
        assert_eq!(simple.complexity, "simple");
        assert_eq!(simple.suggested_strategies, vec!["vector"]);
    }

    #[test]
    fn factual_simple_prefers_vector() {
        let result = select_strategy("factual", "simple", &[]);
        assert_eq!(result["selected_strategy"], "vector");
        assert_eq!(result["scores"]["vector"], 0.8);
        assert_eq!(result["fallback_strategy"], "vector");
    }

    #[test]
    fn explanatory_complex_prefers_hybrid() {
        let result = select_strategy("explanatory", "complex", &[]);
        assert_eq!(result["selected_strategy"], "hybrid");
    }

    #[test]
    fn external_domain_prefers_cross_agent() {
        let result = select_strategy("general", "simple", &["machine-learning".to_string()]);
        assert_eq!(result["selected_strategy"], "cross-agent");
    }

    #[test]
    fn context_sufficiency() {
        let good = evaluate_context(3, 0.8);
        assert_eq!(good["is_sufficient"], true);
        assert_eq!(good["recommendation"], "sufficient");
        assert_eq!(good["quality_score"], 0.7);

        assert_eq!(evaluate_context(0, 0.0)["recommendation"], "no_results");
        assert_eq!(evaluate_context(4, 0.1)["recommendation"], "low_relevance");
        assert_eq!(evaluate_context(1, 0.9)["recommendation"], "few_results");
        assert_eq!(evaluate_context(10, 1.0)["quality_score"], 1.0);
    }

    #[test]
    fn query_refinement() {
        let broad = refine_query("one two three four five six seven", "no_results");
        assert_eq!(broad["refined_query"], "one two three four five");

        let ctx = refine_query("borrow checker", "low_relevance");
        assert_eq!(ctx["refined_query"], "borrow checker definition explanation");

        assert_eq!(refine_query("lifetimes", "few_results")["refined_query"], "explain lifetimes");
        assert_eq!(
            refine_query("Explain lifetimes", "few_results")["refined_query"],
            "Explain lifetimes"
        );
    }

    #[tokio::test]
    async fn evaluate_context_accepts_string_numbers() {
        let tools = analysis_tools();
        let tool = tools.iter().find(|t| t.name() == "evaluate_context").unwrap();
        let value = tool
            .execute(serde_json::json!({"context_count": "2", "avg_relevance": 0.5}))
            .await
            .unwrap();
        assert_eq!(value["is_sufficient"], true);
    }

    #[tokio::test]
    async fn missing_argument_is_invalid() {
        let tools = analysis_tools();
        let tool = tools.iter().find(|t| t.name() == "analyze_query").unwrap();
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
