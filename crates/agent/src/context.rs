//! The context window accumulated during one loop run.
//!
//! Entries are kept in arrival order. Rendering joins them with blank
//! lines; tool results carry a `[Tool: name] Result:` header so the
//! backend can tell observations apart from seed context.

use serde::Serialize;

const SEPARATOR: &str = "\n\n";
const ELISION: &str = "...";

/// Where a context entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "tool")]
pub enum ContextSource {
    Seed,
    Tool(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    pub source: ContextSource,
    pub content: String,
}

impl ContextEntry {
    fn header(&self) -> String {
        match &self.source {
            ContextSource::Seed => String::new(),
            ContextSource::Tool(name) => format!("[Tool: {name}] Result:\n"),
        }
    }

    pub fn render(&self) -> String {
        format!("{}{}", self.header(), self.content)
    }

    fn rendered_chars(&self) -> usize {
        self.header().chars().count() + self.content.chars().count()
    }

    /// Keep only the last `keep` characters of the content, marked as elided.
    fn tail(&self, keep: usize) -> Self {
        let total = self.content.chars().count();
        let tail: String = self.content.chars().skip(total.saturating_sub(keep)).collect();
        Self {
            source: self.source.clone(),
            content: format!("{ELISION}{tail}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextWindow {
    entries: Vec<ContextEntry>,
}

impl ContextWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// A window holding one seed entry. Blank seeds are dropped.
    pub fn with_seed(text: impl Into<String>) -> Self {
        let mut window = Self::new();
        window.push_seed(text);
        window
    }

    pub fn push_seed(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.trim().is_empty() {
            self.entries.push(ContextEntry {
                source: ContextSource::Seed,
                content: text,
            });
        }
    }

    pub fn push_tool_result(&mut self, tool: impl Into<String>, content: impl Into<String>) {
        self.entries.push(ContextEntry {
            source: ContextSource::Tool(tool.into()),
            content: content.into(),
        });
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Character count of [`render`](Self::render).
    pub fn total_chars(&self) -> usize {
        let body: usize = self.entries.iter().map(ContextEntry::rendered_chars).sum();
        body + SEPARATOR.len() * self.entries.len().saturating_sub(1)
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(ContextEntry::render)
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    /// A copy that renders to at most `max_chars` characters.
    ///
    /// The most recent entries are kept whole. The oldest entry that only
    /// partly fits is cut from the front; anything older is dropped.
    pub fn truncated(&self, max_chars: usize) -> Self {
        let mut kept = Vec::new();
        let mut used = 0;

        for entry in self.entries.iter().rev() {
            let separator = if kept.is_empty() { 0 } else { SEPARATOR.len() };
            let size = entry.rendered_chars();

            if used + separator + size <= max_chars {
                kept.push(entry.clone());
                used += separator + size;
                continue;
            }

            let overhead = used + separator + entry.header().chars().count() + ELISION.len();
            let room = max_chars.saturating_sub(overhead);
            if room > 0 {
                kept.push(entry.tail(room));
            }
            break;
        }

        kept.reverse();
        Self { entries: kept }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_seed_and_tool_entries() {
        let mut window = ContextWindow::with_seed("Rust is a systems language.");
        window.push_tool_result("calculate", r#"{"result":4}"#);

        assert_eq!(
            window.render(),
            "Rust is a systems language.\n\n[Tool: calculate] Result:\n{\"result\":4}"
        );
        assert_eq!(window.total_chars(), window.render().chars().count());
    }

    #[test]
    fn blank_seed_is_ignored() {
        assert!(ContextWindow::with_seed("   ").is_empty());
    }

    #[test]
    fn truncation_is_noop_when_it_fits() {
        let mut window = ContextWindow::with_seed("short");
        window.push_tool_result("t", "also short");
        assert_eq!(window.truncated(10_000), window);
    }

    #[test]
    fn truncation_keeps_recent_entries_whole() {
        let mut window = ContextWindow::new();
        window.push_tool_result("old", "a".repeat(500));
        window.push_tool_result("new", "latest observation");

        let cut = window.truncated(200);
        assert!(cut.total_chars() <= 200);
        assert_eq!(cut.len(), 2);
        assert_eq!(cut.entries()[1].content, "latest observation");
        assert!(cut.entries()[0].content.starts_with("..."));
        assert!(cut.entries()[0].content.ends_with('a'));
    }

    #[test]
    fn truncation_drops_entries_that_cannot_fit() {
        let mut window = ContextWindow::new();
        window.push_seed("x".repeat(100));
        window.push_tool_result("t", "y".repeat(100));

        let cut = window.truncated(60);
        assert!(cut.total_chars() <= 60);
        assert_eq!(cut.len(), 1);
        assert_eq!(cut.entries()[0].source, ContextSource::Tool("t".into()));
    }

    #[test]
    fn truncation_is_char_safe() {
        let window = ContextWindow::with_seed("héllo wörld ünïcode".repeat(10));
        let cut = window.truncated(25);
        assert!(cut.total_chars() <= 25);
    }
}
