//! In-memory knowledge stores backing the retrieval tools.
//!
//! Both stores hold their data in a `tokio::sync::RwLock<Vec<_>>` and are
//! meant for tests, demos and small corpora loaded at startup.

pub mod graph;
pub mod vector;

pub use graph::InMemoryGraphStore;
pub use vector::InMemoryVectorStore;

/// Lower-cased alphanumeric terms of a text, short stopwords dropped.
pub(crate) fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_split_and_lowercase() {
        assert_eq!(terms("What is Rust's ownership?"), vec!["what", "rust", "ownership"]);
        assert!(terms("a b c").is_empty());
    }
}
