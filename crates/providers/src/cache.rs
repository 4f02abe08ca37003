//! Response cache: memoizes identical prompts in memory.
//!
//! Keys are the SHA-256 of `model::temperature::prompt`. Entries are evicted
//! oldest-first once `capacity` is reached. Errors are never cached.

use agentmesh_core::ReasoningBackend;
use agentmesh_core::error::BackendError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct CachedBackend {
    inner: Arc<dyn ReasoningBackend>,
    capacity: usize,
    entries: Mutex<CacheEntries>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Default)]
struct CacheEntries {
    map: HashMap<String, String>,
    order: VecDeque<String>,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CachedBackend {
    pub fn new(inner: Arc<dyn ReasoningBackend>, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            entries: Mutex::new(CacheEntries::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(&self, prompt: &str, temperature: f32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.inner.model().as_bytes());
        hasher.update(b"::");
        hasher.update(temperature.to_bits().to_le_bytes());
        hasher.update(b"::");
        hasher.update(prompt.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.map.get(key).cloned()
    }

    fn insert(&self, key: String, value: String) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.map.contains_key(&key) {
            return;
        }
        while entries.order.len() >= self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.map.remove(&oldest);
            }
        }
        entries.order.push_back(key.clone());
        entries.map.insert(key, value);
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().map(|e| e.map.len()).unwrap_or(0);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}

#[async_trait]
impl ReasoningBackend for CachedBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, BackendError> {
        let key = self.key(prompt, temperature);

        if let Some(hit) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(backend = %self.inner.name(), "Response cache hit");
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let text = self.inner.generate(prompt, temperature).await?;
        self.insert(key, text.clone());
        Ok(text)
    }

    async fn health_check(&self) -> Result<bool, BackendError> {
        self.inner.health_check().await
    }
}
