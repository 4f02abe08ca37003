//! Shared test helpers for loop tests.

use agentmesh_core::backend::ReasoningBackend;
use agentmesh_core::error::BackendError;
use std::sync::Mutex;

/// A mock backend that returns a sequence of scripted replies.
///
/// Each call to `generate` returns the next reply in the queue and records
/// the prompt it was given. Panics if more calls are made than replies
/// provided, unless built with [`repeating`](Self::repeating).
pub struct SequentialMockBackend {
    replies: Mutex<Vec<Result<String, BackendError>>>,
    prompts: Mutex<Vec<String>>,
    repeat_last: bool,
}

impl SequentialMockBackend {
    pub fn new(replies: Vec<Result<String, BackendError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
            repeat_last: false,
        }
    }

    pub fn texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Returns the same reply forever.
    pub fn repeating(reply: &str) -> Self {
        Self {
            repeat_last: true,
            ..Self::texts(&[reply])
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ReasoningBackend for SequentialMockBackend {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String, BackendError> {
        let mut prompts = self.prompts.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        let call = prompts.len();
        prompts.push(prompt.to_string());

        let index = if self.repeat_last {
            call.min(replies.len() - 1)
        } else {
            call
        };
        match replies.get(index) {
            Some(reply) => reply.clone(),
            None => panic!(
                "SequentialMockBackend: no more replies (call #{call}, have {})",
                replies.len()
            ),
        }
    }
}

/// Backend whose every call fails.
pub fn failing_backend(error: BackendError) -> SequentialMockBackend {
    SequentialMockBackend {
        repeat_last: true,
        ..SequentialMockBackend::new(vec![Err(error)])
    }
}
