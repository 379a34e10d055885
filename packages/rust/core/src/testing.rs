//! Scripted [`GenerativeModel`] double for orchestration tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use listscribe_genai::GenerativeModel;
use listscribe_shared::{ListscribeError, Result};

/// Returns queued responses in order; calls past the end of a queue fail.
/// Call counters let tests assert "the model was never consulted".
#[derive(Default)]
pub struct MockModel {
    content: Mutex<VecDeque<Result<String>>>,
    json: Mutex<VecDeque<Result<String>>>,
    counts: Mutex<VecDeque<Result<u64>>>,
    content_calls: AtomicUsize,
    json_calls: AtomicUsize,
    count_calls: AtomicUsize,
}

impl MockModel {
    pub fn push_content(&self, response: Result<String>) {
        self.content.lock().unwrap().push_back(response);
    }

    pub fn push_json(&self, response: Result<String>) {
        self.json.lock().unwrap().push_back(response);
    }

    pub fn push_count(&self, response: Result<u64>) {
        self.counts.lock().unwrap().push_back(response);
    }

    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::Relaxed)
    }

    pub fn json_calls(&self) -> usize {
        self.json_calls.load(Ordering::Relaxed)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::Relaxed)
    }
}

fn pop<T>(queue: &Mutex<VecDeque<Result<T>>>, what: &str) -> Result<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(ListscribeError::GenAi(format!("mock {what} queue exhausted"))))
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate_content(&self, _prompt: &str) -> Result<String> {
        self.content_calls.fetch_add(1, Ordering::Relaxed);
        pop(&self.content, "content")
    }

    async fn generate_json(&self, _prompt: &str) -> Result<String> {
        self.json_calls.fetch_add(1, Ordering::Relaxed);
        pop(&self.json, "json")
    }

    async fn count_tokens(&self, _prompt: &str) -> Result<u64> {
        self.count_calls.fetch_add(1, Ordering::Relaxed);
        pop(&self.counts, "count")
    }
}
