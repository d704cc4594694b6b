use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::Generator;
use crate::prompts::RenderedRequest;

type Responder = dyn Fn(&str) -> Result<String> + Send + Sync;

/// A scripted generator for tests. Answers each request with a closure and
/// records how many calls were made and how many overlapped.
pub struct MockGenerator {
    respond: Box<Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockGenerator {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Reply with the rendered request's `"task"` field, or fail on tasks
    /// listed in `failing`.
    pub fn task_field(failing: &[&str]) -> Self {
        let failing: Vec<String> = failing.iter().map(|s| s.to_string()).collect();
        Self::new(move |request| {
            let value: serde_json::Value = serde_json::from_str(request)?;
            let task = value
                .get("task")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow::anyhow!("MockGenerator: request has no task field"))?;
            if failing.iter().any(|f| f == task) {
                anyhow::bail!("MockGenerator: scripted failure for {}", task);
            }
            Ok(task.to_uppercase())
        })
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: &RenderedRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.respond)(request.as_str());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
