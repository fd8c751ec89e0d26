//! Scripted provider adapters shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use consilium::providers::ProviderAdapter;
use consilium::{AiResponse, ConsiliumError, GenerateRequest, ProviderFailure, ProviderId, Result};

/// Adapter that fails a fixed number of times, then answers `content`.
pub struct MockAdapter {
    id: ProviderId,
    content: String,
    failures_left: AtomicU32,
    always_fail: bool,
    failure: ProviderFailure,
    calls: AtomicU32,
    probe_fails: bool,
    probe_delay: Option<Duration>,
}

impl MockAdapter {
    fn build(id: ProviderId, content: &str, failures: u32, always_fail: bool) -> Self {
        Self {
            id,
            content: content.to_string(),
            failures_left: AtomicU32::new(failures),
            always_fail,
            failure: ProviderFailure::Api {
                status: 500,
                message: "internal error".to_string(),
            },
            calls: AtomicU32::new(0),
            probe_fails: false,
            probe_delay: None,
        }
    }

    /// Always answers `content`.
    pub fn ok(id: ProviderId, content: &str) -> Arc<Self> {
        Arc::new(Self::build(id, content, 0, false))
    }

    /// Always fails with an HTTP 500.
    pub fn failing(id: ProviderId) -> Arc<Self> {
        Arc::new(Self::build(id, "", 0, true))
    }

    /// Always fails with `failure`.
    pub fn failing_with(id: ProviderId, failure: ProviderFailure) -> Arc<Self> {
        let mut adapter = Self::build(id, "", 0, true);
        adapter.failure = failure;
        Arc::new(adapter)
    }

    /// Fails `failures` times, then answers `content`.
    pub fn fail_then_ok(id: ProviderId, failures: u32, content: &str) -> Arc<Self> {
        Arc::new(Self::build(id, content, failures, false))
    }

    /// Answers generation calls but fails every health probe.
    pub fn ok_with_failing_probe(id: ProviderId, content: &str) -> Arc<Self> {
        let mut adapter = Self::build(id, content, 0, false);
        adapter.probe_fails = true;
        Arc::new(adapter)
    }

    /// Answers generation calls but probes hang for `delay`.
    pub fn ok_with_slow_probe(id: ProviderId, delay: Duration) -> Arc<Self> {
        let mut adapter = Self::build(id, "slow", 0, false);
        adapter.probe_delay = Some(delay);
        Arc::new(adapter)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn execute(&self, request: &GenerateRequest) -> Result<AiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail {
            return Err(ConsiliumError::provider(self.id, self.failure.clone()));
        }
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Err(ConsiliumError::provider(self.id, self.failure.clone()));
        }
        Ok(AiResponse::new(
            self.id,
            request.model_or(self.default_model()),
            self.content.clone(),
        ))
    }

    async fn probe(&self) -> Result<()> {
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        if self.probe_fails {
            return Err(ConsiliumError::provider(self.id, ProviderFailure::Timeout));
        }
        Ok(())
    }
}
