//! Provider health: counters and the startup probe.
//!
//! [`ProviderStats`] holds the per-provider request/error counters and the
//! coarse `healthy` gate. [`HealthMonitor`] fills that gate by probing every
//! registered adapter once, concurrently, with a bounded fan-out and a
//! per-probe timeout. A slow or failing probe never blocks the others.
//!
//! Live traffic only moves the counters and the circuit breakers; the
//! `healthy` flag changes only when a probe runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::StreamExt;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::registry::ProviderRegistry;
use crate::telemetry;
use crate::types::ProviderId;

// =============================================================================
// Counters
// =============================================================================

#[derive(Debug)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
    healthy: AtomicBool,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            healthy: AtomicBool::new(true),
        }
    }
}

/// Point-in-time copy of one provider's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderCounters {
    pub request_count: u64,
    pub error_count: u64,
    pub healthy: bool,
}

/// Per-provider request/error counters and health flag.
///
/// Counters are monotonic for the life of the process.
#[derive(Debug, Default)]
pub struct ProviderStats {
    counters: DashMap<ProviderId, Counters>,
}

impl ProviderStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `provider`; new providers are healthy.
    pub fn register(&self, provider: ProviderId) {
        self.counters.entry(provider).or_default();
    }

    pub fn record_request(&self, provider: ProviderId) {
        self.counters
            .entry(provider)
            .or_default()
            .requests
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, provider: ProviderId) {
        self.counters
            .entry(provider)
            .or_default()
            .errors
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_healthy(&self, provider: ProviderId, healthy: bool) {
        self.counters
            .entry(provider)
            .or_default()
            .healthy
            .store(healthy, Ordering::Relaxed);
    }

    /// Health gate for `provider`. Untracked providers count as unhealthy.
    pub fn is_healthy(&self, provider: ProviderId) -> bool {
        self.counters
            .get(&provider)
            .is_some_and(|c| c.healthy.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self, provider: ProviderId) -> Option<ProviderCounters> {
        self.counters.get(&provider).map(|c| ProviderCounters {
            request_count: c.requests.load(Ordering::Relaxed),
            error_count: c.errors.load(Ordering::Relaxed),
            healthy: c.healthy.load(Ordering::Relaxed),
        })
    }

    pub fn total_requests(&self) -> u64 {
        self.counters
            .iter()
            .map(|c| c.requests.load(Ordering::Relaxed))
            .sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.counters
            .iter()
            .map(|c| c.errors.load(Ordering::Relaxed))
            .sum()
    }
}

// =============================================================================
// Probing
// =============================================================================

/// Probe fan-out settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Upper bound on one probe. Default: 30 seconds.
    #[serde(rename = "probe_timeout_secs", deserialize_with = "crate::serde_util::duration_secs")]
    pub probe_timeout: Duration,
    /// Probes in flight at once. Default: 5.
    pub max_concurrent_probes: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(30),
            max_concurrent_probes: 5,
        }
    }
}

/// Runs liveness probes against registered adapters.
#[derive(Debug, Clone, Default)]
pub struct HealthMonitor {
    config: HealthConfig,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Probe every registered adapter and record the outcome in `stats`.
    ///
    /// Always completes; failures and timeouts mark the provider unhealthy.
    pub async fn probe_all(
        &self,
        registry: &ProviderRegistry,
        stats: &ProviderStats,
    ) -> BTreeMap<ProviderId, bool> {
        let probe_timeout = self.config.probe_timeout;
        let outcomes: Vec<(ProviderId, bool)> = stream::iter(registry.iter())
            .map(|(id, adapter)| async move {
                let healthy = match tokio::time::timeout(probe_timeout, adapter.probe()).await {
                    Ok(Ok(())) => {
                        debug!(provider = %id, "health probe ok");
                        true
                    }
                    Ok(Err(e)) => {
                        warn!(provider = %id, error = %e, "health probe failed");
                        false
                    }
                    Err(_) => {
                        warn!(
                            provider = %id,
                            timeout_secs = probe_timeout.as_secs(),
                            "health probe timed out"
                        );
                        false
                    }
                };
                (id, healthy)
            })
            .buffer_unordered(self.config.max_concurrent_probes.max(1))
            .collect()
            .await;

        let mut results = BTreeMap::new();
        for (id, healthy) in outcomes {
            stats.set_healthy(id, healthy);
            metrics::counter!(telemetry::HEALTH_PROBES_TOTAL,
                "provider" => id.as_str(),
                "status" => if healthy { "ok" } else { "error" },
            )
            .increment(1);
            results.insert(id, healthy);
        }

        let healthy = results.values().filter(|h| **h).count();
        info!(healthy, total = results.len(), "health probe complete");
        results
    }
}
