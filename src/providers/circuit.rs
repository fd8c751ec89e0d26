//! Per-provider circuit breakers.
//!
//! Each provider gets one breaker, created `Closed`:
//!
//! ```text
//!            failure_count reaches threshold
//!   Closed ───────────────────────────────────► Open
//!     ▲                                          │
//!     │ success                 timeout elapsed  │ (checked in can_execute)
//!     │                                          ▼
//!     └──────────────────────────────────────  HalfOpen
//!                 failure ──► back to Open, last failure refreshed
//! ```
//!
//! `can_execute`, `record_success` and `record_failure` are the only
//! mutators; a successful call is the only way back to `Closed`.
//!
//! `HalfOpen` admits a single trial call. Further callers are refused until
//! the trial's outcome is recorded. A trial whose outcome never arrives
//! (its future was dropped) is abandoned after one more `timeout`, and the
//! next caller becomes the trial.
//!
//! [`CircuitBreakerRegistry::permits`] answers the same question without
//! taking the trial slot, for provider selection.
//!
//! Breakers live in a [`DashMap`], so an update locks a single provider's
//! entry and never serializes unrelated providers.

use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::telemetry;
use crate::types::ProviderId;

/// Breaker state for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// Calls are rejected until the timeout elapses.
    Open,
    /// One trial call decides between `Closed` and `Open`.
    HalfOpen,
}

impl CircuitState {
    fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Breaker tuning shared by every provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit. Default: 5.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls. Default: 60 seconds.
    #[serde(rename = "timeout_secs", deserialize_with = "crate::serde_util::duration_secs")]
    pub timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
struct Breaker {
    failure_count: u32,
    state: CircuitState,
    last_failure: Option<Instant>,
    /// Admission time of the outstanding half-open trial.
    trial_started: Option<Instant>,
}

impl Breaker {
    fn open_timed_out(&self, timeout: Duration) -> bool {
        self.last_failure.is_none_or(|at| at.elapsed() > timeout)
    }

    fn trial_slot_free(&self, timeout: Duration) -> bool {
        self.trial_started.is_none_or(|at| at.elapsed() > timeout)
    }
}

impl Default for Breaker {
    fn default() -> Self {
        Self {
            failure_count: 0,
            state: CircuitState::Closed,
            last_failure: None,
            trial_started: None,
        }
    }
}

/// Read-only view of one breaker, for health reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    /// Milliseconds since the last recorded failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_ms_ago: Option<u64>,
}

/// Breaker table keyed by provider.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<ProviderId, Breaker>,
    config: BreakerConfig,
}

impl CircuitBreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Create a closed breaker for `provider` if it has none yet.
    pub fn register(&self, provider: ProviderId) {
        self.breakers.entry(provider).or_default();
    }

    /// Admit a call to `provider`, or refuse it.
    ///
    /// An open breaker whose timeout has elapsed moves to `HalfOpen` and
    /// admits this caller as the trial. While that trial is outstanding
    /// every other caller is refused.
    pub fn can_execute(&self, provider: ProviderId) -> bool {
        let timeout = self.config.timeout;
        let mut breaker = self.breakers.entry(provider).or_default();
        match breaker.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                let free = breaker.trial_slot_free(timeout);
                if free {
                    breaker.trial_started = Some(Instant::now());
                    debug!(provider = %provider, "half-open trial slot reclaimed");
                }
                free
            }
            CircuitState::Open => {
                let timed_out = breaker.open_timed_out(timeout);
                if timed_out {
                    breaker.state = CircuitState::HalfOpen;
                    breaker.trial_started = Some(Instant::now());
                    record_transition(provider, CircuitState::HalfOpen);
                    info!(provider = %provider, "circuit half-open, allowing trial call");
                }
                timed_out
            }
        }
    }

    /// Whether [`can_execute`](Self::can_execute) would admit a call now.
    ///
    /// Never changes state and never takes the half-open trial slot.
    pub fn permits(&self, provider: ProviderId) -> bool {
        let timeout = self.config.timeout;
        self.breakers.get(&provider).is_none_or(|b| match b.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => b.trial_slot_free(timeout),
            CircuitState::Open => b.open_timed_out(timeout),
        })
    }

    /// Record a successful call: resets the breaker to `Closed`.
    pub fn record_success(&self, provider: ProviderId) {
        let mut breaker = self.breakers.entry(provider).or_default();
        if breaker.state != CircuitState::Closed {
            record_transition(provider, CircuitState::Closed);
            info!(provider = %provider, from = breaker.state.as_str(), "circuit closed");
        }
        breaker.failure_count = 0;
        breaker.state = CircuitState::Closed;
        breaker.trial_started = None;
    }

    /// Record a failed call.
    ///
    /// Opens the circuit when the threshold is reached, or immediately when
    /// the failed call was a half-open trial.
    pub fn record_failure(&self, provider: ProviderId) {
        let mut breaker = self.breakers.entry(provider).or_default();
        breaker.failure_count = breaker.failure_count.saturating_add(1);
        breaker.last_failure = Some(Instant::now());
        breaker.trial_started = None;

        let opens = match breaker.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => breaker.failure_count >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if opens {
            breaker.state = CircuitState::Open;
            record_transition(provider, CircuitState::Open);
            warn!(
                provider = %provider,
                failure_count = breaker.failure_count,
                timeout_secs = self.config.timeout.as_secs(),
                "circuit opened"
            );
        }
    }

    /// Current state of `provider`'s breaker, if one exists.
    pub fn snapshot(&self, provider: ProviderId) -> Option<BreakerSnapshot> {
        self.breakers.get(&provider).map(|b| BreakerSnapshot {
            state: b.state,
            failure_count: b.failure_count,
            last_failure_ms_ago: b.last_failure.map(|at| at.elapsed().as_millis() as u64),
        })
    }

    /// Current state of `provider`'s breaker (`Closed` if never seen).
    pub fn state(&self, provider: ProviderId) -> CircuitState {
        self.breakers
            .get(&provider)
            .map_or(CircuitState::Closed, |b| b.state)
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

fn record_transition(provider: ProviderId, to: CircuitState) {
    metrics::counter!(telemetry::CIRCUIT_TRANSITIONS_TOTAL,
        "provider" => provider.as_str(),
        "to" => to.as_str(),
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed_and_executable() {
        let registry = CircuitBreakerRegistry::default();
        registry.register(ProviderId::OpenAi);
        assert!(registry.can_execute(ProviderId::OpenAi));
        assert_eq!(registry.state(ProviderId::OpenAi), CircuitState::Closed);
        assert_eq!(
            registry.snapshot(ProviderId::OpenAi).unwrap().failure_count,
            0
        );
    }

    #[test]
    fn stays_closed_below_threshold() {
        let registry = CircuitBreakerRegistry::default();
        for _ in 0..4 {
            registry.record_failure(ProviderId::Google);
        }
        assert_eq!(registry.state(ProviderId::Google), CircuitState::Closed);
        assert!(registry.can_execute(ProviderId::Google));
    }

    #[test]
    fn success_resets_failure_count() {
        let registry = CircuitBreakerRegistry::default();
        for _ in 0..4 {
            registry.record_failure(ProviderId::Google);
        }
        registry.record_success(ProviderId::Google);
        registry.record_failure(ProviderId::Google);
        assert_eq!(registry.state(ProviderId::Google), CircuitState::Closed);
        assert_eq!(
            registry.snapshot(ProviderId::Google).unwrap().failure_count,
            1
        );
    }

    #[test]
    fn breakers_are_independent() {
        let registry = CircuitBreakerRegistry::default();
        for _ in 0..5 {
            registry.record_failure(ProviderId::Mistral);
        }
        assert!(!registry.can_execute(ProviderId::Mistral));
        assert!(registry.can_execute(ProviderId::Cohere));
    }

    #[test]
    fn permits_does_not_mutate() {
        let registry = CircuitBreakerRegistry::default();
        assert!(registry.permits(ProviderId::Cohere));
        for _ in 0..5 {
            registry.record_failure(ProviderId::Cohere);
        }
        assert!(!registry.permits(ProviderId::Cohere));
        assert_eq!(registry.state(ProviderId::Cohere), CircuitState::Open);
    }

    #[test]
    fn config_parses_from_toml() {
        let config: BreakerConfig = toml::from_str("failure_threshold = 3\ntimeout_secs = 10").unwrap();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
