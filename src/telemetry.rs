//! Telemetry metric name constants.
//!
//! Centralised metric names for orchestrator operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `consilium_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: provider name (e.g. "openai", "anthropic")
//! - `status`: outcome: "ok" or "error"
//! - `direction`: token direction: "prompt" or "completion"

/// Total provider call attempts made by the coordinator.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "consilium_requests_total";

/// Provider call duration in seconds.
///
/// Labels: `provider`.
pub const REQUEST_DURATION_SECONDS: &str = "consilium_request_duration_seconds";

/// Retry attempts (not counting the initial attempt).
///
/// Labels: `provider` (the provider the retry is sent to).
pub const RETRIES_TOTAL: &str = "consilium_retries_total";

/// Switches from one provider to a fallback provider.
///
/// Labels: `from`, `to`.
pub const FALLBACKS_TOTAL: &str = "consilium_fallbacks_total";

/// Total tokens consumed.
///
/// Labels: `provider`, `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "consilium_tokens_total";

/// Response cache hits.
pub const CACHE_HITS_TOTAL: &str = "consilium_cache_hits_total";

/// Response cache misses (including TTL expiries).
pub const CACHE_MISSES_TOTAL: &str = "consilium_cache_misses_total";

/// Response cache evictions.
///
/// Labels: `reason` ("ttl" | "capacity").
pub const CACHE_EVICTIONS_TOTAL: &str = "consilium_cache_evictions_total";

/// Circuit breaker state transitions.
///
/// Labels: `provider`, `to` ("closed" | "open" | "half_open").
pub const CIRCUIT_TRANSITIONS_TOTAL: &str = "consilium_circuit_transitions_total";

/// Startup / on-demand health probes.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const HEALTH_PROBES_TOTAL: &str = "consilium_health_probes_total";
