//! The orchestrator: provider selection, retry and fallback.
//!
//! # Request flow
//!
//! ```text
//! generate_text(prompt, options)
//!        │
//!        ▼
//!   sanitize ──► cache lookup ──► hit: return (cached = true)
//!                     │ miss
//!                     ▼
//!   select provider: preferred if healthy + breaker allows,
//!                    else first registered healthy + allowed
//!                     │
//!                     ▼
//!   ┌──► breaker denies? ──► switch to fallback, or CircuitOpen
//!   │    (a half-open breaker admits one trial call at a time)
//!   │         │
//!   │         ▼
//!   │    adapter.execute ──► ok: record_success, cache, return
//!   │         │ err
//!   │         ▼
//!   │    record_failure; attempts left?
//!   │      fallback exists: backoff 2^attempt, switch provider
//!   └───── otherwise: fixed delay, same provider
//! ```
//!
//! Exhausting `retry_count` attempts returns the last provider error.
//! A `model` in the options is sent only to the provider it was asked of;
//! fallback providers use their configured default model.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::analysis::{self, AnalysisType, ContractAnalysisResult};
use crate::cache::{CacheKey, ResponseCache};
use crate::providers::{
    CircuitBreakerRegistry, CircuitState, FallbackTable, HealthMonitor, ProviderRegistry,
    ProviderStats, RetryPolicy,
};
use crate::sanitize::sanitize;
use crate::telemetry;
use crate::types::{AiResponse, GenerateRequest, ProviderId, RequestOptions, Usage};
use crate::{ConsiliumError, Result};

use super::builder::OrchestratorBuilder;

/// Routes generation requests across registered providers.
///
/// Built with [`Orchestrator::builder`]. Shared state (cache, breakers,
/// counters) is held in `Arc`s so several orchestrators, or a test, can
/// observe the same instances.
pub struct Orchestrator {
    pub(super) registry: ProviderRegistry,
    pub(super) cache: Arc<ResponseCache>,
    pub(super) breakers: Arc<CircuitBreakerRegistry>,
    pub(super) stats: Arc<ProviderStats>,
    pub(super) fallbacks: FallbackTable,
    pub(super) retry: RetryPolicy,
    pub(super) monitor: HealthMonitor,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Generate text for `prompt`, retrying and falling back as configured.
    #[instrument(
        skip(self, prompt, options),
        fields(preferred = ?options.provider, retry_count = options.retry_count)
    )]
    pub async fn generate_text(&self, prompt: &str, options: &RequestOptions) -> Result<AiResponse> {
        let prompt = sanitize(prompt)?;

        let key = options.use_cache.then(|| CacheKey::new(&prompt, options));
        if let Some(hit) = key.as_ref().and_then(|k| self.cache.get(k)) {
            debug!(provider = %hit.provider, "served from cache");
            return Ok(hit);
        }

        let mut current = self.select_provider(options)?;
        // A requested model only means something to the provider it was chosen for.
        let model_owner = options.provider.unwrap_or(current);
        let request = GenerateRequest::from_options(&prompt, options);
        let default_model_request = GenerateRequest {
            model: None,
            ..request.clone()
        };
        let attempts = options.retry_count.max(1);
        let mut last_err = None;

        for attempt in 0..attempts {
            current = self.admit(current, options)?;

            let adapter = self
                .registry
                .get(current)
                .ok_or(ConsiliumError::NoProviderAvailable)?;
            if attempt > 0 {
                metrics::counter!(telemetry::RETRIES_TOTAL, "provider" => current.as_str())
                    .increment(1);
            }

            self.stats.record_request(current);
            let start = Instant::now();
            let outgoing = if current == model_owner {
                &request
            } else {
                &default_model_request
            };
            match adapter.execute(outgoing).await {
                Ok(mut response) => {
                    record_request(current, start, true);
                    if let Some(usage) = response.metadata.usage {
                        record_token_usage(current, &usage);
                    }
                    self.breakers.record_success(current);
                    response.processing_time_ms = start.elapsed().as_millis() as u64;
                    response.cached = false;
                    if let Some(key) = key {
                        self.cache.put(key, response.clone());
                    }
                    debug!(
                        provider = %current,
                        attempt,
                        processing_time_ms = response.processing_time_ms,
                        "generation succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    record_request(current, start, false);
                    self.stats.record_error(current);
                    self.breakers.record_failure(current);
                    warn!(
                        provider = %current,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "provider call failed"
                    );

                    if attempt + 1 < attempts {
                        match self.fallback_for(current, options) {
                            Some(next) => {
                                let delay = self.retry.backoff_for_attempt(attempt);
                                debug!(from = %current, to = %next, delay_ms = delay.as_millis() as u64, "backing off before fallback");
                                tokio::time::sleep(delay).await;
                                record_fallback(current, next);
                                current = next;
                            }
                            None => {
                                let delay = self.retry.retry_delay;
                                debug!(provider = %current, delay_ms = delay.as_millis() as u64, "retrying same provider");
                                tokio::time::sleep(delay).await;
                            }
                        }
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or(ConsiliumError::NoProviderAvailable))
    }

    /// Whether `id` is registered, healthy and would be admitted by its breaker.
    ///
    /// Does not take a half-open trial slot; [`admit`](Self::admit) does.
    pub(super) fn is_available(&self, id: ProviderId) -> bool {
        self.registry.contains(id) && self.stats.is_healthy(id) && self.breakers.permits(id)
    }

    /// Pass `current` through its breaker, or the first fallback whose breaker admits.
    fn admit(&self, current: ProviderId, options: &RequestOptions) -> Result<ProviderId> {
        if self.breakers.can_execute(current) {
            return Ok(current);
        }
        if options.allow_fallback {
            for next in self.fallbacks.chain(current).iter().copied() {
                if self.registry.contains(next)
                    && self.stats.is_healthy(next)
                    && self.breakers.can_execute(next)
                {
                    record_fallback(current, next);
                    info!(from = %current, to = %next, "circuit open, switching provider");
                    return Ok(next);
                }
            }
        }
        Err(ConsiliumError::CircuitOpen { provider: current })
    }

    fn select_provider(&self, options: &RequestOptions) -> Result<ProviderId> {
        if let Some(preferred) = options.provider {
            if self.is_available(preferred) {
                return Ok(preferred);
            }
            if !options.allow_fallback {
                // Registered and healthy means the breaker said no.
                return Err(
                    if self.registry.contains(preferred) && self.stats.is_healthy(preferred) {
                        ConsiliumError::CircuitOpen {
                            provider: preferred,
                        }
                    } else {
                        ConsiliumError::NoProviderAvailable
                    },
                );
            }
            debug!(preferred = %preferred, "preferred provider unavailable");
        }

        self.registry
            .ids()
            .find(|id| self.is_available(*id))
            .ok_or(ConsiliumError::NoProviderAvailable)
    }

    fn fallback_for(&self, current: ProviderId, options: &RequestOptions) -> Option<ProviderId> {
        if !options.allow_fallback {
            return None;
        }
        self.fallbacks
            .chain(current)
            .iter()
            .copied()
            .find(|id| self.is_available(*id))
    }

    // =========================================================================
    // Contract analysis
    // =========================================================================

    /// Analyze contract `text`, on one provider or by consensus.
    ///
    /// A reply that is not valid analysis JSON is kept as a raw-text summary
    /// with `structured = false`.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn analyze_contract(
        &self,
        text: &str,
        analysis_type: AnalysisType,
        use_consensus: bool,
    ) -> Result<ContractAnalysisResult> {
        if text.trim().is_empty() {
            return Err(ConsiliumError::InvalidInput(
                "contract text is empty".to_string(),
            ));
        }
        let prompt = analysis::build_prompt(text, analysis_type);

        if use_consensus {
            let consensus = self.analyze_with_consensus(&prompt).await?;
            return Ok(ContractAnalysisResult {
                analysis_type,
                analysis: consensus.analysis,
                providers: consensus.providers,
                confidence: Some(consensus.confidence),
                structured: consensus.structured,
            });
        }

        let response = self
            .generate_text(&prompt, &RequestOptions::default())
            .await?;
        let (analysis, structured) = analysis::read_reply(&response.content);
        Ok(ContractAnalysisResult {
            analysis_type,
            analysis,
            providers: vec![response.provider],
            confidence: None,
            structured,
        })
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Run the startup health probe across all registered providers.
    pub async fn initialize(&self) -> BTreeMap<ProviderId, bool> {
        info!(providers = self.registry.len(), "probing providers");
        self.monitor.probe_all(&self.registry, &self.stats).await
    }

    /// Probe every provider again and replace the health flags.
    pub async fn refresh_health(&self) -> BTreeMap<ProviderId, bool> {
        self.monitor.probe_all(&self.registry, &self.stats).await
    }

    /// Snapshot of provider health, breaker state and counters.
    pub fn health_status(&self) -> HealthReport {
        let providers: BTreeMap<ProviderId, ProviderHealth> = self
            .registry
            .ids()
            .map(|id| {
                let counters = self.stats.snapshot(id);
                let breaker = self.breakers.snapshot(id);
                let health = ProviderHealth {
                    healthy: self.stats.is_healthy(id),
                    circuit_state: breaker.as_ref().map_or(CircuitState::Closed, |b| b.state),
                    failure_count: breaker.as_ref().map_or(0, |b| b.failure_count),
                    request_count: counters.map_or(0, |c| c.request_count),
                    error_count: counters.map_or(0, |c| c.error_count),
                };
                (id, health)
            })
            .collect();

        let healthy = providers.values().filter(|p| p.healthy).count();
        let overall_status = match healthy {
            0 => OverallStatus::Unhealthy,
            n if n == providers.len() => OverallStatus::Healthy,
            _ => OverallStatus::Degraded,
        };

        HealthReport {
            overall_status,
            providers,
            cache_size: self.cache.len(),
            total_requests: self.stats.total_requests(),
            total_errors: self.stats.total_errors(),
        }
    }

    /// Registered providers in registration order.
    pub fn providers(&self) -> Vec<ProviderId> {
        self.registry.ids().collect()
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    pub fn stats(&self) -> &Arc<ProviderStats> {
        &self.stats
    }
}

/// Aggregate health across registered providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Every registered provider is healthy.
    Healthy,
    /// Some, but not all, registered providers are healthy.
    Degraded,
    /// No provider is healthy, or none is registered.
    Unhealthy,
}

/// Per-provider entry of a [`HealthReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderHealth {
    pub healthy: bool,
    pub circuit_state: CircuitState,
    pub failure_count: u32,
    pub request_count: u64,
    pub error_count: u64,
}

/// Result of [`Orchestrator::health_status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub overall_status: OverallStatus,
    pub providers: BTreeMap<ProviderId, ProviderHealth>,
    pub cache_size: usize,
    pub total_requests: u64,
    pub total_errors: u64,
}

// =============================================================================
// Metrics helpers
// =============================================================================

fn record_request(provider: ProviderId, start: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "provider" => provider.as_str(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
        "provider" => provider.as_str(),
    )
    .record(start.elapsed().as_secs_f64());
}

fn record_token_usage(provider: ProviderId, usage: &Usage) {
    metrics::counter!(telemetry::TOKENS_TOTAL,
        "provider" => provider.as_str(),
        "direction" => "prompt",
    )
    .increment(u64::from(usage.prompt_tokens));
    metrics::counter!(telemetry::TOKENS_TOTAL,
        "provider" => provider.as_str(),
        "direction" => "completion",
    )
    .increment(u64::from(usage.completion_tokens));
}

fn record_fallback(from: ProviderId, to: ProviderId) {
    metrics::counter!(telemetry::FALLBACKS_TOTAL,
        "from" => from.as_str(),
        "to" => to.as_str(),
    )
    .increment(1);
}
