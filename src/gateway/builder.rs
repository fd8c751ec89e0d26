//! Builder for configuring orchestrator instances

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::orchestrator::Orchestrator;
use crate::Result;
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::{Config, Credentials};
use crate::providers::{
    AdapterConfig, AnthropicAdapter, BreakerConfig, CircuitBreakerRegistry, CohereAdapter,
    FallbackTable, GoogleAdapter, HealthConfig, HealthMonitor, OpenAiCompatibleAdapter,
    ProviderAdapter, ProviderRegistry, ProviderStats, RetryPolicy,
};
use crate::types::ProviderId;

enum PendingAdapter {
    Ready(Arc<dyn ProviderAdapter>),
    Remote(ProviderId, AdapterConfig),
}

/// Builder for [`Orchestrator`].
///
/// Providers are registered in call order, which is also the order used
/// when no provider is preferred:
///
/// ```rust,no_run
/// # use consilium::Orchestrator;
/// # fn main() -> consilium::Result<()> {
/// let orchestrator = Orchestrator::builder()
///     .openai("sk-...")
///     .anthropic("sk-ant-...")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct OrchestratorBuilder {
    adapters: Vec<PendingAdapter>,
    cache: Option<Arc<ResponseCache>>,
    cache_config: CacheConfig,
    breakers: Option<Arc<CircuitBreakerRegistry>>,
    breaker_config: BreakerConfig,
    stats: Option<Arc<ProviderStats>>,
    fallbacks: FallbackTable,
    retry: RetryPolicy,
    health: HealthConfig,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            cache: None,
            cache_config: CacheConfig::default(),
            breakers: None,
            breaker_config: BreakerConfig::default(),
            stats: None,
            fallbacks: FallbackTable::default(),
            retry: RetryPolicy::default(),
            health: HealthConfig::default(),
        }
    }

    /// Builder populated from a config file and environment credentials.
    ///
    /// Only providers with a credential are registered, in
    /// [`ProviderId::ALL`] order.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Self {
        let mut builder = Self::new()
            .cache_config(config.cache.clone())
            .breaker_config(config.breaker.clone())
            .retry_policy(config.retry.clone())
            .health_config(config.health.clone())
            .fallbacks(FallbackTable::default().merge(config.fallback.clone()));

        for id in credentials.configured() {
            let Some(key) = credentials.api_key(id) else {
                continue;
            };
            let settings = config.provider(id);
            let mut adapter = AdapterConfig::new(id, key);
            if let Some(url) = credentials.base_url(id).or(settings.base_url.as_deref()) {
                adapter = adapter.base_url(url);
            }
            if let Some(model) = settings.default_model {
                adapter = adapter.default_model(model);
            }
            if let Some(rate) = settings.cost_per_1k_tokens {
                adapter = adapter.cost_per_1k_tokens(rate);
            }
            if let Some(secs) = settings.timeout_secs {
                adapter = adapter.timeout(Duration::from_secs(secs));
            }
            builder = builder.provider(id, adapter);
        }
        builder
    }

    // -------------------------------------------------------------------------
    // Providers
    // -------------------------------------------------------------------------

    /// Register a ready-made adapter (custom backends, test doubles).
    pub fn adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(PendingAdapter::Ready(adapter));
        self
    }

    /// Register a built-in HTTP adapter for `id`.
    pub fn provider(mut self, id: ProviderId, config: AdapterConfig) -> Self {
        self.adapters.push(PendingAdapter::Remote(id, config));
        self
    }

    pub fn openai(self, api_key: impl Into<String>) -> Self {
        self.provider(ProviderId::OpenAi, AdapterConfig::new(ProviderId::OpenAi, api_key))
    }

    pub fn anthropic(self, api_key: impl Into<String>) -> Self {
        self.provider(
            ProviderId::Anthropic,
            AdapterConfig::new(ProviderId::Anthropic, api_key),
        )
    }

    pub fn google(self, api_key: impl Into<String>) -> Self {
        self.provider(ProviderId::Google, AdapterConfig::new(ProviderId::Google, api_key))
    }

    pub fn mistral(self, api_key: impl Into<String>) -> Self {
        self.provider(
            ProviderId::Mistral,
            AdapterConfig::new(ProviderId::Mistral, api_key),
        )
    }

    pub fn cohere(self, api_key: impl Into<String>) -> Self {
        self.provider(ProviderId::Cohere, AdapterConfig::new(ProviderId::Cohere, api_key))
    }

    // -------------------------------------------------------------------------
    // Shared state
    // -------------------------------------------------------------------------

    /// Use an existing cache instead of building one from the cache config.
    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Use an existing breaker table instead of building one from the breaker config.
    pub fn breakers(mut self, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        self.breakers = Some(breakers);
        self
    }

    pub fn breaker_config(mut self, config: BreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    pub fn stats(mut self, stats: Arc<ProviderStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    // -------------------------------------------------------------------------
    // Policies
    // -------------------------------------------------------------------------

    pub fn fallbacks(mut self, table: FallbackTable) -> Self {
        self.fallbacks = table;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn health_config(mut self, config: HealthConfig) -> Self {
        self.health = config;
        self
    }

    /// Build the orchestrator.
    ///
    /// Fails only if an HTTP client cannot be constructed.
    pub fn build(self) -> Result<Orchestrator> {
        let mut registry = ProviderRegistry::new();
        for pending in self.adapters {
            let adapter = match pending {
                PendingAdapter::Ready(adapter) => adapter,
                PendingAdapter::Remote(id, config) => build_adapter(id, config)?,
            };
            registry.register(adapter);
        }

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(ResponseCache::new(&self.cache_config)));
        let breakers = self
            .breakers
            .unwrap_or_else(|| Arc::new(CircuitBreakerRegistry::new(self.breaker_config)));
        let stats = self.stats.unwrap_or_default();
        for id in registry.ids() {
            breakers.register(id);
            stats.register(id);
        }
        debug!(providers = ?registry, "orchestrator built");

        Ok(Orchestrator {
            registry,
            cache,
            breakers,
            stats,
            fallbacks: self.fallbacks,
            retry: self.retry,
            monitor: HealthMonitor::new(self.health),
        })
    }
}

fn build_adapter(id: ProviderId, config: AdapterConfig) -> Result<Arc<dyn ProviderAdapter>> {
    Ok(match id {
        ProviderId::OpenAi => Arc::new(OpenAiCompatibleAdapter::openai(config)?),
        ProviderId::Mistral => Arc::new(OpenAiCompatibleAdapter::mistral(config)?),
        ProviderId::Anthropic => Arc::new(AnthropicAdapter::new(config)?),
        ProviderId::Google => Arc::new(GoogleAdapter::new(config)?),
        ProviderId::Cohere => Arc::new(CohereAdapter::new(config)?),
    })
}
