//! Provider adapters and the per-provider reliability state around them.
//!
//! - [`traits`]: the [`ProviderAdapter`] capability trait.
//! - [`openai`], [`anthropic`], [`google`], [`cohere`]: HTTP adapters
//!   (Mistral shares the OpenAI-compatible adapter).
//! - [`registry`]: adapters in registration order.
//! - [`circuit`]: per-provider circuit breakers.
//! - [`health`]: request/error counters and the startup probe.
//! - [`fallback`], [`retry`]: where and when the coordinator moves on.

pub mod anthropic;
pub mod circuit;
pub mod cohere;
pub mod fallback;
pub mod google;
pub mod health;
pub mod http;
pub mod openai;
pub mod registry;
pub mod retry;
pub mod traits;

pub use anthropic::AnthropicAdapter;
pub use circuit::{BreakerConfig, BreakerSnapshot, CircuitBreakerRegistry, CircuitState};
pub use cohere::CohereAdapter;
pub use fallback::FallbackTable;
pub use google::GoogleAdapter;
pub use health::{HealthConfig, HealthMonitor, ProviderCounters, ProviderStats};
pub use http::{AdapterConfig, PROVIDER_TIMEOUT};
pub use openai::OpenAiCompatibleAdapter;
pub use registry::ProviderRegistry;
pub use retry::RetryPolicy;
pub use traits::ProviderAdapter;
