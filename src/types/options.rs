//! Per-request options and the provider-agnostic request handed to adapters.

use serde::{Deserialize, Serialize};

use super::ProviderId;

/// Default completion token budget.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default number of attempts per request.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Caller-supplied options for [`Orchestrator::generate_text`](crate::Orchestrator::generate_text).
///
/// These fields participate in the cache fingerprint; they never modify
/// entries that are already cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Provider to try first.
    pub provider: Option<ProviderId>,
    /// Model name; the provider's default model when unset.
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub use_cache: bool,
    /// Maximum attempts, including the first one.
    pub retry_count: u32,
    /// Whether the coordinator may switch to another provider.
    pub allow_fallback: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            use_cache: true,
            retry_count: DEFAULT_RETRY_COUNT,
            allow_fallback: true,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = n;
        self
    }

    /// Pin the request to its starting provider.
    pub fn no_fallback(mut self) -> Self {
        self.allow_fallback = false;
        self
    }
}

/// A sanitized generation request as seen by a [`ProviderAdapter`](crate::providers::ProviderAdapter).
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub(crate) fn from_options(prompt: &str, options: &RequestOptions) -> Self {
        Self {
            prompt: prompt.to_string(),
            model: options.model.clone(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }

    /// Smallest possible liveness request.
    pub fn probe() -> Self {
        Self {
            prompt: "ping".to_string(),
            model: None,
            max_tokens: 1,
            temperature: 0.0,
        }
    }

    /// The requested model, or the adapter's default.
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let opts = RequestOptions::default();
        assert_eq!(opts.max_tokens, 4000);
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert!(opts.use_cache);
        assert_eq!(opts.retry_count, 3);
        assert!(opts.allow_fallback);
        assert!(opts.provider.is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let opts: RequestOptions =
            serde_json::from_str(r#"{"provider":"google","use_cache":false}"#).unwrap();
        assert_eq!(opts.provider, Some(ProviderId::Google));
        assert!(!opts.use_cache);
        assert_eq!(opts.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn model_or_prefers_request_model() {
        let req = GenerateRequest::new("hi");
        assert_eq!(req.model_or("fallback"), "fallback");
        let req = GenerateRequest {
            model: Some("custom".into()),
            ..req
        };
        assert_eq!(req.model_or("fallback"), "custom");
    }
}
