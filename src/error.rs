//! Consilium error types

use std::time::Duration;

use crate::types::ProviderId;

/// Errors surfaced to orchestrator callers.
///
/// Adapter-level failures travel as [`ConsiliumError::Provider`] and are
/// absorbed by the coordinator (breaker + counters) until retries run out.
#[derive(Debug, thiserror::Error)]
pub enum ConsiliumError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("provider {provider} failed: {cause}")]
    Provider {
        provider: ProviderId,
        #[source]
        cause: ProviderFailure,
    },

    /// Breaker denied execution and no fallback provider could take over.
    #[error("circuit open for provider {provider}")]
    CircuitOpen { provider: ProviderId },

    #[error("no provider available")]
    NoProviderAvailable,

    // Consensus
    #[error("consensus needs {required} healthy providers, {available} available")]
    InsufficientProviders { available: usize, required: usize },

    #[error("all {attempted} consensus providers failed")]
    AllProvidersFailed { attempted: usize },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ConsiliumError {
    /// Wrap an adapter failure with the provider that produced it.
    pub fn provider(provider: ProviderId, cause: ProviderFailure) -> Self {
        Self::Provider { provider, cause }
    }

    /// Provider this error is attributed to, if any.
    pub fn provider_id(&self) -> Option<ProviderId> {
        match self {
            Self::Provider { provider, .. } | Self::CircuitOpen { provider } => Some(*provider),
            _ => None,
        }
    }
}

/// Underlying reason a provider call failed.
///
/// The coordinator treats every variant identically; the distinction is kept
/// for logs and for callers inspecting the final error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderFailure {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out")]
    Timeout,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("empty response from model")]
    EmptyResponse,
}

impl From<reqwest::Error> for ProviderFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderFailure::Timeout
        } else if err.is_decode() {
            ProviderFailure::MalformedResponse(err.to_string())
        } else {
            ProviderFailure::Http(err.to_string())
        }
    }
}

/// Result type alias for Consilium operations
pub type Result<T> = std::result::Result<T, ConsiliumError>;
