//! HTTP plumbing shared by the remote adapters.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::ProviderFailure;
use crate::types::ProviderId;
use crate::{ConsiliumError, Result};

/// Transport-level timeout applied to every provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings common to all adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    pub api_key: String,
    pub base_url: String,
    /// Overrides the provider's built-in default model.
    pub default_model: Option<String>,
    /// Used to fill [`AiResponse::cost`](crate::AiResponse::cost).
    pub cost_per_1k_tokens: Option<f64>,
    pub timeout: Duration,
}

impl AdapterConfig {
    /// Settings pointing at the provider's public endpoint.
    pub fn new(provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: provider.default_base_url().to_string(),
            default_model: None,
            cost_per_1k_tokens: None,
            timeout: PROVIDER_TIMEOUT,
        }
    }

    /// Point at a different endpoint (proxies, wiremock).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn cost_per_1k_tokens(mut self, rate: f64) -> Self {
        self.cost_per_1k_tokens = Some(rate);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Build the pooled client an adapter keeps for its lifetime.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConsiliumError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Map a non-success status to a [`ProviderFailure`].
pub(crate) fn check_status(response: &Response) -> std::result::Result<(), ProviderFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    match status.as_u16() {
        401 | 403 => Err(ProviderFailure::AuthenticationFailed),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(ProviderFailure::RateLimited { retry_after })
        }
        code => Err(ProviderFailure::Api {
            status: code,
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }),
    }
}

/// Send a prepared request, check its status and decode the JSON body.
///
/// Every failure is attributed to `provider`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: ProviderId,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let fail = |cause| ConsiliumError::provider(provider, cause);

    let response = request
        .send()
        .await
        .map_err(|e| fail(ProviderFailure::from(e)))?;
    check_status(&response).map_err(fail)?;

    let body = response
        .text()
        .await
        .map_err(|e| fail(ProviderFailure::from(e)))?;
    serde_json::from_str(&body).map_err(|e| fail(ProviderFailure::MalformedResponse(e.to_string())))
}
