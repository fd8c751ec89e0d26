//! Provider adapter capability trait.
//!
//! Each remote backend implements [`ProviderAdapter`], translating a
//! provider-agnostic [`GenerateRequest`] into its own wire call and the reply
//! back into an [`AiResponse`]. Adapters are stored in the
//! [`ProviderRegistry`](super::ProviderRegistry) keyed by [`ProviderId`];
//! adding a backend means registering another adapter.
//!
//! # Failure semantics
//!
//! Any transport, authentication, status or decoding problem is reported as
//! [`ConsiliumError::Provider`](crate::ConsiliumError::Provider). The
//! coordinator does not distinguish causes: every adapter error counts as one
//! failure against the provider's circuit breaker.
//!
//! # Example
//!
//! ```ignore
//! #[async_trait]
//! impl ProviderAdapter for EchoAdapter {
//!     fn id(&self) -> ProviderId { ProviderId::OpenAi }
//!     fn default_model(&self) -> &str { "echo" }
//!
//!     async fn execute(&self, request: &GenerateRequest) -> Result<AiResponse> {
//!         Ok(AiResponse::new(self.id(), request.model_or("echo"), &request.prompt))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::Result;
use crate::types::{AiResponse, GenerateRequest, ProviderId};

/// A remote language-model backend.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Identity this adapter is registered under.
    fn id(&self) -> ProviderId;

    /// Model used when the request does not name one.
    fn default_model(&self) -> &str;

    /// Run one generation call.
    async fn execute(&self, request: &GenerateRequest) -> Result<AiResponse>;

    /// Minimal liveness call used by the health monitor.
    ///
    /// Default implementation issues the smallest possible generation.
    async fn probe(&self) -> Result<()> {
        self.execute(&GenerateRequest::probe()).await.map(|_| ())
    }
}
