//! Consilium - multi-provider AI request orchestrator
//!
//! Routes generation requests to one of several interchangeable language-model
//! providers (OpenAI, Anthropic, Google, Mistral, Cohere), protecting callers
//! from provider failures with per-provider circuit breakers, retry with
//! fallback, and a response cache. Several providers can also be asked at once
//! and their structured answers merged into a consensus result.
//!
//! # Generation Example
//!
//! ```rust,no_run
//! use consilium::{Orchestrator, ProviderId, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> consilium::Result<()> {
//!     let orchestrator = Orchestrator::builder()
//!         .openai("sk-your-key")
//!         .anthropic("sk-ant-your-key")
//!         .build()?;
//!     orchestrator.initialize().await;
//!
//!     let response = orchestrator
//!         .generate_text(
//!             "Summarise the indemnity clause in one sentence.",
//!             &RequestOptions::new().provider(ProviderId::Anthropic),
//!         )
//!         .await?;
//!
//!     println!("{} said: {}", response.provider, response.content);
//!     Ok(())
//! }
//! ```
//!
//! # Configuration Example
//!
//! ```rust,no_run
//! use consilium::{Config, Credentials, OrchestratorBuilder};
//!
//! # fn main() -> consilium::Result<()> {
//! let config = Config::load(None)?;
//! let orchestrator = OrchestratorBuilder::from_config(&config, &Credentials::from_env()).build()?;
//! println!("{:?}", orchestrator.health_status().overall_status);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod sanitize;
mod serde_util;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{ConsiliumError, ProviderFailure, Result};
pub use gateway::{
    ConsensusResult, HealthReport, Orchestrator, OrchestratorBuilder, OverallStatus,
    ProviderHealth,
};

pub use analysis::{AnalysisType, ContractAnalysis, ContractAnalysisResult};
pub use cache::{CacheConfig, CacheKey, ResponseCache};
pub use config::{Config, Credentials, ProviderSettings};
pub use providers::{
    AdapterConfig, BreakerConfig, CircuitBreakerRegistry, CircuitState, FallbackTable,
    HealthConfig, ProviderAdapter, ProviderStats, RetryPolicy,
};
pub use sanitize::sanitize;
pub use version::{BuildInfo, GIT_BRANCH, GIT_SHA, PKG_VERSION};

// Re-export all types
pub use types::{
    AiResponse, FinishReason, GenerateRequest, ProviderId, RequestOptions, ResponseMetadata, Usage,
};
