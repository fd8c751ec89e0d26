//! Public types for the Consilium API.

mod options;
mod provider;
mod response;

pub use options::{
    DEFAULT_MAX_TOKENS, DEFAULT_RETRY_COUNT, DEFAULT_TEMPERATURE, GenerateRequest, RequestOptions,
};
pub use provider::ProviderId;
pub use response::{AiResponse, FinishReason, ResponseMetadata, Usage};
