//! Cohere v2 chat adapter.
//!
//! See: <https://docs.cohere.com/reference/chat>

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{self, AdapterConfig};
use super::traits::ProviderAdapter;
use crate::error::ProviderFailure;
use crate::types::{AiResponse, FinishReason, GenerateRequest, ProviderId, Usage};
use crate::{ConsiliumError, Result};

/// Adapter for `POST {base}/v2/chat`.
#[derive(Clone)]
pub struct CohereAdapter {
    config: AdapterConfig,
    default_model: String,
    http: Client,
}

impl CohereAdapter {
    pub fn new(config: AdapterConfig) -> Result<Self> {
        let http = http::build_client(config.timeout)?;
        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| ProviderId::Cohere.default_model().to_string());
        Ok(Self {
            config,
            default_model,
            http,
        })
    }
}

#[async_trait]
impl ProviderAdapter for CohereAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Cohere
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn execute(&self, request: &GenerateRequest) -> Result<AiResponse> {
        let model = request.model_or(&self.default_model);
        let url = format!("{}/v2/chat", self.config.base_url);

        let reply: ChatResponse = http::send_json(
            self.id(),
            self.http
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&ChatRequest {
                    model,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: &request.prompt,
                    }],
                    max_tokens: request.max_tokens,
                    temperature: request.temperature,
                }),
        )
        .await?;

        let content: String = reply
            .message
            .map(|m| m.content.into_iter().filter_map(|c| c.text).collect())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ConsiliumError::provider(
                self.id(),
                ProviderFailure::EmptyResponse,
            ));
        }

        let (tokens, billed_units) = reply
            .usage
            .map(|u| (u.tokens, u.billed_units))
            .unwrap_or_default();
        let mut response = AiResponse::new(self.id(), model, content)
            .with_provider_response_id(reply.id)
            .with_extra("billed_units", billed_units);
        if let Some(tokens) = tokens {
            response = response.with_usage(
                Usage::new(tokens.input_tokens as u32, tokens.output_tokens as u32),
                self.config.cost_per_1k_tokens,
            );
        }
        if let Some(reason) = reply.finish_reason {
            response = response.with_finish_reason(FinishReason::from_provider(&reason));
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Vec<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    tokens: Option<TokenCounts>,
    #[serde(default)]
    billed_units: Option<serde_json::Value>,
}

// Cohere reports token counts as JSON numbers that may carry a fraction.
#[derive(Deserialize)]
struct TokenCounts {
    #[serde(default)]
    input_tokens: f64,
    #[serde(default)]
    output_tokens: f64,
}
