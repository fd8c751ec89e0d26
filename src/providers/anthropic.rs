//! Anthropic Messages API adapter.
//!
//! See: <https://docs.anthropic.com/en/api/messages>

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{self, AdapterConfig};
use super::traits::ProviderAdapter;
use crate::error::ProviderFailure;
use crate::types::{AiResponse, FinishReason, GenerateRequest, ProviderId, Usage};
use crate::{ConsiliumError, Result};

const API_VERSION: &str = "2023-06-01";

/// Adapter for `POST {base}/v1/messages`.
#[derive(Clone)]
pub struct AnthropicAdapter {
    config: AdapterConfig,
    default_model: String,
    http: Client,
}

impl AnthropicAdapter {
    pub fn new(config: AdapterConfig) -> Result<Self> {
        let http = http::build_client(config.timeout)?;
        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| ProviderId::Anthropic.default_model().to_string());
        Ok(Self {
            config,
            default_model,
            http,
        })
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn execute(&self, request: &GenerateRequest) -> Result<AiResponse> {
        let model = request.model_or(&self.default_model);
        let url = format!("{}/v1/messages", self.config.base_url);

        let reply: MessagesResponse = http::send_json(
            self.id(),
            self.http
                .post(&url)
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&MessagesRequest {
                    model,
                    max_tokens: request.max_tokens,
                    temperature: request.temperature,
                    messages: vec![Message {
                        role: "user",
                        content: &request.prompt,
                    }],
                }),
        )
        .await?;

        // Text blocks are concatenated; other block types carry no prose.
        let content: String = reply
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if content.is_empty() {
            return Err(ConsiliumError::provider(
                self.id(),
                ProviderFailure::EmptyResponse,
            ));
        }

        let mut response =
            AiResponse::new(self.id(), reply.model.as_deref().unwrap_or(model), content)
                .with_provider_response_id(reply.id)
                .with_extra(
                    "stop_sequence",
                    reply.stop_sequence.map(serde_json::Value::from),
                );
        if let Some(usage) = reply.usage {
            response = response.with_usage(
                Usage::new(usage.input_tokens, usage.output_tokens),
                self.config.cost_per_1k_tokens,
            );
        }
        if let Some(reason) = reply.stop_reason {
            response = response.with_finish_reason(FinishReason::from_provider(&reason));
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    stop_sequence: Option<String>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}
