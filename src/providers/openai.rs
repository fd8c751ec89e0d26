//! OpenAI-compatible chat completions adapter.
//!
//! Serves both OpenAI and Mistral, which share the
//! `POST {base}/chat/completions` request and response shape.
//! See: <https://platform.openai.com/docs/api-reference/chat>

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{self, AdapterConfig};
use super::traits::ProviderAdapter;
use crate::error::ProviderFailure;
use crate::types::{AiResponse, FinishReason, GenerateRequest, ProviderId, Usage};
use crate::{ConsiliumError, Result};

/// Adapter for OpenAI-style chat completion endpoints.
#[derive(Clone)]
pub struct OpenAiCompatibleAdapter {
    id: ProviderId,
    config: AdapterConfig,
    default_model: String,
    http: Client,
}

impl OpenAiCompatibleAdapter {
    /// Adapter for api.openai.com.
    pub fn openai(config: AdapterConfig) -> Result<Self> {
        Self::new(ProviderId::OpenAi, config)
    }

    /// Adapter for api.mistral.ai.
    pub fn mistral(config: AdapterConfig) -> Result<Self> {
        Self::new(ProviderId::Mistral, config)
    }

    fn new(id: ProviderId, config: AdapterConfig) -> Result<Self> {
        let http = http::build_client(config.timeout)?;
        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| id.default_model().to_string());
        Ok(Self {
            id,
            config,
            default_model,
            http,
        })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn execute(&self, request: &GenerateRequest) -> Result<AiResponse> {
        let model = request.model_or(&self.default_model);
        let url = format!("{}/chat/completions", self.config.base_url);

        let reply: CompletionResponse = http::send_json(
            self.id,
            self.http
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&CompletionRequest {
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

        let choice = reply.choices.into_iter().next().ok_or_else(|| {
            ConsiliumError::provider(self.id, ProviderFailure::EmptyResponse)
        })?;
        let content = choice
            .message
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ConsiliumError::provider(self.id, ProviderFailure::EmptyResponse))?;

        let mut response =
            AiResponse::new(self.id, reply.model.as_deref().unwrap_or(model), content)
                .with_provider_response_id(reply.id)
                .with_extra(
                    "system_fingerprint",
                    reply.system_fingerprint.map(serde_json::Value::from),
                );
        if let Some(usage) = reply.usage {
            response = response.with_usage(
                Usage::new(usage.prompt_tokens, usage.completion_tokens),
                self.config.cost_per_1k_tokens,
            );
        }
        if let Some(reason) = choice.finish_reason {
            response = response.with_finish_reason(FinishReason::from_provider(&reason));
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
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
struct CompletionResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
    #[serde(default)]
    system_fingerprint: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
