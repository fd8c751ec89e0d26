//! Google Gemini `generateContent` adapter.
//!
//! See: <https://ai.google.dev/api/generate-content>

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{self, AdapterConfig};
use super::traits::ProviderAdapter;
use crate::error::ProviderFailure;
use crate::types::{AiResponse, FinishReason, GenerateRequest, ProviderId, Usage};
use crate::{ConsiliumError, Result};

/// Adapter for `POST {base}/v1beta/models/{model}:generateContent`.
#[derive(Clone)]
pub struct GoogleAdapter {
    config: AdapterConfig,
    default_model: String,
    http: Client,
}

impl GoogleAdapter {
    pub fn new(config: AdapterConfig) -> Result<Self> {
        let http = http::build_client(config.timeout)?;
        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| ProviderId::Google.default_model().to_string());
        Ok(Self {
            config,
            default_model,
            http,
        })
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn execute(&self, request: &GenerateRequest) -> Result<AiResponse> {
        let model = request.model_or(&self.default_model);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, model
        );

        let reply: GenerateContentResponse = http::send_json(
            self.id(),
            self.http
                .post(&url)
                .header("x-goog-api-key", &self.config.api_key)
                .json(&GenerateContentRequest {
                    contents: vec![Content {
                        role: "user",
                        parts: vec![Part {
                            text: &request.prompt,
                        }],
                    }],
                    generation_config: GenerationConfig {
                        max_output_tokens: request.max_tokens,
                        temperature: request.temperature,
                    },
                }),
        )
        .await?;

        let candidate = reply.candidates.into_iter().next().ok_or_else(|| {
            ConsiliumError::provider(self.id(), ProviderFailure::EmptyResponse)
        })?;
        let content: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ConsiliumError::provider(
                self.id(),
                ProviderFailure::EmptyResponse,
            ));
        }

        let mut response = AiResponse::new(
            self.id(),
            reply.model_version.as_deref().unwrap_or(model),
            content,
        )
        .with_provider_response_id(reply.response_id)
        .with_extra("safety_ratings", candidate.safety_ratings);
        if let Some(usage) = reply.usage_metadata {
            response = response.with_usage(
                Usage::new(usage.prompt_token_count, usage.candidates_token_count),
                self.config.cost_per_1k_tokens,
            );
        }
        if let Some(reason) = candidate.finish_reason {
            response = response.with_finish_reason(FinishReason::from_provider(&reason));
        }
        Ok(response)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    response_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}
