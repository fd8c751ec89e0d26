//! Normalized provider response

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProviderId;

/// Provider-agnostic generation result.
///
/// Copied into the response cache and returned to the caller. Only
/// `cached` (on a cache hit) and `processing_time_ms` are touched after the
/// adapter builds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub content: String,
    pub provider: ProviderId,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub processing_time_ms: u64,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub cached: bool,
    #[serde(default)]
    pub metadata: ResponseMetadata,
}

impl AiResponse {
    /// Fresh response with a new request id and the current timestamp.
    pub fn new(provider: ProviderId, model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            provider,
            model: model.into(),
            tokens_used: None,
            cost: None,
            processing_time_ms: 0,
            request_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            cached: false,
            metadata: ResponseMetadata::default(),
        }
    }

    /// Attach usage, deriving `tokens_used` and (given a rate) `cost`.
    pub fn with_usage(mut self, usage: Usage, cost_per_1k_tokens: Option<f64>) -> Self {
        let total = usage.total();
        self.tokens_used = Some(total);
        self.cost = cost_per_1k_tokens.map(|rate| f64::from(total) / 1000.0 * rate);
        self.metadata.usage = Some(usage);
        self
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.metadata.finish_reason = Some(reason);
        self
    }

    pub fn with_provider_response_id(mut self, id: Option<String>) -> Self {
        self.metadata.provider_response_id = id;
        self
    }

    /// Keep a provider-specific field under `metadata.extra`; `None` and JSON
    /// null are skipped.
    pub fn with_extra(mut self, key: &str, value: Option<serde_json::Value>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_null()) {
            self.metadata.extra.insert(key.to_string(), value);
        }
        self
    }
}

/// Usage and stop details normalized across providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_response_id: Option<String>,
    /// Provider-specific fields with no shared counterpart, such as
    /// OpenAI's `system_fingerprint` or Gemini's safety ratings.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Reason the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Map a provider's raw stop reason onto the shared vocabulary.
    pub fn from_provider(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "stop" | "end_turn" | "stop_sequence" | "complete" | "finish_reason_stop" => {
                FinishReason::Stop
            }
            "length" | "max_tokens" | "finish_reason_max_tokens" => FinishReason::Length,
            "content_filter" | "safety" | "recitation" | "error_toxic" => {
                FinishReason::ContentFilter
            }
            _ => FinishReason::Other(raw.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reason_normalizes_provider_vocabularies() {
        assert_eq!(FinishReason::from_provider("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("end_turn"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(FinishReason::from_provider("COMPLETE"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("SAFETY"), FinishReason::ContentFilter);
        assert_eq!(
            FinishReason::from_provider("tool_use"),
            FinishReason::Other("tool_use".into())
        );
    }

    #[test]
    fn extra_skips_missing_and_null_values() {
        let resp = AiResponse::new(ProviderId::Google, "gemini", "hi")
            .with_extra("a", None)
            .with_extra("b", Some(serde_json::Value::Null))
            .with_extra("c", Some(serde_json::json!(1)));
        assert_eq!(resp.metadata.extra.len(), 1);
        assert_eq!(resp.metadata.extra["c"], 1);
    }

    #[test]
    fn usage_derives_tokens_and_cost() {
        let resp = AiResponse::new(ProviderId::OpenAi, "gpt-4o", "hi")
            .with_usage(Usage::new(1500, 500), Some(0.01));
        assert_eq!(resp.tokens_used, Some(2000));
        let cost = resp.cost.unwrap();
        assert!((cost - 0.02).abs() < 1e-9);
        assert!(!resp.cached);
    }

    #[test]
    fn new_responses_get_distinct_request_ids() {
        let a = AiResponse::new(ProviderId::Google, "m", "x");
        let b = AiResponse::new(ProviderId::Google, "m", "x");
        assert_ne!(a.request_id, b.request_id);
    }
}
