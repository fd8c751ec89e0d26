//! Provider identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConsiliumError;

/// One of the known remote model backends.
///
/// Ordering follows declaration order, which is also the default
/// registration order used by [`OrchestratorBuilder::from_config`](crate::OrchestratorBuilder::from_config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Google,
    Mistral,
    Cohere,
}

impl ProviderId {
    /// Every known provider, in default registration order.
    pub const ALL: [ProviderId; 5] = [
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Google,
        ProviderId::Mistral,
        ProviderId::Cohere,
    ];

    /// Stable lowercase name used in logs, metrics and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Google => "google",
            ProviderId::Mistral => "mistral",
            ProviderId::Cohere => "cohere",
        }
    }

    /// Environment variable holding the provider credential.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OPENAI_API_KEY",
            ProviderId::Anthropic => "ANTHROPIC_API_KEY",
            ProviderId::Google => "GOOGLE_API_KEY",
            ProviderId::Mistral => "MISTRAL_API_KEY",
            ProviderId::Cohere => "COHERE_API_KEY",
        }
    }

    /// Environment variable overriding the provider base endpoint.
    pub fn base_url_env(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OPENAI_BASE_URL",
            ProviderId::Anthropic => "ANTHROPIC_BASE_URL",
            ProviderId::Google => "GOOGLE_BASE_URL",
            ProviderId::Mistral => "MISTRAL_BASE_URL",
            ProviderId::Cohere => "COHERE_BASE_URL",
        }
    }

    /// Public API endpoint used when no override is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "https://api.openai.com/v1",
            ProviderId::Anthropic => "https://api.anthropic.com",
            ProviderId::Google => "https://generativelanguage.googleapis.com",
            ProviderId::Mistral => "https://api.mistral.ai/v1",
            ProviderId::Cohere => "https://api.cohere.com",
        }
    }

    /// Model used when the request does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "gpt-4o",
            ProviderId::Anthropic => "claude-sonnet-4-20250514",
            ProviderId::Google => "gemini-1.5-pro",
            ProviderId::Mistral => "mistral-large-latest",
            ProviderId::Cohere => "command-r-plus",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ConsiliumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConsiliumError::InvalidInput(format!("unknown provider: {s}")))
    }
}
