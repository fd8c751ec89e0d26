//! Configuration loading.
//!
//! Tuning is read from TOML with the following resolution order:
//! 1. an explicit path (the CLI `--config` flag)
//! 2. `~/.consilium/config.toml` (user)
//! 3. `/etc/consilium/config.toml` (system)
//! 4. built-in defaults
//!
//! A missing file is only an error when the path was given explicitly.
//!
//! Credentials never live in the config file. [`Credentials::from_env`]
//! reads `<PROVIDER>_API_KEY` and the optional `<PROVIDER>_BASE_URL`
//! override; a provider without a key is simply not registered.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::providers::{BreakerConfig, FallbackTable, HealthConfig, RetryPolicy};
use crate::types::ProviderId;
use crate::{ConsiliumError, Result};

/// Orchestrator configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub health: HealthConfig,
    /// Per-provider overrides layered on the built-in fallback table.
    #[serde(default = "FallbackTable::empty")]
    pub fallback: FallbackTable,
    #[serde(default)]
    pub providers: BTreeMap<ProviderId, ProviderSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            breaker: BreakerConfig::default(),
            retry: RetryPolicy::default(),
            health: HealthConfig::default(),
            fallback: FallbackTable::empty(),
            providers: BTreeMap::new(),
        }
    }
}

/// Non-secret settings for one provider.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderSettings {
    /// Overrides the public endpoint. `<PROVIDER>_BASE_URL` wins over this.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub cost_per_1k_tokens: Option<f64>,
    /// Transport timeout in seconds (default: 120).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConsiliumError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConsiliumError::Configuration(msg) => {
                ConsiliumError::Configuration(format!("{msg} (in {path:?})"))
            }
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ConsiliumError::Configuration(format!("Failed to parse config: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(ConsiliumError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".consilium").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/consilium/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Settings for `provider`, defaults when the file has no section for it.
    pub fn provider(&self, provider: ProviderId) -> ProviderSettings {
        self.providers.get(&provider).cloned().unwrap_or_default()
    }
}

/// Provider credentials and endpoint overrides taken from the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    api_keys: BTreeMap<ProviderId, String>,
    base_urls: BTreeMap<ProviderId, String>,
}

impl Credentials {
    /// Read `<PROVIDER>_API_KEY` / `<PROVIDER>_BASE_URL` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup` (an environment stand-in).
    ///
    /// Empty or whitespace-only values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut credentials = Self::default();
        for id in ProviderId::ALL {
            if let Some(key) = read(id.api_key_env()) {
                credentials.api_keys.insert(id, key);
            }
            if let Some(url) = read(id.base_url_env()) {
                credentials.base_urls.insert(id, url);
            }
        }
        credentials
    }

    pub fn with_api_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.api_keys.insert(provider, key.into());
        self
    }

    pub fn api_key(&self, provider: ProviderId) -> Option<&str> {
        self.api_keys.get(&provider).map(String::as_str)
    }

    pub fn base_url(&self, provider: ProviderId) -> Option<&str> {
        self.base_urls.get(&provider).map(String::as_str)
    }

    /// Providers with a key, in default registration order.
    pub fn configured(&self) -> impl Iterator<Item = ProviderId> + '_ {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.api_keys.contains_key(id))
    }
}
