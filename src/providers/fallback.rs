//! Fallback ordering between providers.
//!
//! Each provider maps to an ordered list of alternatives the coordinator
//! may switch to. The compiled default is deliberately asymmetric: every
//! list ranks the closest peers first and ends with the providers least
//! likely to share an outage.

use std::collections::HashMap;

use serde::Deserialize;

use crate::types::ProviderId;

/// Per-provider ordered fallback lists.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FallbackTable {
    chains: HashMap<ProviderId, Vec<ProviderId>>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        use ProviderId::*;
        Self::empty()
            .with(OpenAi, [Anthropic, Google, Mistral, Cohere])
            .with(Anthropic, [OpenAi, Google, Mistral, Cohere])
            .with(Google, [OpenAi, Anthropic, Mistral, Cohere])
            .with(Mistral, [Anthropic, OpenAi, Cohere, Google])
            .with(Cohere, [OpenAi, Mistral, Anthropic, Google])
    }
}

impl FallbackTable {
    /// Table with no fallbacks at all.
    pub fn empty() -> Self {
        Self {
            chains: HashMap::new(),
        }
    }

    /// Replace the fallback list for `provider`.
    ///
    /// The provider itself is removed from its own list.
    pub fn with(mut self, provider: ProviderId, chain: impl IntoIterator<Item = ProviderId>) -> Self {
        self.set(provider, chain);
        self
    }

    pub fn set(&mut self, provider: ProviderId, chain: impl IntoIterator<Item = ProviderId>) {
        let mut list: Vec<ProviderId> = Vec::new();
        for id in chain {
            if id != provider && !list.contains(&id) {
                list.push(id);
            }
        }
        self.chains.insert(provider, list);
    }

    /// Ordered fallbacks for `provider` (empty if none configured).
    pub fn chain(&self, provider: ProviderId) -> &[ProviderId] {
        self.chains.get(&provider).map_or(&[], Vec::as_slice)
    }

    /// Overlay `other` on top of this table, replacing whole lists.
    pub fn merge(mut self, other: FallbackTable) -> Self {
        for (provider, chain) in other.chains {
            self.set(provider, chain);
        }
        self
    }
}
