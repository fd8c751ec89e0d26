//! Registered provider adapters in registration order.
//!
//! Order matters: the coordinator picks the first healthy, executable
//! provider when the caller names none, and consensus takes the first
//! three healthy ones.

use std::sync::Arc;

use super::traits::ProviderAdapter;
use crate::types::ProviderId;

/// Adapters keyed by [`ProviderId`], iterated in registration order.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    adapters: Vec<(ProviderId, Arc<dyn ProviderAdapter>)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own id.
    ///
    /// Re-registering an id replaces the adapter but keeps its position.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        let id = adapter.id();
        match self.adapters.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = adapter,
            None => self.adapters.push((id, adapter)),
        }
    }

    pub fn get(&self, id: ProviderId) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, adapter)| adapter)
    }

    pub fn contains(&self, id: ProviderId) -> bool {
        self.get(id).is_some()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.adapters.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProviderId, &Arc<dyn ProviderAdapter>)> + '_ {
        self.adapters.iter().map(|(id, adapter)| (*id, adapter))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
