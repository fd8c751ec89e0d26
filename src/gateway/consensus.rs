//! Multi-provider consensus.
//!
//! The same prompt goes to up to [`MAX_CONSENSUS_PROVIDERS`] available
//! providers at once (healthy, and not turned away by their breaker). Each member runs the normal single-call path pinned to
//! its provider (own breaker and retries, no fallback). Settled replies are
//! parsed and merged; failed members are left out of the merge.

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::analysis::{self, ContractAnalysis};
use crate::sanitize::sanitize;
use crate::types::{AiResponse, ProviderId, RequestOptions};
use crate::{ConsiliumError, Result};

use super::orchestrator::Orchestrator;

/// Available providers needed before consensus is attempted.
pub const MIN_CONSENSUS_PROVIDERS: usize = 2;
/// Providers asked per consensus request.
pub const MAX_CONSENSUS_PROVIDERS: usize = 3;

/// Merged outcome of [`Orchestrator::analyze_with_consensus`].
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusResult {
    pub analysis: ContractAnalysis,
    /// `successful / attempted * 100`, one decimal.
    pub confidence: f64,
    /// Providers whose replies were merged, in registration order.
    pub providers: Vec<ProviderId>,
    pub attempted: usize,
    /// False when any merged reply took the raw-text fallback.
    pub structured: bool,
    pub responses: Vec<AiResponse>,
}

impl Orchestrator {
    /// Ask several providers and merge their analyses.
    #[instrument(skip(self, prompt))]
    pub async fn analyze_with_consensus(&self, prompt: &str) -> Result<ConsensusResult> {
        let prompt = sanitize(prompt)?;

        let mut members: Vec<ProviderId> = self
            .registry
            .ids()
            .filter(|id| self.is_available(*id))
            .collect();
        if members.len() < MIN_CONSENSUS_PROVIDERS {
            return Err(ConsiliumError::InsufficientProviders {
                available: members.len(),
                required: MIN_CONSENSUS_PROVIDERS,
            });
        }
        members.truncate(MAX_CONSENSUS_PROVIDERS);
        let attempted = members.len();

        let prompt = prompt.as_str();
        let calls = members.iter().map(|&id| async move {
            let options = RequestOptions::new().provider(id).no_fallback();
            (id, self.generate_text(prompt, &options).await)
        });
        let settled = join_all(calls).await;

        let mut analyses = Vec::new();
        let mut providers = Vec::new();
        let mut responses = Vec::new();
        let mut structured = true;
        for (id, outcome) in settled {
            match outcome {
                Ok(response) => {
                    let (analysis, parsed) = analysis::read_reply(&response.content);
                    structured &= parsed;
                    analyses.push(analysis);
                    providers.push(id);
                    responses.push(response);
                }
                Err(e) => warn!(provider = %id, error = %e, "consensus member failed"),
            }
        }

        if analyses.is_empty() {
            return Err(ConsiliumError::AllProvidersFailed { attempted });
        }

        let confidence = analysis::round1(analyses.len() as f64 / attempted as f64 * 100.0);
        info!(
            successful = analyses.len(),
            attempted,
            confidence,
            "consensus merged"
        );

        Ok(ConsensusResult {
            analysis: analysis::merge(&analyses),
            confidence,
            providers,
            attempted,
            structured,
            responses,
        })
    }
}
