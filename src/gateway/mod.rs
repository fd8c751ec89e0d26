//! Orchestrator and its builder

mod builder;
pub mod consensus;
mod orchestrator;

pub use builder::OrchestratorBuilder;
pub use consensus::{ConsensusResult, MAX_CONSENSUS_PROVIDERS, MIN_CONSENSUS_PROVIDERS};
pub use orchestrator::{HealthReport, Orchestrator, OverallStatus, ProviderHealth};
