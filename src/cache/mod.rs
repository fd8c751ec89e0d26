//! Caching subsystem.
//!
//! - [`response::ResponseCache`]: FIFO + TTL cache of generated responses,
//!   consulted by the [`Orchestrator`](crate::Orchestrator) before any
//!   provider is selected. A hit bypasses provider selection, breakers and
//!   retry entirely.

pub mod response;

pub use response::{CacheConfig, CacheKey, ResponseCache};
