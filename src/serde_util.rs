//! Serde helpers shared by the config sections.
//!
//! Durations are written as plain integers in TOML; the key name carries
//! the unit (`timeout_secs`, `ttl_ms`).

use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub(crate) fn duration_secs<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_secs)
}

pub(crate) fn duration_ms<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_millis)
}
