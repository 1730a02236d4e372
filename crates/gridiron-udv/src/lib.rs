//! Universal Data View assembly.
//!
//! One canonical fact packet per game, identical for every expert. The
//! assembler pulls the latest snapshot from each external adapter (odds,
//! weather, injuries, stats, historical, news), marks what it could not
//! get as absent, and stamps every section with its fetch time so
//! staleness is a per-section warning rather than a failure.
//!
//! - [`adapters`] -- thin `reqwest` clients, one endpoint per section
//! - [`ratelimit`] -- per-adapter token buckets that pause callers
//! - [`assembler`] -- retries, presence flags, staleness, cache keys
//!
//! Failure philosophy: an adapter outage never blocks a UDV. The section
//! is recorded absent and downstream components tolerate the hole.

pub mod adapters;
pub mod assembler;
pub mod ratelimit;

// Re-export primary types at crate root.
pub use adapters::{AdapterClient, AdapterConfig, ScheduledGame};
pub use assembler::{
    CacheTtls, GameMeta, StalenessThresholds, UdvAssembler, cache_key, rounded_snapshot_time,
    stale_sections, with_retries,
};
pub use ratelimit::TokenBucket;

/// Errors that can occur while assembling a UDV.
#[derive(Debug, thiserror::Error)]
pub enum UdvError {
    /// An external fetch failed temporarily; retried with backoff.
    #[error("transient adapter error: {0}")]
    Transient(String),

    /// The adapter responded but the payload did not parse.
    #[error("adapter payload parse error: {0}")]
    Parse(String),

    /// Adapter configuration is invalid or missing.
    #[error("adapter config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for UdvError {
    fn from(e: reqwest::Error) -> Self {
        // Network and timeout failures are retryable by definition;
        // decode failures are not, but reqwest surfaces those before
        // JSON parsing in our flow.
        Self::Transient(e.to_string())
    }
}
