//! Error taxonomy for a scraping run.
//!
//! Lookup misses and convergence timeouts are *not* errors — they surface as
//! empty results and a `false` return respectively. Errors are reserved for
//! broken configuration (cycles, unknown action kinds) and failing browser or
//! store plumbing, which abort the run; there is no retry policy.

use thiserror::Error;

/// Failure modes of a job run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The persisted selector graph references itself. Tree construction
    /// fails fast instead of descending forever.
    #[error("selector graph contains a cycle through `{0}`")]
    CyclicSelectorGraph(String),

    /// An action record carries a kind this runtime does not implement.
    /// Surfaced instead of silently skipped so configuration typos show up.
    #[error("action `{name}` has unsupported kind `{kind}`")]
    UnsupportedAction { name: String, kind: String },

    /// A single-element action resolved to more than one element.
    #[error("action `{0}` resolved to multiple elements, expected exactly one")]
    MultiElementTarget(String),

    /// A browser automation primitive failed (query, evaluate, click, scroll).
    #[error("browser automation failure: {0:#}")]
    Driver(anyhow::Error),

    /// The configuration store itself failed (unreadable file, bad document).
    #[error("config store failure: {0:#}")]
    Store(anyhow::Error),
}

impl ScrapeError {
    pub fn driver(err: anyhow::Error) -> Self {
        Self::Driver(err)
    }

    pub fn store(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}
