//! Scrape error taxonomy.
//!
//! Per-candidate and per-service failures are recovered locally by the
//! fallback chain; sync and range-parse failures propagate to the caller.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// An automation step exceeded its wait bound. Recovered locally by
    /// treating the current candidate or episode as failed.
    #[error("timed out after {waited:?} waiting for `{selector}`")]
    Timeout { selector: String, waited: Duration },

    /// A selector or attribute the extraction flow depends on was absent.
    #[error("extraction miss: {0}")]
    ExtractionMiss(String),

    /// The listing container never appeared or a mid-scroll step failed.
    /// Fatal to the sync call; retries are a caller concern.
    #[error("catalog sync failed: {0}")]
    Sync(String),

    /// Malformed episode-range token. The batch is rejected before any
    /// automation work starts.
    #[error("invalid episode range token: {token:?}")]
    InvalidRangeToken { token: String },

    /// A browser session could not be created. Fatal to that episode only.
    #[error("session error: {0}")]
    Session(String),

    /// CDP-level fault surfaced by the automation driver.
    #[error("driver error: {0}")]
    Driver(String),
}

impl ScrapeError {
    /// Whether the resolver fallback chain may swallow this error and
    /// advance to the next candidate.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScrapeError::Timeout { .. } | ScrapeError::ExtractionMiss(_) | ScrapeError::Driver(_)
        )
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
