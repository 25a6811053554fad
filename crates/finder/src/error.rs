// ABOUTME: Error types for feed discovery.
// ABOUTME: Candidate-level failures are swallowed during verification; these are page-level.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinderError {
    /// The starting point could not be turned into an absolute http(s) URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The initial page fetch failed at the transport level.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The initial page fetch came back with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),

    /// The page fetched fine but its body was empty, leaving nothing to
    /// sniff or scan.
    #[error("no feeds found at {0}")]
    NoFeedsFound(String),
}
