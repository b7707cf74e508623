use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    Api(String, String),

    #[error("parse error: {0}")]
    Parse(String),

    /// The primary search source failed; the caller should retry later.
    #[error("unable to fetch search results, retry later: {0}")]
    SearchUnavailable(String),

    /// Every active source failed for a merged search.
    #[error("all search sources failed for query: {0}")]
    AllSourcesFailed(String),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
