use thiserror::Error;

/// Failure of a market-data request, classified so callers can pick the wording.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The provider answered but has nothing for this ticker.
    #[error("no data for {0}")]
    NotFound(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound(_))
    }
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("no price points for {0}")]
    NoData(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
