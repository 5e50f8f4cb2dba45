use thiserror::Error;

/// Failure of a single outbound fetch. In the composite-fetch context these
/// are folded into a tagged [`crate::Fetched::Error`] so a run can continue
/// with partial data.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("rate limited: {0}")]
    RateLimited(String),
}

/// The per-run call budget was exhausted. Unlike a [`FetchError`] this is a
/// hard failure: the run terminates instead of degrading.
#[derive(Error, Debug, Clone, Copy)]
#[error("call budget exceeded: {used} of {max} external calls used")]
pub struct BudgetExceeded {
    pub max: u32,
    pub used: u32,
}

/// Top-level pipeline failure, reported at the orchestrator boundary.
/// Unexpected stage panics are not modeled here; the service catches them
/// at the HTTP layer and answers with the error envelope.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Budget(#[from] BudgetExceeded),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
}
