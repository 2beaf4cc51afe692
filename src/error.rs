use std::time::Duration;

use thiserror::Error;

/// Process-level failures: startup, scheduler, API server.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Acquiring the raw snapshot for a query term failed.
#[derive(Debug, Error)]
pub enum SnapshotFetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("marketplace returned HTTP {0}")]
    Status(u16),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("page carried no embedded state document")]
    MissingState,

    #[error("embedded state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The snapshot document did not have the expected shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` has an unexpected type")]
    WrongType(&'static str),
}

/// Sending one notification through the messaging gateway failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned HTTP {0}")]
    Status(u16),

    #[error("gateway rejected message: {0}")]
    Rejected(String),
}

/// Outcome of a failed term iteration, captured at the term boundary.
#[derive(Debug, Error)]
pub enum TermError {
    #[error("snapshot fetch failed: {0}")]
    Fetch(#[from] SnapshotFetchError),

    #[error("snapshot schema mismatch: {0}")]
    Schema(#[from] SchemaError),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}
