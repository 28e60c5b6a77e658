use std::time::Duration;

use thiserror::Error;

/// Failures while handling a single update.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("malformed update: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rate source unavailable: {0}")]
    UpstreamUnavailable(#[from] RateError),

    #[error("unknown command: /{0}")]
    UnknownCommand(String),
}

/// Failures of a [`RateSource`](crate::rates::RateSource) lookup.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate source responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed quotation data: {0}")]
    Malformed(String),

    #[error("no quote published for {0}")]
    NotQuoted(String),

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}
