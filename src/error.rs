use elasticsearch::http::{transport::BuildError, StatusCode};
use thiserror::Error;

use crate::runner::RunnerState;

pub type Result<T> = std::result::Result<T, ScenarioError>;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid Elasticsearch URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build transport: {0}")]
    TransportBuild(#[from] BuildError),
    #[error("transport error: {0}")]
    Transport(#[from] elasticsearch::Error),
    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("container error: {0}")]
    Container(String),
    #[error("no cluster reachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },
    #[error("expected {expected} total hits, got {actual}")]
    UnexpectedHitCount { expected: u64, actual: u64 },
    #[error("invalid runner transition {from:?} -> {to:?}")]
    InvalidTransition { from: RunnerState, to: RunnerState },
}

impl ScenarioError {
    /// True when the failure never produced an HTTP response. Bodies are
    /// decoded separately, so a malformed payload is `Serde`, not `Transport`.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ScenarioError::Transport(err) if err.status_code().is_none())
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ScenarioError::Status { status, .. } => Some(*status),
            ScenarioError::Transport(err) => err.status_code(),
            _ => None,
        }
    }
}
