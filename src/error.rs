use reqwest::StatusCode;
use thiserror::Error;

use crate::types::Operation;

#[derive(Error, Debug)]
pub enum ClientError {
    // Exchange errors
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{operation} failed: expected status 200, got {status}: {body}")]
    ContractViolation {
        operation: Operation,
        status: StatusCode,
        body: String,
    },

    // Setup errors
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// HTTP status of a received-but-rejected response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::ContractViolation { status, .. } => Some(status.as_u16()),
            _ => None,
        }
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ClientError::ContractViolation { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
