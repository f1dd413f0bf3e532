use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};
use crate::types::Operation;

/// The only status the service uses to signal success.
pub const SUCCESS_STATUS: StatusCode = StatusCode::OK;

/// A response that passed validation.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub operation: Operation,
    pub status: StatusCode,
    /// Decoded body text. Not interpreted by the client.
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON for callers that want to inspect it.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Accept a response only if its status is exactly [`SUCCESS_STATUS`].
///
/// Any other status, 2xx included, is a contract violation. The body is
/// carried along verbatim and never parsed.
pub fn validate(operation: Operation, status: StatusCode, body: String) -> Result<ApiResponse> {
    if status != SUCCESS_STATUS {
        return Err(ClientError::ContractViolation {
            operation,
            status,
            body,
        });
    }
    Ok(ApiResponse {
        operation,
        status,
        body,
    })
}
