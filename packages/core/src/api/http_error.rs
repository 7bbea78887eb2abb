//! HTTP error handling
//!
//! Every failure leaving the HTTP surface goes through [`HttpError`], so clients
//! always see the same `{message, code, details?}` body.

use crate::services::RemovalError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip)]
    status: u16,
}

impl HttpError {
    /// Create a new HTTP error answered with `status`
    pub fn new(status: u16, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
            status,
        }
    }

    /// Create a new HTTP error with details
    pub fn with_details(
        status: u16,
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(status, message, code)
        }
    }

    /// Status the response is sent with
    ///
    /// Codes that are not valid HTTP statuses become 500.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<RemovalError> for HttpError {
    fn from(err: RemovalError) -> Self {
        let status = err.status_code();
        let code = err.code();

        match &err {
            RemovalError::ServiceFailure {
                status: Some(carried),
                ..
            } => HttpError::with_details(
                status,
                err.to_string(),
                code,
                format!("Google Docs responded with status {}", carried),
            ),
            _ => HttpError::new(status, err.to_string(), code),
        }
    }
}
