//! Service Layer Error Types
//!
//! - [`DocumentError`] classifies failures raised by the document service
//! - [`RemovalError`] is the remove-content endpoint's response taxonomy

use crate::db::StoreError;
use crate::services::drive::DriveError;
use thiserror::Error;

/// Status used for business-rule conflicts
pub const STATUS_INTEGRITY_VIOLATION: u16 = 409;

/// Failure classes raised by a [`DocumentService`](crate::services::DocumentService)
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The Google account could not be authenticated
    #[error("{0}")]
    Authentication(String),

    /// The stored refresh token is no longer valid
    #[error("{0}")]
    RefreshToken(String),

    /// Google Docs service failure, optionally carrying an HTTP status
    #[error("{message}")]
    Service { status: Option<u16>, message: String },

    /// Repository integrity rule violated
    #[error("{0}")]
    Constraint(String),

    /// Acting identity lacks permission
    #[error("{0}")]
    AccessDenied(String),

    /// Anything not classified above
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocumentError {
    /// Create a service error
    pub fn service(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }
}

impl From<DriveError> for DocumentError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Authentication(message) => Self::Authentication(message),
            DriveError::RefreshToken(message) => Self::RefreshToken(message),
            DriveError::Api { status, message } => Self::Service { status, message },
        }
    }
}

impl From<StoreError> for DocumentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccessDenied { .. } => Self::AccessDenied(err.to_string()),
            StoreError::Constraint { .. } => Self::Constraint(err.to_string()),
            StoreError::ConcurrencyFailure { .. } | StoreError::TransactionClosed { .. } => {
                Self::Other(err.into())
            }
        }
    }
}

/// Outcome classes of a failed remove-content request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemovalError {
    /// Malformed request (400)
    #[error("{0}")]
    InvalidRequest(String),

    /// Access-control rejection (403)
    #[error("{0}")]
    Forbidden(String),

    /// Google authentication failure (502)
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// Google Docs service failure with its own status, else 500
    #[error("{message}")]
    ServiceFailure { status: Option<u16>, message: String },

    /// Business-rule conflict (409)
    #[error("{0}")]
    IntegrityViolation(String),

    /// Unclassified failure (500)
    #[error("{0}")]
    InternalError(String),
}

impl RemovalError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// HTTP status code for the response
    ///
    /// Carried service codes are passed through as-is; callers decide what to
    /// do with values that are not valid HTTP statuses.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::Forbidden(_) => 403,
            Self::UpstreamUnavailable(_) => 502,
            Self::ServiceFailure { status, .. } => status.unwrap_or(500),
            Self::IntegrityViolation(_) => STATUS_INTEGRITY_VIOLATION,
            Self::InternalError(_) => 500,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Self::ServiceFailure { .. } => "SERVICE_ERROR",
            Self::IntegrityViolation(_) => "INTEGRITY_VIOLATION",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// Store failures outside the document service (precondition reads, commit)
impl From<StoreError> for RemovalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccessDenied { .. } => Self::Forbidden(err.to_string()),
            StoreError::Constraint { .. } => Self::IntegrityViolation(err.to_string()),
            StoreError::ConcurrencyFailure { .. } | StoreError::TransactionClosed { .. } => {
                Self::InternalError(err.to_string())
            }
        }
    }
}
