//! Error types for the inbound HTTP endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::error::SyncError;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed query parameter.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No spreadsheet credential is held; carries the actionable hint.
    #[error("{0}")]
    Unauthorized(String),

    /// The consent flow or token exchange failed.
    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),

    /// An upstream service (tariff API, Google) failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// The store did not answer.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Required configuration is missing.
    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    /// Internal error (should not occur in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    ///
    /// - Bad request: 400
    /// - Authorization failed: 401
    /// - Unauthorized (no credential yet): 403
    /// - Upstream: 502
    /// - Storage or missing configuration: 503
    /// - Internal: 500
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthorizationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::StorageUnavailable(_) | Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Unauthorized { .. } => Self::Unauthorized(err.to_string()),
            SyncError::Authorization(message) => Self::AuthorizationFailed(message),
            SyncError::StorageUnavailable(message) => Self::StorageUnavailable(message),
            SyncError::ProviderUnavailable(_)
            | SyncError::ProviderContractViolation(_)
            | SyncError::TokenRefreshUnavailable(_)
            | SyncError::DestinationConflict { .. }
            | SyncError::Destination { .. }
            | SyncError::Publish(_) => Self::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Storage and internal details stay in the logs.
        let status = self.status_code();
        let body = match self {
            Self::StorageUnavailable(_) => "Storage unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (status, body).into_response()
    }
}
