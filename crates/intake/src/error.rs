//! Unified error handling for the intake service.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::cache::StoreError;
use crate::manual_link::LinkError;
use crate::resolution::ResolveError;
use crate::search::SearchError;

/// Message shown to the operator when the scan cache is down.
pub const STORE_UNAVAILABLE_MESSAGE: &str = "Product cache unavailable, please try again";

/// Application-level error type for the intake service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Scan cache operation failed.
    #[error("Scan cache error: {0}")]
    Store(#[from] StoreError),

    /// Marketplace could not answer an operator search.
    #[error("Marketplace error: {0}")]
    Marketplace(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidCode(e) => Self::BadRequest(e.to_string()),
            ResolveError::StoreUnavailable(e) => Self::Store(e),
        }
    }
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::InvalidCode(e) => Self::BadRequest(e.to_string()),
            LinkError::InvalidSelection(msg) => Self::BadRequest(msg),
            LinkError::StoreUnavailable(e) => Self::Store(e),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyQuery => Self::BadRequest(err.to_string()),
            SearchError::Unavailable(reason) => Self::Marketplace(reason.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Store(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Intake request error"
            );
        }

        let status = match &self {
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Marketplace(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_) => STORE_UNAVAILABLE_MESSAGE.to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Marketplace(_) => "Marketplace search unavailable, please try again".to_string(),
            Self::BadRequest(_) => self.to_string(),
        };

        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}
