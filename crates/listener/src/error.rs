//! Request-level failures of the ingestion endpoint and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::{AuthError, SignalError};

/// Why a delivery was rejected.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    /// The provider's event-name header is absent, empty, or not UTF-8.
    #[error("missing {0} header")]
    MissingEventName(&'static str),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The `{provider}` path segment names no configured endpoint.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error(transparent)]
    Dispatch(#[from] SignalError),
}

impl WebhookError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::MissingEventName(_) | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::UnknownProvider(_) => StatusCode::NOT_FOUND,
            Self::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Decoder and listener messages stay in the logs.
        let body = match &self {
            Self::Unauthorized(e) => e.to_string(),
            Self::MissingEventName(_) | Self::UnsupportedContentType(_) => self.to_string(),
            Self::InvalidPayload(_) => "invalid payload".to_string(),
            Self::UnknownProvider(_) => "not found".to_string(),
            Self::Dispatch(_) => "listener failed".to_string(),
        };
        (status, body).into_response()
    }
}
