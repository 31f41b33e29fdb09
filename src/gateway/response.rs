//! Mapping of gateway errors to HTTP responses.
//!
//! Every error becomes a JSON [`ErrorResponse`]. Messages are fixed strings
//! wherever the underlying detail could leak information (authentication,
//! handler faults, upstream failures); the detail goes to the log instead.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{AuthError, GatewayError};

/// Message returned for every authentication failure.
pub const UNAUTHORIZED_MESSAGE: &str = "Could not validate credentials";

/// JSON error response returned for all error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

impl GatewayError {
    /// Status code, error type and client-facing message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            GatewayError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "bad_request", message.clone())
            }
            GatewayError::NoMatch { method, path } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("No route for {} {}", method, path),
            ),
            GatewayError::NotFound(what) => (StatusCode::NOT_FOUND, "not_found", what.clone()),
            GatewayError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                UNAUTHORIZED_MESSAGE.to_string(),
            ),
            GatewayError::Conflict(what) => (StatusCode::CONFLICT, "conflict", what.clone()),
            GatewayError::UpstreamTimeout(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "Upstream service timed out".to_string(),
            ),
            GatewayError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "Upstream service unavailable".to_string(),
            ),
            GatewayError::HandlerFault(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        }
    }
}

/// Convert GatewayError to HTTP response.
///
/// Logging follows severity:
/// - 5xx errors are logged at ERROR level with the internal detail
/// - signature mismatches are logged at WARN level (possible tampering)
/// - 404s and routine auth failures are logged at DEBUG level
/// - other 4xx errors are logged at WARN level
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                detail = %self,
                "Server error"
            );
        } else {
            match &self {
                GatewayError::Unauthorized(AuthError::InvalidSignature) => {
                    warn!(
                        error_type = error_type,
                        status = status.as_u16(),
                        "Authentication failed: {}",
                        self
                    );
                }
                GatewayError::Unauthorized(_) | GatewayError::NoMatch { .. } => {
                    debug!(
                        error_type = error_type,
                        status = status.as_u16(),
                        "{}",
                        self
                    );
                }
                GatewayError::NotFound(_) => {
                    debug!(
                        error_type = error_type,
                        status = status.as_u16(),
                        "Resource not found: {}",
                        message
                    );
                }
                _ => {
                    warn!(
                        error_type = error_type,
                        status = status.as_u16(),
                        "Client error: {}",
                        message
                    );
                }
            }
        }

        let body = ErrorResponse::with_status(error_type, message, status);
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}
