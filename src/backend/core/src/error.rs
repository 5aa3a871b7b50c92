//! Error taxonomy for the gateway.
//!
//! Every failure in the request path is classified into one of the kinds in
//! [`ErrorCode`]. The taxonomy is a fixed, closed set by design: new failure
//! modes are expressed as a kind plus a message, not as new variants.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// The five error kinds the gateway distinguishes.
///
/// `ConfigurationError` never reaches [`IntoResponse`]: it can only occur
/// during registry load/validate, where it aborts startup instead of being
/// turned into an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    ServiceUnavailable,
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            // Never served over HTTP, but every variant needs a status.
            Self::ConfigurationError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A classified gateway failure.
#[derive(Debug, thiserror::Error)]
pub struct GatewayError {
    code: ErrorCode,
    message: String,
    internal_message: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl GatewayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            internal_message: None,
            source: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message)
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.internal_message = Some(source.to_string());
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Log at a level matching severity, the way a request failure should be
    /// surfaced to operators without duplicating the client-facing message.
    pub fn log(&self) {
        match self.code {
            ErrorCode::InternalError | ErrorCode::ConfigurationError => {
                tracing::error!(
                    error_code = %self.code,
                    message = %self.message,
                    internal = self.internal_message.as_deref().unwrap_or(""),
                    "request failed"
                );
            }
            ErrorCode::ServiceUnavailable => {
                tracing::warn!(
                    error_code = %self.code,
                    message = %self.message,
                    "request failed"
                );
            }
            ErrorCode::BadRequest | ErrorCode::NotFound => {
                tracing::debug!(
                    error_code = %self.code,
                    message = %self.message,
                    "request rejected"
                );
            }
        }
    }
}

/// Error body shape from the error handling design: `{error, errorCode,
/// statusCode, timestamp}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    error_code: ErrorCode,
    status_code: u16,
    timestamp: DateTime<Utc>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.http_status();
        let body = ErrorBody {
            error: self.message,
            error_code: self.code,
            status_code: status.as_u16(),
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        GatewayError::internal("database driver error").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_error_handling_design() {
        assert_eq!(ErrorCode::BadRequest.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ServiceUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = GatewayError::not_found("endpoint unknown: e1");
        assert_eq!(format!("{err}"), "[NotFound] endpoint unknown: e1");
    }
}
