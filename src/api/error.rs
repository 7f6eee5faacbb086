//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::authority::{AuthorityError, Rejection};

/// Body for a request without a usable credential.
pub const NO_TOKEN_PROVIDED: &str = "No token provided";

/// Body for an unknown, revoked or expired credential.
pub const INVALID_TOKEN: &str = "Invalid token";

/// Body when the token store cannot be reached.
pub const STORE_UNAVAILABLE: &str = "Token store unavailable";

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn store_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for Result<T, AuthorityError> {
    fn store_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::store_error(msg, e))
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    TooManyRequests(String),
    Unavailable(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        Self::TooManyRequests(msg.into())
    }

    pub fn store_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Unavailable(STORE_UNAVAILABLE.into())
    }

    /// The documented 401 body for an authority rejection.
    pub fn rejected(rejection: Rejection) -> Self {
        match rejection {
            Rejection::MissingCredential => Self::unauthorized(NO_TOKEN_PROVIDED),
            Rejection::UnknownOrRevoked | Rejection::Expired => Self::unauthorized(INVALID_TOKEN),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages() {
        let cases = [
            (Rejection::MissingCredential, NO_TOKEN_PROVIDED),
            (Rejection::UnknownOrRevoked, INVALID_TOKEN),
            (Rejection::Expired, INVALID_TOKEN),
        ];
        for (rejection, expected) in cases {
            match ApiError::rejected(rejection) {
                ApiError::Unauthorized(msg) => assert_eq!(msg, expected),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::unauthorized("x").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::too_many_requests("x").into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::store_error("ctx", "boom").into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
