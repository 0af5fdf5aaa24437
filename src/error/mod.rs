//! Centralized API error handling
//!
//! Maps auth failures to HTTP status codes and stable client-facing codes.
//! Server-side failures are logged with their detail and answered with a
//! generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing walletAddress, nonce, or signature")]
    InvalidAuthPayload,

    #[error("Invalid wallet address")]
    InvalidWalletAddress,

    #[error("Signed message does not match expected format")]
    MessageMismatch,

    #[error("Nonce is invalid, expired, or already used")]
    InvalidNonce,

    #[error("Invalid wallet signature")]
    InvalidSignature,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Refresh token is required")]
    RefreshTokenRequired,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    /// `message` goes to the client, `detail` only to the logs
    #[error("{message}")]
    Internal {
        code: &'static str,
        message: &'static str,
        detail: String,
    },
}

/// JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn internal(
        code: &'static str,
        message: &'static str,
        detail: impl std::fmt::Display,
    ) -> Self {
        ApiError::Internal {
            code,
            message,
            detail: detail.to_string(),
        }
    }

    /// Map a login failure; fatal errors become `code`/`message`
    pub fn from_auth(err: AuthError, code: &'static str, message: &'static str) -> Self {
        match err {
            AuthError::InvalidPayload => ApiError::InvalidAuthPayload,
            AuthError::InvalidWalletAddress(_) => ApiError::InvalidWalletAddress,
            AuthError::MessageMismatch => ApiError::MessageMismatch,
            AuthError::InvalidNonce => ApiError::InvalidNonce,
            AuthError::InvalidSignature => ApiError::InvalidSignature,
            fatal @ (AuthError::Store(_) | AuthError::TokenEncoding(_)) => {
                ApiError::internal(code, message, fatal)
            }
        }
    }

    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidAuthPayload => "INVALID_AUTH_PAYLOAD",
            ApiError::InvalidWalletAddress => "INVALID_WALLET_ADDRESS",
            ApiError::MessageMismatch => "MESSAGE_MISMATCH",
            ApiError::InvalidNonce => "INVALID_NONCE",
            ApiError::InvalidSignature => "INVALID_SIGNATURE",
            ApiError::Unauthorized => "AUTH_REQUIRED",
            ApiError::RefreshTokenRequired => "REFRESH_TOKEN_REQUIRED",
            ApiError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            ApiError::Internal { code, .. } => *code,
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidAuthPayload
            | ApiError::InvalidWalletAddress
            | ApiError::MessageMismatch => StatusCode::BAD_REQUEST,
            ApiError::InvalidNonce
            | ApiError::InvalidSignature
            | ApiError::Unauthorized
            | ApiError::RefreshTokenRequired
            | ApiError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        match &self {
            ApiError::Internal { detail, .. } => {
                tracing::error!(error = %detail, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: error_code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(_: validator::ValidationErrors) -> Self {
        ApiError::InvalidAuthPayload
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AddressError;
    use crate::store::StoreError;

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::InvalidNonce.error_code(), "INVALID_NONCE");
        assert_eq!(ApiError::Unauthorized.error_code(), "AUTH_REQUIRED");
        assert_eq!(
            ApiError::internal("LOGOUT_FAILED", "Failed to log out", "boom").error_code(),
            "LOGOUT_FAILED"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidWalletAddress.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::internal("X", "x", "y").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_auth_mapping() {
        let mapped = ApiError::from_auth(
            AuthError::InvalidWalletAddress(AddressError::InvalidChecksum),
            "AUTH_VERIFICATION_FAILED",
            "Authentication failed",
        );
        assert!(matches!(mapped, ApiError::InvalidWalletAddress));

        let mapped = ApiError::from_auth(
            AuthError::Store(StoreError::Unavailable("db down".to_string())),
            "AUTH_VERIFICATION_FAILED",
            "Authentication failed",
        );
        assert_eq!(mapped.error_code(), "AUTH_VERIFICATION_FAILED");
        // Internal detail stays out of the client message
        assert_eq!(mapped.to_string(), "Authentication failed");
    }
}
