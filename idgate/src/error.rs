//! Error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using the gateway error
pub type Result<T> = std::result::Result<T, Error>;

/// Why a session token failed verification
///
/// `Expired` means the caller should try the refresh path; the other two
/// mean the token must be rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenErrorKind {
    /// Token signature is valid but the expiry (plus leeway) has passed
    Expired,
    /// Signature does not verify against the signing key
    BadSignature,
    /// Not a parseable token, or the wrong token kind for the operation
    Malformed,
}

impl fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "expired"),
            Self::BadSignature => write!(f, "bad_signature"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

/// Main error type for the gateway
///
/// Secrets (client secret, raw provider tokens, signing key) must never be
/// embedded in any variant's message.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Provider rejected the authorization code or the exchange call failed
    #[error("Token exchange with {provider} failed{}: {detail}", fmt_status(.status))]
    Exchange {
        /// Provider key (e.g. "google")
        provider: String,
        /// Upstream HTTP status, when the provider answered at all
        status: Option<u16>,
        detail: String,
    },

    /// Provider access token was issued but the profile fetch failed
    #[error("Profile fetch from {provider} failed{}: {detail}", fmt_status(.status))]
    Profile {
        provider: String,
        status: Option<u16>,
        detail: String,
    },

    /// Session token failed verification
    #[error("Invalid session token: {0}")]
    InvalidToken(TokenErrorKind),

    /// Session token could not be signed
    #[error("Token signing failed: {0}")]
    Token(String),

    /// Bad request (missing code, unknown provider, invalid CSRF state)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" (status {s})"),
        None => String::new(),
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            status: status.as_u16(),
        }
    }

    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Error::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::with_code(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    e.to_string(),
                ),
            ),

            Error::Exchange {
                ref provider,
                status,
                ref detail,
            } => {
                tracing::error!(provider = %provider, status = ?status, "Token exchange failed: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::with_code(
                        StatusCode::BAD_GATEWAY,
                        "EXCHANGE_ERROR",
                        "Provider token exchange failed",
                    ),
                )
            }

            Error::Profile {
                ref provider,
                status,
                ref detail,
            } => {
                tracing::error!(provider = %provider, status = ?status, "Profile fetch failed: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::with_code(
                        StatusCode::BAD_GATEWAY,
                        "PROFILE_ERROR",
                        "Provider profile fetch failed",
                    ),
                )
            }

            Error::InvalidToken(kind) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::with_code(
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    format!("Invalid session token: {kind}"),
                ),
            ),

            Error::Token(msg) => {
                tracing::error!("Token signing failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "TOKEN_ERROR",
                        "Session token could not be issued",
                    ),
                )
            }

            Error::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_code(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ),

            Error::Io(e) => {
                tracing::error!("I/O error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "IO_ERROR",
                        "I/O operation failed",
                    ),
                )
            }

            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "Internal server error",
                    ),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

// Manual From implementation for the boxed figment error
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl Error {
    /// Configuration error from a plain message
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(Box::new(figment::Error::from(msg.into())))
    }
}
