//! Client error types

use keystone_core::{ApiErrorBody, FieldErrors};
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed (bad credentials, expired session)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Request body failed server-side validation
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field_errors: FieldErrors,
    },

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflicting state, e.g. email already registered
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code and raw response body
    ///
    /// The service's JSON error body is used when present; otherwise the raw
    /// text (or the status reason when empty) becomes the message.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let parsed = ApiErrorBody::parse(&body);
        let message = match &parsed {
            Some(parsed) => parsed
                .message
                .clone()
                .unwrap_or_else(|| parsed.error.clone()),
            None if body.trim().is_empty() => status.to_string(),
            None => body,
        };

        match status.as_u16() {
            400 => match parsed.and_then(|p| p.field_errors) {
                Some(field_errors) => Self::Validation {
                    message,
                    field_errors,
                },
                None => Self::BadRequest(message),
            },
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether this is an authorization failure (HTTP 401)
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// Per-field validation messages, if the server returned any
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { field_errors, .. } => Some(field_errors),
            _ => None,
        }
    }

    /// Message the service meant for the user.
    ///
    /// `None` for transport failures and 5xx responses, whose text is not
    /// suitable for display.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::AuthenticationFailed(message)
            | Self::BadRequest(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Validation { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}
