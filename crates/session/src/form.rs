//! Errors surfaced to login and registration forms

use keystone_core::FieldErrors;
use keystone_http::ClientError;
use serde::Serialize;

/// Which form an error is rendered on; picks the fallback message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Login,
    Register,
}

impl FormKind {
    const fn fallback_message(self) -> &'static str {
        match self {
            Self::Login => "Login failed. Please try again.",
            Self::Register => "Registration failed. Please try again.",
        }
    }
}

/// A human-readable message plus optional per-field messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct FormError {
    pub message: String,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub field_errors: FieldErrors,
}

impl FormError {
    /// Error for fields rejected before anything was sent
    pub fn from_fields(field_errors: FieldErrors) -> Self {
        Self {
            message: "Validation failed".to_string(),
            field_errors,
        }
    }

    /// Map a client error onto what the form shows.
    ///
    /// The service's own message is used when it sent one; transport
    /// failures and 5xx responses fall back to a generic message.
    pub fn from_client_error(error: &ClientError, kind: FormKind) -> Self {
        let message = error
            .server_message()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| kind.fallback_message())
            .to_string();

        Self {
            message,
            field_errors: error.field_errors().cloned().unwrap_or_default(),
        }
    }

    pub fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }

    /// Message for one field, keyed by submitted field name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.field_errors.get(name).map(String::as_str)
    }
}
