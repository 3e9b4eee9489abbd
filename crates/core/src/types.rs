use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field name to validation message, keyed by submitted field name
/// (`email`, `password`, `firstName`, `lastName`).
pub type FieldErrors = BTreeMap<String, String>;

/// Short-lived bearer credential issued by the identity service.
///
/// Opaque to the client: it is never parsed or validated, only attached to
/// outbound requests. `Debug` output is redacted so credentials cannot leak
/// through logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

/// Profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email: String,
    pub first_name: String,
}

/// Login form payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration form payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Body returned by login, register and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub email: String,
    pub first_name: String,
}

/// A credential together with the profile it was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub credential: Credential,
    pub profile: Profile,
}

impl From<AuthResponse> for AuthGrant {
    fn from(response: AuthResponse) -> Self {
        Self {
            credential: Credential::from(response.access_token),
            profile: Profile {
                email: response.email,
                first_name: response.first_name,
            },
        }
    }
}

/// Error body produced by the identity service
///
/// `message` is set for authentication and conflict failures, `field_errors`
/// for request validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub status: u16,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
}

impl ApiErrorBody {
    /// Parse an error body, returning `None` for anything that isn't the
    /// service's JSON error shape
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

/// Coarse session status, as consumed by views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Authenticated,
    Unauthenticated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initializing => "initializing",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        })
    }
}

/// Application-visible session state.
///
/// The profile only exists inside `Authenticated`, so "profile present iff
/// authenticated" holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "profile", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Initializing,
    Authenticated(Profile),
    Unauthenticated,
}

impl SessionState {
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        match self {
            Self::Initializing => SessionStatus::Initializing,
            Self::Authenticated(_) => SessionStatus::Authenticated,
            Self::Unauthenticated => SessionStatus::Unauthenticated,
        }
    }

    #[must_use]
    pub const fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// True once startup restore has finished one way or the other
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Initializing)
    }
}
