//! Keystone core types and utilities

pub mod config;
pub mod error;
pub mod tracing;
pub mod types;
pub mod validation;

pub use config::{ClientConfig, EndpointConfig};
pub use error::{CoreError, CoreResult};
pub use types::{
    ApiErrorBody, AuthGrant, AuthResponse, Credential, FieldErrors, LoginRequest, Profile,
    RegisterRequest, SessionState, SessionStatus,
};
