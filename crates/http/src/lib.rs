//! Keystone HTTP client for the identity service and protected API
//!
//! Every request goes through [`client::SessionClient`], which attaches the
//! current credential and, on an authorization failure, renews it once
//! through the shared [`client::renewal::RenewalCoordinator`] before
//! replaying the original request.

pub mod client;

pub use client::{
    ApiRequest, RequestKind, SessionClient, SessionClientBuilder,
    credential::CredentialHolder,
    error::ClientError,
    renewal::{RenewalCoordinator, RenewalEvent, RenewalObserver},
};
