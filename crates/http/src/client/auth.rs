//! Identity service operations

use super::{ApiRequest, ClientError, RequestKind, SessionClient};
use keystone_core::{AuthGrant, AuthResponse, LoginRequest, RegisterRequest};

impl SessionClient {
    /// Exchange email and password for a credential
    ///
    /// A 401 here means bad credentials and is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` for bad credentials, or the transport
    /// error
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthGrant, ClientError> {
        let req = ApiRequest::post(&self.endpoints().login)
            .json(request)?
            .with_kind(RequestKind::Login);
        let response: AuthResponse = self.execute(req).await?;
        Ok(response.into())
    }

    /// Create an account and sign in
    ///
    /// # Errors
    ///
    /// Returns `Validation` with per-field messages, `Conflict` when the
    /// email is taken, or the transport error
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant, ClientError> {
        let req = ApiRequest::post(&self.endpoints().register).json(request)?;
        let response: AuthResponse = self.execute(req).await?;
        Ok(response.into())
    }

    /// Exchange the long-lived session proof for a new credential.
    ///
    /// This is the raw renewal call; it never triggers renewal itself and
    /// does not touch the credential holder. Use
    /// [`SessionClient::acquire_fresh_credential`] to renew.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` when the session proof is missing,
    /// expired or revoked
    pub async fn refresh(&self) -> Result<AuthGrant, ClientError> {
        let req = ApiRequest::post(&self.endpoints().refresh).with_kind(RequestKind::Refresh);
        let response: AuthResponse = self.execute_direct(req).await?;
        Ok(response.into())
    }

    /// Invalidate the long-lived session proof server-side
    ///
    /// # Errors
    ///
    /// Returns the error status or transport error; callers treat logout as
    /// best-effort
    pub async fn logout(&self) -> Result<(), ClientError> {
        let req = ApiRequest::post(&self.endpoints().logout).with_kind(RequestKind::Logout);
        self.execute_empty(req).await
    }
}
