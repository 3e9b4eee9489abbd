//! Replayable request description

use reqwest::Method;
use serde::Serialize;

use super::error::ClientError;

/// What a request is, as far as authorization recovery is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Any protected API call
    Standard,
    /// Password login; a 401 means bad credentials
    Login,
    /// Credential renewal; a 401 means the session is over
    Refresh,
    /// Session invalidation.
    ///
    /// Also exempt, unlike the browser client this replaces, which only
    /// exempted login and refresh. Logout is sent after the local credential
    /// is cleared, so it usually carries no bearer token and may well get a
    /// 401; renewing then would mint a credential for a session the user just
    /// ended.
    Logout,
}

impl RequestKind {
    /// Whether a 401 on this kind of request may be recovered by renewal
    pub const fn renews_on_unauthorized(self) -> bool {
        matches!(self, Self::Standard)
    }
}

/// A request the pipeline can dispatch more than once.
///
/// Rebuilt into a `reqwest::Request` for every dispatch so the replay after a
/// renewal is identical except for the credential it carries.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    kind: RequestKind,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            kind: RequestKind::Standard,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_kind(mut self, kind: RequestKind) -> Self {
        self.kind = kind;
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    /// Whether a 401 on this request should go through renewal
    pub(crate) const fn allows_renewal(&self) -> bool {
        self.kind.renews_on_unauthorized() && !self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}
