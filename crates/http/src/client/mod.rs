//! Keystone HTTP client

pub mod auth;
pub mod credential;
pub mod error;
pub mod renewal;
pub mod request;

pub use request::{ApiRequest, RequestKind};

use std::sync::Arc;
use std::time::Duration;

use credential::CredentialHolder;
use error::ClientError;
use keystone_core::{AuthGrant, ClientConfig, Credential, EndpointConfig};
use renewal::{RenewalCoordinator, RenewalObserver};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, ClientBuilder, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Client for the identity service and the protected API behind it.
///
/// Cloning is cheap; clones share the credential holder and the renewal
/// coordinator, so every request issued through any clone participates in
/// the same single-flight renewal.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    client: Client,
    base_url: String,
    endpoints: EndpointConfig,
    cookies: Arc<Jar>,
    refresh_url: Url,
    credentials: Arc<CredentialHolder>,
    renewal: RenewalCoordinator,
}

impl SessionClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> SessionClientBuilder {
        SessionClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn endpoints(&self) -> &EndpointConfig {
        &self.inner.endpoints
    }

    /// The credential holder shared by this client
    pub fn credentials(&self) -> &Arc<CredentialHolder> {
        &self.inner.credentials
    }

    /// Install the observer notified when a renewal outcome is applied
    pub fn set_renewal_observer(&self, observer: Arc<dyn RenewalObserver>) {
        self.inner.renewal.set_observer(observer);
    }

    /// The long-lived session proof the cookie store would send to the
    /// refresh endpoint, as a `Cookie` header value.
    ///
    /// Lets a host that does not live as long as the session (a CLI run)
    /// carry the proof over to its next start.
    pub fn session_proof(&self) -> Option<String> {
        self.inner
            .cookies
            .cookies(&self.inner.refresh_url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Seed the cookie store with a proof previously read from
    /// [`SessionClient::session_proof`]
    pub fn restore_session_proof(&self, proof: &str) {
        for pair in proof.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
            self.inner.cookies.add_cookie_str(pair, &self.inner.refresh_url);
        }
    }

    /// Drop the session proof from the cookie store
    pub fn clear_session_proof(&self) {
        let Some(proof) = self.session_proof() else {
            return;
        };
        let names = proof
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, _)| name.trim());
        for name in names {
            self.inner
                .cookies
                .add_cookie_str(&format!("{name}=; Max-Age=0"), &self.inner.refresh_url);
        }
        debug!("session proof cleared");
    }

    /// Obtain a fresh credential through the shared renewal coordinator
    pub async fn acquire_fresh_credential(&self) -> Option<AuthGrant> {
        let client = self.clone();
        self.inner
            .renewal
            .acquire_fresh_credential(move || async move { client.refresh().await })
            .await
    }

    /// Whether a renewal is currently outstanding
    pub fn is_renewing(&self) -> bool {
        self.inner.renewal.is_renewing()
    }

    /// Execute a request through the pipeline and decode the JSON response
    ///
    /// # Errors
    ///
    /// Returns the transport error, or the error status of the final attempt
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Execute a request whose successful response carries no body
    ///
    /// # Errors
    ///
    /// Returns the transport error, or the error status of the final attempt
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<(), ClientError> {
        self.send(request).await.map(drop)
    }

    /// GET a protected resource
    ///
    /// # Errors
    ///
    /// See [`SessionClient::execute`]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(ApiRequest::get(path)).await
    }

    /// POST a JSON body to a protected resource
    ///
    /// # Errors
    ///
    /// See [`SessionClient::execute`]
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(ApiRequest::post(path).json(body)?).await
    }

    /// Execute with credential injection but without authorization recovery.
    ///
    /// Used for the renewal call itself, which must never trigger renewal.
    async fn execute_direct<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        let credential = self.inner.credentials.get();
        let response = self.dispatch(&request, credential.as_ref()).await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Dispatch with credential injection and one renewal-backed retry
    async fn send(&self, mut request: ApiRequest) -> Result<reqwest::Response, ClientError> {
        let credential = self.inner.credentials.get();
        let response = self.dispatch(&request, credential.as_ref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !request.allows_renewal() {
            return Self::check(response).await;
        }

        request.mark_retried();
        debug!(path = request.path(), "authorization failed, renewing credential");

        match self.acquire_fresh_credential().await {
            Some(grant) => {
                info!(path = request.path(), "retrying request with renewed credential");
                let retried = self.dispatch(&request, Some(&grant.credential)).await?;
                Self::check(retried).await
            }
            None => Self::check(response).await,
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        credential: Option<&Credential>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}{}", self.inner.base_url, request.path());
        let mut builder = self.inner.client.request(request.method().clone(), url);

        if let Some(credential) = credential {
            builder = builder.header(header::AUTHORIZATION, credential.bearer());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method(),
            path = request.path(),
            authorized = credential.is_some(),
            retried = request.is_retried(),
            "dispatching request"
        );
        Ok(builder.send().await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, message))
        }
    }
}

/// Builder for `SessionClient`
#[derive(Default)]
pub struct SessionClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    endpoints: Option<EndpointConfig>,
    credentials: Option<Arc<CredentialHolder>>,
}

impl SessionClientBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = Self::default()
            .base_url(config.base_url.clone())
            .user_agent(config.user_agent.clone())
            .endpoints(config.endpoints.clone());
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        builder
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Override the auth endpoint paths
    #[must_use]
    pub fn endpoints(mut self, endpoints: EndpointConfig) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Share an existing credential holder instead of creating one
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<CredentialHolder>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was set or the HTTP client fails to
    /// build
    pub fn build(self) -> Result<SessionClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let endpoints = self.endpoints.unwrap_or_default();
        let refresh_url = Url::parse(&format!("{base_url}{}", endpoints.refresh)).map_err(|e| {
            ClientError::Configuration(format!("invalid refresh endpoint URL: {e}"))
        })?;

        // The cookie store carries the long-lived session proof between
        // refresh calls.
        let cookies = Arc::new(Jar::default());
        let mut client_builder = ClientBuilder::new().cookie_provider(Arc::clone(&cookies));

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("keystone-client/{}", env!("CARGO_PKG_VERSION")));
        client_builder = client_builder.user_agent(user_agent);

        let client = client_builder.build()?;
        let credentials = self.credentials.unwrap_or_default();

        Ok(SessionClient {
            inner: Arc::new(ClientInner {
                client,
                base_url,
                endpoints,
                cookies,
                refresh_url,
                renewal: RenewalCoordinator::new(Arc::clone(&credentials)),
                credentials,
            }),
        })
    }
}
