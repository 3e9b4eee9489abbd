//! Session state machine
//!
//! [`Session`] is the only writer of authenticated/unauthenticated status.
//! It drives the credential holder on login, registration, logout and
//! startup restore, and follows renewals triggered by the request pipeline
//! through the observer it installs on the client.

use std::sync::Arc;

use keystone_core::validation;
use keystone_core::{AuthGrant, LoginRequest, Profile, RegisterRequest, SessionState};
use keystone_http::{CredentialHolder, RenewalEvent, RenewalObserver, SessionClient};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::form::{FormError, FormKind};
use crate::guard::{GuardDecision, RouteTable};

/// Observable session store
///
/// Transitions are serialized by `transitions` so the credential holder and
/// the published state change together; readers of the watch channel only
/// ever see settled snapshots.
struct SessionStore {
    credentials: Arc<CredentialHolder>,
    state: watch::Sender<SessionState>,
    transitions: Mutex<()>,
}

impl SessionStore {
    fn new(credentials: Arc<CredentialHolder>) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            credentials,
            state,
            transitions: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn publish(&self, next: SessionState) {
        let previous = self.state.send_replace(next.clone());
        if previous != next {
            info!(from = %previous.status(), to = %next.status(), "session state changed");
        }
    }

    /// Store a credential from login or registration
    fn establish(&self, grant: AuthGrant) {
        let _transition = self.transitions.lock();
        self.credentials.set(Some(grant.credential));
        self.publish(SessionState::Authenticated(grant.profile));
    }

    fn terminate(&self) {
        let _transition = self.transitions.lock();
        self.credentials.clear();
        self.publish(SessionState::Unauthenticated);
    }

    /// Apply the startup restore result unless something else settled the
    /// session first
    fn settle_initial(&self, outcome: Option<AuthGrant>) {
        let _transition = self.transitions.lock();
        if self.state.borrow().is_settled() {
            debug!("session settled before restore finished");
            return;
        }
        match outcome {
            Some(grant) => self.publish(SessionState::Authenticated(grant.profile)),
            None => {
                self.credentials.clear();
                self.publish(SessionState::Unauthenticated);
            }
        }
    }
}

impl RenewalObserver for SessionStore {
    fn on_renewal(&self, event: &RenewalEvent) {
        let _transition = self.transitions.lock();
        if self.credentials.epoch() != event.epoch() {
            debug!(epoch = event.epoch(), "ignoring superseded renewal outcome");
            return;
        }
        match event {
            RenewalEvent::Renewed { grant, .. } => {
                self.publish(SessionState::Authenticated(grant.profile.clone()));
            }
            RenewalEvent::Expired { .. } => {
                warn!("session expired, renewal refused");
                self.publish(SessionState::Unauthenticated);
            }
        }
    }
}

/// Application-facing session handle
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Session {
    client: SessionClient,
    store: Arc<SessionStore>,
    routes: Arc<RouteTable>,
}

impl Session {
    /// Wrap a client; the session starts `Initializing`
    pub fn new(client: SessionClient) -> Self {
        Self::with_routes(client, RouteTable::default())
    }

    pub fn with_routes(client: SessionClient, routes: RouteTable) -> Self {
        let store = Arc::new(SessionStore::new(Arc::clone(client.credentials())));
        client.set_renewal_observer(store.clone());
        Self {
            client,
            store,
            routes: Arc::new(routes),
        }
    }

    /// Client for protected API calls made within this session
    pub const fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Current settled state
    pub fn snapshot(&self) -> SessionState {
        self.store.snapshot()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.state.subscribe()
    }

    /// Restore the session silently at startup.
    ///
    /// Relies on the long-lived session proof alone. Always leaves
    /// `Initializing`. Once the session has settled, further calls return the
    /// current state without contacting the service; calls made while a
    /// restore is in flight join it. A caller that gives up on the restore
    /// does not strand the others, since the renewal keeps running for
    /// whoever awaits it next.
    pub async fn initialize(&self) -> SessionState {
        let current = self.snapshot();
        if current.is_settled() {
            return current;
        }

        info!("restoring session");
        let outcome = self.client.acquire_fresh_credential().await;
        self.store.settle_initial(outcome);
        self.snapshot()
    }

    /// Sign in with email and password
    ///
    /// # Errors
    ///
    /// Returns the form error to display; the session state is unchanged
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Profile, FormError> {
        let request = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        validation::validate_login(&request).map_err(FormError::from_fields)?;

        match self.client.login(&request).await {
            Ok(grant) => {
                let profile = grant.profile.clone();
                self.store.establish(grant);
                Ok(profile)
            }
            Err(err) => {
                warn!(error = %err, "login failed");
                Err(FormError::from_client_error(&err, FormKind::Login))
            }
        }
    }

    /// Create an account and sign in
    ///
    /// # Errors
    ///
    /// Returns per-field messages for invalid input (checked locally before
    /// any request), or the service's message; the session state is unchanged
    pub async fn register(&self, request: RegisterRequest) -> Result<Profile, FormError> {
        validation::validate_register(&request).map_err(FormError::from_fields)?;

        match self.client.register(&request).await {
            Ok(grant) => {
                let profile = grant.profile.clone();
                self.store.establish(grant);
                Ok(profile)
            }
            Err(err) => {
                warn!(error = %err, "registration failed");
                Err(FormError::from_client_error(&err, FormKind::Register))
            }
        }
    }

    /// Sign out.
    ///
    /// Local state goes first: the credential is cleared and the session
    /// becomes `Unauthenticated` before the service is contacted, so neither
    /// a slow logout endpoint nor a renewal settling meanwhile can keep the
    /// session alive. The server call then invalidates the session proof and
    /// is best-effort.
    pub async fn logout(&self) {
        self.store.terminate();
        if let Err(err) = self.client.logout().await {
            warn!(error = %err, "server logout failed, local session already cleared");
        }
    }

    /// Route guard decision for `path` in the current state
    pub fn guard(&self, path: &str) -> GuardDecision {
        self.routes.decide(&self.snapshot(), path)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}
