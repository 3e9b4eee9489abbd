//! Single-flight credential renewal
//!
//! However many requests fail authorization at once, only one renewal call is
//! in flight. The first caller creates a shared pending outcome; everyone else
//! who arrives before it settles awaits that same outcome.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use keystone_core::AuthGrant;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::credential::CredentialHolder;

type PendingRenewal = Shared<BoxFuture<'static, Option<AuthGrant>>>;

/// Outcome of a renewal that was applied to the credential holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalEvent {
    /// A fresh credential was stored
    Renewed { grant: AuthGrant, epoch: u64 },
    /// Renewal was refused and the credential was cleared
    Expired { epoch: u64 },
}

impl RenewalEvent {
    /// Holder epoch produced by applying this outcome
    pub const fn epoch(&self) -> u64 {
        match self {
            Self::Renewed { epoch, .. } | Self::Expired { epoch } => *epoch,
        }
    }
}

/// Receives renewal outcomes, e.g. to keep session status in step
pub trait RenewalObserver: Send + Sync {
    fn on_renewal(&self, event: &RenewalEvent);
}

/// Deduplicates concurrent renewal attempts
pub struct RenewalCoordinator {
    credentials: Arc<CredentialHolder>,
    pending: Arc<Mutex<Option<PendingRenewal>>>,
    observer: Arc<RwLock<Option<Arc<dyn RenewalObserver>>>>,
}

impl RenewalCoordinator {
    pub fn new(credentials: Arc<CredentialHolder>) -> Self {
        Self {
            credentials,
            pending: Arc::new(Mutex::new(None)),
            observer: Arc::new(RwLock::new(None)),
        }
    }

    /// Install the observer notified of applied outcomes
    pub fn set_observer(&self, observer: Arc<dyn RenewalObserver>) {
        *self.observer.write() = Some(observer);
    }

    pub fn clear_observer(&self) {
        *self.observer.write() = None;
    }

    /// Whether a renewal is currently outstanding
    pub fn is_renewing(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Obtain a fresh credential, starting a renewal or joining the one in
    /// flight.
    ///
    /// `renew` is only invoked when this call starts a new attempt. On
    /// success the holder is updated and every joined caller gets the same
    /// grant; on failure the holder is cleared and everyone gets `None`. A
    /// result arriving after the holder was written by someone else (logout,
    /// login) is discarded and also yields `None`.
    pub async fn acquire_fresh_credential<F, Fut, E>(&self, renew: F) -> Option<AuthGrant>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AuthGrant, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let pending = {
            let mut slot = self.pending.lock();
            if let Some(pending) = &*slot {
                debug!("joining in-flight credential renewal");
                pending.clone()
            } else {
                let pending = self.start(renew());
                *slot = Some(pending.clone());
                pending
            }
        };

        pending.await
    }

    fn start<Fut, E>(&self, call: Fut) -> PendingRenewal
    where
        Fut: Future<Output = Result<AuthGrant, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let started_at = self.credentials.epoch();
        let credentials = Arc::clone(&self.credentials);
        let pending = Arc::clone(&self.pending);
        let observer = Arc::clone(&self.observer);
        info!(epoch = started_at, "starting credential renewal");

        async move {
            let outcome = call.await;

            let (result, event) = match outcome {
                Ok(grant) => {
                    match credentials.set_if_epoch(started_at, Some(grant.credential.clone())) {
                        Some(epoch) => {
                            info!(epoch, "credential renewed");
                            (
                                Some(grant.clone()),
                                Some(RenewalEvent::Renewed { grant, epoch }),
                            )
                        }
                        None => {
                            info!(
                                started_at,
                                "discarding renewed credential, session changed while renewing"
                            );
                            (None, None)
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "credential renewal failed");
                    let event = credentials
                        .set_if_epoch(started_at, None)
                        .map(|epoch| RenewalEvent::Expired { epoch });
                    (None, event)
                }
            };

            // Release the handle before waiters resume so the next failure
            // starts a new attempt.
            pending.lock().take();

            if let Some(event) = event {
                let observer = observer.read().clone();
                if let Some(observer) = observer {
                    observer.on_renewal(&event);
                }
            }

            result
        }
        .boxed()
        .shared()
    }
}
