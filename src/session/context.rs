use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::domain::Identity;
use crate::token::{decode_claims, Bearer, TokenError};

use super::error::SessionError;
use super::store::TokenStore;

struct SessionInner {
    store: Box<dyn TokenStore>,
    bearer: Mutex<Option<Bearer>>,
    identity: watch::Sender<Option<Identity>>,
}

/// The process-wide credential context.
///
/// Cloning yields another handle to the same session. Every change is
/// published on a watch channel, so all subscribers see a login, logout or
/// expiry as soon as it happens.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(store: impl TokenStore) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                store: Box::new(store),
                bearer: Mutex::new(None),
                identity,
            }),
        }
    }

    /// Restores the session from the token store.
    ///
    /// A stored token that cannot be decoded is discarded.
    #[instrument(skip(self))]
    pub fn load(&self) -> Option<Identity> {
        let Some(token) = self.inner.store.read() else {
            debug!("No stored token");
            self.set(None);
            return None;
        };

        match Self::decode(&token) {
            Ok(identity) => {
                info!(subject = %identity.subject, role = %identity.role, "Session restored");
                self.set(Some((Bearer::new(token), identity.clone())));
                Some(identity)
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored token");
                self.inner.store.clear();
                self.set(None);
                None
            }
        }
    }

    /// Adopts a freshly issued token. An unreadable or already expired token
    /// leaves the session untouched.
    #[instrument(skip(self, bearer))]
    pub fn login(&self, bearer: Bearer) -> Result<Identity, SessionError> {
        let identity = Self::decode(bearer.as_str())?;
        if identity.is_expired(Utc::now()) {
            return Err(SessionError::Expired);
        }

        self.inner.store.write(bearer.as_str());
        info!(subject = %identity.subject, role = %identity.role, "Signed in");
        self.set(Some((bearer, identity.clone())));
        Ok(identity)
    }

    /// Signing out twice is the same as signing out once.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.inner.store.clear();
        if self.set(None) {
            info!("Signed out");
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.identity.borrow().clone()
    }

    pub fn bearer(&self) -> Option<Bearer> {
        self.lock_bearer().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.inner.identity.subscribe()
    }

    /// Signs out if the identity has expired by `now`, then returns whatever
    /// identity remains.
    pub fn revalidate(&self, now: DateTime<Utc>) -> Option<Identity> {
        match self.identity() {
            Some(identity) if identity.is_expired(now) => {
                info!(subject = %identity.subject, "Session expired");
                self.logout();
                None
            }
            current => current,
        }
    }

    /// The live identity and its bearer, checked against `now`.
    pub fn require(&self, now: DateTime<Utc>) -> Result<(Identity, Bearer), SessionError> {
        let had_identity = self.identity().is_some();
        let identity = match self.revalidate(now) {
            Some(identity) => identity,
            None if had_identity => return Err(SessionError::Expired),
            None => return Err(SessionError::SignedOut),
        };
        let bearer = self.bearer().ok_or(SessionError::SignedOut)?;
        Ok((identity, bearer))
    }

    fn decode(token: &str) -> Result<Identity, TokenError> {
        decode_claims(token)?.identity()
    }

    fn lock_bearer(&self) -> std::sync::MutexGuard<'_, Option<Bearer>> {
        self.inner.bearer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns true when the published identity changed.
    fn set(&self, state: Option<(Bearer, Identity)>) -> bool {
        let (bearer, identity) = match state {
            Some((bearer, identity)) => (Some(bearer), Some(identity)),
            None => (None, None),
        };
        *self.lock_bearer() = bearer;
        self.inner.identity.send_if_modified(|current| {
            if *current == identity {
                false
            } else {
                *current = identity;
                true
            }
        })
    }
}

/// Rechecks expiry on a fixed interval for as long as the task runs.
pub fn watch_expiry(session: Session, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if session.identity().is_some() {
                session.revalidate(Utc::now());
            }
        }
    })
}
