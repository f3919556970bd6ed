//! Session manager: the client's authentication state and its lifecycle.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `SessionManager` is created by the host at startup and handed by
//! reference (usually `Arc`) to whatever needs identity or credentials. It
//! owns the in-memory [`Session`], mirrors it into a [`KeyValueStore`], and is
//! the only caller of the credential-issuing [`AuthApi`] endpoints.
//!
//! DESIGN
//! ======
//! State lives in a `tokio::sync::watch` channel so observers can `subscribe`
//! and react to every change. The channel lock is never held across an
//! `.await`; network calls run unlocked and their results are applied in a
//! single `send_if_modified` step that also writes storage.
//!
//! Storage writes therefore run while the state lock is held, and readers
//! such as `snapshot()` wait for them. The store holds three small keys and
//! is local, so the wait is one small file write. Writing after releasing
//! the lock would let a logout and a login interleave their writes and leave
//! storage disagreeing with memory.
//!
//! SEQUENCING
//! ==========
//! `epoch` is bumped by every login start and every logout. A login applies
//! its grant only if its own epoch is still current, so of two overlapping
//! logins the one issued last wins, and a logout discards any login still in
//! flight. A refresh applies only if no login/logout happened since it began,
//! and a failed refresh forces a logout under the same condition. Every epoch
//! change happens inside a state update, so each check and the write it guards
//! are one step.


pub mod error;

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

pub use error::SessionError;

use crate::api::{ApiError, AuthApi, LoginGrant};
use crate::models::{Session, UserProfile};
use crate::navigation::{Navigator, Route};
use crate::storage::{KeyValueStore, StorageError, keys};

#[derive(Debug, thiserror::Error)]
enum HydrateError {
    #[error("session store unreadable: {0}")]
    Storage(#[from] StorageError),
    #[error("stored user is not valid JSON: {0}")]
    User(#[from] serde_json::Error),
}

/// Clears the loading flag when dropped, including when the owning future is
/// dropped mid-request.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<Session>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|s| std::mem::replace(&mut s.is_loading, false));
    }
}

pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<Session>,
    epoch: AtomicU64,
    initialized: AtomicBool,
    route: Mutex<Option<Route>>,
}

impl SessionManager {
    /// Create a manager in the loading state. Call [`SessionManager::initialize`]
    /// next to hydrate from storage.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn KeyValueStore>, navigator: Arc<dyn Navigator>) -> Self {
        let (state, _) = watch::channel(Session::loading());
        Self {
            api,
            store,
            navigator,
            state,
            epoch: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            route: Mutex::new(None),
        }
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    /// Last route this manager asked the navigator for.
    #[must_use]
    pub fn current_route(&self) -> Option<Route> {
        *self.route.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Hydrate from storage. Runs once; later calls are ignored.
    ///
    /// A session is restored only when `user`, `token` and `refreshToken` are
    /// all stored. An unreadable store or corrupt `user` clears every session
    /// key. Loading is always cleared afterwards.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            tracing::warn!("session already initialized");
            return;
        }

        match self.read_stored_session() {
            Ok(Some((user, token, refresh_token))) => {
                tracing::info!(user_id = %user.id, "session restored");
                self.state.send_modify(|s| {
                    s.user = Some(user);
                    s.access_token = Some(token);
                    s.refresh_token = Some(refresh_token);
                    s.is_loading = false;
                });
            }
            Ok(None) => {
                tracing::debug!("no stored session");
                self.state.send_modify(|s| s.is_loading = false);
            }
            Err(e) => {
                tracing::error!(error = %e, "discarding stored session");
                self.end_session(None);
            }
        }
    }

    fn read_stored_session(&self) -> Result<Option<(UserProfile, String, String)>, HydrateError> {
        let user = self.store.get(keys::USER)?;
        let token = self.store.get(keys::TOKEN)?;
        let refresh_token = self.store.get(keys::REFRESH_TOKEN)?;
        let (Some(user), Some(token), Some(refresh_token)) = (user, token, refresh_token) else {
            return Ok(None);
        };
        let user: UserProfile = serde_json::from_str(&user)?;
        Ok(Some((user, token, refresh_token)))
    }

    /// Exchange credentials for a session and go to the dashboard.
    ///
    /// # Errors
    ///
    /// - `RejectedCredentials` with the backend message on a refused login
    /// - `NetworkFault` when the backend is unreachable
    /// - `MalformedResponse` when a success body cannot be decoded
    /// - `Superseded` when a newer login or a logout overtook this call
    ///
    /// On every error the previous session is left as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        let mut ticket = 0;
        self.state.send_modify(|s| {
            ticket = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            s.is_loading = true;
        });
        tracing::debug!(ticket, "login started");

        match self.api.login(email, password).await {
            Ok(grant) => {
                let user_id = grant.user.id.clone();
                if !self.apply_grant(ticket, grant) {
                    tracing::debug!(ticket, "login result superseded");
                    return Err(SessionError::Superseded);
                }
                tracing::info!(%user_id, "logged in");
                self.navigate(Route::Dashboard);
                Ok(())
            }
            Err(e) => {
                let current = self.state.send_if_modified(|s| {
                    if self.epoch.load(Ordering::SeqCst) != ticket {
                        return false;
                    }
                    s.is_loading = false;
                    true
                });
                tracing::warn!(error = %e, current, "login failed");
                Err(SessionError::from_login(e))
            }
        }
    }

    fn apply_grant(&self, ticket: u64, grant: LoginGrant) -> bool {
        self.state.send_if_modified(|s| {
            if self.epoch.load(Ordering::SeqCst) != ticket {
                return false;
            }
            self.persist_grant(&grant);
            s.user = Some(grant.user);
            s.access_token = Some(grant.tokens.access_token);
            s.refresh_token = Some(grant.tokens.refresh_token);
            s.is_loading = false;
            true
        })
    }

    fn persist_grant(&self, grant: &LoginGrant) {
        let user = match serde_json::to_string(&grant.user) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode user for storage");
                return;
            }
        };
        for (key, value) in [
            (keys::USER, user.as_str()),
            (keys::TOKEN, grant.tokens.access_token.as_str()),
            (keys::REFRESH_TOKEN, grant.tokens.refresh_token.as_str()),
        ] {
            if let Err(e) = self.store.set(key, value) {
                tracing::warn!(key, error = %e, "session write failed");
            }
        }
    }

    /// Mint a new access token with the stored refresh token.
    ///
    /// Returns `true` when the new token was applied. Any failure logs the
    /// user out and returns `false`, except when a login or logout happened
    /// meanwhile, in which case the result is discarded without logging out.
    pub async fn refresh_access_token(&self) -> bool {
        let ticket = self.epoch.load(Ordering::SeqCst);
        let refresh_token = self.state.borrow().refresh_token.clone();
        let Some(refresh_token) = refresh_token else {
            tracing::warn!("no refresh token; logging out");
            self.logout();
            return false;
        };

        match self.api.refresh(&refresh_token).await {
            Ok(access_token) => {
                let applied = self.state.send_if_modified(|s| {
                    if self.epoch.load(Ordering::SeqCst) != ticket {
                        return false;
                    }
                    if let Err(e) = self.store.set(keys::TOKEN, &access_token) {
                        tracing::warn!(error = %e, "access token write failed");
                    }
                    s.access_token = Some(access_token);
                    true
                });
                if applied {
                    tracing::debug!("access token refreshed");
                } else {
                    tracing::debug!("refresh result superseded");
                }
                applied
            }
            Err(e) => {
                if !self.end_session(Some(ticket)) {
                    tracing::debug!(error = %e, "stale refresh failed");
                    return false;
                }
                tracing::warn!(error = %e, "token refresh failed; logged out");
                self.navigate(Route::Landing);
                false
            }
        }
    }

    /// Submit a registration form and go to the login view on success. Does
    /// not authenticate.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` when the backend refuses the form
    /// - `NetworkFault` when the backend is unreachable
    pub async fn register(&self, payload: &serde_json::Value) -> Result<(), SessionError> {
        self.state.send_modify(|s| s.is_loading = true);
        let result = {
            let _loading = LoadingGuard { state: &self.state };
            self.api.register(payload).await
        };

        match result {
            Ok(()) => {
                tracing::info!("registered");
                self.navigate(Route::Login);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "registration failed");
                Err(SessionError::from_register(e))
            }
        }
    }

    /// Clear the session in memory and storage, then go to the landing page.
    /// Idempotent.
    pub fn logout(&self) {
        self.end_session(None);
        tracing::info!("logged out");
        self.navigate(Route::Landing);
    }

    /// Clear memory and storage and bump the epoch, all under the state lock.
    /// With `Some(ticket)` this happens only while `ticket` is still the
    /// current epoch; returns whether it happened.
    fn end_session(&self, ticket: Option<u64>) -> bool {
        self.state.send_if_modified(|s| {
            if ticket.is_some_and(|t| self.epoch.load(Ordering::SeqCst) != t) {
                return false;
            }
            self.epoch.fetch_add(1, Ordering::SeqCst);
            s.clear_credentials();
            s.is_loading = false;
            self.clear_storage();
            true
        })
    }

    fn clear_storage(&self) {
        for key in keys::SESSION_KEYS {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "session key removal failed");
            }
        }
    }

    // =========================================================================
    // AUTHENTICATED CALLS
    // =========================================================================

    /// Run `call` with the current access token. A 401 triggers one refresh
    /// and one retry with the new token.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when no token is held, the refresh fails, or the
    /// retried call is still unauthorized. Other failures map through
    /// [`SessionError::from_request`].
    pub async fn authorized<T, F, Fut>(&self, call: F) -> Result<T, SessionError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let token = self.access_token().ok_or(SessionError::NotAuthenticated)?;
        match call(token).await {
            Err(ApiError::Rejected { status: 401, .. }) => {
                tracing::debug!("access token rejected; refreshing");
                if !self.refresh_access_token().await {
                    return Err(SessionError::NotAuthenticated);
                }
                let token = self.access_token().ok_or(SessionError::NotAuthenticated)?;
                call(token).await.map_err(|e| match e {
                    ApiError::Rejected { status: 401, .. } => SessionError::NotAuthenticated,
                    other => SessionError::from_request(other),
                })
            }
            other => other.map_err(SessionError::from_request),
        }
    }

    fn navigate(&self, route: Route) {
        *self.route.lock().unwrap_or_else(PoisonError::into_inner) = Some(route);
        self.navigator.navigate(route);
    }
}
