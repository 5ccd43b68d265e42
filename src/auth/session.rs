//! Session lifecycle
//!
//! A [`Session`] exists exactly when a non-empty token is persisted. The
//! [`SessionManager`] is the only writer of session keys: it persists them on
//! sign-in, updates them on profile changes and clears them on logout or when
//! any request reports the session as expired.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{AuthResponse, User};
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::realtime::RoomEventSubscriber;
use crate::store::{
    CredentialStore, GUEST_KEY, TOKEN_KEY, USER_EMAIL_KEY, USER_ID_KEY, USER_NAME_KEY,
};
use crate::viewmodel::StateStore;

/// Session data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The bearer token
    pub token: String,

    /// The signed-in user
    pub user: User,
}

impl Session {
    /// Rebuild a session from persisted keys.
    ///
    /// Requires a non-empty token, a numeric user id and a name.
    pub fn load(store: &dyn CredentialStore) -> Option<Self> {
        let token = store.load(TOKEN_KEY).filter(|t| !t.is_empty())?;
        let id = store.load(USER_ID_KEY)?.parse::<i64>().ok()?;
        let name = store.load(USER_NAME_KEY)?;
        let email = store.load(USER_EMAIL_KEY).filter(|e| !e.is_empty());
        let is_guest = store.load(GUEST_KEY).as_deref() == Some("true");

        Some(Self {
            token,
            user: User {
                id,
                name,
                email,
                is_guest,
            },
        })
    }

    /// Write every session key.
    pub fn persist(&self, store: &dyn CredentialStore) -> Result<()> {
        store.save(TOKEN_KEY, &self.token)?;
        store.save(USER_ID_KEY, &self.user.id.to_string())?;
        store.save(USER_NAME_KEY, &self.user.name)?;
        match &self.user.email {
            Some(email) => store.save(USER_EMAIL_KEY, email)?,
            None => store.delete(USER_EMAIL_KEY),
        }
        store.save(GUEST_KEY, if self.user.is_guest { "true" } else { "false" })
    }
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Self {
            token: response.token,
            user: response.user,
        }
    }
}

/// Observable state of the session holder
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// The current session, if signed in
    pub session: Option<Session>,
    /// An auth request is running
    pub is_loading: bool,
    /// Message of the last failure, including the expiry notice
    pub error: Option<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Session lifecycle transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(User),
    SignedOut,
    Expired,
}

struct SessionInner {
    api: ApiClient,
    state: StateStore<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    realtime: Mutex<Option<RoomEventSubscriber>>,
}

/// Owner of the session lifecycle
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    /// Create a manager and restore any persisted session.
    pub fn new(api: ApiClient) -> Self {
        let restored = Session::load(api.credentials().as_ref());
        if let Some(session) = &restored {
            info!("Restored session for user {}", session.user.id);
        }
        let (events, _) = broadcast::channel(16);

        Self {
            inner: Arc::new(SessionInner {
                api,
                state: StateStore::new(SessionState {
                    session: restored,
                    ..SessionState::default()
                }),
                events,
                realtime: Mutex::new(None),
            }),
        }
    }

    /// Disconnect `subscriber` whenever the session ends.
    pub fn attach_realtime(&self, subscriber: RoomEventSubscriber) {
        *self
            .inner
            .realtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscriber);
    }

    /// Re-read the persisted session, replacing the in-memory one.
    pub fn restore(&self) -> Option<Session> {
        let restored = Session::load(self.inner.api.credentials().as_ref());
        self.inner.state.update(|s| s.session = restored.clone());
        restored
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.state.read(|s| s.session.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.read(SessionState::is_authenticated)
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.begin();
        let result = self.inner.api.login(email, password).await;
        self.finish_sign_in(result)
    }

    /// Create an account and sign in
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        self.begin();
        let result = self.inner.api.register(name, email, password).await;
        self.finish_sign_in(result)
    }

    /// Start a guest session
    pub async fn guest_login(&self) -> Result<User> {
        self.begin();
        let result = self.inner.api.guest_login().await;
        self.finish_sign_in(result)
    }

    /// Turn the current guest account into a permanent one
    pub async fn upgrade_account(&self, email: &str, password: &str) -> Result<User> {
        if !self.is_authenticated() {
            return Err(Error::validation("Sign in as a guest before upgrading."));
        }
        self.begin();
        let result = self.inner.api.upgrade_account(email, password).await;
        self.finish_sign_in(result)
    }

    /// Change the display name and persist it
    pub async fn update_name(&self, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            let err = Error::validation("Please enter a name.");
            self.inner.state.update(|s| s.error = Some(err.user_message()));
            return Err(err);
        }

        self.begin();
        let result = self.inner.api.update_user_name(name).await;
        match result {
            Ok(response) => {
                let user = response.user;
                self.inner
                    .api
                    .credentials()
                    .save(USER_NAME_KEY, &user.name)
                    .map_err(|e| self.fail(e))?;
                self.inner.state.update(|s| {
                    s.is_loading = false;
                    if let Some(session) = s.session.as_mut() {
                        session.user = user.clone();
                    }
                });
                Ok(user)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Ask the backend to mail a reset link; returns the server's message
    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        self.begin();
        match self.inner.api.forgot_password(email.trim()).await {
            Ok(response) => {
                self.inner.state.update(|s| s.is_loading = false);
                Ok(response.message)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Set a new password with a reset token; returns the server's message
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<String> {
        self.begin();
        match self.inner.api.reset_password(token, new_password).await {
            Ok(response) => {
                self.inner.state.update(|s| s.is_loading = false);
                Ok(response.message)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// End the session and forget persisted credentials
    pub async fn logout(&self) {
        self.disconnect_realtime().await;
        self.inner.api.credentials().clear_all();
        let had_session = self.inner.state.update(|s| {
            s.error = None;
            s.is_loading = false;
            s.session.take().is_some()
        });
        if had_session {
            info!("Signed out");
            let _ = self.inner.events.send(SessionEvent::SignedOut);
        }
    }

    /// Tear down the session after a request sent with `token` got a 401.
    ///
    /// Returns `true` only for the call that actually ended the session, so
    /// concurrent 401s produce a single teardown. A 401 for a token other than
    /// the current session's is stale and leaves the session alone.
    pub async fn handle_unauthorized(&self, token: &str) -> bool {
        let torn_down = self.inner.state.update(|s| match &s.session {
            Some(session) if session.token == token => {
                s.session = None;
                s.is_loading = false;
                s.error = Some(Error::Unauthorized.user_message());
                true
            }
            _ => false,
        });
        if !torn_down {
            self.forget_orphaned_token(token);
            return false;
        }

        warn!("Session expired; clearing credentials");
        self.inner.api.credentials().clear_all();
        self.disconnect_realtime().await;
        let _ = self.inner.events.send(SessionEvent::Expired);
        true
    }

    /// Clear a rejected token that no in-memory session owns
    fn forget_orphaned_token(&self, token: &str) {
        let credentials = self.inner.api.credentials();
        if self.is_authenticated() || credentials.load(TOKEN_KEY).as_deref() != Some(token) {
            debug!("Ignoring stale unauthorized signal");
            return;
        }
        warn!("Clearing rejected credentials without a session");
        credentials.clear_all();
    }

    /// Forward the client's unauthorized signals to [`Self::handle_unauthorized`].
    pub fn spawn_unauthorized_listener(&self) -> JoinHandle<()> {
        let mut signals = self.inner.api.on_unauthorized();
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(token) => {
                        manager.handle_unauthorized(&token).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!("Unauthorized listener skipped {} signals", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Clear the last error message
    pub fn clear_error(&self) {
        self.inner.state.update(|s| s.error = None);
    }

    fn begin(&self) {
        self.inner.state.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn fail(&self, error: Error) -> Error {
        let message = error.user_message();
        self.inner.state.update(|s| {
            s.is_loading = false;
            s.error = Some(message);
        });
        error
    }

    fn finish_sign_in(&self, result: Result<AuthResponse>) -> Result<User> {
        let response = result.map_err(|e| self.fail(e))?;
        let session = Session::from(response);
        session
            .persist(self.inner.api.credentials().as_ref())
            .map_err(|e| self.fail(e))?;

        let user = session.user.clone();
        info!("Signed in as user {}", user.id);
        self.inner.state.update(|s| {
            s.is_loading = false;
            s.error = None;
            s.session = Some(session);
        });
        let _ = self.inner.events.send(SessionEvent::SignedIn(user.clone()));
        Ok(user)
    }

    async fn disconnect_realtime(&self) {
        let subscriber = self
            .inner
            .realtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(subscriber) = subscriber {
            subscriber.disconnect().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;

    fn stored(entries: &[(&str, &str)]) -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        for (key, value) in entries {
            store.save(key, value).unwrap();
        }
        store
    }

    #[test]
    fn load_requires_non_empty_token() {
        let store = stored(&[(TOKEN_KEY, ""), (USER_ID_KEY, "1"), (USER_NAME_KEY, "Ada")]);
        assert!(Session::load(&store).is_none());
    }

    #[test]
    fn load_requires_numeric_user_id() {
        let store = stored(&[(TOKEN_KEY, "t"), (USER_ID_KEY, "abc"), (USER_NAME_KEY, "Ada")]);
        assert!(Session::load(&store).is_none());
    }

    #[test]
    fn load_treats_email_as_optional() {
        let store = stored(&[
            (TOKEN_KEY, "t"),
            (USER_ID_KEY, "7"),
            (USER_NAME_KEY, "Guest"),
            (GUEST_KEY, "true"),
        ]);
        let session = Session::load(&store).unwrap();
        assert_eq!(session.user.id, 7);
        assert_eq!(session.user.email, None);
        assert!(session.user.is_guest);
    }

    #[test]
    fn persist_then_load_restores_same_session() {
        let store = MemoryCredentialStore::new();
        let session = Session {
            token: "token-1".to_string(),
            user: User {
                id: 3,
                name: "Ada".to_string(),
                email: Some("ada@example.com".to_string()),
                is_guest: false,
            },
        };
        session.persist(&store).unwrap();
        assert_eq!(Session::load(&store), Some(session));
    }
}
