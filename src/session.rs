use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::MemoriesApi;
use crate::models::{AuthSession, User};

/// Session state machine: `Resolving -> {Authenticated, Anonymous}`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Between mount and the first resolution outcome
    Resolving,
    Authenticated(AuthSession),
    Anonymous,
}

/// The one view the front end may show for a given session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Auth,
    App,
}

impl SessionState {
    pub fn screen(&self) -> Screen {
        match self {
            Self::Resolving => Screen::Loading,
            Self::Authenticated(_) => Screen::App,
            Self::Anonymous => Screen::Auth,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Resolving)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(session) => Some(&session.user),
            _ => None,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Resolving => "Resolving",
            Self::Authenticated(_) => "Authenticated",
            Self::Anonymous => "Anonymous",
        }
    }
}

/// Resolves who is signed in and publishes every transition.
///
/// Clones share state, so a resolution can be spawned while the front end
/// keeps its own handle. After [`teardown`](Self::teardown) late results are
/// dropped instead of written.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    tx: Arc<watch::Sender<SessionState>>,
    mounted: Arc<AtomicBool>,
    started: Arc<AtomicBool>,
}

impl Default for SessionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionResolver {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Resolving);
        Self {
            tx: Arc::new(tx),
            mounted: Arc::new(AtomicBool::new(true)),
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn screen(&self) -> Screen {
        self.tx.borrow().screen()
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.borrow().is_resolved()
    }

    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Issue the single startup session lookup. Any failure means anonymous.
    /// Calling again after the first lookup returns the current state.
    pub async fn resolve<A: MemoriesApi + ?Sized>(&self, api: &A) -> SessionState {
        if self.started.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        let outcome = match api.fetch_session_user().await {
            Ok(user) => SessionState::Authenticated(AuthSession { token: None, user }),
            Err(e) => {
                tracing::debug!("Session lookup failed, continuing anonymously: {}", e);
                SessionState::Anonymous
            }
        };

        if !self.mounted.load(Ordering::SeqCst) {
            tracing::warn!(
                "Dropping {} session result after teardown",
                outcome.state_name()
            );
            return self.state();
        }

        // A sign-in that finished while the lookup was in flight wins.
        if self.is_resolved() {
            return self.state();
        }
        self.transition(outcome)
    }

    /// Direct transition used by the login and signup forms.
    pub fn complete_auth(&self, session: AuthSession) -> SessionState {
        self.started.store(true, Ordering::SeqCst);
        self.transition(SessionState::Authenticated(session))
    }

    /// Switch to anonymous immediately, then tell the server. The server
    /// call is advisory; its failure is swallowed.
    pub async fn logout<A: MemoriesApi + ?Sized>(&self, api: &A) -> SessionState {
        let state = self.transition(SessionState::Anonymous);
        if let Err(e) = api.logout().await {
            tracing::debug!("Logout request failed, ignoring: {}", e);
        }
        state
    }

    pub fn teardown(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    fn transition(&self, next: SessionState) -> SessionState {
        if !self.mounted.load(Ordering::SeqCst) {
            tracing::warn!("Ignoring {} transition after teardown", next.state_name());
            return self.state();
        }
        let previous = self.tx.send_replace(next.clone());
        tracing::info!(
            "Session {} -> {}",
            previous.state_name(),
            next.state_name()
        );
        next
    }
}
