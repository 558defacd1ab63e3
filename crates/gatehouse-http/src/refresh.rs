//! Single-flight token refresh.
//!
//! The coordinator owns the only write path to the token store during a
//! refresh. The first caller that sees a 401 starts a refresh; every caller
//! that arrives while it is in flight awaits the same shared future and
//! observes the same outcome.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use gatehouse_core::{AccessToken, RefreshToken, Result, TokenPair, TokenStore};

/// Performs the actual refresh call.
#[async_trait]
pub trait Refresher: Send + Sync {
    /// Exchange `token` for a new pair.
    async fn refresh(&self, token: &RefreshToken) -> Result<TokenPair>;
}

/// Result of a refresh, shared by every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token is in the store.
    Refreshed(AccessToken),
    /// Refresh failed; the store has been cleared.
    Rejected(String),
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A refresh succeeded and new tokens are stored.
    SessionRefreshed,
    /// The session cannot be recovered; the user has to log in again.
    LoginRequired,
}

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Refreshing,
    Failed,
}

type Flight = Shared<BoxFuture<'static, RefreshOutcome>>;

enum State {
    Idle,
    Refreshing { generation: u64, flight: Flight },
    Failed,
}

struct Inner {
    state: State,
    generation: u64,
}

/// Serializes refreshes so at most one is in flight at a time.
pub struct RefreshCoordinator {
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn Refresher>,
    inner: Mutex<Inner>,
    events: broadcast::Sender<AuthEvent>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn TokenStore>, refresher: Arc<dyn Refresher>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            store,
            refresher,
            inner: Mutex::new(Inner {
                state: State::Idle,
                generation: 0,
            }),
            events,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> CoordinatorState {
        match self.lock().state {
            State::Idle => CoordinatorState::Idle,
            State::Refreshing { .. } => CoordinatorState::Refreshing,
            State::Failed => CoordinatorState::Failed,
        }
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Return to Idle after a successful login.
    ///
    /// An in-flight refresh is left alone; it settles the state itself.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, State::Failed) {
            debug!("Coordinator reset after login");
            inner.state = State::Idle;
        }
    }

    /// Signal the login boundary without a refresh attempt.
    pub fn signal_login_required(&self) {
        // No subscribers is fine.
        let _ = self.events.send(AuthEvent::LoginRequired);
    }

    /// Handle a 401 received for a request sent with `rejected`.
    ///
    /// If the store already holds a different access token (a refresh
    /// completed after the request was sent), no new refresh is started and
    /// the stored token is returned.
    #[instrument(skip_all)]
    pub async fn refresh_after_unauthorized(&self, rejected: Option<&AccessToken>) -> RefreshOutcome {
        let (generation, flight) = {
            let mut inner = self.lock();
            let joined = match &inner.state {
                State::Refreshing { generation, flight } => Some((*generation, flight.clone())),
                State::Failed => {
                    return RefreshOutcome::Rejected("session ended, login required".to_string());
                }
                State::Idle => None,
            };

            match joined {
                Some((generation, flight)) => {
                    debug!(generation, "Joining in-flight refresh");
                    (generation, flight)
                }
                None => {
                    match self.store.get() {
                        Ok(Some(pair)) if Some(&pair.access_token) != rejected => {
                            debug!("Token already replaced, skipping refresh");
                            return RefreshOutcome::Refreshed(pair.access_token);
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Failed to read token store"),
                    }

                    inner.generation += 1;
                    let generation = inner.generation;
                    let flight = run_refresh(self.store.clone(), self.refresher.clone())
                        .boxed()
                        .shared();
                    inner.state = State::Refreshing {
                        generation,
                        flight: flight.clone(),
                    };
                    debug!(generation, "Starting refresh");
                    (generation, flight)
                }
            }
        };

        let outcome = flight.await;
        self.settle(generation, &outcome);
        outcome
    }

    /// Move out of Refreshing once the flight for `generation` completed.
    /// Only the first waiter to get here performs the transition.
    fn settle(&self, generation: u64, outcome: &RefreshOutcome) {
        let mut inner = self.lock();
        let current = matches!(
            inner.state,
            State::Refreshing { generation: g, .. } if g == generation
        );
        if !current {
            return;
        }

        let event = match outcome {
            RefreshOutcome::Refreshed(_) => {
                inner.state = State::Idle;
                AuthEvent::SessionRefreshed
            }
            RefreshOutcome::Rejected(_) => {
                inner.state = State::Failed;
                AuthEvent::LoginRequired
            }
        };
        drop(inner);

        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("state", &self.state())
            .finish()
    }
}

async fn run_refresh(store: Arc<dyn TokenStore>, refresher: Arc<dyn Refresher>) -> RefreshOutcome {
    let current = match store.get() {
        Ok(Some(pair)) => pair,
        Ok(None) => return reject(store.as_ref(), "no refresh token stored".to_string()),
        Err(e) => return reject(store.as_ref(), e.to_string()),
    };

    match refresher.refresh(&current.refresh_token).await {
        Ok(pair) => {
            let access = pair.access_token.clone();
            if let Err(e) = store.set(pair) {
                return reject(store.as_ref(), e.to_string());
            }
            info!("Session refreshed");
            RefreshOutcome::Refreshed(access)
        }
        Err(e) => reject(store.as_ref(), e.to_string()),
    }
}

fn reject(store: &dyn TokenStore, reason: String) -> RefreshOutcome {
    warn!(%reason, "Token refresh failed, clearing session");
    if let Err(e) = store.clear() {
        warn!(error = %e, "Failed to clear token store");
    }
    RefreshOutcome::Rejected(reason)
}
