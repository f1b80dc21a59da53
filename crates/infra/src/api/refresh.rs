//! Single-flight token refresh
//!
//! The first request that observes a 401 moves the coordinator from
//! `Idle` to `Refreshing` and starts exactly one refresh exchange. Every
//! request that observes a 401 while that exchange is in flight queues
//! behind it. When the exchange settles the queue is drained in arrival
//! order:
//!
//! - on success each queued request is replayed once with the new token
//! - on failure the session is torn down, the request that started the
//!   cycle fails with [`ApiError::SessionExpired`] and every other queued
//!   request fails with its original 401
//!
//! The cycle runs on its own task, so it completes even if the caller that
//! started it stops waiting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use photox_core::{SessionEndReason, SessionObserver};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::errors::ApiError;
use crate::auth::TokenStore;

/// Deferred re-execution of a request that failed with a 401
pub type Replay = Box<dyn FnOnce() -> BoxFuture<'static, Result<Value, ApiError>> + Send>;

/// Result of a successful refresh exchange
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedTokens {
    pub access: String,
    /// Present when the server rotates refresh tokens
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Performs the refresh exchange against the backend
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn exchange(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError>;
}

struct PendingRequest {
    replay: Replay,
    /// The 401 this request observed; `None` for an explicit refresh
    original: Option<ApiError>,
    /// Whether this request started the cycle
    originating: bool,
    reply: oneshot::Sender<Result<Value, ApiError>>,
}

enum RefreshState {
    Idle,
    Refreshing { waiters: VecDeque<PendingRequest> },
}

/// Coordinates token refresh across every request of one client
pub struct RefreshCoordinator {
    tokens: Arc<TokenStore>,
    session: Arc<dyn SessionObserver>,
    state: Mutex<RefreshState>,
    exchanges: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(tokens: Arc<TokenStore>, session: Arc<dyn SessionObserver>) -> Self {
        Self {
            tokens,
            session,
            state: Mutex::new(RefreshState::Idle),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Recover a request that failed with a 401.
    ///
    /// Resolves to the replayed outcome, or to a terminal authentication
    /// failure when the refresh does not succeed.
    pub async fn recover(
        self: &Arc<Self>,
        original: ApiError,
        replay: Replay,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<Value, ApiError> {
        self.enqueue(Some(original), replay, refresher).await
    }

    /// Refresh the access token now, joining a cycle already in flight.
    pub async fn refresh_now(
        self: &Arc<Self>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<(), ApiError> {
        let noop: Replay = Box::new(|| async { Ok(Value::Null) }.boxed());
        self.enqueue(None, noop, refresher).await.map(|_| ())
    }

    /// Clear both tokens and notify the observer.
    ///
    /// The observer is only told when there was a session to end.
    pub async fn end_session(&self, reason: SessionEndReason) {
        match self.tokens.clear().await {
            Ok(true) => self.session.session_ended(reason),
            Ok(false) => debug!(%reason, "Session already cleared"),
            Err(err) => {
                error!(error = %err, "Failed to clear persisted tokens");
                self.session.session_ended(reason);
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock(), RefreshState::Refreshing { .. })
    }

    /// Requests waiting on the in-flight refresh, including the one that
    /// started it
    pub fn pending_requests(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Refresh exchanges issued since construction
    pub fn exchanges_issued(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }

    async fn enqueue(
        self: &Arc<Self>,
        original: Option<ApiError>,
        replay: Replay,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<Value, ApiError> {
        let (reply, receiver) = oneshot::channel();

        let starts_cycle = {
            let mut state = self.state.lock();
            if let RefreshState::Refreshing { waiters } = &mut *state {
                waiters.push_back(PendingRequest { replay, original, originating: false, reply });
                debug!(waiting = waiters.len(), "Queued request behind in-flight refresh");
                false
            } else {
                let pending = PendingRequest { replay, original, originating: true, reply };
                *state = RefreshState::Refreshing { waiters: VecDeque::from([pending]) };
                true
            }
        };

        if starts_cycle {
            let coordinator = Arc::clone(self);
            tokio::spawn(async move { coordinator.run_cycle(refresher).await });
        }

        receiver.await.unwrap_or_else(|_| {
            Err(ApiError::Internal("refresh cycle ended without resolving request".to_string()))
        })
    }

    async fn run_cycle(self: Arc<Self>, refresher: Arc<dyn TokenRefresher>) {
        let mut guard = CycleGuard { coordinator: self.as_ref(), settled: false };

        match self.exchange(refresher.as_ref()).await {
            Ok(()) => {
                let waiters = guard.settle();
                info!(replaying = waiters.len(), "Access token refreshed");

                for pending in waiters {
                    let outcome = (pending.replay)().await;
                    if let Err(err) = &outcome {
                        debug!(error = %err, "Replayed request failed");
                    }
                    let _ = pending.reply.send(outcome);
                }
            }
            Err((reason, failure)) => {
                warn!(%reason, "Token refresh failed, ending session");
                self.end_session(reason).await;

                let waiters = guard.settle();
                let mut failure = failure;
                for pending in waiters {
                    let outcome = match (pending.originating, pending.original) {
                        (false, Some(original)) => Err(original),
                        (_, original) => Err(ApiError::SessionExpired {
                            cause: original.or_else(|| failure.take()).map(Box::new),
                        }),
                    };
                    let _ = pending.reply.send(outcome);
                }
            }
        }
    }

    async fn exchange(
        &self,
        refresher: &dyn TokenRefresher,
    ) -> Result<(), (SessionEndReason, Option<ApiError>)> {
        let Some(refresh_token) = self.tokens.refresh_token().await else {
            return Err((SessionEndReason::RefreshUnavailable, None));
        };

        self.exchanges.fetch_add(1, Ordering::SeqCst);
        debug!("Issuing refresh exchange");

        let refreshed = refresher.exchange(&refresh_token).await.map_err(|err| {
            warn!(error = %err, "Refresh exchange rejected");
            (SessionEndReason::RefreshFailed, Some(err))
        })?;

        self.tokens
            .update_access_token(refreshed.access, refreshed.refresh)
            .await
            .map_err(|err| (SessionEndReason::RefreshFailed, Some(ApiError::from(err))))
    }

    fn take_waiters(&self) -> VecDeque<PendingRequest> {
        match std::mem::replace(&mut *self.state.lock(), RefreshState::Idle) {
            RefreshState::Idle => VecDeque::new(),
            RefreshState::Refreshing { waiters } => waiters,
        }
    }
}

// Returns the coordinator to `Idle` if a cycle unwinds before settling;
// dropped senders then resolve their requests as internal errors.
struct CycleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl CycleGuard<'_> {
    fn settle(&mut self) -> VecDeque<PendingRequest> {
        self.settled = true;
        self.coordinator.take_waiters()
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            drop(self.coordinator.take_waiters());
        }
    }
}
