//! Port interfaces for token persistence and session lifecycle
//!
//! These traits define the boundaries between the request pipeline and the
//! embedding application (storage backend, login navigation).

use std::fmt;

use async_trait::async_trait;
use photox_domain::{Result, TokenPair};

/// Trait for persisting the token pair across restarts
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Load the persisted pair (an empty pair when nothing is stored)
    async fn load(&self) -> Result<TokenPair>;

    /// Persist the pair, replacing whatever was stored
    async fn save(&self, tokens: &TokenPair) -> Result<()>;

    /// Remove both tokens
    async fn clear(&self) -> Result<()>;
}

/// Why a session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// The refresh exchange was rejected or failed
    RefreshFailed,
    /// A 401 arrived and no refresh token was available
    RefreshUnavailable,
    /// The user logged out
    LoggedOut,
}

impl fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RefreshFailed => write!(f, "refresh failed"),
            Self::RefreshUnavailable => write!(f, "no refresh token"),
            Self::LoggedOut => write!(f, "logged out"),
        }
    }
}

/// Receives session teardown notifications.
///
/// The embedding application reacts by sending the user to its login
/// boundary.
pub trait SessionObserver: Send + Sync {
    fn session_ended(&self, reason: SessionEndReason);
}
