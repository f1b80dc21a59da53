//! Process-wide token store
//!
//! Holds the current access/refresh pair in memory and writes every
//! mutation through to the configured storage backend:
//! - login stores a full pair
//! - a successful refresh replaces the access token
//! - logout or a failed refresh clears both tokens

use std::sync::Arc;

use photox_core::TokenStorage;
use photox_domain::{Result, TokenPair};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::storage::MemoryTokenStorage;

/// Token store with write-through persistence
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    current: RwLock<TokenPair>,
}

impl TokenStore {
    /// Create an empty store backed by `storage`.
    ///
    /// Call [`TokenStore::initialize`] to pick up persisted tokens.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { storage, current: RwLock::new(TokenPair::empty()) }
    }

    /// Store backed by process memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStorage::new()))
    }

    /// Create a store and load persisted tokens from `storage`.
    ///
    /// # Errors
    /// Returns error if the storage backend cannot be read
    pub async fn load(storage: Arc<dyn TokenStorage>) -> Result<Self> {
        let store = Self::new(storage);
        store.initialize().await?;
        Ok(store)
    }

    /// Load persisted tokens into memory.
    ///
    /// # Returns
    /// `true` if an access token was found
    ///
    /// # Errors
    /// Returns error if the storage backend cannot be read
    pub async fn initialize(&self) -> Result<bool> {
        let tokens = self.storage.load().await?;
        let found = tokens.has_access_token();
        *self.current.write().await = tokens;

        if found {
            info!("Token store initialized with existing tokens");
        } else {
            debug!("No existing tokens found in storage");
        }
        Ok(found)
    }

    pub async fn access_token(&self) -> Option<String> {
        self.current.read().await.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.current.read().await.refresh_token.clone()
    }

    /// Whether an access token is present.
    ///
    /// This is the authenticated/unauthenticated signal used by navigation
    /// guards and batch preconditions.
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.has_access_token()
    }

    /// Current pair
    pub async fn tokens(&self) -> TokenPair {
        self.current.read().await.clone()
    }

    /// Replace the whole pair (login).
    ///
    /// # Errors
    /// Returns error if persisting fails; memory is left unchanged then.
    pub async fn store_tokens(&self, tokens: TokenPair) -> Result<()> {
        let mut current = self.current.write().await;
        self.storage.save(&tokens).await?;
        *current = tokens;

        info!("Tokens stored");
        Ok(())
    }

    /// Install a refreshed access token, keeping the refresh token unless
    /// the server rotated it.
    ///
    /// # Errors
    /// Returns error if persisting fails; memory is left unchanged then.
    pub async fn update_access_token(
        &self,
        access_token: String,
        rotated_refresh: Option<String>,
    ) -> Result<()> {
        let mut current = self.current.write().await;
        let next = TokenPair {
            access_token: Some(access_token),
            refresh_token: rotated_refresh.or_else(|| current.refresh_token.clone()),
        };
        self.storage.save(&next).await?;
        *current = next;

        debug!("Access token refreshed");
        Ok(())
    }

    /// Remove both tokens.
    ///
    /// Memory is cleared even if the storage backend fails.
    ///
    /// # Returns
    /// `true` if any token was present before the call
    ///
    /// # Errors
    /// Returns error if the storage backend cannot be cleared
    pub async fn clear(&self) -> Result<bool> {
        let mut current = self.current.write().await;
        let had_tokens = !current.is_empty();
        *current = TokenPair::empty();
        drop(current);

        self.storage.clear().await?;
        if had_tokens {
            info!("Tokens cleared");
        }
        Ok(had_tokens)
    }
}
