//! Token storage backends

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use photox_core::TokenStorage;
use photox_domain::{PhotoxError, Result, TokenPair};
use tracing::debug;

/// Persists the token pair as a JSON document keyed `token` and
/// `refresh_token`.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load(&self) -> Result<TokenPair> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted tokens");
                return Ok(TokenPair::empty());
            }
            Err(err) => {
                return Err(PhotoxError::Storage(format!(
                    "failed to read {}: {err}",
                    self.path.display()
                )))
            }
        };

        serde_json::from_str(&contents).map_err(|err| {
            PhotoxError::Storage(format!("corrupt token file {}: {err}", self.path.display()))
        })
    }

    async fn save(&self, tokens: &TokenPair) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                PhotoxError::Storage(format!("failed to create {}: {err}", parent.display()))
            })?;
        }

        let json = serde_json::to_vec_pretty(tokens)
            .map_err(|err| PhotoxError::Storage(format!("failed to encode tokens: {err}")))?;

        // Replaced atomically through a sibling temp file
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await.map_err(|err| {
            PhotoxError::Storage(format!("failed to write {}: {err}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|err| {
            PhotoxError::Storage(format!("failed to replace {}: {err}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), "Tokens persisted");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PhotoxError::Storage(format!(
                "failed to remove {}: {err}",
                self.path.display()
            ))),
        }
    }
}

/// In-memory storage for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    tokens: Mutex<TokenPair>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self { tokens: Mutex::new(tokens) }
    }

    /// Current stored pair
    pub fn stored(&self) -> TokenPair {
        self.tokens.lock().clone()
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load(&self) -> Result<TokenPair> {
        Ok(self.tokens.lock().clone())
    }

    async fn save(&self, tokens: &TokenPair) -> Result<()> {
        *self.tokens.lock() = tokens.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.tokens.lock() = TokenPair::empty();
        Ok(())
    }
}
