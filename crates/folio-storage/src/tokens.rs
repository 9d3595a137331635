//! Access/refresh token persistence.

use crate::{KeyValueStore, StorageKeys, StorageResult};
use tracing::debug;

/// Tokens read back from storage. Either may be absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl std::fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access", &self.access.as_ref().map(|_| "<redacted>"))
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// High-level API over a [`KeyValueStore`] for the two session tokens.
pub struct TokenStore {
    storage: Box<dyn KeyValueStore>,
}

impl TokenStore {
    /// Create a token store with the given storage backend.
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Persist both tokens.
    pub fn save(&self, access: &str, refresh: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, access)?;
        self.storage.set(StorageKeys::REFRESH_TOKEN, refresh)?;
        debug!("Saved session tokens");
        Ok(())
    }

    /// Replace the access token, keeping the refresh token as is.
    pub fn set_access_token(&self, access: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, access)
    }

    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::REFRESH_TOKEN)
    }

    pub fn load(&self) -> StorageResult<StoredTokens> {
        Ok(StoredTokens {
            access: self.access_token()?,
            refresh: self.refresh_token()?,
        })
    }

    pub fn has_access_token(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::ACCESS_TOKEN)
    }

    /// Remove both tokens. Both deletes are attempted; the first failure is
    /// returned.
    pub fn clear(&self) -> StorageResult<()> {
        let access = self.storage.delete(StorageKeys::ACCESS_TOKEN);
        let refresh = self.storage.delete(StorageKeys::REFRESH_TOKEN);
        access?;
        refresh?;
        debug!("Cleared session tokens");
        Ok(())
    }
}
