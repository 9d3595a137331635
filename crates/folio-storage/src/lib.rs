//! Durable token storage for the Folio session client.
//!
//! This crate provides:
//! - [`KeyValueStore`]: the storage backend seam
//! - [`FileStorage`]: a JSON file that survives process restarts
//! - [`MemoryStorage`]: an in-process backend for tests and ephemeral sessions
//! - [`TokenStore`]: the access/refresh token API the session layer uses

mod file;
mod keys;
mod memory;
mod tokens;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use tokens::{StoredTokens, TokenStore};
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the file-backed token store at `path`.
pub fn open_token_store(path: impl Into<std::path::PathBuf>) -> StorageResult<TokenStore> {
    let storage = FileStorage::open(path)?;
    Ok(TokenStore::new(Box::new(storage)))
}
