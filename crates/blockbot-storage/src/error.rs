//! Storage error types for blockbot-storage.
//!
//! Every failure of a [`ModuleStore`](crate::traits::ModuleStore) operation
//! is a value of [`StorageError`]. Callers report it and keep their
//! in-memory state.

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The SQLite backend reported an error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// No module or workspace at the given path.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Creating or renaming onto a path that is taken.
    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    /// The backend cannot be reached.
    #[error("storage unavailable")]
    Unavailable,

    /// A path that does not follow `<workspace>/<module>.blk`.
    #[error("invalid module path: '{path}'")]
    InvalidPath { path: String },

    /// Module content text parsed as JSON but is not a module.
    #[error("invalid module content: {reason}")]
    InvalidContent { reason: String },
}
