//! Error types for the store and its command loop.
//!
//! `StoreError` covers the backing file and is returned to callers.
//! `TransactionError` and `CommandError` are usage errors that the command
//! loop renders as replies instead of ending the session.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read the backing file
    #[error("Failed to load records from {path}: {source}")]
    Load {
        /// Path to the backing file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the backing file
    #[error("Failed to save records to {path}: {source}")]
    Save {
        /// Path to the backing file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A line in the backing file is not a `key,value` record
    #[error("Malformed record at {path}:{line}: {reason}")]
    MalformedRecord {
        /// Path to the backing file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Why the line was rejected
        reason: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transaction control misuse
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// Transaction control errors.
///
/// These are caller-usage errors; the store is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// Rollback requested with no open transaction
    #[error("TRANSACTION NOT FOUND")]
    NotFound,

    /// Begin requested while a transaction is already open
    #[error("TRANSACTION ALREADY ACTIVE")]
    AlreadyActive,
}

/// Command parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unknown verb or wrong number of arguments
    #[error("Invalid command")]
    Invalid(String),
}

/// Errors that end a command session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading input or writing replies failed
    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store failed to save on the way out
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
