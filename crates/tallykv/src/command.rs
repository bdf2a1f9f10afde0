//! Textual command parsing and dispatch.
//!
//! Each input line is one command. Tokens are separated by single spaces
//! and every verb has a fixed token count:
//!
//! | Command      | Tokens | Reply                                  |
//! |--------------|--------|----------------------------------------|
//! | `SET k v`    | 3      | none                                   |
//! | `GET k`      | 2      | value, or `NULL`                       |
//! | `DELETE k`   | 2      | none                                   |
//! | `COUNT v`    | 2      | count                                  |
//! | `BEGIN`      | 1      | none                                   |
//! | `COMMIT`     | 1      | none                                   |
//! | `ROLLBACK`   | 1      | none, or `TRANSACTION NOT FOUND`       |
//! | `END`        | 1      | none; saves and ends the session       |
//!
//! Anything else replies `Invalid command`.

use crate::error::{CommandError, Result};
use crate::store::Store;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Reply printed for an absent key.
pub const NULL_REPLY: &str = "NULL";

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SET key value`
    Set {
        /// Key to write
        key: String,
        /// Value to store
        value: String,
    },
    /// `GET key`
    Get {
        /// Key to read
        key: String,
    },
    /// `DELETE key`
    Delete {
        /// Key to remove
        key: String,
    },
    /// `COUNT value`
    Count {
        /// Value to count
        value: String,
    },
    /// `BEGIN`
    Begin,
    /// `COMMIT`
    Commit,
    /// `ROLLBACK`
    Rollback,
    /// `END`
    End,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split(' ').collect();
        let invalid = || CommandError::Invalid(line.to_string());

        let command = match tokens.as_slice() {
            ["SET", key, value] => Self::Set {
                key: (*key).to_string(),
                value: (*value).to_string(),
            },
            ["GET", key] => Self::Get {
                key: (*key).to_string(),
            },
            ["DELETE", key] => Self::Delete {
                key: (*key).to_string(),
            },
            ["COUNT", value] => Self::Count {
                value: (*value).to_string(),
            },
            ["BEGIN"] => Self::Begin,
            ["COMMIT"] => Self::Commit,
            ["ROLLBACK"] => Self::Rollback,
            ["END"] => Self::End,
            _ => return Err(invalid()),
        };

        // Empty operands come from doubled spaces and are not valid keys or values
        match &command {
            Self::Set { key, value } if key.is_empty() || value.is_empty() => Err(invalid()),
            Self::Get { key } | Self::Delete { key } if key.is_empty() => Err(invalid()),
            Self::Count { value } if value.is_empty() => Err(invalid()),
            _ => Ok(command),
        }
    }
}

/// Outcome of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to print
    Silent,
    /// A value, or `NULL` when absent
    Value(Option<String>),
    /// An occurrence count
    Count(u64),
    /// A non-fatal error message
    Error(String),
    /// The session should end
    Stop,
}

impl Reply {
    /// Text to print, if any.
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Silent | Self::Stop => None,
            other => Some(other.to_string()),
        }
    }

    /// Whether the session should stop reading input.
    pub const fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Silent | Self::Stop => Ok(()),
            Self::Value(Some(value)) => f.write_str(value),
            Self::Value(None) => f.write_str(NULL_REPLY),
            Self::Count(count) => write!(f, "{count}"),
            Self::Error(message) => f.write_str(message),
        }
    }
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Self::Error(err.to_string())
    }
}

/// Run one command against the store.
///
/// Caller-usage errors (rollback without a transaction, nested begin) are
/// turned into [`Reply::Error`] and leave the store unchanged.
///
/// # Errors
///
/// Returns `StoreError` only when saving fails on `COMMIT` or `END`.
pub fn execute(store: &mut Store, command: Command) -> Result<Reply> {
    let reply = match command {
        Command::Set { key, value } => {
            store.set(&key, &value);
            Reply::Silent
        }
        Command::Get { key } => Reply::Value(store.get(&key).map(str::to_string)),
        Command::Delete { key } => {
            store.delete(&key);
            Reply::Silent
        }
        Command::Count { value } => Reply::Count(store.count(&value)),
        Command::Begin => match store.begin() {
            Ok(()) => Reply::Silent,
            Err(e) => {
                warn!("BEGIN rejected: {e}");
                Reply::Error(e.to_string())
            }
        },
        Command::Commit => {
            store.commit()?;
            Reply::Silent
        }
        Command::Rollback => match store.rollback() {
            Ok(()) => Reply::Silent,
            Err(e) => {
                warn!("ROLLBACK rejected: {e}");
                Reply::Error(e.to_string())
            }
        },
        Command::End => {
            store.save()?;
            Reply::Stop
        }
    };
    Ok(reply)
}
