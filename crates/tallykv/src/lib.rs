//! File-backed key-value store with a value occurrence index and
//! single-level transactions.
//!
//! The store keeps every record in memory together with a derived index
//! from value to the number of keys holding it, so `COUNT` is a lookup
//! rather than a scan. A transaction stages writes in an overlay that reads
//! and counts see immediately; `commit` folds the overlay in and rewrites
//! the backing file, `rollback` drops it.
//!
//! # Architecture
//!
//! - `store`: records, index and transaction control
//! - `index`: value occurrence counts
//! - `transaction`: the uncommitted overlay
//! - `codec`: `key,value` backing file format
//! - `command`: textual command parsing and dispatch
//! - `session`: the interactive loop
//! - `config`: CLI and environment configuration
//!
//! # Example
//!
//! ```no_run
//! use tallykv::Store;
//!
//! fn main() -> tallykv::Result<()> {
//!     let mut store = Store::open("db.csv")?;
//!     store.set("a", "x");
//!     store.begin()?;
//!     store.set("b", "x");
//!     assert_eq!(store.count("x"), 2);
//!     store.rollback()?;
//!     assert_eq!(store.count("x"), 1);
//!     store.save()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod index;
pub mod session;
pub mod store;
pub mod transaction;

pub use command::{Command, Reply};
pub use config::SessionConfig;
pub use error::{CommandError, Result, SessionError, StoreError, TransactionError};
pub use index::OccurrenceIndex;
pub use session::SessionEnd;
pub use store::Store;
pub use transaction::{Overlay, Pending, TransactionState};
