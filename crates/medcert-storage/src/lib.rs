//! medcert-storage
//!
//! Persistence for patients, doctors and certificate records behind the
//! [`Store`](store::Store) trait, with in-memory and SQLite backends and
//! JSON backups.

pub mod backup;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use crate::error::StorageError;
pub use crate::store::{DEFAULT_SEARCH_LIMIT, Store, StoreStats};
