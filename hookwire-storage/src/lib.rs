//! Storage collaborator interface for hookwire.
//!
//! The runtime never talks to a database engine directly. It consumes the
//! [`Database`] and [`Transaction`] traits defined here, threading filters,
//! sort keys, paginators and lock policies through unchanged.
//!
//! # Architecture
//!
//! - Rows are exchanged as [`AttributeMap`](hookwire_types::AttributeMap)s keyed by property id
//! - A fetch with no matching row reports [`StorageError::NotFound`]
//! - Writes return the authoritative row (defaults and generated ids filled in)
//! - Commit/rollback close the transaction; later calls report [`StorageError::Closed`]
//!
//! [`MemoryDatabase`] is a complete in-process implementation used by tests
//! and embedders that do not need persistence.

mod error;
mod memory;
mod query;
mod transaction;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryDatabase, MemoryTransaction};
pub use query::{
    DbOptions, Filter, IsolationLevel, LockPolicy, Paginator, ResourceState, SortKey, SortOrder,
    TxOptions,
};
pub use transaction::{Database, Transaction};
