//! Database library
//!
//! The library exposes the `RecordStore` trait, the SQLite backed `Db` implementing it through
//! pre-defined queries, and an in-memory implementation with the same semantics.
pub mod in_memory;
pub mod queries;
pub mod store;
pub mod types;

pub use in_memory::InMemoryRecordStore;
pub use queries::Db;
pub use store::RecordStore;
