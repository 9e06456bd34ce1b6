//! Storage implementations for the intake pipeline.
//!
//! Available backends:
//! - `MemoryRecordStore` / `MemoryFileStore` - In-memory storage (always available)
//! - `LocalFileStore` - Uploads on the local filesystem (always available)
//! - `PostgresRecordStore` - PostgreSQL record storage (requires `postgres` feature)

pub mod local;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use local::LocalFileStore;
pub use memory::{MemoryFileStore, MemoryRecordStore};

#[cfg(feature = "postgres")]
pub use postgres::PostgresRecordStore;
