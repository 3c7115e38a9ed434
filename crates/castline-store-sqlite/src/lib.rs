//! SQLite backend for the castline ingest store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every upsert, conditional
//! soft-delete and stat batch executes as a single transaction; the
//! duplicate check lives inside that transaction, which is what keeps it
//! race-free when multiple workers land on the same unique key.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
