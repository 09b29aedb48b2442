//! SQLite backend for the Psephos election store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Fact bodies are stored as JSON and
//! queried with SQLite's JSON functions; natural keys and outgoing links live
//! in side tables so that unique constraints and restricted deletes are
//! enforced by the database itself.

mod encode;
mod rollup;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
