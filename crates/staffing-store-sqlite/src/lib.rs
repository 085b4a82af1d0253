//! SQLite backend for the staffing data layer.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each collection is one row in the
//! `documents` table.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteBackend;

#[cfg(test)]
mod tests;
