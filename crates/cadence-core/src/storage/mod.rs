//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Ladder scheduling state per item
//! - Append-only review log
//! - Versioned schema migrations

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, ReviewLogEntry, ReviewStats, Storage, StorageError};
