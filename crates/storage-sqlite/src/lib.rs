//! SQLite storage implementation for Tallyfolio.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `tallyfolio-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for postings and aggregates
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies
//! exist. The `core` crate is database-agnostic and works with traits.
//!
//! The aggregate table carries the engine's uniqueness invariant: a unique
//! index over the full aggregate key makes concurrent upserts racing on the
//! same key collapse to one row, and the repository retries the losing
//! insert as an update.

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod aggregates;
pub mod postings;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from tallyfolio-core for convenience
pub use tallyfolio_core::errors::{DatabaseError, Error, Result};
