//! SQLite storage implementation for the market cache.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the store traits defined in `marketcache-core` and contains:
//! - Database connection pooling and the single-writer actor
//! - Diesel migrations
//! - The quote cache and usage log repositories
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! `core` is database-agnostic and works with traits.
//!
//! ```text
//!      core (sync engine)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
mod utils;

// Repository implementations
pub mod market_data;
pub mod usage;

pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

pub use errors::{IntoCore, StorageError};
pub use market_data::MarketDataRepository;
pub use usage::UsageRepository;

pub use marketcache_core::errors::{DatabaseError, Error, Result};
