//! SQLite storage for the append-only API usage log.

mod model;
mod repository;

pub use model::UsageRecordDB;
pub use repository::UsageRepository;

pub use marketcache_core::usage::UsageStore;
