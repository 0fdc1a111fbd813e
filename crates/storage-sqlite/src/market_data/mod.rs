//! SQLite storage implementation for cached quotes.

mod model;
mod repository;

pub use model::QuoteDB;
pub use repository::MarketDataRepository;

// Re-export trait from core for convenience
pub use marketcache_core::quotes::QuoteStore;
