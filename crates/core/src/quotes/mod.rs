//! Quote cache module.
//!
//! This module provides the core types and services for keeping the quote
//! cache fresh within provider budgets:
//!
//! - [`model`] - Cached quote rows and per-cycle updates
//! - [`store`] - Storage trait for persisting and querying quotes
//! - [`provider_config`] - Per-provider thresholds, intervals and retry policy
//! - [`planner`] - Staleness-aware planning of upstream calls
//! - [`validation`] - Per-symbol checks on provider answers
//! - [`sync`] - The sync cycle and its report
//! - [`constants`] - Configuration constants
//!
//! # Architecture
//!
//! ```text
//! QuoteSyncService → RetryExecutor → market-data crate (providers)
//!       ↓                  ↓
//! QuoteStore (DB)     UsageLedger (DB)
//! ```
//!
//! Every store and provider sits behind a trait, so the whole cycle runs
//! against mocks in tests.

pub mod constants;
pub mod model;
pub mod planner;
pub mod provider_config;
pub mod store;
pub mod sync;
pub mod validation;

#[cfg(test)]
mod sync_tests;

// Re-export commonly used types for convenience
pub use model::{MetadataUpdate, Quote, QuoteUpdate};
pub use planner::{StalenessPlanner, SyncPlan};
pub use provider_config::{LedgerFailurePolicy, ProviderConfig, RetryPolicy};
pub use store::QuoteStore;
pub use sync::{
    CallsMade, ItemError, QuoteSyncService, QuoteSyncServiceTrait, SyncReport, SyncStatus,
};
