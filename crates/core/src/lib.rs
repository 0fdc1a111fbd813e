//! Marketcache Core - Domain entities, services, and traits.
//!
//! This crate contains the budget-aware sync engine. It is database-agnostic
//! and defines traits that are implemented by the `storage-sqlite` crate.
//!
//! - [`usage`] - Usage ledger over an append-only call log
//! - [`limits`] - Budget gatekeeper (monthly quota, minimum interval)
//! - [`quotes`] - Quote model, staleness planner and sync executor

pub mod errors;
pub mod limits;
pub mod quotes;
pub mod usage;

pub use limits::{BudgetGatekeeper, RefreshDecision};
pub use quotes::{ProviderConfig, QuoteSyncService, QuoteSyncServiceTrait, SyncReport};
pub use usage::UsageLedger;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
