//! API usage accounting.
//!
//! - [`model`] - Usage records
//! - [`store`] - Storage trait for the append-only usage log
//! - [`ledger`] - Best-effort recording and count queries over the log

pub mod ledger;
pub mod model;
pub mod store;

pub use ledger::UsageLedger;
pub use model::{NewUsageRecord, UsageRecord};
pub use store::UsageStore;
