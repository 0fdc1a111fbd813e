//! Refresh budget module - quota and interval policy for upstream calls.

mod limits_model;
mod limits_service;

pub use limits_model::RefreshDecision;
pub use limits_service::{month_start, next_month_start, BudgetGatekeeper};
