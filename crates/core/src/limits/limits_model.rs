use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a budget check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshDecision {
    pub allowed: bool,
    /// Why the refresh was denied.
    pub reason: Option<String>,
    /// Earliest time a new attempt could pass the failing check.
    pub next_eligible_at: Option<DateTime<Utc>>,
    /// Set when the refresh is allowed but usage or ledger health is worth flagging.
    pub warning: Option<String>,
    /// Successful calls counted this month (0 when the ledger was unreadable).
    pub used: u64,
}

impl RefreshDecision {
    pub fn allow(used: u64) -> Self {
        Self {
            allowed: true,
            reason: None,
            next_eligible_at: None,
            warning: None,
            used,
        }
    }

    pub fn deny(
        used: u64,
        reason: impl Into<String>,
        next_eligible_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            next_eligible_at,
            warning: None,
            used,
        }
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }
}
