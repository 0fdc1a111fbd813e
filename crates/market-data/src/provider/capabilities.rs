//! Provider capabilities and call categories.
//!
//! This module defines structures for describing what a market data provider
//! can do and which upstream endpoint each call category hits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::AssetClass;

/// Describes the capabilities of a market data provider.
///
/// Used by the staleness planner to decide which call categories exist at all
/// for a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Asset class this provider serves.
    pub asset_class: AssetClass,

    /// Whether symbols must be mapped to a provider catalog id before quoting.
    /// Providers that quote by ticker use the symbol itself as internal id.
    pub resolves_ids: bool,

    /// Whether the provider can return display name and logo.
    pub supports_metadata: bool,
}

/// The three logical upstream operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Ids,
    Metadata,
    Quotes,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Ids => "ids",
            CallKind::Metadata => "metadata",
            CallKind::Quotes => "quotes",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
