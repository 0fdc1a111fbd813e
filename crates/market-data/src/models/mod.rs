//! Market data models
//!
//! - `types` - Type alias for provider catalog ids (InternalId)
//! - `instrument` - Asset class served by a provider
//! - `quote` - Raw provider answers (ProviderQuote, AssetMetadata)

mod instrument;
mod quote;
mod types;

pub use instrument::AssetClass;
pub use quote::{AssetMetadata, ProviderQuote};
pub use types::InternalId;
