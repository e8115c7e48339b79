//! A single-target gNMI collector.
//!
//! The collector keeps the state of one target in a cache fed by the
//! [`UpdateIngestor`], serves it through the gNMI Subscribe and Get RPCs and,
//! when started with a schema, accepts Set transactions that are validated
//! against the schema and published to the cache with their `state`
//! container mirrored into `config`.
//!
//! ```ignore
//! let config = CollectorConfig::new()?.validate()?;
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let collector = CollectorBuilder::new(config, shutdown_rx).start().await?;
//! collector.target_update(response).await?;
//! ```

pub mod cache;
mod collector;
mod config;
mod constants;
mod errors;
pub mod metrics;
pub mod network;
pub mod proto;
pub mod schema;
pub mod set;
pub mod tree;
pub mod utils;

pub use collector::*;
pub use config::*;
pub use errors::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
