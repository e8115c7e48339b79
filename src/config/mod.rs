//! Layered configuration for the collector.
//!
//! Sources are merged in order, later ones winning:
//! 1. Type defaults
//! 2. The file named by `CONFIG_PATH`, when set
//! 3. `COLLECTOR__` prefixed environment variables (`__` separates sections)

mod cache;
mod ingest;
mod monitoring;
mod server;
mod set;

pub use cache::*;
pub use ingest::*;
pub use monitoring::*;
pub use server::*;
pub use set::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "COLLECTOR";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CollectorConfig {
    /// gNMI listener and target identity
    #[serde(default)]
    pub server: ServerConfig,
    /// State cache behaviour
    #[serde(default)]
    pub cache: CacheConfig,
    /// Update ingestion loop
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Set RPC: schema and config/state mirroring
    #[serde(default)]
    pub set: SetConfig,
    /// Prometheus endpoint
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl CollectorConfig {
    /// Loads defaults, the `CONFIG_PATH` file and environment overrides.
    ///
    /// Does not validate: call [`validate`](Self::validate) once every
    /// override has been applied.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let config: Self = builder.add_source(environment()).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Merges another file on top of the current values. Environment
    /// variables are applied again and keep the highest priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn validate(self) -> Result<Self> {
        self.server.validate()?;
        self.cache.validate()?;
        self.ingest.validate()?;
        self.set.validate()?;
        self.monitoring.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
