use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestConfig {
    /// Capacity of the channel feeding the update ingestion loop
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::InvalidConfig("ingest.channel_capacity must be > 0".into()));
        }
        Ok(())
    }
}

fn default_channel_capacity() -> usize {
    1024
}
