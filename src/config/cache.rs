use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_PERIOD_SECS;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Publish `/meta/...` leaves for the target on a timer
    #[serde(default)]
    pub send_meta: bool,

    #[serde(default = "default_period")]
    pub metadata_period_in_secs: u64,

    #[serde(default = "default_period")]
    pub size_period_in_secs: u64,

    /// Events buffered per live subscription before it is ended as lagging
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            send_meta: false,
            metadata_period_in_secs: default_period(),
            size_period_in_secs: default_period(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.send_meta && (self.metadata_period_in_secs == 0 || self.size_period_in_secs == 0) {
            return Err(Error::InvalidConfig(
                "cache metadata and size periods must be > 0 when send_meta is on".into(),
            ));
        }
        if self.subscriber_buffer == 0 {
            return Err(Error::InvalidConfig("cache.subscriber_buffer must be > 0".into()));
        }
        Ok(())
    }
}

fn default_period() -> u64 {
    DEFAULT_PERIOD_SECS
}
fn default_subscriber_buffer() -> usize {
    1024
}
