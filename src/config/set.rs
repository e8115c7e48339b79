use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_CONFIG_CONTAINER;
use crate::constants::DEFAULT_STATE_CONTAINER;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SetConfig {
    /// JSON schema descriptor. Set answers `Unimplemented` without one.
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// Parent element every Set diff path must sit under
    #[serde(default = "default_state_container")]
    pub state_container: String,

    /// Sibling element the state paths are mirrored into
    #[serde(default = "default_config_container")]
    pub config_container: String,
}

impl Default for SetConfig {
    fn default() -> Self {
        Self {
            schema_path: None,
            state_container: default_state_container(),
            config_container: default_config_container(),
        }
    }
}

impl SetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.state_container.is_empty() || self.config_container.is_empty() {
            return Err(Error::InvalidConfig("set container names cannot be empty".into()));
        }
        if self.state_container == self.config_container {
            return Err(Error::InvalidConfig(format!(
                "set.state_container and set.config_container are both {:?}",
                self.state_container
            )));
        }
        if let Some(path) = &self.schema_path {
            if !path.is_file() {
                return Err(Error::InvalidConfig(format!(
                    "schema descriptor {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

fn default_state_container() -> String {
    DEFAULT_STATE_CONTAINER.to_string()
}
fn default_config_container() -> String {
    DEFAULT_CONFIG_CONTAINER.to_string()
}
