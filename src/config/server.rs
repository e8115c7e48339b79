use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the gNMI service listens on. Port 0 picks a free port.
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,

    /// Name of the single target this collector serves
    #[serde(default = "default_target")]
    pub target: String,

    /// Directory receiving `collector.log`; logs go to stdout when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Time allowed until a response starts, in milliseconds. 0, the default,
    /// disables it.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// HTTP2 SETTINGS_MAX_CONCURRENT_STREAMS
    #[serde(default = "default_max_streams")]
    pub max_concurrent_streams: u32,

    #[serde(default = "default_h2_keepalive_interval")]
    pub http2_keep_alive_interval_in_secs: u64,

    #[serde(default = "default_h2_keepalive_timeout")]
    pub http2_keep_alive_timeout_in_secs: u64,

    #[serde(default = "default_tcp_nodelay")]
    pub tcp_nodelay: bool,

    /// Compress responses with gzip. Compressed requests are always accepted.
    #[serde(default)]
    pub gzip_responses: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            target: default_target(),
            log_dir: None,
            request_timeout_in_ms: default_request_timeout(),
            max_concurrent_streams: default_max_streams(),
            http2_keep_alive_interval_in_secs: default_h2_keepalive_interval(),
            http2_keep_alive_timeout_in_secs: default_h2_keepalive_timeout(),
            tcp_nodelay: default_tcp_nodelay(),
            gzip_responses: false,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(Error::InvalidConfig("server.target cannot be empty".into()));
        }
        if self.target == crate::constants::WILDCARD_TARGET {
            return Err(Error::InvalidConfig(format!(
                "server.target cannot be the wildcard {:?}",
                self.target
            )));
        }
        if self.max_concurrent_streams == 0 {
            return Err(Error::InvalidConfig(
                "server.max_concurrent_streams must be > 0".into(),
            ));
        }
        if self.http2_keep_alive_timeout_in_secs >= self.http2_keep_alive_interval_in_secs {
            return Err(Error::InvalidConfig(format!(
                "http2 keepalive timeout {}s must be shorter than interval {}s",
                self.http2_keep_alive_timeout_in_secs, self.http2_keep_alive_interval_in_secs
            )));
        }
        Ok(())
    }
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9339))
}
fn default_target() -> String {
    "target".to_string()
}
fn default_request_timeout() -> u64 {
    0
}
fn default_max_streams() -> u32 {
    256
}
fn default_h2_keepalive_interval() -> u64 {
    300
}
fn default_h2_keepalive_timeout() -> u64 {
    20
}
fn default_tcp_nodelay() -> bool {
    true
}
