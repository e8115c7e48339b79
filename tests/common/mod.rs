use std::io::Write;
use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;

use gnmi_collector::proto::gnmi::g_nmi_client::GNmiClient;
use gnmi_collector::proto::gnmi::Path;
use gnmi_collector::Collector;
use gnmi_collector::CollectorBuilder;
use gnmi_collector::CollectorConfig;
use tempfile::NamedTempFile;
use tokio::sync::watch;
use tonic::transport::Channel;

pub const TARGET: &str = "dut";

pub const SCHEMA_JSON: &str = r#"{
  "models": [
    { "name": "openconfig-interfaces", "organization": "OpenConfig working group", "version": "3.0.0" },
    { "name": "openconfig-system", "organization": "OpenConfig working group", "version": "1.0.0" }
  ],
  "root": {
    "kind": "container",
    "children": {
      "interfaces": {
        "kind": "container",
        "children": {
          "interface": {
            "kind": "list",
            "keys": ["name"],
            "children": {
              "config": {
                "kind": "container",
                "children": {
                  "description": { "kind": "leaf", "type": { "base": "string", "max_length": 64 } },
                  "mtu": { "kind": "leaf", "type": { "base": "uint", "min": 68, "max": 9216 } }
                }
              },
              "state": {
                "kind": "container",
                "children": {
                  "description": { "kind": "leaf", "type": { "base": "string", "max_length": 64 } },
                  "mtu": { "kind": "leaf", "type": { "base": "uint", "min": 68, "max": 9216 } },
                  "oper-status": { "kind": "leaf", "type": { "base": "enumeration", "values": ["UP", "DOWN"] } }
                }
              }
            }
          }
        }
      },
      "system": {
        "kind": "container",
        "children": {
          "config": {
            "kind": "container",
            "children": { "hostname": { "kind": "leaf", "type": { "base": "string" } } }
          },
          "state": {
            "kind": "container",
            "children": { "hostname": { "kind": "leaf", "type": { "base": "string" } } }
          }
        }
      }
    }
  }
}"#;

static LOGGER_INIT: Once = Once::new();

pub fn enable_logger() {
    LOGGER_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// A collector on an ephemeral port. The schema file and the shutdown
/// sender must outlive the collector.
pub struct TestCollector {
    pub collector: Collector,
    pub shutdown_tx: watch::Sender<()>,
    _schema_file: Option<NamedTempFile>,
}

impl TestCollector {
    pub async fn start(with_schema: bool) -> Self {
        enable_logger();

        let mut config = CollectorConfig::default();
        config.server.listen_address = "127.0.0.1:0".parse().unwrap();
        config.server.target = TARGET.to_string();

        let schema_file = with_schema.then(|| {
            let mut file = NamedTempFile::new().unwrap();
            file.write_all(SCHEMA_JSON.as_bytes()).unwrap();
            file
        });
        config.set.schema_path = schema_file.as_ref().map(|f| f.path().to_path_buf());

        let config = config.validate().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let collector = CollectorBuilder::new(config, shutdown_rx).start().await.unwrap();

        Self {
            collector,
            shutdown_tx,
            _schema_file: schema_file,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.collector.local_addr()
    }

    pub async fn client(&self) -> GNmiClient<Channel> {
        connect(self.addr()).await
    }

    pub async fn stop(self) {
        self.shutdown_tx.send(()).unwrap();
        self.collector.stop().await.unwrap();
    }
}

pub async fn connect(addr: SocketAddr) -> GNmiClient<Channel> {
    let endpoint = format!("http://{addr}");
    for _ in 0..50 {
        if let Ok(client) = GNmiClient::connect(endpoint.clone()).await {
            return client;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("could not connect to {endpoint}");
}

pub fn path(text: &str) -> Path {
    Path::parse(text).unwrap()
}

pub fn target_prefix() -> Option<Path> {
    Some(Path {
        target: TARGET.to_string(),
        ..Default::default()
    })
}
