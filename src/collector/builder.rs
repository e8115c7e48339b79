//! Assembles a [`Collector`] from its configuration.
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let collector = CollectorBuilder::new(config, shutdown_rx)
//!     .schema(schema) // optional, enables Set
//!     .start()
//!     .await?;
//! ```
//!
//! Startup failures (unreadable schema, defaults failing validation, bind
//! failure) are returned from [`CollectorBuilder::start`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use super::Collector;
use super::Target;
use super::UpdateIngestor;
use crate::cache::Cache;
use crate::cache::TargetCache;
use crate::network::grpc;
use crate::network::grpc::GnmiService;
use crate::network::grpc::SubscribeServer;
use crate::schema::Schema;
use crate::set::MirrorRewriter;
use crate::set::SetEngine;
use crate::utils::periodic::spawn_periodic;
use crate::CollectorConfig;
use crate::NetworkError;
use crate::Result;

pub struct CollectorBuilder {
    pub(super) config: CollectorConfig,
    pub(super) schema: Option<Schema>,
    shutdown_signal: watch::Receiver<()>,
}

impl CollectorBuilder {
    /// `shutdown_signal` stops the collector when a value is sent on it.
    pub fn new(
        config: CollectorConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            schema: None,
            shutdown_signal,
        }
    }

    /// Enables Set with `schema`, taking precedence over `set.schema_path`.
    pub fn schema(
        mut self,
        schema: Schema,
    ) -> Self {
        self.schema = Some(schema);
        self
    }

    pub async fn start(self) -> Result<Collector> {
        let CollectorBuilder {
            config,
            schema,
            mut shutdown_signal,
        } = self;

        let schema = match (schema, &config.set.schema_path) {
            (Some(schema), _) => Some(schema),
            (None, Some(path)) => Some(Schema::from_file(path)?),
            (None, None) => None,
        };
        let initial = schema.as_ref().map(Schema::default_root).transpose()?;

        let target_name = config.server.target.clone();
        let cache = Cache::new(&[target_name.as_str()]);
        let cache_target = cache.get_target(&target_name)?;
        cache_target.connect();

        let target = Arc::new(Target::new(
            target_name.clone(),
            cache_target.clone() as Arc<dyn TargetCache>,
            initial,
        ));
        let engine = schema.map(|schema| {
            info!(target_name = %target_name, "Set enabled");
            Arc::new(SetEngine::new(
                target.clone(),
                Arc::new(schema),
                MirrorRewriter::new(&config.set.state_container, &config.set.config_container),
            ))
        });

        let cancel = CancellationToken::new();

        let subscriptions = Arc::new(SubscribeServer::new(
            target_name.clone(),
            cache_target.clone(),
            config.cache.subscriber_buffer,
            cancel.clone(),
        ));
        let fanout = subscriptions.clone();
        cache.set_client(move |notification| fanout.update(notification));

        let (updates_tx, updates_rx) = mpsc::channel(config.ingest.channel_capacity);
        let ingestor = UpdateIngestor::new(target.clone(), updates_rx, cancel.clone());
        let ingest_handle = tokio::spawn(ingestor.run());

        let mut background = Vec::new();
        if config.cache.send_meta {
            let meta_target = cache_target.clone();
            background.push(spawn_periodic(
                "metadata",
                Duration::from_secs(config.cache.metadata_period_in_secs),
                cancel.clone(),
                move || meta_target.update_metadata(),
            ));
            let size_target = cache_target.clone();
            background.push(spawn_periodic(
                "size",
                Duration::from_secs(config.cache.size_period_in_secs),
                cancel.clone(),
                move || size_target.update_size(),
            ));
        }

        let listen_address = config.server.listen_address;
        let (listener, local_addr) = match bind(listen_address).await {
            Ok(bound) => bound,
            Err(e) => {
                cancel.cancel();
                return Err(e.into());
            }
        };

        let service = GnmiService::new(
            target_name.clone(),
            cache_target.clone(),
            engine.clone(),
            subscriptions,
        );
        let server_handle = tokio::spawn(grpc::start_rpc_server(
            service,
            listener,
            config.server.clone(),
            cancel.clone(),
        ));

        let watcher = cancel.clone();
        background.push(tokio::spawn(async move {
            tokio::select! {
                _ = watcher.cancelled() => {}
                Ok(()) = shutdown_signal.changed() => {
                    debug!("shutdown signal received");
                    watcher.cancel();
                }
            }
        }));

        info!(target_name = %target_name, %local_addr, "collector started");

        Ok(Collector {
            target,
            cache: cache_target,
            engine,
            updates_tx,
            local_addr,
            cancel,
            ingest_handle: Mutex::new(Some(ingest_handle)),
            server_handle: Mutex::new(Some(server_handle)),
            background: Mutex::new(background),
        })
    }
}

async fn bind(
    addr: SocketAddr,
) -> std::result::Result<(TcpListener, SocketAddr), NetworkError> {
    let bind_error = |source| NetworkError::Bind { addr, source };
    let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;
    Ok((listener, local_addr))
}
