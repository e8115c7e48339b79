use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::Target;
use crate::cache::CacheTarget;
use crate::proto::gnmi::SubscribeResponse;
use crate::set::SetEngine;
use crate::IngestError;
use crate::NetworkError;
use crate::Result;

/// A running collector. Built by [`CollectorBuilder`](super::CollectorBuilder).
pub struct Collector {
    pub(super) target: Arc<Target>,
    pub(super) cache: Arc<CacheTarget>,
    pub(super) engine: Option<Arc<SetEngine>>,
    pub(super) updates_tx: mpsc::Sender<SubscribeResponse>,
    pub(super) local_addr: SocketAddr,
    pub(super) cancel: CancellationToken,
    pub(super) ingest_handle: Mutex<Option<JoinHandle<std::result::Result<(), IngestError>>>>,
    pub(super) server_handle: Mutex<Option<JoinHandle<std::result::Result<(), NetworkError>>>>,
    pub(super) background: Mutex<Vec<JoinHandle<()>>>,
}

impl Collector {
    /// Address the gNMI server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn target(&self) -> &Arc<Target> {
        &self.target
    }

    pub fn cache(&self) -> &Arc<CacheTarget> {
        &self.cache
    }

    /// `None` when the collector runs without a schema.
    pub fn set_engine(&self) -> Option<&Arc<SetEngine>> {
        self.engine.as_ref()
    }

    /// Queues an upstream response for the ingestion loop. Waits while the
    /// loop's channel is full.
    pub async fn target_update(
        &self,
        resp: SubscribeResponse,
    ) -> std::result::Result<(), IngestError> {
        self.updates_tx.send(resp).await.map_err(|_| IngestError::Closed)
    }

    /// Token cancelled when the collector stops.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Resolves once the collector has been asked to stop.
    pub async fn stopped(&self) {
        self.cancel.cancelled().await
    }

    /// Stops every task and waits for them. Returns the error that ended
    /// the ingestion loop or the server early, if any.
    pub async fn stop(&self) -> Result<()> {
        info!(target_name = self.target.name(), "stopping collector");
        self.cancel.cancel();

        let mut first_error: Option<crate::Error> = None;
        if let Some(handle) = self.ingest_handle.lock().await.take() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "ingestion loop had stopped with an error");
                    first_error.get_or_insert(e.into());
                }
                Err(e) => {
                    first_error.get_or_insert(NetworkError::TaskFailed(e).into());
                }
            }
        }
        if let Some(handle) = self.server_handle.lock().await.take() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "gNMI server failed");
                    first_error.get_or_insert(e.into());
                }
                Err(e) => {
                    first_error.get_or_insert(NetworkError::TaskFailed(e).into());
                }
            }
        }
        for handle in self.background.lock().await.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task failed");
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
