//! Single-writer loop applying upstream state updates to the cache.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::Target;
use crate::metrics::INGESTED_MESSAGES;
use crate::proto::gnmi::subscribe_response::Response;
use crate::proto::gnmi::Notification;
use crate::proto::gnmi::SubscribeResponse;
use crate::IngestError;

/// An upstream message as the ingestion loop sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMessage {
    /// Changes to apply on top of the cached state
    Delta(Notification),
    /// The upstream finished sending its initial state
    Sync,
    /// The upstream failed; nothing after this is processed
    Error(String),
}

impl SourceMessage {
    /// Classifies a response. A response without payload is an error.
    pub fn from_response(resp: SubscribeResponse) -> Result<Self, IngestError> {
        match resp.response {
            Some(Response::Update(notification)) => Ok(SourceMessage::Delta(notification)),
            Some(Response::SyncResponse(_)) => Ok(SourceMessage::Sync),
            Some(Response::Error(e)) => Ok(SourceMessage::Error(e.message)),
            None => Err(IngestError::EmptyResponse),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SourceMessage::Delta(_) => "delta",
            SourceMessage::Sync => "sync",
            SourceMessage::Error(_) => "error",
        }
    }
}

pub struct UpdateIngestor {
    target: Arc<Target>,
    updates_rx: mpsc::Receiver<SubscribeResponse>,
    cancel: CancellationToken,
}

impl UpdateIngestor {
    pub fn new(
        target: Arc<Target>,
        updates_rx: mpsc::Receiver<SubscribeResponse>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            updates_rx,
            cancel,
        }
    }

    /// Processes messages in arrival order until cancelled or until every
    /// sender is gone. Returns the first fatal error otherwise.
    pub async fn run(mut self) -> Result<(), IngestError> {
        info!(target_name = self.target.name(), "update ingestion started");
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(target_name = self.target.name(), "update ingestion cancelled");
                    return Ok(());
                }
                resp = self.updates_rx.recv() => {
                    let Some(resp) = resp else {
                        debug!(target_name = self.target.name(), "update channel closed");
                        return Ok(());
                    };
                    if let Err(e) = self.handle(resp).await {
                        error!(target_name = self.target.name(), error = %e, "update ingestion stopped");
                        return Err(e);
                    }
                }
            }
        }
    }

    async fn handle(
        &self,
        resp: SubscribeResponse,
    ) -> Result<(), IngestError> {
        let message = SourceMessage::from_response(resp)?;
        INGESTED_MESSAGES
            .with_label_values(&[self.target.name(), message.kind()])
            .inc();

        let _serialized = self.target.lock().await;
        match message {
            SourceMessage::Delta(notification) => {
                trace!(
                    updates = notification.update.len(),
                    deletes = notification.delete.len(),
                    "applying delta"
                );
                self.target
                    .cache()
                    .apply_delta(notification)
                    .map_err(IngestError::Apply)
            }
            SourceMessage::Sync => {
                self.target.cache().mark_synced();
                Ok(())
            }
            SourceMessage::Error(message) => Err(IngestError::Source(message)),
        }
    }
}
