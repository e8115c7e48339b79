//! Subscribe RPC: serves ONCE, POLL and STREAM subscription lists from the
//! state cache.
//!
//! The cache hands every applied notification to [`SubscribeServer::update`],
//! which broadcasts it to live STREAM subscriptions. Each subscription runs in
//! its own task and writes into a bounded channel backing the response
//! stream. A subscription whose broadcast receiver falls behind is ended with
//! `RESOURCE_EXHAUSTED`.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::check_target;
use crate::cache::CacheTarget;
use crate::metrics::ACTIVE_SUBSCRIPTIONS;
use crate::proto::gnmi::subscribe_request::Request;
use crate::proto::gnmi::subscribe_response::Response;
use crate::proto::gnmi::subscription_list::Mode;
use crate::proto::gnmi::Notification;
use crate::proto::gnmi::Path;
use crate::proto::gnmi::SubscribeRequest;
use crate::proto::gnmi::SubscribeResponse;
use crate::proto::gnmi::SubscriptionList;

pub type SubscribeStream = Pin<Box<dyn Stream<Item = Result<SubscribeResponse, Status>> + Send>>;

type RequestStream = Pin<Box<dyn Stream<Item = Result<SubscribeRequest, Status>> + Send>>;

type ResponseSender = mpsc::Sender<Result<SubscribeResponse, Status>>;

pub struct SubscribeServer {
    target: String,
    cache: Arc<CacheTarget>,
    events: broadcast::Sender<Arc<Notification>>,
    buffer: usize,
    cancel: CancellationToken,
}

impl SubscribeServer {
    /// `buffer` bounds both the per-subscription response channel and the
    /// number of notifications a STREAM subscription may lag behind.
    pub fn new(
        target: String,
        cache: Arc<CacheTarget>,
        buffer: usize,
        cancel: CancellationToken,
    ) -> Self {
        let (events, _) = broadcast::channel(buffer);
        Self {
            target,
            cache,
            events,
            buffer,
            cancel,
        }
    }

    /// Cache client hook.
    pub fn update(
        &self,
        notification: &Notification,
    ) {
        if self.events.receiver_count() > 0 {
            // Only fails when every receiver dropped in the meantime.
            let _ = self.events.send(Arc::new(notification.clone()));
        }
    }

    /// Starts a subscription from the first message of `requests`, which
    /// must carry a subscription list.
    pub async fn subscribe<S>(
        &self,
        mut requests: S,
    ) -> Result<SubscribeStream, Status>
    where
        S: Stream<Item = Result<SubscribeRequest, Status>> + Send + Unpin + 'static,
    {
        let first = requests
            .next()
            .await
            .ok_or_else(|| Status::invalid_argument("stream closed before a subscription list"))??;
        let Some(Request::Subscribe(list)) = first.request else {
            return Err(Status::invalid_argument(
                "first message must carry a subscription list",
            ));
        };
        let subscription = ActiveSubscription::from_list(&self.target, list)?;

        // Registered before the initial dump so no change is missed.
        let events = match subscription.mode {
            Mode::Stream => Some(self.events.subscribe()),
            Mode::Once | Mode::Poll => None,
        };

        let (tx, rx) = mpsc::channel(self.buffer);
        let handler = SubscriptionHandler {
            subscription,
            cache: self.cache.clone(),
            events,
            cancel: self.cancel.child_token(),
        };
        tokio::spawn(handler.run(Box::pin(requests), tx));

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[derive(Debug)]
struct ActiveSubscription {
    mode: Mode,
    patterns: Vec<Path>,
    updates_only: bool,
}

impl ActiveSubscription {
    fn from_list(
        target: &str,
        list: SubscriptionList,
    ) -> Result<Self, Status> {
        let mode = Mode::try_from(list.mode)
            .map_err(|_| Status::invalid_argument(format!("unknown subscription mode {}", list.mode)))?;

        let prefix = list.prefix.unwrap_or_default();
        check_target(&prefix.target, target)?;

        let base = Path::from_elems(prefix.elem);
        let patterns = if list.subscription.is_empty() {
            vec![base]
        } else {
            list.subscription
                .iter()
                .map(|s| base.join(&s.path.clone().unwrap_or_default()))
                .map(|p| Path::from_elems(p.elem))
                .collect()
        };

        Ok(Self {
            mode,
            patterns,
            updates_only: list.updates_only,
        })
    }

    fn matches(
        &self,
        path: &Path,
    ) -> bool {
        self.patterns.iter().any(|pattern| path.matches(pattern))
    }

    /// The part of `notification` this subscription covers, if any.
    fn filter(
        &self,
        notification: &Notification,
    ) -> Option<Notification> {
        let update: Vec<_> = notification
            .update
            .iter()
            .filter(|u| u.path.as_ref().is_some_and(|p| self.matches(p)))
            .cloned()
            .collect();
        let delete: Vec<_> = notification.delete.iter().filter(|p| self.matches(p)).cloned().collect();
        if update.is_empty() && delete.is_empty() {
            return None;
        }
        Some(Notification {
            timestamp: notification.timestamp,
            prefix: notification.prefix.clone(),
            update,
            delete,
            atomic: notification.atomic,
        })
    }
}

/// Why a subscription task ended early.
enum End {
    ClientGone,
    Failed(Status),
}

/// Runs one subscription. The client's request stream is owned by
/// [`run`](Self::run), not by the handler.
struct SubscriptionHandler {
    subscription: ActiveSubscription,
    cache: Arc<CacheTarget>,
    events: Option<broadcast::Receiver<Arc<Notification>>>,
    cancel: CancellationToken,
}

impl SubscriptionHandler {
    async fn run(
        mut self,
        mut requests: RequestStream,
        tx: ResponseSender,
    ) {
        let mode = self.subscription.mode.as_str_name();
        ACTIVE_SUBSCRIPTIONS.with_label_values(&[mode]).inc();
        debug!(mode, patterns = ?self.subscription.patterns, "subscription started");

        let result = match self.subscription.mode {
            Mode::Once => self.initial_sync(&tx).await,
            Mode::Poll => self.poll(&mut requests, &tx).await,
            Mode::Stream => self.stream(&mut requests, &tx).await,
        };
        match result {
            Ok(()) => debug!(mode, "subscription finished"),
            Err(End::ClientGone) => debug!(mode, "subscriber went away"),
            Err(End::Failed(status)) => {
                warn!(mode, status = %status.message(), "subscription ended with error");
                let _ = tx.send(Err(status)).await;
            }
        }
        ACTIVE_SUBSCRIPTIONS.with_label_values(&[mode]).dec();
    }

    /// Cached state (unless `updates_only`) followed by `sync_response`.
    async fn initial_sync(
        &self,
        tx: &ResponseSender,
    ) -> Result<(), End> {
        if !self.subscription.updates_only {
            self.dump(tx).await?;
        }
        send(tx, Response::SyncResponse(true)).await
    }

    async fn dump(
        &self,
        tx: &ResponseSender,
    ) -> Result<(), End> {
        for notification in self.cache.query(&self.subscription.patterns) {
            send(tx, Response::Update(notification)).await?;
        }
        Ok(())
    }

    async fn poll(
        &self,
        requests: &mut RequestStream,
        tx: &ResponseSender,
    ) -> Result<(), End> {
        self.initial_sync(tx).await?;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                _ = tx.closed() => return Err(End::ClientGone),
                request = requests.next() => match request {
                    None | Some(Err(_)) => return Ok(()),
                    Some(Ok(SubscribeRequest { request: Some(Request::Poll(_)) })) => {
                        self.dump(tx).await?;
                        send(tx, Response::SyncResponse(true)).await?;
                    }
                    Some(Ok(_)) => {
                        return Err(End::Failed(Status::invalid_argument(
                            "only poll requests are accepted on a POLL subscription",
                        )));
                    }
                },
            }
        }
    }

    async fn stream(
        &mut self,
        requests: &mut RequestStream,
        tx: &ResponseSender,
    ) -> Result<(), End> {
        let Some(mut events) = self.events.take() else {
            return Err(End::Failed(Status::internal("stream subscription without events")));
        };
        self.initial_sync(tx).await?;

        let mut requests_open = true;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                _ = tx.closed() => return Err(End::ClientGone),
                event = events.recv() => match event {
                    Ok(notification) => {
                        if let Some(filtered) = self.subscription.filter(&notification) {
                            send(tx, Response::Update(filtered)).await?;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        info!(missed, "subscriber fell behind");
                        return Err(End::Failed(Status::resource_exhausted(format!(
                            "subscription fell behind by {missed} notifications"
                        ))));
                    }
                    Err(RecvError::Closed) => return Ok(()),
                },
                request = requests.next(), if requests_open => match request {
                    None | Some(Err(_)) => requests_open = false,
                    Some(Ok(_)) => {
                        return Err(End::Failed(Status::invalid_argument(
                            "no further requests are accepted on a STREAM subscription",
                        )));
                    }
                },
            }
        }
    }
}

async fn send(
    tx: &ResponseSender,
    response: Response,
) -> Result<(), End> {
    tx.send(Ok(SubscribeResponse {
        response: Some(response),
    }))
    .await
    .map_err(|_| End::ClientGone)
}
