//! gNMI over gRPC.
//!
//! [`start_rpc_server`] serves the gNMI service and the standard gRPC health
//! service on an already bound listener until the collector is cancelled.

mod gnmi_service;
mod subscribe;

#[cfg(test)]
mod subscribe_test;

use std::error::Error as StdError;
use std::time::Duration;

pub use gnmi_service::*;
pub use subscribe::*;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tonic::codec::CompressionEncoding;
use tonic::Status;
use tonic_health::server::health_reporter;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::constants::WILDCARD_TARGET;
use crate::proto::gnmi::g_nmi_server::GNmiServer;
use crate::NetworkError;
use crate::ServerConfig;
use crate::SetError;

pub(crate) async fn start_rpc_server(
    service: GnmiService,
    listener: TcpListener,
    config: ServerConfig,
    cancel: CancellationToken,
) -> Result<(), NetworkError> {
    let (mut health_reporter, health_service) = health_reporter();
    health_reporter.set_serving::<GNmiServer<GnmiService>>().await;

    let mut server_builder = tonic::transport::Server::builder()
        .max_concurrent_streams(config.max_concurrent_streams)
        .http2_keepalive_interval(Some(Duration::from_secs(
            config.http2_keep_alive_interval_in_secs,
        )))
        .http2_keepalive_timeout(Some(Duration::from_secs(
            config.http2_keep_alive_timeout_in_secs,
        )));
    if config.request_timeout_in_ms > 0 {
        server_builder = server_builder.timeout(Duration::from_millis(config.request_timeout_in_ms));
    }

    let gnmi = GNmiServer::new(service).accept_compressed(CompressionEncoding::Gzip);
    let gnmi = if config.gzip_responses {
        gnmi.send_compressed(CompressionEncoding::Gzip)
    } else {
        gnmi
    };

    let nodelay = config.tcp_nodelay;
    let incoming = TcpListenerStream::new(listener).map(move |stream| {
        if let Ok(stream) = &stream {
            if let Err(e) = stream.set_nodelay(nodelay) {
                warn!(error = %e, "failed to set TCP_NODELAY");
            }
        }
        stream
    });

    let shutdown = cancel.clone();
    let result = server_builder
        .add_service(health_service)
        .add_service(gnmi)
        .serve_with_incoming_shutdown(incoming, async move {
            shutdown.cancelled().await;
            info!("stopping gNMI server");
        })
        .await;

    if let Err(e) = result {
        error!(error = %e, "gNMI server failed");
        cancel.cancel();
        return Err(e.into());
    }
    debug!("gNMI server finished");
    Ok(())
}

impl From<SetError> for Status {
    fn from(err: SetError) -> Self {
        let message = error_chain(&err);
        match err {
            SetError::Unsupported => Status::unimplemented(message),
            SetError::Prefix { .. }
            | SetError::PrefixNotContainer { .. }
            | SetError::Delete { .. }
            | SetError::Replace { .. }
            | SetError::Update { .. }
            | SetError::Validation(_) => Status::invalid_argument(message),
            SetError::Rewrite(_) => Status::failed_precondition(message),
            SetError::Diff(_) | SetError::Publish(_) => Status::internal(message),
        }
    }
}

/// Display of `err` followed by each of its sources.
pub(crate) fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A request target addresses this collector when it is empty, the wildcard
/// or the collector's own target name.
pub(crate) fn check_target(
    requested: &str,
    target: &str,
) -> Result<(), Status> {
    if requested.is_empty() || requested == WILDCARD_TARGET || requested == target {
        Ok(())
    } else {
        Err(Status::not_found(format!("no such target {requested:?}")))
    }
}
