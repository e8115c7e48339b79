//! gNMI service: Capabilities and Get are served from the schema and the
//! cache, Set goes through the transaction engine, Subscribe through
//! [`SubscribeServer`].

use std::sync::Arc;

use tonic::Request;
use tonic::Response;
use tonic::Status;
use tonic::Streaming;
use tracing::debug;

use super::check_target;
use super::SubscribeServer;
use super::SubscribeStream;
use crate::cache::CacheTarget;
use crate::constants::GNMI_VERSION;
use crate::proto::gnmi::g_nmi_server::GNmi;
use crate::proto::gnmi::CapabilityRequest;
use crate::proto::gnmi::CapabilityResponse;
use crate::proto::gnmi::Encoding;
use crate::proto::gnmi::GetRequest;
use crate::proto::gnmi::GetResponse;
use crate::proto::gnmi::ModelData;
use crate::proto::gnmi::Path;
use crate::proto::gnmi::SetRequest;
use crate::proto::gnmi::SetResponse;
use crate::proto::gnmi::SubscribeRequest;
use crate::set::SetEngine;

pub struct GnmiService {
    target: String,
    cache: Arc<CacheTarget>,
    engine: Option<Arc<SetEngine>>,
    subscriptions: Arc<SubscribeServer>,
}

impl GnmiService {
    /// `engine` is `None` when no schema was configured; Set then answers
    /// `UNIMPLEMENTED`.
    pub fn new(
        target: String,
        cache: Arc<CacheTarget>,
        engine: Option<Arc<SetEngine>>,
        subscriptions: Arc<SubscribeServer>,
    ) -> Self {
        Self {
            target,
            cache,
            engine,
            subscriptions,
        }
    }
}

#[tonic::async_trait]
impl GNmi for GnmiService {
    type SubscribeStream = SubscribeStream;

    async fn capabilities(
        &self,
        _request: Request<CapabilityRequest>,
    ) -> Result<Response<CapabilityResponse>, Status> {
        let supported_models = self
            .engine
            .as_ref()
            .map(|engine| {
                engine
                    .schema()
                    .models
                    .iter()
                    .map(|m| ModelData {
                        name: m.name.clone(),
                        organization: m.organization.clone(),
                        version: m.version.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Response::new(CapabilityResponse {
            supported_models,
            supported_encodings: vec![Encoding::JsonIetf as i32, Encoding::Json as i32],
            gnmi_version: GNMI_VERSION.to_string(),
        }))
    }

    /// Answers from the cache; the request's data type is not filtered on.
    async fn get(
        &self,
        request: Request<GetRequest>,
    ) -> Result<Response<GetResponse>, Status> {
        let req = request.into_inner();
        let prefix = req.prefix.unwrap_or_default();
        check_target(&prefix.target, &self.target)?;

        let base = Path::from_elems(prefix.elem);
        let patterns: Vec<Path> = if req.path.is_empty() {
            vec![base]
        } else {
            req.path
                .iter()
                .map(|p| Path::from_elems(base.join(p).elem))
                .collect()
        };

        let notification = self.cache.query(&patterns);
        if notification.is_empty() {
            let wanted: Vec<String> = patterns.iter().map(ToString::to_string).collect();
            return Err(Status::not_found(format!(
                "no data at {}",
                wanted.join(", ")
            )));
        }
        debug!(leaves = notification.len(), "Get served from cache");
        Ok(Response::new(GetResponse { notification }))
    }

    async fn set(
        &self,
        request: Request<SetRequest>,
    ) -> Result<Response<SetResponse>, Status> {
        let Some(engine) = &self.engine else {
            return Err(Status::unimplemented("Set is not supported without a schema"));
        };

        let req = request.into_inner();
        if let Some(prefix) = &req.prefix {
            check_target(&prefix.target, &self.target)?;
        }
        let prefix = req.prefix.clone();

        // Detached so a client that hangs up does not abort a queued transaction.
        let engine = engine.clone();
        let outcome = tokio::spawn(async move { engine.apply_set(req).await })
            .await
            .map_err(|e| Status::internal(format!("Set transaction aborted: {e}")))??;
        Ok(Response::new(SetResponse {
            prefix,
            timestamp: outcome.timestamp(),
            response: outcome.results,
        }))
    }

    async fn subscribe(
        &self,
        request: Request<Streaming<SubscribeRequest>>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        let stream = self.subscriptions.subscribe(request.into_inner()).await?;
        Ok(Response::new(stream))
    }
}
