use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::MutexGuard;

use crate::cache::TargetCache;
use crate::tree::Node;

/// The single device a collector serves.
///
/// The mutex around the committed tree is the serialization point for every
/// mutation of the target: a Set transaction holds it from copy to commit and
/// the ingestion loop holds it while it applies each message.
pub struct Target {
    name: String,
    cache: Arc<dyn TargetCache>,
    current: Mutex<Option<Node>>,
}

impl Target {
    /// `initial` is the committed tree Set transactions start from; `None`
    /// when the collector runs without a schema.
    pub fn new(
        name: impl Into<String>,
        cache: Arc<dyn TargetCache>,
        initial: Option<Node>,
    ) -> Self {
        Self {
            name: name.into(),
            cache,
            current: Mutex::new(initial),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self) -> &dyn TargetCache {
        self.cache.as_ref()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<Node>> {
        self.current.lock().await
    }
}

impl std::fmt::Debug for Target {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Target").field("name", &self.name).finish()
    }
}
