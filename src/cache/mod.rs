//! Latest known state of the collector's target.
//!
//! The cache keeps one leaf per concrete path together with the timestamp it
//! was last written at. Every applied delta is handed to the registered
//! client, which fans it out to subscriptions.

mod target;


use std::collections::HashMap;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
pub use target::*;
use tracing::debug;

use crate::proto::gnmi::Notification;
use crate::CacheError;

/// Receives every notification the cache applied, already scoped to the
/// target through its prefix.
pub type CacheClient = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Write side of a target's cache entry.
#[cfg_attr(test, automock)]
pub trait TargetCache: Send + Sync + 'static {
    /// Applies deletes then updates of `notification` on top of the cached
    /// state. Nothing is applied when an update is rejected.
    fn apply_delta(
        &self,
        notification: Notification,
    ) -> Result<(), CacheError>;

    /// Records that the target finished sending its initial state.
    fn mark_synced(&self);
}

pub struct Cache {
    targets: HashMap<String, Arc<CacheTarget>>,
    client: Arc<RwLock<Option<CacheClient>>>,
}

impl Cache {
    pub fn new<S: AsRef<str>>(targets: &[S]) -> Self {
        let client = Arc::new(RwLock::new(None));
        let targets = targets
            .iter()
            .map(|name| {
                let name = name.as_ref().to_string();
                let target = Arc::new(CacheTarget::new(name.clone(), client.clone()));
                (name, target)
            })
            .collect();
        Self { targets, client }
    }

    pub fn get_target(
        &self,
        name: &str,
    ) -> Result<Arc<CacheTarget>, CacheError> {
        self.targets
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::UnknownTarget(name.to_string()))
    }

    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    /// Installs the callback invoked after each applied notification,
    /// replacing any previous one.
    pub fn set_client(
        &self,
        client: impl Fn(&Notification) + Send + Sync + 'static,
    ) {
        debug!("cache client registered");
        *self.client.write() = Some(Arc::new(client));
    }
}
