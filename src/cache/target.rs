use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use prost::Message;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::CacheClient;
use super::TargetCache;
use crate::constants::META_ROOT;
use crate::metrics::CACHED_LEAVES;
use crate::proto::gnmi::Notification;
use crate::proto::gnmi::Path;
use crate::proto::gnmi::PathElem;
use crate::proto::gnmi::TypedValue;
use crate::proto::gnmi::Update;
use crate::utils::time::now_nanos;
use crate::CacheError;

#[derive(Debug, Clone)]
struct CachedLeaf {
    path: Path,
    value: TypedValue,
    timestamp: i64,
}

#[derive(Debug, Default)]
struct TargetState {
    leaves: BTreeMap<String, CachedLeaf>,
    connected: bool,
    synced: bool,
    update_count: u64,
    delete_count: u64,
    latest_timestamp: i64,
}

impl TargetState {
    /// Number of cached leaves outside of `/meta`.
    fn leaf_count(&self) -> usize {
        self.leaves.values().filter(|leaf| !is_meta(&leaf.path)).count()
    }
}

/// Cache entry of one target.
pub struct CacheTarget {
    name: String,
    state: RwLock<TargetState>,
    client: Arc<RwLock<Option<CacheClient>>>,
}

impl std::fmt::Debug for CacheTarget {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CacheTarget").field("name", &self.name).finish()
    }
}

impl CacheTarget {
    pub(super) fn new(
        name: String,
        client: Arc<RwLock<Option<CacheClient>>>,
    ) -> Self {
        Self {
            name,
            state: RwLock::new(TargetState::default()),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Marks the target as connected.
    pub fn connect(&self) {
        self.state.write().connected = true;
        debug!(target_name = %self.name, "target connected");
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    pub fn is_synced(&self) -> bool {
        self.state.read().synced
    }

    pub fn leaf_count(&self) -> usize {
        self.state.read().leaf_count()
    }

    /// Writes the `/meta` statistics leaves and notifies the client.
    pub fn update_metadata(&self) {
        let (connected, synced, updates, deletes, latest, leaves) = {
            let state = self.state.read();
            (
                state.connected,
                state.synced,
                state.update_count,
                state.delete_count,
                state.latest_timestamp,
                state.leaf_count() as u64,
            )
        };
        self.write_meta(vec![
            meta_update("connected", TypedValue::bool(connected)),
            meta_update("sync", TypedValue::bool(synced)),
            meta_update("updateCount", TypedValue::uint(updates)),
            meta_update("deleteCount", TypedValue::uint(deletes)),
            meta_update("latestTimestamp", TypedValue::int(latest)),
            meta_update("leafCount", TypedValue::uint(leaves)),
        ]);
    }

    /// Writes `/meta/size`, the encoded size in bytes of every cached leaf.
    pub fn update_size(&self) {
        let size: usize = {
            let state = self.state.read();
            state
                .leaves
                .values()
                .filter(|leaf| !is_meta(&leaf.path))
                .map(|leaf| Update::new(leaf.path.clone(), leaf.value.clone()).encoded_len())
                .sum()
        };
        self.write_meta(vec![meta_update("size", TypedValue::uint(size as u64))]);
    }

    /// Cached leaves matching any of `patterns`, one notification per leaf
    /// carrying the leaf's own timestamp. Patterns may use wildcards.
    pub fn query(
        &self,
        patterns: &[Path],
    ) -> Vec<Notification> {
        let state = self.state.read();
        state
            .leaves
            .values()
            .filter(|leaf| patterns.iter().any(|p| leaf.path.matches(p)))
            .map(|leaf| Notification {
                timestamp: leaf.timestamp,
                prefix: Some(self.prefix()),
                update: vec![Update::new(leaf.path.clone(), leaf.value.clone())],
                ..Default::default()
            })
            .collect()
    }

    fn prefix(&self) -> Path {
        Path {
            target: self.name.clone(),
            ..Default::default()
        }
    }

    fn write_meta(
        &self,
        updates: Vec<Update>,
    ) {
        let notification = Notification {
            timestamp: now_nanos(),
            update: updates,
            ..Default::default()
        };
        if let Err(e) = self.apply_delta(notification) {
            warn!(target_name = %self.name, error = %e, "failed to write cache metadata");
        }
    }

    fn notify(
        &self,
        notification: &Notification,
    ) {
        let client = self.client.read().clone();
        if let Some(client) = client {
            client(notification);
        }
    }
}

impl TargetCache for CacheTarget {
    fn apply_delta(
        &self,
        notification: Notification,
    ) -> Result<(), CacheError> {
        let prefix = notification.prefix.clone().unwrap_or_default();
        let timestamp = notification.timestamp;

        let mut updates = Vec::with_capacity(notification.update.len());
        for update in notification.update {
            let path = update.path.as_ref().ok_or(CacheError::MissingPath)?;
            let full = Path::from_elems(prefix.join(path).elem);
            let value = update.val.ok_or_else(|| CacheError::MissingValue {
                path: full.to_string(),
            })?;
            updates.push((full.to_string(), full, value));
        }

        let mut state = self.state.write();
        for (key, _, _) in &updates {
            if let Some(cached) = state.leaves.get(key) {
                if cached.timestamp > timestamp {
                    return Err(CacheError::Stale {
                        path: key.clone(),
                        cached: cached.timestamp,
                        received: timestamp,
                    });
                }
            }
        }

        let mut removed = Vec::new();
        for delete in &notification.delete {
            let full = Path::from_elems(prefix.join(delete).elem);
            state.leaves.retain(|_, leaf| {
                let hit = leaf.path.matches(&full);
                if hit {
                    removed.push(leaf.path.clone());
                }
                !hit
            });
        }

        let mut applied = Vec::with_capacity(updates.len());
        for (key, path, value) in updates {
            applied.push(Update::new(path.clone(), value.clone()));
            state.leaves.insert(
                key,
                CachedLeaf {
                    path,
                    value,
                    timestamp,
                },
            );
        }

        let is_meta_only = applied.iter().all(|u| u.path.as_ref().is_some_and(is_meta));
        if !is_meta_only || !removed.is_empty() {
            state.update_count += applied.len() as u64;
            state.delete_count += removed.len() as u64;
            state.latest_timestamp = state.latest_timestamp.max(timestamp);
        }
        CACHED_LEAVES.with_label_values(&[&self.name]).set(state.leaf_count() as i64);
        drop(state);

        trace!(
            target_name = %self.name,
            updates = applied.len(),
            deletes = removed.len(),
            "applied delta"
        );

        let emitted = Notification {
            timestamp,
            prefix: Some(self.prefix()),
            update: applied,
            delete: removed,
            atomic: notification.atomic,
        };
        if !emitted.is_empty() {
            self.notify(&emitted);
        }
        Ok(())
    }

    fn mark_synced(&self) {
        self.state.write().synced = true;
        debug!(target_name = %self.name, "target synced");
    }
}

fn meta_update(
    name: &str,
    value: TypedValue,
) -> Update {
    Update::new(
        Path::from_elems(vec![PathElem::new(META_ROOT), PathElem::new(name)]),
        value,
    )
}

fn is_meta(path: &Path) -> bool {
    path.elem.first().is_some_and(|e| e.name == META_ROOT)
}
