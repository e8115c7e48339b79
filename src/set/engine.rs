use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::MirrorRewriter;
use crate::collector::Target;
use crate::metrics::SET_LATENCY_MS;
use crate::metrics::SET_TRANSACTIONS;
use crate::proto::gnmi::update_result::Operation;
use crate::proto::gnmi::Notification;
use crate::proto::gnmi::Path;
use crate::proto::gnmi::SetRequest;
use crate::proto::gnmi::UpdateResult;
use crate::schema::Schema;
use crate::schema::SchemaNode;
use crate::tree;
use crate::tree::Node;
use crate::utils::time::elapsed_ms;
use crate::utils::time::now_nanos;
use crate::SetError;
use crate::TreeError;

/// What a committed Set transaction published.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOutcome {
    /// The rewritten diff handed to the cache, stamped with the commit time.
    pub notification: Notification,
    /// One entry per request operation, deletes then replaces then updates.
    pub results: Vec<UpdateResult>,
}

impl SetOutcome {
    pub fn timestamp(&self) -> i64 {
        self.notification.timestamp
    }
}

/// Applies Set requests to one target.
#[derive(Debug)]
pub struct SetEngine {
    target: Arc<Target>,
    schema: Arc<Schema>,
    mirror: MirrorRewriter,
}

impl SetEngine {
    pub fn new(
        target: Arc<Target>,
        schema: Arc<Schema>,
        mirror: MirrorRewriter,
    ) -> Self {
        Self {
            target,
            schema,
            mirror,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// A copy of the committed tree.
    pub async fn snapshot(&self) -> Option<Node> {
        self.target.lock().await.clone()
    }

    /// Runs one Set transaction.
    ///
    /// The committed tree and the cache are only touched when every step
    /// succeeds. Operations run as deletes, then replaces, then updates, each
    /// group in request order and relative to the request prefix.
    pub async fn apply_set(
        &self,
        req: SetRequest,
    ) -> Result<SetOutcome, SetError> {
        let start = Instant::now();
        let result = self.transact(req).await;

        let outcome = match &result {
            Ok(o) if o.notification.is_empty() => "empty",
            Ok(_) => "committed",
            Err(e) => stage(e),
        };
        let target = self.target.name();
        SET_TRANSACTIONS.with_label_values(&[target, outcome]).inc();
        SET_LATENCY_MS.with_label_values(&[target]).observe(elapsed_ms(start));
        if let Err(e) = &result {
            warn!(target_name = target, stage = outcome, error = %e, "Set transaction rejected");
        }
        result
    }

    async fn transact(
        &self,
        req: SetRequest,
    ) -> Result<SetOutcome, SetError> {
        let mut current = self.target.lock().await;
        let original = current.as_ref().ok_or(SetError::Unsupported)?;
        let mut dirty = original.clone();

        let prefix = req.prefix.clone().unwrap_or_default();
        let results = self.mutate(&mut dirty, &prefix, &req)?;

        tree::validate(&self.schema.root, &dirty).map_err(SetError::Validation)?;

        let mut notification = tree::diff(original, &dirty).map_err(SetError::Diff)?;
        notification.timestamp = now_nanos();
        notification.prefix = Some(Path {
            origin: prefix.origin.clone(),
            target: self.target.name().to_string(),
            ..Default::default()
        });

        let notification = self.mirror.rewrite(notification)?;

        self.target
            .cache()
            .apply_delta(notification.clone())
            .map_err(SetError::Publish)?;

        *current = Some(dirty);
        info!(
            target_name = self.target.name(),
            updates = notification.update.len(),
            deletes = notification.delete.len(),
            "Set transaction committed"
        );

        Ok(SetOutcome {
            notification,
            results,
        })
    }

    /// Applies the request operations to `dirty` below the resolved prefix.
    fn mutate(
        &self,
        dirty: &mut Node,
        prefix: &Path,
        req: &SetRequest,
    ) -> Result<Vec<UpdateResult>, SetError> {
        let prefix_elems = Path::from_elems(prefix.elem.clone());
        let prefix_text = prefix_elems.to_string();

        let resolved = tree::get_or_create_node(&self.schema.root, dirty, &prefix_elems)
            .map_err(|source| SetError::Prefix {
                prefix: prefix_text.clone(),
                source,
            })?;
        let addresses_entry = prefix_elems.elem.last().is_some_and(|e| !e.key.is_empty());
        let schema = match resolved.schema {
            SchemaNode::Container { .. } => resolved.schema,
            SchemaNode::List { .. } if addresses_entry => resolved.schema,
            _ => return Err(SetError::PrefixNotContainer { prefix: prefix_text }),
        };
        let node = resolved
            .node
            .ok_or_else(|| SetError::PrefixNotContainer { prefix: prefix_text.clone() })?;
        debug!(prefix = %prefix_text, "resolved Set prefix");

        let mut results =
            Vec::with_capacity(req.delete.len() + req.replace.len() + req.update.len());

        for path in &req.delete {
            tree::delete_node(schema, node, path).map_err(|source| SetError::Delete {
                path: path.to_string(),
                source,
            })?;
            results.push(result(path, Operation::Delete));
        }

        for update in &req.replace {
            let path = update.path.clone().unwrap_or_default();
            let replace = |source: TreeError| SetError::Replace {
                path: path.to_string(),
                source,
            };
            tree::delete_node(schema, node, &path).map_err(replace)?;
            tree::get_or_create_node(schema, node, &path).map_err(replace)?;
            tree::set_node(schema, node, &path, &update.val.clone().unwrap_or_default())
                .map_err(replace)?;
            results.push(result(&path, Operation::Replace));
        }

        for update in &req.update {
            let path = update.path.clone().unwrap_or_default();
            let fail = |source: TreeError| SetError::Update {
                path: path.to_string(),
                source,
            };
            tree::get_or_create_node(schema, node, &path).map_err(fail)?;
            tree::set_node(schema, node, &path, &update.val.clone().unwrap_or_default())
                .map_err(fail)?;
            results.push(result(&path, Operation::Update));
        }

        Ok(results)
    }
}

fn result(
    path: &Path,
    op: Operation,
) -> UpdateResult {
    UpdateResult {
        path: Some(path.clone()),
        op: op as i32,
    }
}

/// Metric label of the step a transaction failed at.
fn stage(error: &SetError) -> &'static str {
    match error {
        SetError::Unsupported => "unsupported",
        SetError::Prefix { .. } | SetError::PrefixNotContainer { .. } => "prefix",
        SetError::Delete { .. } | SetError::Replace { .. } | SetError::Update { .. } => "mutation",
        SetError::Validation(_) => "validation",
        SetError::Diff(_) => "diff",
        SetError::Rewrite(_) => "rewrite",
        SetError::Publish(_) => "publish",
    }
}
