//! Schema descriptor for the device tree.
//!
//! A schema is loaded once at startup from a JSON descriptor and never
//! changes for the lifetime of a collector. Its presence is what enables the
//! gNMI Set RPC.
//!
//! ```json
//! {
//!   "models": [{ "name": "openconfig-interfaces", "organization": "OpenConfig", "version": "3.0.0" }],
//!   "root": {
//!     "kind": "container",
//!     "children": {
//!       "interfaces": {
//!         "kind": "container",
//!         "children": {
//!           "interface": {
//!             "kind": "list",
//!             "keys": ["name"],
//!             "children": {
//!               "state": {
//!                 "kind": "container",
//!                 "children": {
//!                   "mtu": { "kind": "leaf", "type": { "base": "uint", "min": 68, "max": 9216 } }
//!                 }
//!               }
//!             }
//!           }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

mod node;


pub use node::*;

use std::path::Path as FsPath;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::tree;
use crate::tree::Node;
use crate::SchemaError;

/// Model advertised through the Capabilities RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
    pub root: SchemaNode,
}

impl Schema {
    pub fn new(root: SchemaNode) -> Self {
        Self {
            models: Vec::new(),
            root,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_file(path: impl AsRef<FsPath>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded schema descriptor");
        Self::from_json(&text)
    }

    /// Checks the descriptor itself: a container root, keyed lists, non-empty
    /// enumerations, ordered ranges and defaults that fit their leaf type.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if !matches!(self.root, SchemaNode::Container { .. }) {
            return Err(SchemaError::RootNotContainer);
        }
        check_node(&self.root, "")
    }

    /// An empty root with every applicable default populated. Fails when the
    /// defaulted root does not pass validation.
    pub fn default_root(&self) -> Result<Node, SchemaError> {
        let mut root = Node::empty_container();
        tree::populate_defaults(&self.root, &mut root).map_err(SchemaError::DefaultsInvalid)?;
        tree::validate(&self.root, &root).map_err(SchemaError::DefaultsInvalid)?;
        Ok(root)
    }
}

fn check_node(
    node: &SchemaNode,
    path: &str,
) -> Result<(), SchemaError> {
    match node {
        SchemaNode::Container { children } => check_children(children, path),
        SchemaNode::List { keys, children, .. } => {
            if keys.is_empty() {
                return Err(SchemaError::ListWithoutKeys {
                    path: display_path(path),
                });
            }
            check_children(children, path)
        }
        SchemaNode::Leaf(leaf) => check_leaf(leaf, path),
    }
}

fn check_children(
    children: &std::collections::BTreeMap<String, SchemaNode>,
    path: &str,
) -> Result<(), SchemaError> {
    for (name, child) in children {
        check_node(child, &format!("{path}/{name}"))?;
    }
    Ok(())
}

fn check_leaf(
    leaf: &LeafSchema,
    path: &str,
) -> Result<(), SchemaError> {
    let range_error = |min: String, max: String| SchemaError::InvalidRange {
        path: display_path(path),
        min,
        max,
    };
    match &leaf.leaf_type {
        LeafType::Enumeration { values } if values.is_empty() => {
            return Err(SchemaError::EmptyEnumeration {
                path: display_path(path),
            });
        }
        LeafType::Int {
            min: Some(min),
            max: Some(max),
        } if min > max => return Err(range_error(min.to_string(), max.to_string())),
        LeafType::Uint {
            min: Some(min),
            max: Some(max),
        } if min > max => return Err(range_error(min.to_string(), max.to_string())),
        LeafType::Double {
            min: Some(min),
            max: Some(max),
        } if min > max => return Err(range_error(min.to_string(), max.to_string())),
        LeafType::String {
            min_length: Some(min),
            max_length: Some(max),
        } if min > max => return Err(range_error(min.to_string(), max.to_string())),
        _ => {}
    }

    if let Some(default) = &leaf.default {
        tree::leaf_from_json(&leaf.leaf_type, default, path).map_err(|e| {
            SchemaError::InvalidDefault {
                path: display_path(path),
                reason: e.to_string(),
            }
        })?;
    }
    Ok(())
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
