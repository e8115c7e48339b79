//! Schema-directed get-or-create, delete and set on a device tree.
//!
//! Every operation takes the schema node describing `root` and a path
//! relative to it, so callers can operate below a resolved prefix.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use super::value::json_from_typed;
use super::value::json_kind;
use super::value::leaf_from_json;
use super::value::leaf_from_typed;
use super::value::strip_module;
use super::ListKey;
use super::Node;
use crate::proto::gnmi::Path;
use crate::proto::gnmi::PathElem;
use crate::proto::gnmi::TypedValue;
use crate::schema::SchemaNode;
use crate::TreeError;

/// Node addressed by [`get_or_create_node`] together with its schema.
#[derive(Debug)]
pub struct Resolved<'n, 's> {
    /// `None` only when the path names a leaf that holds no value yet.
    pub node: Option<&'n mut Node>,
    pub schema: &'s SchemaNode,
}

/// Walks `path`, creating any missing container, list or list entry on the
/// way. A leaf at the end of the path is returned as found and never created.
pub fn get_or_create_node<'n, 's>(
    schema: &'s SchemaNode,
    root: &'n mut Node,
    path: &Path,
) -> Result<Resolved<'n, 's>, TreeError> {
    schema_for(schema, path)?;
    let Some((last, parents)) = path.elem.split_last() else {
        return Ok(Resolved {
            node: Some(root),
            schema,
        });
    };
    let (children, parent_schema) = descend_mut(schema, root, parents, path, true)?
        .ok_or_else(|| TreeError::KindMismatch {
            path: path.to_string(),
        })?;

    let child_schema = lookup_child(parent_schema, last, path, parents.len())?;
    let node = match child_schema {
        SchemaNode::Leaf(_) => {
            no_keys(last, path)?;
            children.get_mut(&last.name)
        }
        SchemaNode::Container { .. } => {
            no_keys(last, path)?;
            Some(children.entry(last.name.clone()).or_insert_with(Node::empty_container))
        }
        SchemaNode::List { .. } => {
            let list = children.entry(last.name.clone()).or_insert_with(Node::empty_list);
            if last.key.is_empty() {
                Some(list)
            } else {
                check_keys(child_schema, last, path)?;
                let entries = list_entries_mut(list, path)?;
                Some(entries.entry(last.key.clone()).or_insert_with(Node::empty_container))
            }
        }
    };

    Ok(Resolved {
        node,
        schema: child_schema,
    })
}

/// Looks up `path` without modifying the tree.
pub fn get_node<'n>(
    schema: &SchemaNode,
    root: &'n Node,
    path: &Path,
) -> Result<Option<&'n Node>, TreeError> {
    let mut node = root;
    let mut schema = schema;
    let last = path.elem.len().saturating_sub(1);

    for (i, elem) in path.elem.iter().enumerate() {
        let child_schema = lookup_child(schema, elem, path, i)?;
        let Node::Container(children) = node else {
            return Err(TreeError::KindMismatch {
                path: display_prefix(path, i),
            });
        };
        let Some(child) = children.get(&elem.name) else {
            return Ok(None);
        };

        node = match child_schema {
            SchemaNode::Leaf(_) | SchemaNode::List { .. } if i != last && elem.key.is_empty() => {
                return Err(TreeError::NotTraversable {
                    path: display_prefix(path, i + 1),
                });
            }
            SchemaNode::Leaf(_) | SchemaNode::Container { .. } => {
                no_keys(elem, path)?;
                child
            }
            SchemaNode::List { .. } if elem.key.is_empty() => child,
            SchemaNode::List { .. } => {
                check_keys(child_schema, elem, path)?;
                let Node::List(entries) = child else {
                    return Err(TreeError::KindMismatch {
                        path: display_prefix(path, i + 1),
                    });
                };
                match entries.get(&elem.key) {
                    Some(entry) => entry,
                    None => return Ok(None),
                }
            }
        };
        schema = child_schema;
    }
    Ok(Some(node))
}

/// Removes the subtree or leaf at `path`. Deleting something that does not
/// exist succeeds; deleting the empty path clears `root`.
pub fn delete_node(
    schema: &SchemaNode,
    root: &mut Node,
    path: &Path,
) -> Result<(), TreeError> {
    let Some((last, parents)) = path.elem.split_last() else {
        *root = Node::empty_container();
        return Ok(());
    };
    let Some((children, parent_schema)) = descend_mut(schema, root, parents, path, false)? else {
        return Ok(());
    };

    let child_schema = lookup_child(parent_schema, last, path, parents.len())?;
    match child_schema {
        SchemaNode::Leaf(_) | SchemaNode::Container { .. } => {
            no_keys(last, path)?;
            children.remove(&last.name);
        }
        SchemaNode::List { .. } if last.key.is_empty() => {
            children.remove(&last.name);
        }
        SchemaNode::List { .. } => {
            check_keys(child_schema, last, path)?;
            if let Some(list) = children.get_mut(&last.name) {
                list_entries_mut(list, path)?.remove(&last.key);
            }
        }
    }
    Ok(())
}

/// Stores `value` at `path`, creating missing ancestors.
///
/// Leaves take a scalar value. Containers and list entries take a JSON
/// object that is merged into what is already there; an unkeyed list takes a
/// JSON array of entries carrying their key fields.
pub fn set_node(
    schema: &SchemaNode,
    root: &mut Node,
    path: &Path,
    value: &TypedValue,
) -> Result<(), TreeError> {
    schema_for(schema, path)?;
    let text = path.to_string();
    let Some((last, parents)) = path.elem.split_last() else {
        let json = json_from_typed(value, &text)?;
        return merge_object(schema, root, &json, "", None);
    };
    let (children, parent_schema) = descend_mut(schema, root, parents, path, true)?
        .ok_or_else(|| TreeError::KindMismatch { path: text.clone() })?;

    let child_schema = lookup_child(parent_schema, last, path, parents.len())?;
    match child_schema {
        SchemaNode::Leaf(leaf) => {
            no_keys(last, path)?;
            let leaf_value = leaf_from_typed(&leaf.leaf_type, value, &text)?;
            children.insert(last.name.clone(), Node::Leaf(leaf_value));
        }
        SchemaNode::Container { .. } => {
            no_keys(last, path)?;
            let json = json_from_typed(value, &text)?;
            let child = children.entry(last.name.clone()).or_insert_with(Node::empty_container);
            merge_object(child_schema, child, &json, &text, None)?;
        }
        SchemaNode::List { .. } if last.key.is_empty() => {
            let json = json_from_typed(value, &text)?;
            let list = children.entry(last.name.clone()).or_insert_with(Node::empty_list);
            merge_list(child_schema, list, &json, &text)?;
        }
        SchemaNode::List { .. } => {
            check_keys(child_schema, last, path)?;
            let json = json_from_typed(value, &text)?;
            let list = children.entry(last.name.clone()).or_insert_with(Node::empty_list);
            let entry = list_entries_mut(list, path)?
                .entry(last.key.clone())
                .or_insert_with(Node::empty_container);
            merge_object(child_schema, entry, &json, &text, Some(&last.key))?;
        }
    }
    Ok(())
}

/// Installs schema defaults for absent leaves of every container that
/// already exists below `node`. Missing containers are not created.
pub fn populate_defaults(
    schema: &SchemaNode,
    node: &mut Node,
) -> Result<(), TreeError> {
    populate_defaults_at(schema, node, "")
}

fn populate_defaults_at(
    schema: &SchemaNode,
    node: &mut Node,
    path: &str,
) -> Result<(), TreeError> {
    let Some(schema_children) = schema.children() else {
        return Ok(());
    };
    let children = container_children_mut(node, || display_text(path))?;

    for (name, child_schema) in schema_children {
        let child_path = format!("{path}/{name}");
        match child_schema {
            SchemaNode::Leaf(leaf) => {
                if let Some(default) = &leaf.default {
                    if !children.contains_key(name) {
                        let value = leaf_from_json(&leaf.leaf_type, default, &child_path)?;
                        children.insert(name.clone(), Node::Leaf(value));
                    }
                }
            }
            SchemaNode::Container { .. } => {
                if let Some(child) = children.get_mut(name) {
                    populate_defaults_at(child_schema, child, &child_path)?;
                }
            }
            SchemaNode::List { .. } => {
                if let Some(Node::List(entries)) = children.get_mut(name) {
                    for entry in entries.values_mut() {
                        populate_defaults_at(child_schema, entry, &child_path)?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Schema node addressed by `path`, checking element names, list keys and
/// that only containers and list entries are traversed.
pub fn schema_for<'s>(
    schema: &'s SchemaNode,
    path: &Path,
) -> Result<&'s SchemaNode, TreeError> {
    let mut current = schema;
    let last = path.elem.len().saturating_sub(1);
    for (i, elem) in path.elem.iter().enumerate() {
        let child = lookup_child(current, elem, path, i)?;
        match child {
            SchemaNode::List { .. } if !elem.key.is_empty() => check_keys(child, elem, path)?,
            SchemaNode::List { .. } | SchemaNode::Leaf(_) if i != last => {
                return Err(TreeError::NotTraversable {
                    path: display_prefix(path, i + 1),
                });
            }
            SchemaNode::List { .. } => {}
            SchemaNode::Leaf(_) | SchemaNode::Container { .. } => no_keys(elem, path)?,
        }
        current = child;
    }
    Ok(current)
}

/// Walks `elems` (all but the last element of `full`) down to a container
/// or list entry and returns its children. With `create` unset a missing
/// node yields `Ok(None)`.
fn descend_mut<'n, 's>(
    schema: &'s SchemaNode,
    root: &'n mut Node,
    elems: &[PathElem],
    full: &Path,
    create: bool,
) -> Result<Option<(&'n mut BTreeMap<String, Node>, &'s SchemaNode)>, TreeError> {
    let mut node = root;
    let mut schema = schema;

    for (i, elem) in elems.iter().enumerate() {
        let child_schema = lookup_child(schema, elem, full, i)?;
        match child_schema {
            SchemaNode::Leaf(_) => {
                return Err(TreeError::NotTraversable {
                    path: display_prefix(full, i + 1),
                });
            }
            SchemaNode::List { .. } if elem.key.is_empty() => {
                return Err(TreeError::NotTraversable {
                    path: display_prefix(full, i + 1),
                });
            }
            SchemaNode::List { .. } => check_keys(child_schema, elem, full)?,
            SchemaNode::Container { .. } => no_keys(elem, full)?,
        }

        let children = container_children_mut(node, || display_prefix(full, i))?;
        let child = if create {
            children.entry(elem.name.clone()).or_insert_with(|| match child_schema {
                SchemaNode::List { .. } => Node::empty_list(),
                _ => Node::empty_container(),
            })
        } else {
            match children.get_mut(&elem.name) {
                Some(child) => child,
                None => return Ok(None),
            }
        };

        node = if let SchemaNode::List { .. } = child_schema {
            let entries = list_entries_mut(child, full)?;
            if create {
                entries.entry(elem.key.clone()).or_insert_with(Node::empty_container)
            } else {
                match entries.get_mut(&elem.key) {
                    Some(entry) => entry,
                    None => return Ok(None),
                }
            }
        } else {
            child
        };
        schema = child_schema;
    }

    let children = container_children_mut(node, || display_prefix(full, elems.len()))?;
    Ok(Some((children, schema)))
}

fn merge_object(
    schema: &SchemaNode,
    node: &mut Node,
    json: &Json,
    path: &str,
    entry_key: Option<&ListKey>,
) -> Result<(), TreeError> {
    let Json::Object(fields) = json else {
        return Err(TreeError::InvalidJson {
            path: display_text(path),
            reason: format!("expected object, got {}", json_kind(json)),
        });
    };
    let key_names = schema.list_keys().unwrap_or(&[]);
    let children = container_children_mut(node, || display_text(path))?;

    for (raw_name, value) in fields {
        let name = strip_module(raw_name);
        if key_names.iter().any(|k| k == name) {
            // Key values live in the list key map; they only need to agree.
            if let Some(expected) = entry_key.and_then(|k| k.get(name)) {
                if json_key_string(value, path)? != *expected {
                    return Err(TreeError::InvalidJson {
                        path: display_text(path),
                        reason: format!("key {name} does not match the path"),
                    });
                }
            }
            continue;
        }

        let child_path = format!("{path}/{name}");
        let child_schema = schema.child(name).ok_or_else(|| TreeError::UnknownElement {
            path: display_text(path),
            name: name.to_string(),
        })?;
        match child_schema {
            SchemaNode::Leaf(leaf) => {
                let leaf_value = leaf_from_json(&leaf.leaf_type, value, &child_path)?;
                children.insert(name.to_string(), Node::Leaf(leaf_value));
            }
            SchemaNode::Container { .. } => {
                let child = children.entry(name.to_string()).or_insert_with(Node::empty_container);
                merge_object(child_schema, child, value, &child_path, None)?;
            }
            SchemaNode::List { .. } => {
                let list = children.entry(name.to_string()).or_insert_with(Node::empty_list);
                merge_list(child_schema, list, value, &child_path)?;
            }
        }
    }
    Ok(())
}

fn merge_list(
    schema: &SchemaNode,
    list: &mut Node,
    json: &Json,
    path: &str,
) -> Result<(), TreeError> {
    let Json::Array(items) = json else {
        return Err(TreeError::InvalidJson {
            path: path.to_string(),
            reason: format!("expected array, got {}", json_kind(json)),
        });
    };
    let key_names = schema.list_keys().unwrap_or(&[]);
    let Node::List(entries) = list else {
        return Err(TreeError::KindMismatch {
            path: path.to_string(),
        });
    };

    for item in items {
        let Json::Object(fields) = item else {
            return Err(TreeError::InvalidJson {
                path: path.to_string(),
                reason: format!("expected list entry object, got {}", json_kind(item)),
            });
        };
        let mut key = ListKey::new();
        for key_name in key_names {
            let value = fields
                .iter()
                .find(|(field, _)| strip_module(field) == key_name)
                .map(|(_, value)| value)
                .ok_or_else(|| TreeError::InvalidJson {
                    path: path.to_string(),
                    reason: format!("list entry is missing key {key_name}"),
                })?;
            key.insert(key_name.clone(), json_key_string(value, path)?);
        }
        let entry = entries.entry(key.clone()).or_insert_with(Node::empty_container);
        merge_object(schema, entry, item, path, Some(&key))?;
    }
    Ok(())
}

fn json_key_string(
    value: &Json,
    path: &str,
) -> Result<String, TreeError> {
    match value {
        Json::String(s) => Ok(s.clone()),
        Json::Number(n) => Ok(n.to_string()),
        Json::Bool(b) => Ok(b.to_string()),
        other => Err(TreeError::InvalidJson {
            path: display_text(path),
            reason: format!("list key cannot be {}", json_kind(other)),
        }),
    }
}

fn lookup_child<'s>(
    schema: &'s SchemaNode,
    elem: &PathElem,
    path: &Path,
    depth: usize,
) -> Result<&'s SchemaNode, TreeError> {
    schema.child(&elem.name).ok_or_else(|| TreeError::UnknownElement {
        path: display_prefix(path, depth),
        name: elem.name.clone(),
    })
}

fn check_keys(
    schema: &SchemaNode,
    elem: &PathElem,
    path: &Path,
) -> Result<(), TreeError> {
    let expected = schema.list_keys().unwrap_or(&[]);
    let matches =
        expected.len() == elem.key.len() && expected.iter().all(|k| elem.key.contains_key(k));
    if matches {
        Ok(())
    } else {
        Err(TreeError::KeyMismatch {
            path: path.to_string(),
            expected: expected.to_vec(),
            got: elem.key.keys().cloned().collect(),
        })
    }
}

fn no_keys(
    elem: &PathElem,
    path: &Path,
) -> Result<(), TreeError> {
    if elem.key.is_empty() {
        Ok(())
    } else {
        Err(TreeError::UnexpectedKeys {
            path: path.to_string(),
        })
    }
}

fn container_children_mut<'n>(
    node: &'n mut Node,
    path: impl FnOnce() -> String,
) -> Result<&'n mut BTreeMap<String, Node>, TreeError> {
    match node {
        Node::Container(children) => Ok(children),
        _ => Err(TreeError::KindMismatch { path: path() }),
    }
}

fn list_entries_mut<'n>(
    node: &'n mut Node,
    path: &Path,
) -> Result<&'n mut BTreeMap<ListKey, Node>, TreeError> {
    match node {
        Node::List(entries) => Ok(entries),
        _ => Err(TreeError::KindMismatch {
            path: path.to_string(),
        }),
    }
}

fn display_prefix(
    path: &Path,
    len: usize,
) -> String {
    Path::from_elems(path.elem[..len].to_vec()).to_string()
}

fn display_text(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
