use std::collections::BTreeMap;

use super::LeafValue;
use super::Node;
use crate::proto::gnmi::Notification;
use crate::proto::gnmi::Path;
use crate::proto::gnmi::PathElem;
use crate::proto::gnmi::Update;
use crate::TreeError;

/// Minimal notification turning `original` into `modified`.
///
/// Leaves present only in `original` are deleted; leaves that are new or
/// whose value changed are updated. Paths are absolute, ordered by their
/// text form, and the notification carries no prefix or timestamp.
pub fn diff(
    original: &Node,
    modified: &Node,
) -> Result<Notification, TreeError> {
    let before = flatten_root(original)?;
    let after = flatten_root(modified)?;

    let delete = before
        .iter()
        .filter(|(key, _)| !after.contains_key(*key))
        .map(|(_, (path, _))| path.clone())
        .collect();

    let update = after
        .into_iter()
        .filter(|(key, (_, value))| before.get(key).map_or(true, |(_, old)| old != value))
        .map(|(_, (path, value))| Update::new(path, value.to_typed()))
        .collect();

    Ok(Notification {
        delete,
        update,
        ..Default::default()
    })
}

type Flattened<'a> = BTreeMap<String, (Path, &'a LeafValue)>;

fn flatten_root(root: &Node) -> Result<Flattened<'_>, TreeError> {
    if !matches!(root, Node::Container(_)) {
        return Err(TreeError::KindMismatch {
            path: "/".to_string(),
        });
    }
    let mut leaves = BTreeMap::new();
    flatten(root, &mut Vec::new(), &mut leaves);
    Ok(leaves)
}

fn flatten<'a>(
    node: &'a Node,
    elems: &mut Vec<PathElem>,
    leaves: &mut Flattened<'a>,
) {
    match node {
        Node::Leaf(value) => {
            let path = Path::from_elems(elems.clone());
            leaves.insert(path.to_string(), (path, value));
        }
        Node::Container(children) => {
            for (name, child) in children {
                match child {
                    Node::List(entries) => {
                        for (key, entry) in entries {
                            elems.push(PathElem {
                                name: name.clone(),
                                key: key.clone(),
                            });
                            flatten(entry, elems, leaves);
                            elems.pop();
                        }
                    }
                    _ => {
                        elems.push(PathElem::new(name.clone()));
                        flatten(child, elems, leaves);
                        elems.pop();
                    }
                }
            }
        }
        // Lists are expanded by their parent container.
        Node::List(_) => {}
    }
}
