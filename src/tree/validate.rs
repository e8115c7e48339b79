use super::LeafValue;
use super::Node;
use crate::schema::LeafSchema;
use crate::schema::LeafType;
use crate::schema::SchemaNode;
use crate::TreeError;

/// Checks a whole tree against `schema`.
///
/// Every violation found is reported, not just the first one: unknown
/// children, nodes of the wrong kind, list entries whose key names differ
/// from the schema, lists over `max_elements`, and leaves of the wrong type or
/// outside their length, range or enumeration constraints.
pub fn validate(
    schema: &SchemaNode,
    root: &Node,
) -> Result<(), TreeError> {
    let mut violations = Vec::new();
    check(schema, root, "", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(TreeError::Validation(violations))
    }
}

fn check(
    schema: &SchemaNode,
    node: &Node,
    path: &str,
    violations: &mut Vec<String>,
) {
    match (schema, node) {
        (SchemaNode::Container { .. }, Node::Container(children)) => {
            check_children(schema, children, path, violations);
        }
        (
            SchemaNode::List {
                keys,
                max_elements,
                ..
            },
            Node::List(entries),
        ) => {
            if let Some(max) = max_elements {
                if entries.len() > *max {
                    violations.push(format!(
                        "{}: {} entries exceed max-elements {max}",
                        display(path),
                        entries.len()
                    ));
                }
            }
            for (key, entry) in entries {
                let entry_path = format!("{path}{}", render_key(key));
                if key.len() != keys.len() || !keys.iter().all(|k| key.contains_key(k)) {
                    violations.push(format!(
                        "{entry_path}: entry keys do not match list keys {keys:?}"
                    ));
                }
                match entry {
                    Node::Container(children) => {
                        check_children(schema, children, &entry_path, violations)
                    }
                    _ => violations.push(format!("{entry_path}: list entry is not a container")),
                }
            }
        }
        (SchemaNode::Leaf(leaf), Node::Leaf(value)) => check_leaf(leaf, value, path, violations),
        (schema, _) => violations.push(format!(
            "{}: expected {}",
            display(path),
            schema.kind_name()
        )),
    }
}

fn check_children(
    schema: &SchemaNode,
    children: &std::collections::BTreeMap<String, Node>,
    path: &str,
    violations: &mut Vec<String>,
) {
    for (name, child) in children {
        let child_path = format!("{path}/{name}");
        match schema.child(name) {
            Some(child_schema) => check(child_schema, child, &child_path, violations),
            None => violations.push(format!("{child_path}: unknown element")),
        }
    }
}

fn check_leaf(
    leaf: &LeafSchema,
    value: &LeafValue,
    path: &str,
    violations: &mut Vec<String>,
) {
    let mut fail = |reason: String| violations.push(format!("{path}: {reason}"));

    match (&leaf.leaf_type, value) {
        (
            LeafType::String {
                min_length,
                max_length,
            },
            LeafValue::String(s),
        ) => {
            let len = s.chars().count();
            if min_length.is_some_and(|min| len < min) || max_length.is_some_and(|max| len > max) {
                fail(format!("length {len} out of range"));
            }
        }
        (LeafType::Enumeration { values }, LeafValue::String(s)) => {
            if !values.iter().any(|v| v == s) {
                fail(format!("{s:?} is not one of {values:?}"));
            }
        }
        (LeafType::Bool, LeafValue::Bool(_)) | (LeafType::Bytes, LeafValue::Bytes(_)) => {}
        (LeafType::Int { min, max }, LeafValue::Int(i)) => {
            if min.is_some_and(|min| *i < min) || max.is_some_and(|max| *i > max) {
                fail(format!("{i} out of range"));
            }
        }
        (LeafType::Uint { min, max }, LeafValue::Uint(u)) => {
            if min.is_some_and(|min| *u < min) || max.is_some_and(|max| *u > max) {
                fail(format!("{u} out of range"));
            }
        }
        (LeafType::Double { min, max }, LeafValue::Double(d)) => {
            if min.is_some_and(|min| *d < min) || max.is_some_and(|max| *d > max) {
                fail(format!("{d} out of range"));
            }
        }
        (leaf_type, _) => fail(format!("expected {}", leaf_type.name())),
    }
}

fn render_key(key: &super::ListKey) -> String {
    key.iter().map(|(k, v)| format!("[{k}={v}]")).collect()
}

fn display(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
