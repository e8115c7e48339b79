use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// One node of the schema tree.
///
/// List entries share the list's `children`; the key values of an entry live
/// in the tree's list key map and are not declared as leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    Container {
        #[serde(default)]
        children: BTreeMap<String, SchemaNode>,
    },
    List {
        keys: Vec<String>,
        #[serde(default)]
        max_elements: Option<usize>,
        #[serde(default)]
        children: BTreeMap<String, SchemaNode>,
    },
    Leaf(LeafSchema),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafSchema {
    #[serde(rename = "type")]
    pub leaf_type: LeafType,

    /// Value installed by default population when the leaf is absent.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// Base type of a leaf plus the constraints checked by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "base", rename_all = "snake_case")]
pub enum LeafType {
    String {
        #[serde(default)]
        min_length: Option<usize>,
        #[serde(default)]
        max_length: Option<usize>,
    },
    Bool,
    Int {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    Uint {
        #[serde(default)]
        min: Option<u64>,
        #[serde(default)]
        max: Option<u64>,
    },
    Double {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Bytes,
    Enumeration {
        values: Vec<String>,
    },
}

impl SchemaNode {
    pub fn container(children: impl IntoIterator<Item = (&'static str, SchemaNode)>) -> Self {
        SchemaNode::Container {
            children: collect_children(children),
        }
    }

    pub fn list(
        keys: &[&str],
        children: impl IntoIterator<Item = (&'static str, SchemaNode)>,
    ) -> Self {
        SchemaNode::List {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            max_elements: None,
            children: collect_children(children),
        }
    }

    pub fn leaf(leaf_type: LeafType) -> Self {
        SchemaNode::Leaf(LeafSchema {
            leaf_type,
            default: None,
        })
    }

    /// Sets the default of a leaf; no-op on other kinds.
    pub fn with_default(
        mut self,
        value: serde_json::Value,
    ) -> Self {
        if let SchemaNode::Leaf(leaf) = &mut self {
            leaf.default = Some(value);
        }
        self
    }

    /// Children of a container, or of each entry of a list.
    pub fn children(&self) -> Option<&BTreeMap<String, SchemaNode>> {
        match self {
            SchemaNode::Container { children } | SchemaNode::List { children, .. } => {
                Some(children)
            }
            SchemaNode::Leaf(_) => None,
        }
    }

    pub fn child(
        &self,
        name: &str,
    ) -> Option<&SchemaNode> {
        self.children().and_then(|c| c.get(name))
    }

    pub fn list_keys(&self) -> Option<&[String]> {
        match self {
            SchemaNode::List { keys, .. } => Some(keys),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::Container { .. } => "container",
            SchemaNode::List { .. } => "list",
            SchemaNode::Leaf(_) => "leaf",
        }
    }
}

impl LeafType {
    pub fn name(&self) -> &'static str {
        match self {
            LeafType::String { .. } => "string",
            LeafType::Bool => "bool",
            LeafType::Int { .. } => "int",
            LeafType::Uint { .. } => "uint",
            LeafType::Double { .. } => "double",
            LeafType::Bytes => "bytes",
            LeafType::Enumeration { .. } => "enumeration",
        }
    }
}

fn collect_children(
    children: impl IntoIterator<Item = (&'static str, SchemaNode)>
) -> BTreeMap<String, SchemaNode> {
    children.into_iter().map(|(name, node)| (name.to_string(), node)).collect()
}
