use std::collections::BTreeMap;

use crate::proto::gnmi::TypedValue;

/// Key values of one list entry, by key name.
pub type ListKey = BTreeMap<String, String>;

/// A node of the device tree.
///
/// Snapshots are plain values: a deep copy is a `clone()`, and two snapshots
/// are equal when their trees are equal.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Container(BTreeMap<String, Node>),
    List(BTreeMap<ListKey, Node>),
    Leaf(LeafValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeafValue {
    String(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    Bytes(Vec<u8>),
}

impl Node {
    pub fn empty_container() -> Self {
        Node::Container(BTreeMap::new())
    }

    pub fn empty_list() -> Self {
        Node::List(BTreeMap::new())
    }

    pub fn as_leaf(&self) -> Option<&LeafValue> {
        match self {
            Node::Leaf(value) => Some(value),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Container(children) => Some(children),
            _ => None,
        }
    }
}

impl LeafValue {
    pub fn to_typed(&self) -> TypedValue {
        match self {
            LeafValue::String(s) => TypedValue::string(s.clone()),
            LeafValue::Bool(b) => TypedValue::bool(*b),
            LeafValue::Int(i) => TypedValue::int(*i),
            LeafValue::Uint(u) => TypedValue::uint(*u),
            LeafValue::Double(d) => TypedValue::double(*d),
            LeafValue::Bytes(b) => TypedValue {
                value: Some(crate::proto::gnmi::typed_value::Value::BytesVal(b.clone())),
            },
        }
    }
}

impl From<&LeafValue> for TypedValue {
    fn from(value: &LeafValue) -> Self {
        value.to_typed()
    }
}
