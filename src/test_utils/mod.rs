//! Fixtures shared by the unit tests.

use serde_json::json;

use crate::proto::gnmi::Path;
use crate::proto::gnmi::TypedValue;
use crate::proto::gnmi::Update;
use crate::schema::LeafType;
use crate::schema::Schema;
use crate::schema::SchemaNode;

pub(crate) const TARGET: &str = "dut";

fn interface_leaves(with_state_only: bool) -> Vec<(&'static str, SchemaNode)> {
    let mut leaves = vec![
        (
            "description",
            SchemaNode::leaf(LeafType::String {
                min_length: None,
                max_length: Some(64),
            }),
        ),
        ("enabled", SchemaNode::leaf(LeafType::Bool)),
        (
            "mtu",
            SchemaNode::leaf(LeafType::Uint {
                min: Some(68),
                max: Some(9216),
            }),
        ),
    ];
    if with_state_only {
        leaves.push((
            "oper-status",
            SchemaNode::leaf(LeafType::Enumeration {
                values: vec!["UP".to_string(), "DOWN".to_string()],
            }),
        ));
        leaves.push((
            "counters",
            SchemaNode::container([(
                "in-octets",
                SchemaNode::leaf(LeafType::Uint {
                    min: None,
                    max: None,
                }),
            )]),
        ));
    }
    leaves
}

/// `/interfaces/interface[name]/{config,state}` plus
/// `/system/{config,state}/hostname`.
pub(crate) fn interfaces_schema() -> Schema {
    let hostname = || {
        SchemaNode::leaf(LeafType::String {
            min_length: Some(1),
            max_length: Some(253),
        })
    };
    Schema::new(SchemaNode::container([
        (
            "interfaces",
            SchemaNode::container([(
                "interface",
                SchemaNode::list(
                    &["name"],
                    [
                        ("config", SchemaNode::container(interface_leaves(false))),
                        ("state", SchemaNode::container(interface_leaves(true))),
                    ],
                ),
            )]),
        ),
        (
            "system",
            SchemaNode::container([
                ("config", SchemaNode::container([("hostname", hostname())])),
                ("state", SchemaNode::container([("hostname", hostname())])),
            ]),
        ),
    ]))
}

pub(crate) fn path(text: &str) -> Path {
    match Path::parse(text) {
        Ok(path) => path,
        Err(e) => panic!("bad test path {text}: {e}"),
    }
}

pub(crate) fn update(
    text: &str,
    val: TypedValue,
) -> Update {
    Update::new(path(text), val)
}

pub(crate) fn json_update(
    text: &str,
    value: serde_json::Value,
) -> Update {
    Update::new(path(text), TypedValue::json_ietf(&value))
}

pub(crate) fn eth0_state_json() -> serde_json::Value {
    json!({ "description": "uplink", "enabled": true, "mtu": 1500 })
}
