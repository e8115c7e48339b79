//! Conversion of wire values into typed leaves.

use base64::Engine;
use serde_json::Value as Json;

use super::LeafValue;
use crate::proto::gnmi::typed_value::Value;
use crate::proto::gnmi::TypedValue;
use crate::schema::LeafType;
use crate::TreeError;

/// Converts a gNMI value into a leaf of type `leaf_type`.
///
/// Integer variants are coerced into each other when the value fits; JSON
/// encoded scalars go through [`leaf_from_json`]. Range and enumeration
/// constraints are left to validation.
pub fn leaf_from_typed(
    leaf_type: &LeafType,
    value: &TypedValue,
    path: &str,
) -> Result<LeafValue, TreeError> {
    let mismatch = || TreeError::TypeMismatch {
        path: path.to_string(),
        expected: leaf_type.name().to_string(),
        got: value.kind_name().to_string(),
    };

    let Some(inner) = &value.value else {
        return Err(TreeError::MissingValue {
            path: path.to_string(),
        });
    };

    match (inner, leaf_type) {
        (Value::JsonVal(bytes) | Value::JsonIetfVal(bytes), _) => {
            leaf_from_json(leaf_type, &parse_json(bytes, path)?, path)
        }
        (
            Value::StringVal(s) | Value::AsciiVal(s),
            LeafType::String { .. } | LeafType::Enumeration { .. },
        ) => Ok(LeafValue::String(s.clone())),
        (Value::BoolVal(b), LeafType::Bool) => Ok(LeafValue::Bool(*b)),
        (Value::IntVal(i), LeafType::Int { .. }) => Ok(LeafValue::Int(*i)),
        (Value::IntVal(i), LeafType::Uint { .. }) => {
            u64::try_from(*i).map(LeafValue::Uint).map_err(|_| mismatch())
        }
        (Value::UintVal(u), LeafType::Uint { .. }) => Ok(LeafValue::Uint(*u)),
        (Value::UintVal(u), LeafType::Int { .. }) => {
            i64::try_from(*u).map(LeafValue::Int).map_err(|_| mismatch())
        }
        (Value::DoubleVal(d), LeafType::Double { .. }) => finite(*d, path),
        (Value::FloatVal(f), LeafType::Double { .. }) => finite(f64::from(*f), path),
        (Value::BytesVal(b), LeafType::Bytes) => Ok(LeafValue::Bytes(b.clone())),
        _ => Err(mismatch()),
    }
}

/// Converts an RFC 7951 JSON scalar into a leaf of type `leaf_type`.
/// 64-bit integers and decimals may be carried as strings, binary as base64.
pub fn leaf_from_json(
    leaf_type: &LeafType,
    value: &Json,
    path: &str,
) -> Result<LeafValue, TreeError> {
    let mismatch = || TreeError::TypeMismatch {
        path: path.to_string(),
        expected: leaf_type.name().to_string(),
        got: json_kind(value).to_string(),
    };

    match (leaf_type, value) {
        (LeafType::String { .. } | LeafType::Enumeration { .. }, Json::String(s)) => {
            Ok(LeafValue::String(s.clone()))
        }
        (LeafType::Bool, Json::Bool(b)) => Ok(LeafValue::Bool(*b)),
        (LeafType::Int { .. }, Json::Number(n)) => n.as_i64().map(LeafValue::Int).ok_or_else(mismatch),
        (LeafType::Int { .. }, Json::String(s)) => {
            s.parse::<i64>().map(LeafValue::Int).map_err(|_| mismatch())
        }
        (LeafType::Uint { .. }, Json::Number(n)) => {
            n.as_u64().map(LeafValue::Uint).ok_or_else(mismatch)
        }
        (LeafType::Uint { .. }, Json::String(s)) => {
            s.parse::<u64>().map(LeafValue::Uint).map_err(|_| mismatch())
        }
        (LeafType::Double { .. }, Json::Number(n)) => {
            n.as_f64().ok_or_else(mismatch).and_then(|d| finite(d, path))
        }
        (LeafType::Double { .. }, Json::String(s)) => {
            s.parse::<f64>().map_err(|_| mismatch()).and_then(|d| finite(d, path))
        }
        (LeafType::Bytes, Json::String(s)) => base64::engine::general_purpose::STANDARD
            .decode(s)
            .map(LeafValue::Bytes)
            .map_err(|e| TreeError::InvalidJson {
                path: path.to_string(),
                reason: format!("invalid base64: {e}"),
            }),
        _ => Err(mismatch()),
    }
}

/// Leaves never hold NaN or infinities.
fn finite(
    value: f64,
    path: &str,
) -> Result<LeafValue, TreeError> {
    if value.is_finite() {
        Ok(LeafValue::Double(value))
    } else {
        Err(TreeError::NonFinite {
            path: path.to_string(),
            value,
        })
    }
}

/// Extracts the JSON document carried by a `json_val` or `json_ietf_val`.
pub(crate) fn json_from_typed(
    value: &TypedValue,
    path: &str,
) -> Result<Json, TreeError> {
    match &value.value {
        Some(Value::JsonVal(bytes) | Value::JsonIetfVal(bytes)) => parse_json(bytes, path),
        None => Err(TreeError::MissingValue {
            path: path.to_string(),
        }),
        Some(_) => Err(TreeError::TypeMismatch {
            path: path.to_string(),
            expected: "json".to_string(),
            got: value.kind_name().to_string(),
        }),
    }
}

pub(crate) fn parse_json(
    bytes: &[u8],
    path: &str,
) -> Result<Json, TreeError> {
    serde_json::from_slice(bytes).map_err(|e| TreeError::InvalidJson {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Drops an RFC 7951 module qualifier: `openconfig-interfaces:mtu` -> `mtu`.
pub(crate) fn strip_module(name: &str) -> &str {
    name.split_once(':').map_or(name, |(_, local)| local)
}

pub(crate) fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
