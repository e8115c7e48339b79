use crate::proto::gnmi::typed_value::Value;
use crate::proto::gnmi::TypedValue;

impl TypedValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: Some(Value::StringVal(value.into())),
        }
    }

    pub fn bool(value: bool) -> Self {
        Self {
            value: Some(Value::BoolVal(value)),
        }
    }

    pub fn int(value: i64) -> Self {
        Self {
            value: Some(Value::IntVal(value)),
        }
    }

    pub fn uint(value: u64) -> Self {
        Self {
            value: Some(Value::UintVal(value)),
        }
    }

    pub fn double(value: f64) -> Self {
        Self {
            value: Some(Value::DoubleVal(value)),
        }
    }

    /// RFC 7951 encoded JSON.
    pub fn json_ietf(value: &serde_json::Value) -> Self {
        Self {
            value: Some(Value::JsonIetfVal(value.to_string().into_bytes())),
        }
    }

    /// Short name of the carried variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.value {
            None => "empty",
            Some(Value::StringVal(_)) => "string",
            Some(Value::IntVal(_)) => "int",
            Some(Value::UintVal(_)) => "uint",
            Some(Value::BoolVal(_)) => "bool",
            Some(Value::BytesVal(_)) => "bytes",
            Some(Value::FloatVal(_)) => "float",
            Some(Value::DoubleVal(_)) => "double",
            Some(Value::LeaflistVal(_)) => "leaf-list",
            Some(Value::JsonVal(_)) => "json",
            Some(Value::JsonIetfVal(_)) => "json_ietf",
            Some(Value::AsciiVal(_)) => "ascii",
            Some(Value::ProtoBytes(_)) => "proto_bytes",
        }
    }
}
