//! Type-tagged JSON encode/decode of arbitrary payloads to bytes (component B).
//!
//! `Value` is the restricted host-value set the engine accepts: strings,
//! finite numbers, booleans, null, an explicit `undefined/unit` marker,
//! ordered sequences, key-to-value mappings, and raw byte buffers. Top-level
//! scalars are wrapped as `{"__type": T, "value": v}` so they survive a round
//! trip through JSON; sequences and mappings are serialized directly.

use std::collections::BTreeMap;

use serde_json::json;

use crate::error::{Error, Result};

const OP_ENCODE: &str = "serializer::encode";
const OP_DECODE: &str = "serializer::decode";

/// The restricted set of values this crate can carry inside an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    fn type_tag(&self) -> Option<&'static str> {
        match self {
            Value::Null => Some("Null"),
            Value::Undefined => Some("Undefined"),
            Value::Bool(_) => Some("Bool"),
            // Non-finite numbers fall through untagged to native JSON `null`
            // (spec §4.B / §9 open question 4) rather than round-tripping as
            // a tagged `Number` whose `value` is `null`.
            Value::Number(n) if !n.is_finite() => None,
            Value::Number(_) => Some("Number"),
            Value::String(_) => Some("String"),
            Value::Bytes(_) => Some("Bytes"),
            Value::Sequence(_) | Value::Mapping(_) => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Undefined => serde_json::Value::Null,
            Value::Bool(b) => json!(*b),
            Value::Number(n) => {
                if n.is_finite() {
                    json!(*n)
                } else {
                    // Documented lossy edge case (spec §4.B / §9 open question 4):
                    // NaN/±Inf at the top level encode as null rather than a
                    // tagged representation.
                    serde_json::Value::Null
                }
            }
            Value::String(s) => json!(s),
            Value::Bytes(b) => serde_json::Value::Array(
                b.iter().map(|byte| json!(*byte)).collect(),
            ),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json_nested).collect())
            }
            Value::Mapping(map) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_json_nested());
                }
                serde_json::Value::Object(obj)
            }
        }
    }

    /// Nested values are not re-tagged; only the top-level call site wraps.
    fn to_json_nested(&self) -> serde_json::Value {
        match self {
            Value::Undefined => serde_json::Value::Null,
            Value::Number(n) if !n.is_finite() => serde_json::Value::Null,
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json_nested).collect())
            }
            Value::Mapping(map) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_json_nested());
                }
                serde_json::Value::Object(obj)
            }
            Value::Bytes(b) => {
                serde_json::Value::Array(b.iter().map(|byte| json!(*byte)).collect())
            }
            other => other.to_json(),
        }
    }

    fn from_json(v: &serde_json::Value) -> Result<Value> {
        if let serde_json::Value::Object(obj) = v {
            if let Some(serde_json::Value::String(ty)) = obj.get("__type") {
                let inner = obj
                    .get("value")
                    .ok_or_else(|| Error::format(OP_DECODE, "tagged value missing `value` field"))?;
                return Value::from_tagged(ty, inner);
            }
        }
        Value::from_json_nested(v)
    }

    fn from_tagged(ty: &str, inner: &serde_json::Value) -> Result<Value> {
        match ty {
            "Null" => Ok(Value::Null),
            "Undefined" => Ok(Value::Undefined),
            "Bool" => inner
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| Error::format(OP_DECODE, "tagged Bool value is not a boolean")),
            "Number" => inner
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| Error::format(OP_DECODE, "tagged Number value is not numeric")),
            "String" => inner
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| Error::format(OP_DECODE, "tagged String value is not a string")),
            "Bytes" => {
                let arr = inner
                    .as_array()
                    .ok_or_else(|| Error::format(OP_DECODE, "tagged Bytes value is not an array"))?;
                let mut out = Vec::with_capacity(arr.len());
                for item in arr {
                    let byte = item
                        .as_u64()
                        .filter(|n| *n <= u8::MAX as u64)
                        .ok_or_else(|| Error::format(OP_DECODE, "bytes array element out of range"))?;
                    out.push(byte as u8);
                }
                Ok(Value::Bytes(out))
            }
            other => Err(Error::format(
                OP_DECODE,
                format!("unknown __type tag `{other}`"),
            )),
        }
    }

    fn from_json_nested(v: &serde_json::Value) -> Result<Value> {
        Ok(match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().ok_or_else(|| {
                Error::format(OP_DECODE, "number is not representable as f64")
            })?),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(Value::from_json_nested(item)?);
                }
                Value::Sequence(out)
            }
            serde_json::Value::Object(obj) => {
                let mut map = BTreeMap::new();
                for (k, v) in obj {
                    map.insert(k.clone(), Value::from_json_nested(v)?);
                }
                Value::Mapping(map)
            }
        })
    }
}

/// Encodes a [`Value`] to its UTF-8 JSON byte representation.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let json_value = match value.type_tag() {
        Some(tag) => json!({ "__type": tag, "value": value.to_json() }),
        None => value.to_json(),
    };
    serde_json::to_vec(&json_value)
        .map_err(|e| Error::format(OP_ENCODE, format!("json serialization failed: {e}")))
}

/// Decodes the inverse of [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let parsed: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::format(OP_DECODE, format!("json parse failed: {e}")))?;
    Value::from_json(&parsed)
}
