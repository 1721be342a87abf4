//! The one concrete Serial backend: JSON, via `serde_json`. `callms`'s
//! "system Serial backend" and `load_from_configuration`'s document
//! format both resolve to this module.

use serde_json::Value as Json;

use polycall_value::{ExceptionPayload, Value, ValueKind};

use crate::error::{SerialError, SerialResult};
use crate::traits::{Deserializer, Serializer};

/// Stateless JSON encoder/decoder over `Value` trees.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBackend;

impl Serializer for JsonBackend {
    fn encode(&self, value: &Value) -> SerialResult<Vec<u8>> {
        let json = to_json(value)?;
        serde_json::to_vec(&json).map_err(SerialError::Encode)
    }
}

impl Deserializer for JsonBackend {
    fn decode(&self, bytes: &[u8]) -> SerialResult<Value> {
        let json: Json = serde_json::from_slice(bytes).map_err(SerialError::Decode)?;
        from_json(&json)
    }
}

pub fn to_json(value: &Value) -> SerialResult<Json> {
    Ok(match value.kind() {
        ValueKind::Bool => Json::Bool(value.as_bool()),
        ValueKind::Char => Json::String(value.as_str()),
        ValueKind::Short | ValueKind::Int | ValueKind::Long => Json::Number(value.as_long().into()),
        ValueKind::Float | ValueKind::Double => serde_json::Number::from_f64(value.as_double())
            .map(Json::Number)
            .unwrap_or(Json::Null),
        ValueKind::Str => Json::String(value.as_str()),
        ValueKind::Buffer => Json::Array(
            value
                .as_buffer()
                .into_iter()
                .map(|byte| Json::Number(byte.into()))
                .collect(),
        ),
        ValueKind::Array => {
            let items = value.as_array();
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                out.push(to_json(item)?);
            }
            Json::Array(out)
        }
        ValueKind::Map => {
            let pairs = value.as_map();
            let mut map = serde_json::Map::with_capacity(pairs.len());
            for (k, v) in &pairs {
                map.insert(key_to_string(k), to_json(v)?);
            }
            Json::Object(map)
        }
        ValueKind::Ptr => Json::String(format!("0x{:x}", value.ptr_addr().unwrap_or(0))),
        ValueKind::Null => Json::Null,
        ValueKind::Exception | ValueKind::Throwable => {
            let payload = value
                .as_exception()
                .ok_or(SerialError::UnsupportedKind(value.kind()))?;
            exception_to_json(&payload)
        }
        other @ (ValueKind::Function | ValueKind::Object | ValueKind::Class | ValueKind::Future) => {
            return Err(SerialError::UnsupportedKind(other));
        }
    })
}

fn exception_to_json(payload: &ExceptionPayload) -> Json {
    let mut map = serde_json::Map::new();
    map.insert("name".to_string(), Json::String(payload.name.clone()));
    map.insert("message".to_string(), Json::String(payload.message.clone()));
    map.insert(
        "expected".to_string(),
        Json::Array(payload.expected.iter().map(|k| Json::String(k.name().to_string())).collect()),
    );
    map.insert(
        "supplied".to_string(),
        Json::Array(payload.supplied.iter().map(|k| Json::String(k.name().to_string())).collect()),
    );
    Json::Object(map)
}

/// JSON object keys must be strings; non-string Value keys are rendered
/// through their own typed accessor rather than the general-purpose
/// `stringify` (which is meant for display, not canonical map keys).
fn key_to_string(key: &Value) -> String {
    match key.kind() {
        ValueKind::Str | ValueKind::Char => key.as_str(),
        ValueKind::Bool => key.as_bool().to_string(),
        ValueKind::Short | ValueKind::Int | ValueKind::Long => key.as_long().to_string(),
        ValueKind::Float | ValueKind::Double => key.as_double().to_string(),
        _ => polycall_value::display_string(key),
    }
}

pub fn from_json(json: &Json) -> SerialResult<Value> {
    Ok(match json {
        Json::Null => Value::null(),
        Json::Bool(b) => Value::bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::long(i)
            } else if let Some(f) = n.as_f64() {
                Value::double(f)
            } else {
                return Err(SerialError::InvalidDocument(format!("unrepresentable number {n}")));
            }
        }
        Json::String(s) => Value::string(s.clone()),
        Json::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_json(item)?);
            }
            Value::array(out).map_err(|e| SerialError::InvalidDocument(e.to_string()))?
        }
        Json::Object(fields) => {
            let mut pairs = Vec::with_capacity(fields.len());
            for (k, v) in fields {
                pairs.push((Value::string(k.clone()), from_json(v)?));
            }
            Value::map(pairs).map_err(|e| SerialError::InvalidDocument(e.to_string()))?
        }
    })
}

/// Convenience entry points used by callers that only need one-shot
/// conversion without constructing a `JsonBackend`.
pub fn to_json_string(value: &Value) -> SerialResult<String> {
    serde_json::to_string(&to_json(value)?).map_err(SerialError::Encode)
}

pub fn from_json_str(text: &str) -> SerialResult<Value> {
    let json: Json = serde_json::from_str(text).map_err(SerialError::Decode)?;
    from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_nested_map() {
        let original = Value::map(vec![
            (Value::string("name"), Value::string("pc")),
            (Value::string("count"), Value::int(3)),
        ])
        .unwrap();
        let text = to_json_string(&original).unwrap();
        let restored = from_json_str(&text).unwrap();
        assert!(restored.compare(&original));
    }

    #[test]
    fn functions_are_not_serializable() {
        use polycall_value::FunctionRef;
        use std::any::Any;
        use std::sync::Arc;

        #[derive(Debug)]
        struct Noop;
        impl FunctionRef for Noop {
            fn name(&self) -> &str {
                "noop"
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }
        let v = Value::function(Arc::new(Noop));
        assert!(to_json(&v).is_err());
    }
}
