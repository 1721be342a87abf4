use polycall_value::Value;

use crate::error::SerialResult;

/// Encodes a Value tree into a document format's byte representation.
/// Used by `callms` (map-by-serial) and `load_from_configuration`.
pub trait Serializer {
    fn encode(&self, value: &Value) -> SerialResult<Vec<u8>>;
}

/// Decodes a document back into a Value tree.
pub trait Deserializer {
    fn decode(&self, bytes: &[u8]) -> SerialResult<Value>;
}
