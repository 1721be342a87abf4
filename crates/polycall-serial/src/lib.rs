//! Serializer/Deserializer traits over `Value`, plus the one concrete
//! backend (JSON) used by `callms`'s map-by-serial dispatch and by
//! `load_from_configuration`'s manifest parsing.

mod error;
mod json;
mod traits;

pub use error::{SerialError, SerialResult};
pub use json::{from_json, from_json_str, to_json, to_json_string, JsonBackend};
pub use traits::{Deserializer, Serializer};
