use polycall_value::ValueKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerialError {
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode document: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("value of kind {0} cannot round-trip through a serial document")]
    UnsupportedKind(ValueKind),

    #[error("malformed document: {0}")]
    InvalidDocument(String),
}

pub type SerialResult<T> = Result<T, SerialError>;
