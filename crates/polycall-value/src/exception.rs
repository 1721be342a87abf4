use crate::kind::ValueKind;

/// Payload carried by `exception`/`throwable` values.
///
/// Covers both the signature-mismatch case the error taxonomy spells out
/// ("the failing name, argc, and expected vs supplied kind tuple") and the
/// general guest-language exception case, which adapters surface with a
/// free-form message and optional attached data.
#[derive(Debug, Clone)]
pub struct ExceptionPayload {
    pub name: String,
    pub message: String,
    pub expected: Vec<ValueKind>,
    pub supplied: Vec<ValueKind>,
}

impl ExceptionPayload {
    pub fn message(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            expected: Vec::new(),
            supplied: Vec::new(),
        }
    }

    pub fn signature_mismatch(
        name: impl Into<String>,
        expected: Vec<ValueKind>,
        supplied: Vec<ValueKind>,
    ) -> Self {
        let name = name.into();
        let message = format!(
            "signature mismatch calling '{name}': expected {} argument(s), got {}",
            expected.len(),
            supplied.len()
        );
        Self {
            name,
            message,
            expected,
            supplied,
        }
    }
}

impl std::fmt::Display for ExceptionPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}
