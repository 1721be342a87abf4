use crate::kind::ValueKind;
use crate::value::{Value, MAX_DEPTH};

/// Outcome of [`stringify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringifyResult {
    /// `buf` was `Some`; this many bytes were written (truncated to fit).
    Written(usize),
    /// `buf` was `None`; this is the number of bytes the full
    /// representation would need.
    RequiredLen(usize),
}

/// Render a value as text.
///
/// Arrays bracket-enclose comma-separated children; maps brace-enclose
/// `key:value` pairs; buffers render as two hex digits per byte; pointers
/// render as an implementation-defined hex address. Recursive, and bounded
/// by `MAX_DEPTH` so a caller-constructed cycle produces a truncated
/// rendering instead of recursing forever.
///
/// When `buf` is `None`, no bytes are written — the caller gets the byte
/// length it would need to pass next time, matching the "report required
/// length when destination is null" rule.
pub fn stringify(value: &Value, buf: Option<&mut [u8]>) -> StringifyResult {
    let text = render(value, 0);
    match buf {
        None => StringifyResult::RequiredLen(text.len()),
        Some(dst) => {
            let n = text.len().min(dst.len());
            dst[..n].copy_from_slice(&text.as_bytes()[..n]);
            StringifyResult::Written(n)
        }
    }
}

/// Convenience wrapper around [`stringify`] for callers that just want
/// an owned `String` instead of driving the two-call buffer protocol
/// (coercing a non-string argument to `string`, log messages, tests).
pub fn display_string(value: &Value) -> String {
    render(value, 0)
}

fn render(value: &Value, depth: usize) -> String {
    if depth >= MAX_DEPTH {
        return "...".to_string();
    }
    match value.kind() {
        ValueKind::Bool => value.as_bool().to_string(),
        ValueKind::Char | ValueKind::Short | ValueKind::Int | ValueKind::Long => {
            value.as_long().to_string()
        }
        ValueKind::Float | ValueKind::Double => value.as_double().to_string(),
        ValueKind::String => value.as_str(),
        ValueKind::Buffer => value
            .as_buffer()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect(),
        ValueKind::Array => {
            let items = value.as_array();
            let body = items
                .iter()
                .map(|v| render(v, depth + 1))
                .collect::<Vec<_>>()
                .join(",");
            format!("[{body}]")
        }
        ValueKind::Map => {
            let pairs = value.as_map();
            let body = pairs
                .iter()
                .map(|(k, v)| format!("{}:{}", render(k, depth + 1), render(v, depth + 1)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{body}}}")
        }
        ValueKind::Ptr => format!("0x{:x}", value.ptr_addr().unwrap_or(0)),
        ValueKind::Null => "null".to_string(),
        ValueKind::Function => "<function>".to_string(),
        ValueKind::Class => "<class>".to_string(),
        ValueKind::Object => "<object>".to_string(),
        ValueKind::Future => "<future>".to_string(),
        ValueKind::Exception | ValueKind::Throwable => value
            .as_exception()
            .map(|p| p.to_string())
            .unwrap_or_default(),
    }
}
