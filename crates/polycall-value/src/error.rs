use crate::kind::ValueKind;
use thiserror::Error;

/// Errors a [`crate::Value`] constructor or accessor can report.
///
/// Typed-accessor kind mismatches do *not* appear here: per the error
/// taxonomy, those return a sentinel (`false`/`0`/`null`) and log at error
/// level rather than failing the call. `ValueError` is reserved for the
/// paths that actually abort: allocation/overflow at construction time, and
/// cyclic composite construction.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("allocation failure constructing a {0} value")]
    Alloc(ValueKind),

    #[error("payload size overflow constructing a {kind} value ({len} elements)")]
    SizeOverflow { kind: ValueKind, len: usize },

    #[error("refusing to construct a cyclic {0} value")]
    Cyclic(ValueKind),

    #[error("stringify buffer too small: need {needed} bytes, got {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

pub type ValueResult<T> = Result<T, ValueError>;
