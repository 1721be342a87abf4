use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The closed set of tags a [`crate::Value`] can carry.
///
/// Mirrors the kind set in the data model: every cross-boundary argument and
/// result is one of these. `#[repr(i32)]` plus `num_enum` gives the ABI shim
/// in the root crate a stable integer representation without a second,
/// hand-maintained conversion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ValueKind {
    Bool = 0,
    Char = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    String = 7,
    Buffer = 8,
    Array = 9,
    Map = 10,
    Ptr = 11,
    Future = 12,
    Function = 13,
    Null = 14,
    Class = 15,
    Object = 16,
    Exception = 17,
    Throwable = 18,
}

impl ValueKind {
    /// True for the kinds the dispatcher's adjacency coercion table covers.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueKind::Bool
                | ValueKind::Char
                | ValueKind::Short
                | ValueKind::Int
                | ValueKind::Long
                | ValueKind::Float
                | ValueKind::Double
        )
    }

    pub fn is_composite(self) -> bool {
        matches!(self, ValueKind::Array | ValueKind::Map)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Char => "char",
            ValueKind::Short => "short",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Buffer => "buffer",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
            ValueKind::Ptr => "ptr",
            ValueKind::Future => "future",
            ValueKind::Function => "function",
            ValueKind::Null => "null",
            ValueKind::Class => "class",
            ValueKind::Object => "object",
            ValueKind::Exception => "exception",
            ValueKind::Throwable => "throwable",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
