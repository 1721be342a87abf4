use polycall_value::ValueKind;

use crate::type_::Type;
use crate::visibility::Visibility;

/// A class constructor overload: an indexed parameter list plus visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    pub params: Vec<(String, Type)>,
    pub visibility: Visibility,
}

impl Constructor {
    pub fn new(params: Vec<(String, Type)>, visibility: Visibility) -> Constructor {
        Constructor { params, visibility }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn param_kinds(&self) -> Vec<ValueKind> {
        self.params.iter().map(|(_, t)| t.kind).collect()
    }

    /// Zero when arity matches and every positional type index matches —
    /// the overload-resolution predicate the dispatcher calls this
    /// `compare` for, mirroring the data model's wording exactly (a
    /// boolean "matches" is all a caller ever needs from it).
    pub fn compare(&self, arg_types: &[ValueKind]) -> bool {
        if self.params.len() != arg_types.len() {
            return false;
        }
        self.params
            .iter()
            .zip(arg_types)
            .all(|((_, t), k)| t.kind == *k)
    }
}
