use polycall_value::ValueKind;

use crate::type_::Type;

/// An ordered tuple of (parameter name, Type) plus a return Type.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    params: Vec<(String, Type)>,
    return_type: Type,
}

impl Signature {
    pub fn new(return_type: Type) -> Signature {
        Signature {
            params: Vec::new(),
            return_type,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: Type) -> Signature {
        self.params.push((name.into(), ty));
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[(String, Type)] {
        &self.params
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    pub fn param_type(&self, index: usize) -> Option<&Type> {
        self.params.get(index).map(|(_, t)| t)
    }

    pub fn param_kinds(&self) -> Vec<ValueKind> {
        self.params.iter().map(|(_, t)| t.kind).collect()
    }

    /// Fill a parameter's `Type` in place during `discover`, per the
    /// Reflection ownership rule ("Signature slots filled in order by the
    /// adapter during discover").
    pub fn set_param_type(&mut self, index: usize, ty: Type) -> bool {
        match self.params.get_mut(index) {
            Some((_, slot)) => {
                *slot = ty;
                true
            }
            None => false,
        }
    }
}
