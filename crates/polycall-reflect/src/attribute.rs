use crate::type_::Type;
use crate::visibility::Visibility;

/// A named, typed field on a Class.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub ty: Type,
    pub visibility: Visibility,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: Type, visibility: Visibility) -> Attribute {
        Attribute {
            name: name.into(),
            ty,
            visibility,
        }
    }
}
