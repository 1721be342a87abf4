use std::any::Any;
use std::fmt;
use std::sync::Arc;

use polycall_value::ValueKind;

use crate::hash::DescriptorHash;

/// Adapter-supplied construction/destruction interface for a [`Type`]'s
/// implementation blob. Most primitive `Type`s have no implementation at
/// all (`None`); adapters set one when the guest language's own type
/// needs adapter-specific setup/teardown (e.g. a Python class object, a
/// JS prototype).
pub trait TypeImpl: fmt::Debug + Send + Sync {
    fn construct(&self) -> Box<dyn Any + Send + Sync>;
    fn destroy(&self, _instance: Box<dyn Any + Send + Sync>) {}
}

/// A small record describing one type known to the runtime: a kind tag, a
/// name, and an optional adapter-owned implementation.
#[derive(Clone)]
pub struct Type {
    pub kind: ValueKind,
    pub name: String,
    pub hash: DescriptorHash,
    interface: Option<Arc<dyn TypeImpl>>,
}

impl Type {
    pub fn primitive(kind: ValueKind) -> Type {
        Type {
            kind,
            name: kind.name().to_string(),
            hash: DescriptorHash::for_type(kind.name()),
            interface: None,
        }
    }

    pub fn named(kind: ValueKind, name: impl Into<String>) -> Type {
        let name = name.into();
        let hash = DescriptorHash::for_type(&name);
        Type {
            kind,
            name,
            hash,
            interface: None,
        }
    }

    pub fn with_interface(mut self, interface: Arc<dyn TypeImpl>) -> Type {
        self.interface = Some(interface);
        self
    }

    pub fn interface(&self) -> Option<&Arc<dyn TypeImpl>> {
        self.interface.as_ref()
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("hash", &self.hash)
            .finish()
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}
impl Eq for Type {}

/// All built-in kinds, registered as `Type`s before any language adapter
/// loads (see the Host Loader).
pub fn builtin_types() -> Vec<Type> {
    use ValueKind::*;
    [
        Bool, Char, Short, Int, Long, Float, Double, String, Buffer, Array, Map, Ptr, Future,
        Function, Null, Class, Object, Exception, Throwable,
    ]
    .into_iter()
    .map(Type::primitive)
    .collect()
}
