use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use polycall_value::{ClassRef, Value, ValueKind};
use rustc_hash::FxHashMap;

use crate::attribute::Attribute;
use crate::constructor::Constructor;
use crate::error::{ReflectError, ReflectResult};
use crate::hash::DescriptorHash;
use crate::method::Method;
use crate::object::{Object, ObjectImpl};
use crate::visibility::Visibility;

/// Adapter-owned implementation behind a [`Class`]: static member
/// access, instantiation, and class-level teardown — the Class-level
/// vtable ("static_get/static_set/constructor/destroy").
pub trait ClassImpl: fmt::Debug + Send + Sync {
    fn static_get(&self, name: &str) -> ReflectResult<Value>;
    fn static_set(&self, name: &str, value: Value) -> ReflectResult<()>;
    fn instantiate(&self, ctor: &Constructor, args: &[Value]) -> ReflectResult<Arc<dyn ObjectImpl>>;
    fn destroy(&self) {}
}

/// A class type: attributes, methods, constructors, static members, and
/// the adapter implementation backing all of the above.
///
/// Attribute/method maps are populated during `discover` and are sealed
/// (further mutation rejected) once `seal()` runs at the end of it, per
/// the Reflection Ownership rule.
pub struct Class {
    name: String,
    hash: DescriptorHash,
    visibility: Visibility,
    attributes: RwLock<FxHashMap<String, Attribute>>,
    // Preserves registration order, which overload resolution relies on
    // for "ties resolved by preferring the entry registered earliest".
    methods: RwLock<Vec<Method>>,
    constructors: Vec<Constructor>,
    static_attributes: RwLock<FxHashMap<String, Attribute>>,
    implementation: Arc<dyn ClassImpl>,
    sealed: AtomicBool,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        visibility: Visibility,
        constructors: Vec<Constructor>,
        implementation: Arc<dyn ClassImpl>,
    ) -> Class {
        let name = name.into();
        let hash = DescriptorHash::for_type(&name);
        Class {
            name,
            hash,
            visibility,
            attributes: RwLock::new(FxHashMap::default()),
            methods: RwLock::new(Vec::new()),
            constructors,
            static_attributes: RwLock::new(FxHashMap::default()),
            implementation,
            sealed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> DescriptorHash {
        self.hash
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn insert_attribute(&self, attr: Attribute) -> ReflectResult<()> {
        self.ensure_unsealed()?;
        self.attributes.write().expect("lock poisoned").insert(attr.name.clone(), attr);
        Ok(())
    }

    pub fn insert_static_attribute(&self, attr: Attribute) -> ReflectResult<()> {
        self.ensure_unsealed()?;
        self.static_attributes
            .write()
            .expect("lock poisoned")
            .insert(attr.name.clone(), attr);
        Ok(())
    }

    pub fn insert_method(&self, method: Method) -> ReflectResult<()> {
        self.ensure_unsealed()?;
        self.methods.write().expect("lock poisoned").push(method);
        Ok(())
    }

    fn ensure_unsealed(&self) -> ReflectResult<()> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(ReflectError::Sealed(self.name.clone()));
        }
        Ok(())
    }

    /// Called once at the end of `discover` to freeze the member maps.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        self.attributes.read().expect("lock poisoned").get(name).cloned()
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        self.attributes.read().expect("lock poisoned").values().cloned().collect()
    }

    pub fn static_attributes(&self) -> Vec<Attribute> {
        self.static_attributes.read().expect("lock poisoned").values().cloned().collect()
    }

    pub fn methods(&self) -> Vec<Method> {
        self.methods.read().expect("lock poisoned").clone()
    }

    pub fn methods_named<'a>(&'a self, name: &str) -> Vec<Method> {
        self.methods
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    /// First method named `name` whose positional parameter kinds match
    /// `arg_kinds`, preferring the earliest-registered candidate.
    pub fn resolve_method(&self, name: &str, arg_kinds: &[ValueKind]) -> Option<Method> {
        self.methods
            .read()
            .expect("lock poisoned")
            .iter()
            .find(|m| m.name == name && m.signature.param_kinds().as_slice() == arg_kinds)
            .cloned()
    }

    pub fn resolve_constructor(&self, arg_kinds: &[ValueKind]) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.compare(arg_kinds))
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn static_get(&self, name: &str) -> ReflectResult<Value> {
        self.implementation.static_get(name)
    }

    pub fn static_set(&self, name: &str, value: Value) -> ReflectResult<()> {
        self.implementation.static_set(name, value)
    }

    /// Resolve an overload by argument kind and instantiate a new Object.
    pub fn new_instance(self: &Arc<Self>, args: &[Value]) -> ReflectResult<Arc<Object>> {
        let arg_kinds: Vec<_> = args.iter().map(Value::kind).collect();
        let ctor = self
            .resolve_constructor(&arg_kinds)
            .ok_or_else(|| ReflectError::NotFound(format!("{}::constructor", self.name)))?;
        let obj_impl = self.implementation.instantiate(ctor, args)?;
        Ok(Object::new(Arc::clone(self), obj_impl))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("hash", &self.hash)
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl ClassRef for Class {
    fn name(&self) -> &str {
        &self.name
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_arc_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
