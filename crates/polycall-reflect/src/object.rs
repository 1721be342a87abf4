use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use polycall_value::{ObjectRef, Value};

use crate::class::Class;
use crate::error::{ReflectError, ReflectResult};

/// Adapter-owned implementation behind an [`Object`]: attribute
/// get/set and destructor, per the Object-level vtable.
pub trait ObjectImpl: fmt::Debug + Send + Sync {
    fn get(&self, attribute: &str) -> ReflectResult<Value>;
    fn set(&self, attribute: &str, value: Value) -> ReflectResult<()>;
    fn destructor(&self) {}
}

/// A live instance of a Class. Always refcounted; a `Value` of kind
/// `object` adds a reference and releases one on `Value::destroy`.
pub struct Object {
    class: Arc<Class>,
    implementation: Arc<dyn ObjectImpl>,
    refcount: AtomicUsize,
}

impl Object {
    pub fn new(class: Arc<Class>, implementation: Arc<dyn ObjectImpl>) -> Arc<Object> {
        Arc::new(Object {
            class,
            implementation,
            refcount: AtomicUsize::new(1),
        })
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn get(&self, attribute: &str) -> ReflectResult<Value> {
        self.implementation.get(attribute)
    }

    pub fn set(&self, attribute: &str, value: Value) -> ReflectResult<()> {
        self.implementation.set(attribute, value)
    }

    /// Resolve `method_name` against the owning Class by argument kinds and
    /// invoke it with `self` as the receiver.
    pub fn method_invoke(self: &Arc<Self>, method_name: &str, args: &[Value]) -> ReflectResult<Value> {
        let arg_kinds: Vec<_> = args.iter().map(Value::kind).collect();
        let method = self
            .class
            .resolve_method(method_name, &arg_kinds)
            .ok_or_else(|| ReflectError::NotFound(method_name.to_string()))?;
        let receiver: Arc<dyn ObjectRef> = self.clone() as Arc<dyn ObjectRef>;
        method.invoke(&receiver, args)
    }

    pub fn method_await(self: &Arc<Self>, method_name: &str, args: &[Value]) -> ReflectResult<Value> {
        let arg_kinds: Vec<_> = args.iter().map(Value::kind).collect();
        let method = self
            .class
            .resolve_method(method_name, &arg_kinds)
            .ok_or_else(|| ReflectError::NotFound(method_name.to_string()))?;
        let receiver: Arc<dyn ObjectRef> = self.clone() as Arc<dyn ObjectRef>;
        method.invoke_async(&receiver, args)
    }

    /// Add a reference, mirroring the Ownership rule that a `Value` of
    /// kind `object` bumps the refcount.
    pub fn retain(&self) -> usize {
        self.refcount.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Release a reference; runs the adapter's destructor when the count
    /// reaches zero.
    pub fn release(&self) -> usize {
        let prev = self.refcount.fetch_sub(1, Ordering::AcqRel);
        if prev == 1 {
            self.implementation.destructor();
        }
        prev - 1
    }

    pub fn ref_count(&self) -> usize {
        self.refcount.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class.name())
            .field("refcount", &self.ref_count())
            .finish()
    }
}

impl ObjectRef for Object {
    fn class_name(&self) -> &str {
        self.class.name()
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_arc_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
