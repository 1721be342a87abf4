use std::sync::Arc;

use polycall_reflect::{Class, Function};
use polycall_value::{ClassRef, FunctionRef, Value, ValueKind};

use crate::error::{PolycallError, PolycallResult};

/// §6.1's `FnHandle`: a resolved Function descriptor, with the accessors
/// `function_parameter_type`/`function_return_type`/`function_size`/
/// `function_async` wrap.
#[derive(Clone)]
pub struct FunctionHandle(Arc<dyn FunctionRef>);

impl FunctionHandle {
    pub(crate) fn new(handle: Arc<dyn FunctionRef>) -> FunctionHandle {
        FunctionHandle(handle)
    }

    fn function(&self) -> &Function {
        self.0
            .as_any()
            .downcast_ref::<Function>()
            .expect("FunctionHandle always wraps this crate's own Function descriptor")
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn parameter_type(&self, index: usize) -> Option<ValueKind> {
        self.function().signature().param_type(index).map(|t| t.kind)
    }

    pub fn return_type(&self) -> ValueKind {
        self.function().signature().return_type().kind
    }

    pub fn size(&self) -> usize {
        self.function().arity()
    }

    pub fn is_async(&self) -> bool {
        self.function().is_async()
    }
}

/// §6.1's `ClassHandle`: a resolved Class descriptor, backing
/// `class_new`/`class_static_get`/`class_static_set`.
#[derive(Clone)]
pub struct ClassHandle(Arc<dyn ClassRef>);

impl ClassHandle {
    pub(crate) fn new(handle: Arc<dyn ClassRef>) -> ClassHandle {
        ClassHandle(handle)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    fn class(&self) -> &Class {
        self.0
            .as_any()
            .downcast_ref::<Class>()
            .expect("ClassHandle always wraps this crate's own Class descriptor")
    }

    /// Owned `Arc<Class>`, needed for `new_instance`'s `self: &Arc<Self>`
    /// receiver — the only place this handle needs more than a borrow.
    fn class_arc(&self) -> Arc<Class> {
        Arc::clone(&self.0)
            .as_arc_any()
            .downcast::<Class>()
            .ok()
            .expect("ClassHandle always wraps this crate's own Class descriptor")
    }

    pub fn new_instance(&self, args: &[Value]) -> PolycallResult<Value> {
        let class = self.class_arc();
        let object = class.new_instance(args)?;
        Ok(Value::object(object as Arc<dyn polycall_value::ObjectRef>))
    }

    pub fn static_get(&self, name: &str) -> PolycallResult<Value> {
        Ok(self.class().static_get(name)?)
    }

    pub fn static_set(&self, name: &str, value: Value) -> PolycallResult<()> {
        Ok(self.class().static_set(name, value)?)
    }
}

/// `object_get`/`object_set`/`callv_object` operate directly on a
/// `Value` of kind `object` rather than a dedicated handle type — the
/// data model already carries everything needed (§4.1's refcounted
/// `Arc<dyn ObjectRef>`), so no extra wrapper earns its keep here.
pub(crate) fn object_of(value: &Value) -> PolycallResult<Arc<polycall_reflect::Object>> {
    let obj_ref = value.as_object().ok_or(PolycallError::NotAnObject)?;
    obj_ref
        .as_arc_any()
        .downcast::<polycall_reflect::Object>()
        .map_err(|_| PolycallError::NotAnObject)
}
