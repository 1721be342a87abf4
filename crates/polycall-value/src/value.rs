use std::sync::{Arc, RwLock};

use crate::error::{ValueError, ValueResult};
use crate::exception::ExceptionPayload;
use crate::handles::{ClassRef, FunctionRef, FutureRef, ObjectRef};
use crate::kind::ValueKind;
use crate::ptr::PtrPayload;

/// Maximum nesting depth `copy`, `stringify` and `Debug` will walk into a
/// composite value before bailing out. Cyclic composites are a caller
/// programming error per the data model; this cap turns "caller built a
/// cycle anyway" into a bounded, logged failure instead of a stack overflow.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug)]
pub(crate) enum ValueInner {
    Bool(bool),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Buffer(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Ptr(PtrPayload),
    Future(Arc<dyn FutureRef>),
    Function(Arc<dyn FunctionRef>),
    Null,
    Class(Arc<dyn ClassRef>),
    Object(Arc<dyn ObjectRef>),
    Exception(ExceptionPayload),
    Throwable(ExceptionPayload),
}

impl ValueInner {
    fn kind(&self) -> ValueKind {
        match self {
            ValueInner::Bool(_) => ValueKind::Bool,
            ValueInner::Char(_) => ValueKind::Char,
            ValueInner::Short(_) => ValueKind::Short,
            ValueInner::Int(_) => ValueKind::Int,
            ValueInner::Long(_) => ValueKind::Long,
            ValueInner::Float(_) => ValueKind::Float,
            ValueInner::Double(_) => ValueKind::Double,
            ValueInner::Str(_) => ValueKind::String,
            ValueInner::Buffer(_) => ValueKind::Buffer,
            ValueInner::Array(_) => ValueKind::Array,
            ValueInner::Map(_) => ValueKind::Map,
            ValueInner::Ptr(_) => ValueKind::Ptr,
            ValueInner::Future(_) => ValueKind::Future,
            ValueInner::Function(_) => ValueKind::Function,
            ValueInner::Null => ValueKind::Null,
            ValueInner::Class(_) => ValueKind::Class,
            ValueInner::Object(_) => ValueKind::Object,
            ValueInner::Exception(_) => ValueKind::Exception,
            ValueInner::Throwable(_) => ValueKind::Throwable,
        }
    }
}

/// The interior cell a `Value` shares via `Arc`. Exposed (crate-visible)
/// because `PtrPayload::ValueRef` needs to name the type; callers only ever
/// see the opaque `Value` wrapper.
pub type ValueCell = RwLock<ValueInner>;

/// A heap-allocated, reference-counted, tagged dynamic value.
///
/// Every cross-boundary argument and result flows through `Value`. Cloning a
/// `Value` is cheap (an `Arc` bump) and is *not* the same as [`Value::copy`],
/// which performs the spec's deep recursive clone. Refcounting rides on
/// `Arc`'s atomic strong count, which already satisfies "refcount is never
/// negative" and "atomic when adapter callbacks cross threads" for free.
#[derive(Debug, Clone)]
pub struct Value(pub(crate) Arc<ValueCell>);

impl Value {
    fn from_inner(inner: ValueInner) -> Value {
        Value(Arc::new(RwLock::new(inner)))
    }

    // ---- typed constructors -------------------------------------------------

    pub fn bool(v: bool) -> Value {
        Value::from_inner(ValueInner::Bool(v))
    }

    pub fn char(v: char) -> Value {
        Value::from_inner(ValueInner::Char(v))
    }

    pub fn short(v: i16) -> Value {
        Value::from_inner(ValueInner::Short(v))
    }

    pub fn int(v: i32) -> Value {
        Value::from_inner(ValueInner::Int(v))
    }

    pub fn long(v: i64) -> Value {
        Value::from_inner(ValueInner::Long(v))
    }

    pub fn float(v: f32) -> Value {
        Value::from_inner(ValueInner::Float(v))
    }

    pub fn double(v: f64) -> Value {
        Value::from_inner(ValueInner::Double(v))
    }

    pub fn string(v: impl Into<String>) -> Value {
        Value::from_inner(ValueInner::Str(v.into()))
    }

    pub fn buffer(v: impl Into<Vec<u8>>) -> Value {
        Value::from_inner(ValueInner::Buffer(v.into()))
    }

    pub fn null() -> Value {
        Value::from_inner(ValueInner::Null)
    }

    pub fn exception(payload: ExceptionPayload) -> Value {
        Value::from_inner(ValueInner::Exception(payload))
    }

    pub fn throwable(payload: ExceptionPayload) -> Value {
        Value::from_inner(ValueInner::Throwable(payload))
    }

    pub fn ptr_external(addr: usize, tag: Option<String>) -> Value {
        Value::from_inner(ValueInner::Ptr(PtrPayload::External { addr, tag }))
    }

    pub fn function(f: Arc<dyn FunctionRef>) -> Value {
        Value::from_inner(ValueInner::Function(f))
    }

    pub fn object(o: Arc<dyn ObjectRef>) -> Value {
        Value::from_inner(ValueInner::Object(o))
    }

    pub fn class(c: Arc<dyn ClassRef>) -> Value {
        Value::from_inner(ValueInner::Class(c))
    }

    pub fn future(f: Arc<dyn FutureRef>) -> Value {
        Value::from_inner(ValueInner::Future(f))
    }

    /// Construct an `array` value. Fails (rather than panicking) if the
    /// element count would overflow the payload-size computation.
    pub fn array(elements: Vec<Value>) -> ValueResult<Value> {
        elements
            .len()
            .checked_mul(std::mem::size_of::<Value>())
            .ok_or(ValueError::SizeOverflow {
                kind: ValueKind::Array,
                len: elements.len(),
            })?;
        Ok(Value::from_inner(ValueInner::Array(elements)))
    }

    /// Construct a `map` value from (key, value) pairs. Keys are strings by
    /// convention but any kind is permitted, per the data model.
    pub fn map(pairs: Vec<(Value, Value)>) -> ValueResult<Value> {
        pairs
            .len()
            .checked_mul(2 * std::mem::size_of::<Value>())
            .ok_or(ValueError::SizeOverflow {
                kind: ValueKind::Map,
                len: pairs.len(),
            })?;
        Ok(Value::from_inner(ValueInner::Map(pairs)))
    }

    // ---- introspection -------------------------------------------------------

    pub fn kind(&self) -> ValueKind {
        self.0.read().expect("value lock poisoned").kind()
    }

    /// Current strong refcount. Starts at one; never negative by
    /// construction (it rides on `Arc`'s atomic counter).
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Estimated payload size in bytes, used by the ABI's `value_size`.
    pub fn size(&self) -> usize {
        let inner = self.0.read().expect("value lock poisoned");
        match &*inner {
            ValueInner::Bool(_) => std::mem::size_of::<bool>(),
            ValueInner::Char(_) => std::mem::size_of::<char>(),
            ValueInner::Short(_) => std::mem::size_of::<i16>(),
            ValueInner::Int(_) => std::mem::size_of::<i32>(),
            ValueInner::Long(_) => std::mem::size_of::<i64>(),
            ValueInner::Float(_) => std::mem::size_of::<f32>(),
            ValueInner::Double(_) => std::mem::size_of::<f64>(),
            ValueInner::Str(s) => s.len(),
            ValueInner::Buffer(b) => b.len(),
            ValueInner::Array(a) => a.iter().map(Value::size).sum(),
            ValueInner::Map(m) => m.iter().map(|(k, v)| k.size() + v.size()).sum(),
            ValueInner::Ptr(_) => std::mem::size_of::<usize>(),
            ValueInner::Null => 0,
            ValueInner::Future(_)
            | ValueInner::Function(_)
            | ValueInner::Class(_)
            | ValueInner::Object(_) => std::mem::size_of::<usize>(),
            ValueInner::Exception(p) | ValueInner::Throwable(p) => {
                p.name.len() + p.message.len()
            }
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind() == ValueKind::Null
    }

    // ---- copy / reference / dereference / destroy -----------------------------

    /// Deep recursive clone. Composite kinds clone every child; `Function`,
    /// `Object`, `Class` and `Future` values bump the underlying
    /// descriptor's refcount (an `Arc` clone) rather than cloning the
    /// descriptor itself, per the Reflection Ownership rule.
    pub fn copy(&self) -> ValueResult<Value> {
        self.copy_depth(0)
    }

    fn copy_depth(&self, depth: usize) -> ValueResult<Value> {
        if depth >= MAX_DEPTH {
            return Err(ValueError::Cyclic(self.kind()));
        }
        let inner = self.0.read().expect("value lock poisoned");
        let copied = match &*inner {
            ValueInner::Bool(v) => ValueInner::Bool(*v),
            ValueInner::Char(v) => ValueInner::Char(*v),
            ValueInner::Short(v) => ValueInner::Short(*v),
            ValueInner::Int(v) => ValueInner::Int(*v),
            ValueInner::Long(v) => ValueInner::Long(*v),
            ValueInner::Float(v) => ValueInner::Float(*v),
            ValueInner::Double(v) => ValueInner::Double(*v),
            ValueInner::Str(v) => ValueInner::Str(v.clone()),
            ValueInner::Buffer(v) => ValueInner::Buffer(v.clone()),
            ValueInner::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.copy_depth(depth + 1)?);
                }
                ValueInner::Array(out)
            }
            ValueInner::Map(pairs) => {
                let mut out = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    out.push((k.copy_depth(depth + 1)?, v.copy_depth(depth + 1)?));
                }
                ValueInner::Map(out)
            }
            ValueInner::Ptr(p) => ValueInner::Ptr(p.clone()),
            ValueInner::Future(f) => ValueInner::Future(Arc::clone(f)),
            ValueInner::Function(f) => ValueInner::Function(Arc::clone(f)),
            ValueInner::Null => ValueInner::Null,
            ValueInner::Class(c) => ValueInner::Class(Arc::clone(c)),
            ValueInner::Object(o) => ValueInner::Object(Arc::clone(o)),
            ValueInner::Exception(p) => ValueInner::Exception(p.clone()),
            ValueInner::Throwable(p) => ValueInner::Throwable(p.clone()),
        };
        Ok(Value::from_inner(copied))
    }

    /// Wrap this value as a `ptr`-kind reference without deep copying.
    /// Mutation performed through the returned reference (or through any
    /// other reference to the same cell) is visible via `dereference` on
    /// every other reference — this is what gives adapters out-parameter
    /// semantics without a marshalled copy.
    pub fn reference(&self) -> Value {
        Value::from_inner(ValueInner::Ptr(PtrPayload::ValueRef(Arc::clone(&self.0))))
    }

    /// Follow a `ptr`-kind reference back to the Value it points at.
    /// Returns `None` for an `External` pointer (opaque, not a Value) or
    /// for a non-`ptr` value.
    pub fn dereference(&self) -> Option<Value> {
        let inner = self.0.read().expect("value lock poisoned");
        match &*inner {
            ValueInner::Ptr(PtrPayload::ValueRef(cell)) => Some(Value(Arc::clone(cell))),
            _ => None,
        }
    }

    /// Explicit destroy verb for the ABI surface. Rust's `Drop` already
    /// recursively frees owned children when the last reference goes away;
    /// this method exists so callers modelled on the C ABI have an
    /// explicit call site, and so `destroy` on an adapter-flagged-destroyed
    /// value can be short-circuited by higher layers before it reaches here.
    pub fn destroy(self) {
        drop(self)
    }

    // ---- compare ---------------------------------------------------------

    /// Structural comparison by kind and content. Kinds that do not support
    /// comparison (`Function`, `Object`, `Class`, `Future`) compare by
    /// identity (same underlying descriptor).
    pub fn compare(&self, other: &Value) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        let a = self.0.read().expect("value lock poisoned");
        let b = other.0.read().expect("value lock poisoned");
        match (&*a, &*b) {
            (ValueInner::Bool(x), ValueInner::Bool(y)) => x == y,
            (ValueInner::Char(x), ValueInner::Char(y)) => x == y,
            (ValueInner::Short(x), ValueInner::Short(y)) => x == y,
            (ValueInner::Int(x), ValueInner::Int(y)) => x == y,
            (ValueInner::Long(x), ValueInner::Long(y)) => x == y,
            (ValueInner::Float(x), ValueInner::Float(y)) => x == y,
            (ValueInner::Double(x), ValueInner::Double(y)) => x == y,
            (ValueInner::Str(x), ValueInner::Str(y)) => x == y,
            (ValueInner::Buffer(x), ValueInner::Buffer(y)) => x == y,
            (ValueInner::Array(x), ValueInner::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(a, b)| a.compare(b))
            }
            (ValueInner::Map(x), ValueInner::Map(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .zip(y)
                        .all(|((k1, v1), (k2, v2))| k1.compare(k2) && v1.compare(v2))
            }
            (ValueInner::Ptr(x), ValueInner::Ptr(y)) => x.addr() == y.addr(),
            (ValueInner::Null, ValueInner::Null) => true,
            (ValueInner::Function(x), ValueInner::Function(y)) => Arc::ptr_eq(x, y),
            (ValueInner::Class(x), ValueInner::Class(y)) => Arc::ptr_eq(x, y),
            (ValueInner::Object(x), ValueInner::Object(y)) => Arc::ptr_eq(x, y),
            (ValueInner::Future(x), ValueInner::Future(y)) => Arc::ptr_eq(x, y),
            (ValueInner::Exception(x), ValueInner::Throwable(y))
            | (ValueInner::Throwable(x), ValueInner::Exception(y)) => {
                x.name == y.name && x.message == y.message
            }
            (ValueInner::Exception(x), ValueInner::Exception(y))
            | (ValueInner::Throwable(x), ValueInner::Throwable(y)) => {
                x.name == y.name && x.message == y.message
            }
            _ => false,
        }
    }

    // ---- typed accessors ---------------------------------------------------
    // Kind mismatch logs at error level and returns the documented sentinel
    // rather than failing the call.

    pub fn as_bool(&self) -> bool {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Bool(v) => *v,
            other => {
                log::error!("value accessor mismatch: expected bool, got {}", other.kind());
                false
            }
        }
    }

    pub fn as_long(&self) -> i64 {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Bool(v) => *v as i64,
            ValueInner::Char(v) => *v as i64,
            ValueInner::Short(v) => *v as i64,
            ValueInner::Int(v) => *v as i64,
            ValueInner::Long(v) => *v,
            other => {
                log::error!("value accessor mismatch: expected long, got {}", other.kind());
                0
            }
        }
    }

    pub fn as_double(&self) -> f64 {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Float(v) => *v as f64,
            ValueInner::Double(v) => *v,
            other => {
                log::error!(
                    "value accessor mismatch: expected double, got {}",
                    other.kind()
                );
                0.0
            }
        }
    }

    pub fn as_str(&self) -> String {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Str(v) => v.clone(),
            other => {
                log::error!("value accessor mismatch: expected string, got {}", other.kind());
                String::new()
            }
        }
    }

    pub fn as_array(&self) -> Vec<Value> {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Array(v) => v.clone(),
            other => {
                log::error!("value accessor mismatch: expected array, got {}", other.kind());
                Vec::new()
            }
        }
    }

    pub fn as_buffer(&self) -> Vec<u8> {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Buffer(v) => v.clone(),
            other => {
                log::error!("value accessor mismatch: expected buffer, got {}", other.kind());
                Vec::new()
            }
        }
    }

    /// Address backing a `ptr` value, for display purposes only. Returns
    /// `None` for non-`ptr` values.
    pub fn ptr_addr(&self) -> Option<usize> {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Ptr(p) => Some(p.addr()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Vec<(Value, Value)> {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Map(v) => v.clone(),
            other => {
                log::error!("value accessor mismatch: expected map, got {}", other.kind());
                Vec::new()
            }
        }
    }

    pub fn as_function(&self) -> Option<Arc<dyn FunctionRef>> {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Function(f) => Some(Arc::clone(f)),
            other => {
                log::error!(
                    "value accessor mismatch: expected function, got {}",
                    other.kind()
                );
                None
            }
        }
    }

    pub fn as_class(&self) -> Option<Arc<dyn ClassRef>> {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Class(c) => Some(Arc::clone(c)),
            other => {
                log::error!("value accessor mismatch: expected class, got {}", other.kind());
                None
            }
        }
    }

    pub fn as_object(&self) -> Option<Arc<dyn ObjectRef>> {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Object(o) => Some(Arc::clone(o)),
            other => {
                log::error!(
                    "value accessor mismatch: expected object, got {}",
                    other.kind()
                );
                None
            }
        }
    }

    pub fn as_future(&self) -> Option<Arc<dyn FutureRef>> {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Future(f) => Some(Arc::clone(f)),
            other => {
                log::error!(
                    "value accessor mismatch: expected future, got {}",
                    other.kind()
                );
                None
            }
        }
    }

    pub fn as_exception(&self) -> Option<ExceptionPayload> {
        match &*self.0.read().expect("value lock poisoned") {
            ValueInner::Exception(p) | ValueInner::Throwable(p) => Some(p.clone()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::bool(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::int(v)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::long(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::double(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::string(v)
    }
}
