use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use polycall_value::{FunctionRef, Value};

use crate::error::{ReflectError, ReflectResult};
use crate::hash::DescriptorHash;
use crate::signature::Signature;

/// Adapter-owned implementation behind a [`Function`].
///
/// `invoke`/`invoke_async` correspond to the function-level vtable
/// operations in the Adapter Interface ("create/invoke/await/destroy").
/// `invoke_async` returns a `Value` of kind `future`; the concrete Future
/// type lives one layer up (`polycall-dispatch`), so the Function
/// descriptor never needs to name it — it only needs to know the result
/// is a Value, per the data model.
pub trait FunctionImpl: fmt::Debug + Send + Sync {
    fn invoke(&self, args: &[Value]) -> ReflectResult<Value>;

    fn invoke_async(&self, args: &[Value]) -> ReflectResult<Value> {
        let _ = args;
        Err(ReflectError::NotAsync {
            name: "<unnamed>".to_string(),
        })
    }

    /// Runs once before the first `invoke`. Default is a no-op; adapters
    /// override when their runtime needs lazy setup per Function.
    fn create(&self) -> ReflectResult<()> {
        Ok(())
    }

    /// Runs at most once, when the Function's refcount drops to zero.
    fn destroy(&self) {}
}

/// A callable descriptor: name, Signature, adapter implementation, async
/// flag, and an optional closure-data Value used when one Function wraps
/// another (e.g. a bound method, a partially-applied native callback).
#[derive(Clone)]
pub struct Function {
    name: String,
    hash: DescriptorHash,
    signature: Signature,
    implementation: Arc<dyn FunctionImpl>,
    is_async: bool,
    closure_data: Option<Value>,
    refcount: Arc<AtomicUsize>,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        implementation: Arc<dyn FunctionImpl>,
        is_async: bool,
    ) -> Function {
        let name = name.into();
        let hash =
            DescriptorHash::for_function(&name, &param_hashes(&signature));
        Function {
            name,
            hash,
            signature,
            implementation,
            is_async,
            closure_data: None,
            refcount: Arc::new(AtomicUsize::new(1)),
        }
    }

    pub fn with_closure_data(mut self, data: Value) -> Function {
        self.closure_data = Some(data);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> DescriptorHash {
        self.hash
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn closure_data(&self) -> Option<&Value> {
        self.closure_data.as_ref()
    }

    pub fn arity(&self) -> usize {
        self.signature.arity()
    }

    pub fn invoke(&self, args: &[Value]) -> ReflectResult<Value> {
        self.implementation.invoke(args).map_err(|e| match e {
            ReflectError::Invocation { message, .. } => ReflectError::Invocation {
                name: self.name.clone(),
                message,
            },
            other => other,
        })
    }

    pub fn invoke_async(&self, args: &[Value]) -> ReflectResult<Value> {
        if !self.is_async {
            return Err(ReflectError::NotAsync {
                name: self.name.clone(),
            });
        }
        self.implementation.invoke_async(args)
    }

    /// Bump the descriptor refcount when a `Value` of kind `function`
    /// wraps this descriptor, per the Reflection Ownership rule.
    pub fn retain(&self) -> usize {
        self.refcount.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Release a reference added by [`Function::retain`]; runs the
    /// adapter's `destroy` callback when the count reaches zero.
    pub fn release(&self) -> usize {
        let prev = self.refcount.fetch_sub(1, Ordering::AcqRel);
        if prev == 1 {
            self.implementation.destroy();
        }
        prev - 1
    }

    pub fn ref_count(&self) -> usize {
        self.refcount.load(Ordering::Acquire)
    }
}

fn param_hashes(sig: &Signature) -> Vec<DescriptorHash> {
    sig.params().iter().map(|(_, t)| t.hash).collect()
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("hash", &self.hash)
            .field("arity", &self.arity())
            .field("is_async", &self.is_async)
            .finish()
    }
}

impl FunctionRef for Function {
    fn name(&self) -> &str {
        &self.name
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_::Type;
    use polycall_value::ValueKind;

    #[derive(Debug)]
    struct AddTwo;
    impl FunctionImpl for AddTwo {
        fn invoke(&self, args: &[Value]) -> ReflectResult<Value> {
            Ok(Value::long(args[0].as_long() + args[1].as_long()))
        }
    }

    #[test]
    fn invoke_roundtrip() {
        let sig = Signature::new(Type::primitive(ValueKind::Long))
            .with_param("a", Type::primitive(ValueKind::Long))
            .with_param("b", Type::primitive(ValueKind::Long));
        let f = Function::new("add", sig, Arc::new(AddTwo), false);
        let result = f.invoke(&[Value::long(5), Value::long(15)]).unwrap();
        assert_eq!(result.as_long(), 20);
    }

    #[test]
    fn signature_invariant() {
        let sig = Signature::new(Type::primitive(ValueKind::Long))
            .with_param("a", Type::primitive(ValueKind::Long))
            .with_param("b", Type::primitive(ValueKind::Long));
        let f = Function::new("add", sig, Arc::new(AddTwo), false);
        assert_eq!(f.arity(), 2);
        for i in 0..f.arity() {
            assert_eq!(f.signature().param_type(i).unwrap().kind, ValueKind::Long);
        }
    }
}
