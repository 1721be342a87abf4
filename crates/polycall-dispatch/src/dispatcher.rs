use std::sync::{Arc, Mutex};

use polycall_loader::{Handle, LoaderCore};
use polycall_reflect::{Function, Signature};
use polycall_serial::{Deserializer, JsonBackend};
use polycall_value::{Value, ValueKind};

use crate::coerce::coerce;
use crate::error::{DispatchError, DispatchResult};
use crate::future::Future;

/// Holds a reference to the Loader Core's global Scope and the stack of
/// currently active Handles (non-empty only while a `call_handle` is in
/// progress, including nested/reentrant ones triggered by a native
/// callback invoked from guest code — §5's reentrancy guarantee).
pub struct Dispatcher {
    loader: Arc<LoaderCore>,
    active: Mutex<Vec<Handle>>,
}

struct ActiveGuard<'a> {
    dispatcher: &'a Dispatcher,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.active.lock().expect("lock poisoned").pop();
    }
}

impl Dispatcher {
    pub fn new(loader: Arc<LoaderCore>) -> Dispatcher {
        Dispatcher {
            loader,
            active: Mutex::new(Vec::new()),
        }
    }

    fn push_active(&self, handle: Handle) -> ActiveGuard<'_> {
        self.active.lock().expect("lock poisoned").push(handle);
        ActiveGuard { dispatcher: self }
    }

    /// §4.6 lookup rule: the currently active Handle's Context first (if
    /// any is on the stack), then the global Scope.
    fn resolve(&self, name: &str) -> DispatchResult<Value> {
        if let Some(handle) = self.active.lock().expect("lock poisoned").last() {
            if let Some(value) = handle.scope().get(name) {
                return Ok(value);
            }
        }
        self.loader
            .global_scope()
            .get(name)
            .ok_or_else(|| DispatchError::SymbolNotFound(name.to_string()))
    }

    fn function_of(&self, name: &str, value: &Value) -> DispatchResult<Arc<dyn polycall_value::FunctionRef>> {
        let func_ref = value
            .as_function()
            .ok_or_else(|| DispatchError::NotAFunction(name.to_string()))?;
        if func_ref.as_any().downcast_ref::<Function>().is_none() {
            return Err(DispatchError::NotAFunction(name.to_string()));
        }
        Ok(func_ref)
    }

    fn coerce_args(&self, sig: &Signature, args: &[Value], name: &str) -> DispatchResult<Vec<Value>> {
        if args.len() != sig.arity() {
            return Err(DispatchError::Arity {
                name: name.to_string(),
                expected: sig.arity(),
                supplied: args.len(),
            });
        }
        args.iter()
            .enumerate()
            .map(|(i, arg)| {
                let target = sig.param_type(i).expect("index bounded by arity check above");
                if arg.kind() == target.kind {
                    Ok(arg.clone())
                } else {
                    coerce(arg, target.kind, name, i)
                }
            })
            .collect()
    }

    fn invoke_named(&self, name: &str, args: &[Value], value: Value) -> DispatchResult<Value> {
        let func_ref = self.function_of(name, &value)?;
        let func = func_ref
            .as_any()
            .downcast_ref::<Function>()
            .expect("checked by function_of");
        let coerced = self.coerce_args(func.signature(), args, func.name())?;
        func.invoke(&coerced).map_err(DispatchError::from)
    }

    /// Positional call by name (§4.6 `call`/`callv`).
    pub fn call(&self, name: &str, args: &[Value]) -> DispatchResult<Value> {
        let value = self.resolve(name)?;
        self.invoke_named(name, args, value)
    }

    /// Same as [`Dispatcher::call`], named `callv` to match the explicit
    /// "positional call with an explicit array" ABI entry point.
    pub fn callv(&self, name: &str, args: &[Value]) -> DispatchResult<Value> {
        self.call(name, args)
    }

    /// `callt`: positional call with explicit expected type kinds,
    /// coercing each argument to the caller-declared kind *before* the
    /// function's own signature coercion runs.
    pub fn callt(&self, name: &str, type_ids: &[ValueKind], args: &[Value]) -> DispatchResult<Value> {
        if type_ids.len() != args.len() {
            return Err(DispatchError::Arity {
                name: name.to_string(),
                expected: type_ids.len(),
                supplied: args.len(),
            });
        }
        let mut coerced = Vec::with_capacity(args.len());
        for (i, (arg, kind)) in args.iter().zip(type_ids).enumerate() {
            coerced.push(if arg.kind() == *kind {
                arg.clone()
            } else {
                coerce(arg, *kind, name, i)?
            });
        }
        self.call(name, &coerced)
    }

    fn call_named_map(&self, name: &str, pairs: &[(Value, Value)]) -> DispatchResult<Value> {
        let target = self.resolve(name)?;
        let func_ref = self.function_of(name, &target)?;
        let func = func_ref
            .as_any()
            .downcast_ref::<Function>()
            .expect("checked by function_of");
        let mut ordered = Vec::with_capacity(func.arity());
        for (index, (pname, ty)) in func.signature().params().iter().enumerate() {
            let supplied = pairs
                .iter()
                .find(|(k, _)| k.as_str() == *pname)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| DispatchError::MissingNamedArgument {
                    name: name.to_string(),
                    param: pname.clone(),
                })?;
            ordered.push(if supplied.kind() == ty.kind {
                supplied
            } else {
                coerce(&supplied, ty.kind, name, index)?
            });
        }
        func.invoke(&ordered).map_err(DispatchError::from)
    }

    /// `callms`: deserialize a key→value document with the system Serial
    /// backend, reorder positional slots by matching keys to the
    /// Signature, then dispatch.
    pub fn callms(&self, name: &str, serialized: &[u8]) -> DispatchResult<Value> {
        let decoded = JsonBackend.decode(serialized)?;
        self.call_named_map(name, &decoded.as_map())
    }

    /// `callmv`: map-by-array, the same semantics as `callms` without a
    /// serial round-trip.
    pub fn callmv(&self, name: &str, keys: &[String], values: &[Value]) -> DispatchResult<Value> {
        let pairs: Vec<(Value, Value)> = keys
            .iter()
            .zip(values)
            .map(|(k, v)| (Value::string(k.clone()), v.clone()))
            .collect();
        self.call_named_map(name, &pairs)
    }

    /// `await`: invokes the Function's asynchronous vtable entry and
    /// returns a Future. If the adapter's `invoke_async` already produced
    /// a settled Value (a synchronous guest-language result), it is
    /// wrapped as an already-resolved Future rather than forcing every
    /// adapter to mint one.
    pub fn await_call(&self, name: &str, args: &[Value]) -> DispatchResult<Future> {
        let value = self.resolve(name)?;
        let func_ref = self.function_of(name, &value)?;
        let func = func_ref
            .as_any()
            .downcast_ref::<Function>()
            .expect("checked by function_of");
        if !func.is_async() {
            return Err(DispatchError::NotAsync(name.to_string()));
        }
        let coerced = self.coerce_args(func.signature(), args, name)?;
        let result = func.invoke_async(&coerced)?;
        if result.kind() == ValueKind::Future {
            return Future::from_value(&result).ok_or(DispatchError::UnsupportedFuture);
        }
        Ok(Future::resolved(result))
    }

    /// `call_handle`: restricted lookup inside one Handle rather than the
    /// global Scope. Pushes `handle` as the active Handle for the
    /// duration of the call so a reentrant native callback invoked from
    /// within sees the same active context (§5 reentrancy guarantee).
    pub fn call_handle(&self, handle: &Handle, name: &str, args: &[Value]) -> DispatchResult<Value> {
        let _guard = self.push_active(handle.clone());
        let value = handle
            .scope()
            .get(name)
            .ok_or_else(|| DispatchError::SymbolNotFound(name.to_string()))?;
        self.invoke_named(name, args, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polycall_loader::HostAdapter;
    use polycall_reflect::{ReflectError, Type};

    fn native_dispatcher() -> (Arc<Dispatcher>, Arc<HostAdapter>) {
        let loader = LoaderCore::new("polycall-test");
        let host = HostAdapter::new();
        loader.register_adapter(host.clone()).unwrap();
        (Arc::new(Dispatcher::new(loader)), host)
    }

    #[test]
    fn positional_call_by_name() {
        let (dispatcher, host) = native_dispatcher();
        host.register(
            "multiply",
            Signature::new(Type::primitive(ValueKind::Long))
                .with_param("a", Type::primitive(ValueKind::Long))
                .with_param("b", Type::primitive(ValueKind::Long)),
            Box::new(|args| Ok(Value::long(args[0].as_long() * args[1].as_long()))),
        )
        .unwrap();
        dispatcher.loader.load_from_memory("host", "builtin", &[]).unwrap();

        let result = dispatcher.call("multiply", &[Value::long(5), Value::long(15)]).unwrap();
        assert_eq!(result.as_long(), 75);
    }

    #[test]
    fn coercion_widens_adjacent_numeric_argument() {
        let (dispatcher, host) = native_dispatcher();
        host.register(
            "identity",
            Signature::new(Type::primitive(ValueKind::Long))
                .with_param("x", Type::primitive(ValueKind::Long)),
            Box::new(|args| Ok(args[0].clone())),
        )
        .unwrap();
        dispatcher.loader.load_from_memory("host", "builtin", &[]).unwrap();

        // caller supplies an Int where Long is declared: adjacent widening.
        let result = dispatcher.call("identity", &[Value::int(9)]).unwrap();
        assert_eq!(result.kind(), ValueKind::Long);
        assert_eq!(result.as_long(), 9);
    }

    #[test]
    fn unknown_symbol_is_reported() {
        let (dispatcher, _host) = native_dispatcher();
        let err = dispatcher.call("missing", &[]).unwrap_err();
        assert!(matches!(err, DispatchError::SymbolNotFound(_)));
    }

    #[test]
    fn callmv_reorders_by_signature_param_name() {
        let (dispatcher, host) = native_dispatcher();
        host.register(
            "hello_boy_await",
            Signature::new(Type::primitive(ValueKind::Long))
                .with_param("a", Type::primitive(ValueKind::Long))
                .with_param("b", Type::primitive(ValueKind::Long)),
            Box::new(|args| Ok(Value::long(args[0].as_long() + args[1].as_long()))),
        )
        .unwrap();
        dispatcher.loader.load_from_memory("host", "builtin", &[]).unwrap();

        let result = dispatcher
            .callmv(
                "hello_boy_await",
                &["b".to_string(), "a".to_string()],
                &[Value::long(2), Value::long(10)],
            )
            .unwrap();
        assert_eq!(result.as_long(), 12);
    }

    #[test]
    fn callms_decodes_json_before_dispatching() {
        let (dispatcher, host) = native_dispatcher();
        host.register(
            "hello_boy_await",
            Signature::new(Type::primitive(ValueKind::Long))
                .with_param("a", Type::primitive(ValueKind::Long))
                .with_param("b", Type::primitive(ValueKind::Long)),
            Box::new(|args| Ok(Value::long(args[0].as_long() + args[1].as_long()))),
        )
        .unwrap();
        dispatcher.loader.load_from_memory("host", "builtin", &[]).unwrap();

        let result = dispatcher
            .callms("hello_boy_await", br#"{"a":10,"b":2}"#)
            .unwrap();
        assert_eq!(result.as_long(), 12);
    }

    #[derive(Debug)]
    struct AsyncDouble;
    impl polycall_reflect::FunctionImpl for AsyncDouble {
        fn invoke(&self, args: &[Value]) -> Result<Value, ReflectError> {
            Ok(args[0].clone())
        }
        fn invoke_async(&self, args: &[Value]) -> Result<Value, ReflectError> {
            Ok(Value::long(args[0].as_long()))
        }
    }

    #[test]
    fn await_call_wraps_a_synchronous_adapter_result_as_already_resolved() {
        let loader = LoaderCore::new("polycall-test");
        let host = HostAdapter::new();
        loader.register_adapter(host.clone()).unwrap();
        let func = Function::new(
            "h",
            Signature::new(Type::primitive(ValueKind::Long)).with_param("x", Type::primitive(ValueKind::Long)),
            Arc::new(AsyncDouble),
            true,
        );
        host.register_function(func).unwrap();
        loader.load_from_memory("host", "builtin", &[]).unwrap();

        let dispatcher = Dispatcher::new(loader);
        let future = dispatcher.await_call("h", &[Value::long(34)]).unwrap();
        assert!(future.is_settled());
        future.on_settle(|outcome| assert_eq!(outcome.unwrap().as_long(), 34));
    }
}
