use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use polycall_reflect::{builtin_types, Function, FunctionImpl, FunctionRef, ReflectError, ReflectResult, Scope, Signature, Type};
use polycall_value::Value;
use rustc_hash::FxHashMap;

use crate::adapter::Adapter;
use crate::error::LoaderResult;

/// A native Rust closure wrapping a host routine, the Rust stand-in for
/// the spec's raw C function-pointer cast — idiomatic Rust has no safe
/// equivalent of casting through a narrow union, so natively registered
/// callbacks are boxed trait objects dispatched dynamically instead.
pub type NativeFn = Box<dyn Fn(&[Value]) -> ReflectResult<Value> + Send + Sync>;

struct NativeFunctionImpl(NativeFn);

impl fmt::Debug for NativeFunctionImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<native fn>")
    }
}

impl FunctionImpl for NativeFunctionImpl {
    fn invoke(&self, args: &[Value]) -> ReflectResult<Value> {
        (self.0)(args)
    }
}

/// The synthetic adapter for natively registered Rust functions. Always
/// initialized first and destroyed last; pre-registers a `Type` for
/// every built-in `ValueKind` so type lookups by name succeed before any
/// language adapter has loaded.
#[derive(Debug)]
pub struct HostAdapter {
    functions: RwLock<FxHashMap<String, Arc<Function>>>,
    types: RwLock<FxHashMap<String, Type>>,
}

impl HostAdapter {
    pub fn new() -> Arc<HostAdapter> {
        let types = builtin_types().into_iter().map(|t| (t.name.clone(), t)).collect();
        Arc::new(HostAdapter {
            functions: RwLock::new(FxHashMap::default()),
            types: RwLock::new(types),
        })
    }

    /// Wrap `f` in a Function descriptor and make it available to
    /// `discover` the next time this adapter is loaded.
    pub fn register(
        &self,
        name: impl Into<String>,
        signature: Signature,
        f: NativeFn,
    ) -> ReflectResult<Arc<Function>> {
        let name = name.into();
        let mut functions = self.functions.write().expect("lock poisoned");
        if functions.contains_key(&name) {
            return Err(ReflectError::AlreadyRegistered { name });
        }
        let func = Arc::new(Function::new(name.clone(), signature, Arc::new(NativeFunctionImpl(f)), false));
        functions.insert(name, func.clone());
        Ok(func)
    }

    /// Make an already-built Function descriptor available to `discover`,
    /// the path used when a native callback needs something `register`'s
    /// plain closure can't express — an asynchronous one, or one that
    /// carries closure data.
    pub fn register_function(&self, func: Function) -> ReflectResult<Arc<Function>> {
        let name = func.name().to_string();
        let mut functions = self.functions.write().expect("lock poisoned");
        if functions.contains_key(&name) {
            return Err(ReflectError::AlreadyRegistered { name });
        }
        let func = Arc::new(func);
        functions.insert(name, func.clone());
        Ok(func)
    }

    pub fn type_named(&self, name: &str) -> Option<Type> {
        self.types.read().expect("lock poisoned").get(name).cloned()
    }
}

impl Adapter for HostAdapter {
    fn tag(&self) -> &str {
        "host"
    }

    fn initialize(&self, _config: Option<&Value>) -> LoaderResult<()> {
        Ok(())
    }

    fn execution_path(&self, _path: &Path) -> LoaderResult<()> {
        Ok(())
    }

    fn load_from_file(&self, _paths: &[PathBuf]) -> LoaderResult<Box<dyn Any + Send + Sync>> {
        Ok(Box::new(()))
    }

    fn load_from_memory(&self, _name: &str, _buffer: &[u8]) -> LoaderResult<Box<dyn Any + Send + Sync>> {
        Ok(Box::new(()))
    }

    fn load_from_package(&self, _path: &Path) -> LoaderResult<Box<dyn Any + Send + Sync>> {
        Ok(Box::new(()))
    }

    fn clear(&self, _raw: Box<dyn Any + Send + Sync>) {}

    fn discover(&self, _raw: &(dyn Any + Send + Sync), scope: &Scope) -> LoaderResult<()> {
        for (name, func) in self.functions.read().expect("lock poisoned").iter() {
            let value = Value::function(func.clone() as Arc<dyn FunctionRef>);
            scope.define(name, value)?;
        }
        Ok(())
    }

    fn destroy(&self) {}
}
