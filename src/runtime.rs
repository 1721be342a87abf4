use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use polycall_dispatch::{Dispatcher, Future};
use polycall_fork::{ChildCallback, ForkManager, ForkOutcome};
use polycall_loader::{Adapter, Handle, HostAdapter, LoaderCore, NativeFn};
use polycall_reflect::Signature;
use polycall_value::{FunctionRef, Value, ValueKind};

use crate::error::{PolycallError, PolycallResult};
use crate::handles::{self, ClassHandle, FunctionHandle};
use crate::inspect;

struct Inner {
    loader: Arc<LoaderCore>,
    dispatcher: Dispatcher,
    host: Arc<HostAdapter>,
}

/// Build a fresh `LoaderCore` with the Host Loader registered and
/// initialized first, per "Host is always initialized first and
/// destroyed last". Shared between `Polycall::initialize` and the fork
/// trampoline's `reinit` closure, so the two never drift apart.
fn bootstrap(manager_name: &str) -> PolycallResult<(Arc<LoaderCore>, Arc<HostAdapter>)> {
    let loader = LoaderCore::new(manager_name);
    let host = HostAdapter::new();
    loader.register_adapter(host.clone() as Arc<dyn Adapter>)?;
    loader.load_from_memory("host", "<bootstrap>", &[])?;
    Ok((loader, host))
}

/// The assembled runtime: one Loader Core, one Dispatcher bound to it,
/// the Host Loader, a fork trampoline, and the Handle-tracking side
/// table `inspect()` walks (`LoaderCore` itself does not retain Handles
/// once a `load_*` call returns them).
pub struct Polycall {
    inner: RwLock<Inner>,
    fork: Arc<ForkManager>,
    handles: RwLock<HashMap<String, Vec<Handle>>>,
    // Set by the fork trampoline's `reinit` closure each time it runs;
    // `fork()` drains it to recover the freshly rebuilt Host without
    // widening the `Adapter` trait with a downcast-back-out method just
    // for this one caller.
    rebuilt_host: Arc<Mutex<Option<Arc<HostAdapter>>>>,
}

impl Polycall {
    /// §6.1 `initialize`.
    pub fn initialize() -> PolycallResult<Arc<Polycall>> {
        let (loader, host) = bootstrap("polycall")?;
        let dispatcher = Dispatcher::new(loader.clone());

        let rebuilt_host: Arc<Mutex<Option<Arc<HostAdapter>>>> = Arc::new(Mutex::new(None));
        let for_reinit = rebuilt_host.clone();
        let reinit: Arc<polycall_fork::ReinitFn> = Arc::new(move || {
            let (loader, host) = bootstrap("polycall").expect("bootstrapping a clean LoaderCore cannot fail");
            *for_reinit.lock().expect("lock poisoned") = Some(host);
            loader
        });
        let fork = ForkManager::new(loader.clone(), reinit);

        Ok(Arc::new(Polycall {
            inner: RwLock::new(Inner { loader, dispatcher, host }),
            fork,
            handles: RwLock::new(HashMap::new()),
            rebuilt_host,
        }))
    }

    /// §6.1 `destroy`: tear down every adapter in reverse initialization
    /// order. Idempotent (`LoaderCore::shutdown` drains its own order
    /// stack, so a second call is a no-op).
    pub fn destroy(&self) -> PolycallResult<()> {
        self.inner.read().expect("lock poisoned").loader.shutdown();
        self.handles.write().expect("lock poisoned").clear();
        Ok(())
    }

    fn track(&self, tag: &str, handle: Handle) {
        self.handles
            .write()
            .expect("lock poisoned")
            .entry(tag.to_string())
            .or_default()
            .push(handle);
    }

    pub fn load_from_file(&self, tag: &str, paths: &[PathBuf]) -> PolycallResult<Handle> {
        let handle = self.inner.read().expect("lock poisoned").loader.load_from_file(tag, paths)?;
        self.track(tag, handle.clone());
        Ok(handle)
    }

    pub fn load_from_memory(&self, tag: &str, name: &str, buffer: &[u8]) -> PolycallResult<Handle> {
        let handle = self
            .inner
            .read()
            .expect("lock poisoned")
            .loader
            .load_from_memory(tag, name, buffer)?;
        self.track(tag, handle.clone());
        Ok(handle)
    }

    pub fn load_from_package(&self, tag: &str, path: &Path) -> PolycallResult<Handle> {
        let handle = self.inner.read().expect("lock poisoned").loader.load_from_package(tag, path)?;
        self.track(tag, handle.clone());
        Ok(handle)
    }

    /// §6.2: load a configuration document, recursing into its children
    /// before its own `discover` runs.
    pub fn load_from_configuration(&self, path: &Path) -> PolycallResult<Vec<Handle>> {
        let handles = self
            .inner
            .read()
            .expect("lock poisoned")
            .loader
            .load_from_configuration(path)?;
        for handle in &handles {
            self.track(handle.tag(), handle.clone());
        }
        Ok(handles)
    }

    /// Resolve adapter `tag`'s shared library and hand its raw interface
    /// singleton to `build`, the one place that knows the dylib's actual
    /// ABI shape (out of scope for this crate per §1).
    pub fn load_adapter_library(
        &self,
        tag: &str,
        default_path: &Path,
        build: impl FnOnce(*mut std::ffi::c_void) -> Arc<dyn Adapter>,
    ) -> PolycallResult<()> {
        Ok(self
            .inner
            .read()
            .expect("lock poisoned")
            .loader
            .load_adapter_library(tag, default_path, build)?)
    }

    /// Register an adapter constructed in-process rather than `dlopen`ed.
    pub fn register_adapter(&self, adapter: Arc<dyn Adapter>) -> PolycallResult<()> {
        Ok(self.inner.read().expect("lock poisoned").loader.register_adapter(adapter)?)
    }

    /// §6.1 `register`: wrap a native Rust closure as a Function and make
    /// it callable immediately. Bypasses the Host Loader's `discover`
    /// path (which would try to redefine every previously registered
    /// name and fail on the second call) by defining straight into the
    /// global Scope.
    pub fn register(
        &self,
        name: impl Into<String>,
        signature: Signature,
        f: NativeFn,
    ) -> PolycallResult<FunctionHandle> {
        let inner = self.inner.read().expect("lock poisoned");
        let func = inner.host.register(name, signature, f)?;
        let func_ref = func.clone() as Arc<dyn FunctionRef>;
        inner
            .loader
            .global_scope()
            .define(func.name().to_string(), Value::function(func_ref.clone()))?;
        Ok(FunctionHandle::new(func_ref))
    }

    pub fn call(&self, name: &str, args: &[Value]) -> PolycallResult<Value> {
        Ok(self.inner.read().expect("lock poisoned").dispatcher.call(name, args)?)
    }

    pub fn callv(&self, name: &str, args: &[Value]) -> PolycallResult<Value> {
        Ok(self.inner.read().expect("lock poisoned").dispatcher.callv(name, args)?)
    }

    pub fn callt(&self, name: &str, type_ids: &[ValueKind], args: &[Value]) -> PolycallResult<Value> {
        Ok(self
            .inner
            .read()
            .expect("lock poisoned")
            .dispatcher
            .callt(name, type_ids, args)?)
    }

    pub fn callms(&self, name: &str, serialized: &[u8]) -> PolycallResult<Value> {
        Ok(self.inner.read().expect("lock poisoned").dispatcher.callms(name, serialized)?)
    }

    pub fn callmv(&self, name: &str, keys: &[String], values: &[Value]) -> PolycallResult<Value> {
        Ok(self
            .inner
            .read()
            .expect("lock poisoned")
            .dispatcher
            .callmv(name, keys, values)?)
    }

    pub fn call_handle(&self, handle: &Handle, name: &str, args: &[Value]) -> PolycallResult<Value> {
        Ok(self
            .inner
            .read()
            .expect("lock poisoned")
            .dispatcher
            .call_handle(handle, name, args)?)
    }

    /// §6.1 `await`: invoke `name`'s asynchronous vtable entry.
    pub fn await_call(&self, name: &str, args: &[Value]) -> PolycallResult<Future> {
        Ok(self.inner.read().expect("lock poisoned").dispatcher.await_call(name, args)?)
    }

    /// The idiomatic stand-in for `await`'s `on_resolve`/`on_reject`/`ctx`
    /// triple: two owned closures instead of two raw function pointers
    /// plus an opaque context blob.
    pub fn await_future(
        &self,
        future: &Future,
        on_resolve: impl FnOnce(Value) -> Value + Send + 'static,
        on_reject: impl FnOnce(Value) -> Value + Send + 'static,
    ) -> Future {
        future.and_then(on_resolve, on_reject)
    }

    pub fn function(&self, name: &str) -> PolycallResult<FunctionHandle> {
        let inner = self.inner.read().expect("lock poisoned");
        let value = inner
            .loader
            .global_scope()
            .get(name)
            .ok_or_else(|| PolycallError::UnknownFunction(name.to_string()))?;
        let func_ref = value
            .as_function()
            .ok_or_else(|| PolycallError::UnknownFunction(name.to_string()))?;
        Ok(FunctionHandle::new(func_ref))
    }

    pub fn class(&self, name: &str) -> PolycallResult<ClassHandle> {
        let inner = self.inner.read().expect("lock poisoned");
        let value = inner
            .loader
            .global_scope()
            .get(name)
            .ok_or_else(|| PolycallError::UnknownClass(name.to_string()))?;
        let class_ref = value.as_class().ok_or_else(|| PolycallError::UnknownClass(name.to_string()))?;
        Ok(ClassHandle::new(class_ref))
    }

    pub fn object_get(&self, object: &Value, attribute: &str) -> PolycallResult<Value> {
        Ok(handles::object_of(object)?.get(attribute)?)
    }

    pub fn object_set(&self, object: &Value, attribute: &str, value: Value) -> PolycallResult<()> {
        Ok(handles::object_of(object)?.set(attribute, value)?)
    }

    pub fn callv_object(&self, object: &Value, method: &str, args: &[Value]) -> PolycallResult<Value> {
        Ok(handles::object_of(object)?.method_invoke(method, args)?)
    }

    /// §6.3 `inspect`.
    pub fn inspect(&self) -> PolycallResult<String> {
        let handles = self.handles.read().expect("lock poisoned");
        let tree = inspect::inspect_tree(&handles);
        Ok(polycall_serial::to_json_string(&tree)?)
    }

    /// Register (or replace) the continuation run once in the child
    /// after `fork`'s re-init completes.
    pub fn set_fork_callback(&self, callback: Arc<ChildCallback>) {
        self.fork.set_child_callback(callback);
    }

    /// §4.8: quiesce every adapter, tear down and rebuild the loader
    /// stack in both halves of `fork(2)`, then run the child callback
    /// exactly once in the child. Only the Host Loader's state survives
    /// automatically — any dynamically loaded language adapter has to be
    /// re-`load_*`'d by the registered child callback, since this crate
    /// has no general recipe for an arbitrary adapter's post-fork state.
    pub fn fork(&self, ctx: Option<Arc<dyn Any + Send + Sync>>) -> PolycallResult<ForkOutcome> {
        let outcome = self.fork.protected_fork(ctx)?;
        let loader = self.fork.loader();
        let host = self
            .rebuilt_host
            .lock()
            .expect("lock poisoned")
            .take()
            .expect("reinit always sets this before protected_fork returns");
        let dispatcher = Dispatcher::new(loader.clone());
        *self.inner.write().expect("lock poisoned") = Inner { loader, dispatcher, host };
        self.handles.write().expect("lock poisoned").clear();
        Ok(outcome)
    }
}
