use std::any::Any;
use std::collections::HashSet;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::ThreadId;

use polycall_reflect::{Context, Scope};
use polycall_registry::PluginManager;
use polycall_value::{Value, ValueKind};
use rustc_hash::FxHashMap;

use crate::adapter::Adapter;
use crate::error::{LoaderError, LoaderResult};
use crate::handle::Handle;

/// Sits atop the Plugin Manager. Owns the initialization-order stack, the
/// destroy map, the per-adapter aggregate Scope, and the global Scope the
/// Dispatcher resolves unqualified names against.
pub struct LoaderCore {
    plugins: PluginManager,
    adapters: RwLock<FxHashMap<String, Arc<dyn Adapter>>>,
    order: Mutex<Vec<String>>,
    destroyed: Mutex<HashSet<usize>>,
    aggregates: RwLock<FxHashMap<String, Arc<Scope>>>,
    global: Arc<Scope>,
    init_thread: Mutex<Option<ThreadId>>,
    next_handle_id: AtomicU64,
}

impl LoaderCore {
    pub fn new(manager_name: impl Into<String>) -> Arc<LoaderCore> {
        Arc::new(LoaderCore {
            plugins: PluginManager::new(manager_name),
            adapters: RwLock::new(FxHashMap::default()),
            order: Mutex::new(Vec::new()),
            destroyed: Mutex::new(HashSet::new()),
            aggregates: RwLock::new(FxHashMap::default()),
            global: Arc::new(Scope::new()),
            init_thread: Mutex::new(None),
            next_handle_id: AtomicU64::new(1),
        })
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn global_scope(&self) -> &Arc<Scope> {
        &self.global
    }

    /// Register an adapter that was constructed in-process (the Host
    /// Loader) rather than `dlopen`ed through the Plugin Manager.
    pub fn register_adapter(&self, adapter: Arc<dyn Adapter>) -> LoaderResult<()> {
        let tag = adapter.tag().to_string();
        let mut adapters = self.adapters.write().expect("lock poisoned");
        if adapters.contains_key(&tag) {
            return Err(LoaderError::AlreadyRegistered(tag));
        }
        adapters.insert(tag, adapter);
        Ok(())
    }

    /// §4.5's `execution_path` vtable entry: tell adapter `tag` about an
    /// additional directory to search for script files, independent of
    /// whether it has been `load_*`-initialized yet.
    pub fn execution_path(&self, tag: &str, path: &Path) -> LoaderResult<()> {
        let adapter = self
            .adapters
            .read()
            .expect("lock poisoned")
            .get(tag)
            .cloned()
            .ok_or_else(|| LoaderError::UnknownAdapter(tag.to_string()))?;
        adapter.execution_path(path)
    }

    /// Resolve adapter `tag`'s shared library via the Plugin Manager
    /// (§4.3's env-var → well-known-symbol → compile-time-default
    /// precedence, under `<MANAGER>_LIBRARY_PATH`) and hand its raw
    /// interface singleton to `build`, which reconstitutes it as a
    /// concrete `Arc<dyn Adapter>` — the one place a caller who actually
    /// knows a dylib's ABI bridges it back into this crate's trait
    /// object. §1 treats everything on the other side of `build` (the
    /// dylib's own FFI shape) as adapter-internal and out of scope here.
    pub fn load_adapter_library(
        self: &Arc<Self>,
        tag: &str,
        default_path: &Path,
        build: impl FnOnce(*mut c_void) -> Arc<dyn Adapter>,
    ) -> LoaderResult<()> {
        if self.adapters.read().expect("lock poisoned").contains_key(tag) {
            return Err(LoaderError::AlreadyRegistered(tag.to_string()));
        }
        let env_var = format!("{}_LIBRARY_PATH", self.plugins.name().to_uppercase());
        let plugin = self.plugins.initialize(tag, &env_var, default_path)?;
        let adapter = build(plugin.singleton());
        self.register_adapter(adapter)
    }

    fn record_init_thread(&self) {
        let mut slot = self.init_thread.lock().expect("lock poisoned");
        let current = std::thread::current().id();
        match *slot {
            None => *slot = Some(current),
            Some(first) if first != current => {
                log::debug!("loader touched from a second thread after initialization");
            }
            _ => {}
        }
    }

    /// First `load_*` call for `tag` triggers its adapter's `initialize`
    /// and records it at the top of the initialization-order stack.
    fn ensure_initialized(&self, tag: &str) -> LoaderResult<Arc<dyn Adapter>> {
        let adapter = self
            .adapters
            .read()
            .expect("lock poisoned")
            .get(tag)
            .cloned()
            .ok_or_else(|| LoaderError::UnknownAdapter(tag.to_string()))?;

        let mut order = self.order.lock().expect("lock poisoned");
        if !order.iter().any(|t| t == tag) {
            self.record_init_thread();
            adapter.initialize(None)?;
            order.push(tag.to_string());
            log::info!("adapter '{tag}' initialized (position {})", order.len());
        }
        Ok(adapter)
    }

    /// The five-step protocol shared by every `load_from_*` entry point.
    fn load(
        self: &Arc<Self>,
        tag: &str,
        do_load: impl FnOnce(&dyn Adapter) -> LoaderResult<Box<dyn Any + Send + Sync>>,
    ) -> LoaderResult<Handle> {
        let adapter = self.ensure_initialized(tag)?;
        let raw = do_load(adapter.as_ref())?;

        let loader_ref: Arc<dyn Any + Send + Sync> = Arc::clone(self) as Arc<dyn Any + Send + Sync>;
        let context = Arc::new(Context::new(loader_ref));

        if let Err(e) = adapter.discover(raw.as_ref(), &context.scope) {
            adapter.clear(raw);
            return Err(e);
        }

        if let Err(e) = self.merge_context(tag, &context) {
            adapter.clear(raw);
            return Err(e);
        }

        let id = self.next_handle_id.fetch_add(1, Ordering::Relaxed);
        Ok(Handle::new(id, tag, adapter, raw, context))
    }

    fn merge_context(&self, tag: &str, context: &Context) -> LoaderResult<()> {
        let aggregate = {
            let mut aggregates = self.aggregates.write().expect("lock poisoned");
            aggregates.entry(tag.to_string()).or_insert_with(|| Arc::new(Scope::new())).clone()
        };
        for name in context.scope.names() {
            let Some(value) = context.scope.get(&name) else { continue };
            aggregate
                .define(&name, value.clone())
                .map_err(|_| LoaderError::DuplicateSymbol(name.clone()))?;
            self.global
                .define(&name, value)
                .map_err(|_| LoaderError::DuplicateSymbol(name))?;
        }
        Ok(())
    }

    pub fn load_from_file(self: &Arc<Self>, tag: &str, paths: &[PathBuf]) -> LoaderResult<Handle> {
        let paths = paths.to_vec();
        self.load(tag, move |adapter| adapter.load_from_file(&paths))
    }

    pub fn load_from_memory(self: &Arc<Self>, tag: &str, name: &str, buffer: &[u8]) -> LoaderResult<Handle> {
        let name = name.to_string();
        let buffer = buffer.to_vec();
        self.load(tag, move |adapter| adapter.load_from_memory(&name, &buffer))
    }

    pub fn load_from_package(self: &Arc<Self>, tag: &str, path: &Path) -> LoaderResult<Handle> {
        let path = path.to_path_buf();
        self.load(tag, move |adapter| adapter.load_from_package(&path))
    }

    /// Parses a manifest document per §6.2: `language_id` (the adapter
    /// tag), `path` (a single script file or a list of them), optional
    /// `execution_paths`, and any other key taken as a nested-config-key
    /// whose value names a child configuration file, resolved relative to
    /// this document's own directory and loaded — recursively — before
    /// this document's own `path` is loaded and so before its `discover`
    /// runs.
    pub fn load_from_configuration(self: &Arc<Self>, path: &Path) -> LoaderResult<Vec<Handle>> {
        let text = std::fs::read_to_string(path)?;
        let doc = polycall_serial::from_json_str(&text)?;
        let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        self.load_configuration_document(&doc, &dir)
    }

    fn load_configuration_document(self: &Arc<Self>, doc: &Value, dir: &Path) -> LoaderResult<Vec<Handle>> {
        const RECOGNIZED: [&str; 3] = ["language_id", "path", "execution_paths"];

        let fields = doc.as_map();
        let field = |key: &str| -> Option<Value> {
            fields.iter().find(|(k, _)| k.as_str() == key).map(|(_, v)| v.clone())
        };

        let language_id = field("language_id")
            .map(|v| v.as_str())
            .ok_or_else(|| LoaderError::Configuration("missing 'language_id' field".to_string()))?;

        let mut handles = Vec::new();

        // Every key other than the three recognized ones is a
        // nested-config-key: its value names a child configuration file,
        // resolved relative to `dir` and loaded fully (including its own
        // nested children) before this document's own `path` is loaded.
        for (key, value) in &fields {
            if RECOGNIZED.contains(&key.as_str().as_str()) {
                continue;
            }
            let child_path = dir.join(value.as_str());
            let child_dir = child_path.parent().unwrap_or(dir).to_path_buf();
            let child_text = std::fs::read_to_string(&child_path)?;
            let child_doc = polycall_serial::from_json_str(&child_text)?;
            handles.extend(self.load_configuration_document(&child_doc, &child_dir)?);
        }

        if let Some(path_value) = field("path") {
            let paths: Vec<PathBuf> = if path_value.kind() == ValueKind::Array {
                path_value.as_array().iter().map(|v| dir.join(v.as_str())).collect()
            } else {
                vec![dir.join(path_value.as_str())]
            };
            if !paths.is_empty() {
                handles.push(self.load_from_file(&language_id, &paths)?);
            }
        }

        // §6.2's `execution_paths`: extra script-search directories,
        // applied once the language_id's adapter exists (registered
        // directly or already `load_from_file`d above) and before any
        // sibling config reads them via a later `discover`.
        if let Some(dirs) = field("execution_paths") {
            for entry in dirs.as_array() {
                self.execution_path(&language_id, &dir.join(entry.as_str()))?;
            }
        }

        Ok(handles)
    }

    fn adapter_identity(&self, tag: &str) -> Option<usize> {
        self.adapters
            .read()
            .expect("lock poisoned")
            .get(tag)
            .map(|a| Arc::as_ptr(a) as *const () as usize)
    }

    /// Tear down adapters this one pulled in transitively, then the
    /// adapter itself, idempotently via the destroy map.
    pub fn destroy_adapter(&self, tag: &str) {
        let Some(key) = self.adapter_identity(tag) else { return };
        {
            let mut destroyed = self.destroyed.lock().expect("lock poisoned");
            if destroyed.contains(&key) {
                return;
            }
            destroyed.insert(key);
        }
        if let Some(adapter) = self.adapters.read().expect("lock poisoned").get(tag).cloned() {
            adapter.unload_children();
            adapter.destroy();
        }
    }

    /// Let every initialized adapter quiesce (§4.8 step 2), in
    /// initialization order, ahead of a `fork(2)`. Adapters that don't
    /// override `Adapter::fork_prepare` are a no-op here.
    pub fn fork_prepare_all(&self) {
        let order = self.order.lock().expect("lock poisoned").clone();
        let adapters = self.adapters.read().expect("lock poisoned");
        for tag in &order {
            if let Some(adapter) = adapters.get(tag) {
                adapter.fork_prepare();
            }
        }
    }

    /// Drain the initialization-order stack top to bottom, destroying
    /// every adapter exactly once, then tear down the Plugin Manager.
    pub fn shutdown(&self) {
        let order: Vec<String> = self.order.lock().expect("lock poisoned").drain(..).rev().collect();
        for tag in order {
            self.destroy_adapter(&tag);
        }
        self.plugins.destroy();
    }
}

impl Drop for LoaderCore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostAdapter;
    use polycall_reflect::Signature;
    use polycall_value::ValueKind;

    #[test]
    fn host_adapter_initializes_first_and_registers_functions() {
        let loader = LoaderCore::new("polycall");
        let host = HostAdapter::new();
        host.register(
            "double",
            Signature::new(polycall_reflect::Type::primitive(ValueKind::Long))
                .with_param("x", polycall_reflect::Type::primitive(ValueKind::Long)),
            Box::new(|args| Ok(Value::long(args[0].as_long() * 2))),
        )
        .unwrap();
        loader.register_adapter(host.clone()).unwrap();

        let handle = loader.load_from_memory("host", "builtin", &[]).unwrap();
        assert_eq!(handle.tag(), "host");
        let func = loader.global_scope().get("double").unwrap();
        let f = func.as_function().unwrap();
        assert_eq!(f.invoke(&[Value::long(21)]).unwrap().as_long(), 42);
    }

    #[test]
    fn redefining_a_name_across_loads_is_an_error() {
        let loader = LoaderCore::new("polycall");
        let host = HostAdapter::new();
        host.register(
            "noop",
            Signature::new(polycall_reflect::Type::primitive(ValueKind::Null)),
            Box::new(|_| Ok(Value::null())),
        )
        .unwrap();
        loader.register_adapter(host.clone()).unwrap();

        loader.load_from_memory("host", "a", &[]).unwrap();
        let second = loader.load_from_memory("host", "b", &[]);
        assert!(second.is_err());
    }
}
