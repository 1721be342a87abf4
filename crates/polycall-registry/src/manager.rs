use std::ffi::c_void;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use libloading::Library;
use rustc_hash::FxHashMap;

use crate::error::{RegistryError, RegistryResult};
use crate::locate::{entry_symbol_name, library_file_name, resolve_library_directory};
use crate::plugin::Plugin;

type EntryFn = unsafe extern "C" fn() -> *mut c_void;

/// Maps plugin names to live interface implementations, tracking
/// registration order so `destroy` can tear everything down in reverse.
/// `name` is the manager's own tag (the `M` half of the `X_M[d]` /
/// `X_M_impl_interface_singleton` mangling rules).
pub struct PluginManager {
    name: String,
    plugins: RwLock<FxHashMap<String, Arc<Plugin>>>,
    order: Mutex<Vec<String>>,
}

impl PluginManager {
    pub fn new(name: impl Into<String>) -> PluginManager {
        PluginManager {
            name: name.into(),
            plugins: RwLock::new(FxHashMap::default()),
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load adapter `adapter_name`'s shared library, resolve its entry
    /// symbol, call it once with zero arguments, and register the
    /// resulting interface pointer as a Plugin.
    pub fn initialize(
        &self,
        adapter_name: &str,
        env_var: &str,
        default_path: &Path,
    ) -> RegistryResult<Arc<Plugin>> {
        if self.plugins.read().expect("lock poisoned").contains_key(adapter_name) {
            return Err(RegistryError::AlreadyRegistered(adapter_name.to_string()));
        }

        let directory = resolve_library_directory(env_var, default_path);
        let file_name = library_file_name(adapter_name, &self.name);
        let path = directory.join(file_name);

        let library = unsafe { Library::new(&path) }.map_err(|source| RegistryError::Load {
            path: path.clone(),
            source,
        })?;

        let symbol_name = entry_symbol_name(adapter_name, &self.name);
        let singleton = unsafe {
            let entry: libloading::Symbol<EntryFn> =
                library.get(symbol_name.as_bytes()).map_err(|source| RegistryError::Symbol {
                    symbol: symbol_name.clone(),
                    path: path.clone(),
                    source,
                })?;
            entry()
        };

        log::info!("loaded adapter '{adapter_name}' from {}", path.display());

        let plugin = Arc::new(Plugin::from_library(adapter_name.to_string(), library, singleton));
        self.register(adapter_name, plugin.clone())?;
        Ok(plugin)
    }

    /// Register an already-constructed interface (the Host Loader's
    /// synthetic adapter never goes through `dlopen`).
    pub fn create(
        &self,
        name: &str,
        singleton: *mut c_void,
        destructor: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> RegistryResult<Arc<Plugin>> {
        if self.plugins.read().expect("lock poisoned").contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        let plugin = Arc::new(Plugin::from_host(name.to_string(), singleton, destructor));
        self.register(name, plugin.clone())?;
        Ok(plugin)
    }

    fn register(&self, name: &str, plugin: Arc<Plugin>) -> RegistryResult<()> {
        self.plugins.write().expect("lock poisoned").insert(name.to_string(), plugin);
        self.order.lock().expect("lock poisoned").push(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Plugin>> {
        self.plugins.read().expect("lock poisoned").get(name).cloned()
    }

    /// All registered plugins, in registration order.
    pub fn iterate(&self) -> Vec<Arc<Plugin>> {
        let plugins = self.plugins.read().expect("lock poisoned");
        self.order
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter_map(|name| plugins.get(name).cloned())
            .collect()
    }

    /// Unregister and tear down a single plugin.
    pub fn clear(&self, name: &str) -> RegistryResult<()> {
        let plugin = self
            .plugins
            .write()
            .expect("lock poisoned")
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        self.order.lock().expect("lock poisoned").retain(|n| n != name);
        plugin.teardown();
        Ok(())
    }

    /// Tear down every plugin in reverse registration order.
    pub fn destroy(&self) {
        let order: Vec<String> = self.order.lock().expect("lock poisoned").drain(..).rev().collect();
        let mut plugins = self.plugins.write().expect("lock poisoned");
        for name in order {
            if let Some(plugin) = plugins.remove(&name) {
                plugin.teardown();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_then_clear() {
        let manager = PluginManager::new("polycall");
        let plugin = manager.create("host", std::ptr::null_mut(), None).unwrap();
        assert_eq!(plugin.name(), "host");
        assert!(manager.get("host").is_some());
        manager.clear("host").unwrap();
        assert!(manager.get("host").is_none());
    }

    #[test]
    fn destroy_tears_down_in_reverse_order() {
        let manager = PluginManager::new("polycall");
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let log = log.clone();
            let tag = tag.to_string();
            manager
                .create(
                    &tag,
                    std::ptr::null_mut(),
                    Some(Box::new(move || log.lock().unwrap().push(tag.clone()))),
                )
                .unwrap();
        }
        manager.destroy();
        assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
    }
}
