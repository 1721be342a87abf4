use std::any::Any;
use std::sync::{Arc, RwLock};

use polycall_value::Value;
use rustc_hash::FxHashMap;

use crate::error::{ReflectError, ReflectResult};

/// A named mapping from symbol name to Value. Owns the Values it holds —
/// dropping a Scope (or removing an entry) releases exactly the reference
/// the Scope held, same as any other `Value` clone.
///
/// Readers during dispatch and writers during load share one `RwLock`,
/// which is the reader/writer discipline the concurrency model calls for:
/// many concurrent `call`s can resolve names while no load is in
/// progress, and a load excludes readers only for the duration of the
/// merge.
#[derive(Default)]
pub struct Scope {
    symbols: RwLock<FxHashMap<String, Value>>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    pub fn define(&self, name: impl Into<String>, value: Value) -> ReflectResult<()> {
        let name = name.into();
        let mut guard = self.symbols.write().expect("scope lock poisoned");
        if guard.contains_key(&name) {
            return Err(ReflectError::AlreadyRegistered { name });
        }
        guard.insert(name, value);
        Ok(())
    }

    /// Overwrite-or-insert, used only by the merge step that folds a
    /// Handle's Context into the adapter's aggregate Context — ordinary
    /// `define` rejects redefinition (the dispatcher's "shadowing is not
    /// automatic" rule).
    pub fn replace(&self, name: impl Into<String>, value: Value) {
        self.symbols
            .write()
            .expect("scope lock poisoned")
            .insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.symbols.read().expect("scope lock poisoned").get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.read().expect("scope lock poisoned").contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.symbols.read().expect("scope lock poisoned").keys().cloned().collect()
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.symbols.write().expect("scope lock poisoned").remove(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.read().expect("scope lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A Scope plus a back-pointer to the Loader that produced it. The
/// back-pointer is type-erased (`Arc<dyn Any + Send + Sync>`) because
/// naming the concrete Loader type here would put `polycall-reflect`
/// downstream of `polycall-loader`, inverting the dependency order; the
/// loader crate downcasts it back with `Any::downcast_ref`.
pub struct Context {
    pub scope: Arc<Scope>,
    loader: Arc<dyn Any + Send + Sync>,
}

impl Context {
    pub fn new(loader: Arc<dyn Any + Send + Sync>) -> Context {
        Context {
            scope: Arc::new(Scope::new()),
            loader,
        }
    }

    pub fn loader_as<T: 'static>(&self) -> Option<&T> {
        self.loader.downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_get() {
        let scope = Scope::new();
        scope.define("pi", Value::double(3.14)).unwrap();
        assert_eq!(scope.get("pi").unwrap().as_double(), 3.14);
    }

    #[test]
    fn redefine_is_an_error() {
        let scope = Scope::new();
        scope.define("x", Value::int(1)).unwrap();
        assert!(scope.define("x", Value::int(2)).is_err());
    }
}
