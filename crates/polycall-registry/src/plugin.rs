use std::ffi::c_void;

use libloading::Library;

/// Where a Plugin's interface singleton pointer came from — a real
/// `dlopen`ed shared library, or one assembled in-process (the Host
/// Loader's synthetic adapter never touches a `.so`/`.dll`).
enum Source {
    Library(Library),
    Host,
}

/// `(name, library-handle, interface, destructor)` per §4.3. The
/// `interface` pointer is opaque here — `polycall-registry` sits below
/// `polycall-loader` in the dependency order and never names the
/// `Adapter` trait it actually points at; the loader crate reconstitutes
/// the concrete type from the raw pointer it handed `create`/got back
/// from the entry symbol.
pub struct Plugin {
    name: String,
    source: Source,
    singleton: *mut c_void,
    destructor: Option<Box<dyn Fn() + Send + Sync>>,
}

// `*mut c_void` is never dereferenced by this crate, only handed back to
// the caller that knows what it points to; the Library itself is already
// Send+Sync in `libloading`.
unsafe impl Send for Plugin {}
unsafe impl Sync for Plugin {}

impl Plugin {
    pub(crate) fn from_library(name: String, library: Library, singleton: *mut c_void) -> Plugin {
        Plugin {
            name,
            source: Source::Library(library),
            singleton,
            destructor: None,
        }
    }

    pub(crate) fn from_host(
        name: String,
        singleton: *mut c_void,
        destructor: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> Plugin {
        Plugin {
            name,
            source: Source::Host,
            singleton,
            destructor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, Source::Library(_))
    }

    /// The raw interface pointer this Plugin's entry point (or `create`
    /// caller) produced. Safety: the caller must know the concrete type
    /// it was constructed as.
    pub fn singleton(&self) -> *mut c_void {
        self.singleton
    }

    /// Run the iface-provided destroy callback if one was supplied;
    /// otherwise the plugin is simply unloaded when it is dropped (a
    /// `Library` source closes via `dlclose` on `Drop`).
    pub(crate) fn teardown(&self) {
        if let Some(destructor) = &self.destructor {
            destructor();
        }
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}
