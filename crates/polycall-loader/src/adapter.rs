use std::any::Any;
use std::fmt;
use std::path::Path;

use polycall_reflect::Scope;
use polycall_value::Value;

use crate::error::LoaderResult;

/// Function/Object/Class-level vtable operations (§4.5 tail) are already
/// modeled one layer down, inside `polycall-reflect`, as `FunctionImpl`/
/// `ObjectImpl`/`ClassImpl` — the per-descriptor adapter implementation
/// these descriptors carry. Re-exported here under the names the Adapter
/// Interface table uses so callers reading this crate don't have to go
/// hunting in `polycall-reflect` for them.
pub use polycall_reflect::ClassImpl as ClassAdapter;
pub use polycall_reflect::FunctionImpl as FunctionAdapter;
pub use polycall_reflect::ObjectImpl as ObjectAdapter;

/// The per-language vtable: the top half of §4.5's Adapter Interface
/// table (`initialize`/`execution_path`/`load_from_*`/`clear`/`discover`/
/// `destroy`). One `Adapter` instance represents one loaded language
/// runtime (Python, a WASM engine, the Host).
///
/// `load_from_*` return adapter-owned opaque data (`Box<dyn Any + Send +
/// Sync>`) rather than a raw handle pointer — the Rust encoding of "an
/// adapter-owned Handle" the spec describes, since the adapter alone
/// knows the concrete shape of what it loaded.
pub trait Adapter: fmt::Debug + Send + Sync {
    fn tag(&self) -> &str;

    fn initialize(&self, config: Option<&Value>) -> LoaderResult<()>;

    fn execution_path(&self, path: &Path) -> LoaderResult<()>;

    fn load_from_file(&self, paths: &[std::path::PathBuf]) -> LoaderResult<Box<dyn Any + Send + Sync>>;

    fn load_from_memory(&self, name: &str, buffer: &[u8]) -> LoaderResult<Box<dyn Any + Send + Sync>>;

    fn load_from_package(&self, path: &Path) -> LoaderResult<Box<dyn Any + Send + Sync>>;

    /// Release a previously loaded Handle's adapter-owned data.
    fn clear(&self, raw: Box<dyn Any + Send + Sync>);

    /// Populate `scope` with the Functions/Classes found in `raw`.
    fn discover(&self, raw: &(dyn Any + Send + Sync), scope: &Scope) -> LoaderResult<()>;

    /// Tear down any adapters this one pulled in transitively. Default is
    /// a no-op; only adapters that themselves host nested loaders (rare)
    /// need to override it.
    fn unload_children(&self) {}

    /// Tear down the runtime itself. Called at most once (the Loader
    /// Core's destroy map enforces this).
    fn destroy(&self);

    /// Let a live adapter quiesce before the process forks. Default is a
    /// no-op; adapters with thread-local scheduler state override it.
    fn fork_prepare(&self) {}
}
