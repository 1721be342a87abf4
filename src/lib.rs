//! Polycall: a polyglot function-call runtime.
//!
//! Loads code written in any of several supported language runtimes into a
//! single host process and exposes every loaded symbol — functions,
//! classes, objects, methods — through one uniform calling interface,
//! §6.1's ABI surface. This crate is the facade: it assembles the seven
//! `polycall-*` subcrates (value, reflection, plugin registry, loader
//! core, dispatcher, fork safety, serial interface) behind `Polycall`.

mod abi;
mod config;
mod env;
mod error;
mod handles;
mod inspect;
mod runtime;

pub use abi::PolycallValue;

pub use config::resolve_path as resolve_configuration_path;
pub use env::{configuration_path, script_search_path, CONFIGURATION_PATH_VAR, SCRIPT_PATH_VAR};
pub use error::{PolycallError, PolycallResult};
pub use handles::{ClassHandle, FunctionHandle};
pub use runtime::Polycall;

// Re-export the subcrates' public vocabulary so a caller needs only this
// one crate on their `Cargo.toml` to build adapters, construct Values,
// and drive calls end to end.
pub use polycall_dispatch::{are_adjacent, coerce, DispatchError, DispatchResult, Future};
pub use polycall_fork::{ChildCallback, ForkError, ForkOutcome, ForkResult};
pub use polycall_loader::{
    Adapter, ClassAdapter, FunctionAdapter, Handle, HostAdapter, LoaderError, LoaderResult, NativeFn,
    ObjectAdapter,
};
pub use polycall_reflect::{
    class_metadata, function_metadata, Attribute, Class, Constructor, Context, Function, Method, Object,
    ReflectError, ReflectResult, Scope, Signature, Type, Visibility,
};
pub use polycall_registry::{Plugin, PluginManager, RegistryError, RegistryResult};
pub use polycall_serial::{from_json_str, to_json_string, SerialError, SerialResult};
pub use polycall_value::{
    ClassRef, ExceptionPayload, FunctionRef, FutureRef, ObjectRef, PtrPayload, Value, ValueError, ValueKind,
    ValueResult,
};
