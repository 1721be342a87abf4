//! Dynamic adapter library loading: resolves a plugin name and search
//! path to a live interface implementation, handles the `X_M[d]` /
//! `X_M_impl_interface_singleton` name-mangling rules, and tracks plugin
//! lifetimes (registration order, teardown).

mod error;
mod locate;
mod manager;
mod plugin;

pub use error::{RegistryError, RegistryResult};
pub use locate::{entry_symbol_name, library_file_name, resolve_library_directory};
pub use manager::PluginManager;
pub use plugin::Plugin;
