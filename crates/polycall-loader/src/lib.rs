//! Loader Core, Adapter Interface, and the Host Loader: the layer that
//! turns a tag + a load call into a live, discovered set of Functions and
//! Classes, with lazy per-adapter initialization and strict
//! reverse-order destruction.

mod adapter;
mod core;
mod error;
mod handle;
mod host;

pub use adapter::{Adapter, ClassAdapter, FunctionAdapter, ObjectAdapter};
pub use core::LoaderCore;
pub use error::{LoaderError, LoaderResult};
pub use handle::Handle;
pub use host::{HostAdapter, NativeFn};
