use thiserror::Error;

/// The facade's unified result type. Every subcrate error arrives here
/// via `#[from]`; `Polycall`'s own methods add a handful of facade-level
/// variants for lookups the subcrates have no vocabulary for (an ABI
/// caller asking for a function or class that was never registered).
#[derive(Debug, Error)]
pub enum PolycallError {
    #[error("function '{0}' not found")]
    UnknownFunction(String),

    #[error("class '{0}' not found")]
    UnknownClass(String),

    #[error("value is not an object")]
    NotAnObject,

    #[error("already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Value(#[from] polycall_value::ValueError),

    #[error(transparent)]
    Reflect(#[from] polycall_reflect::ReflectError),

    #[error(transparent)]
    Registry(#[from] polycall_registry::RegistryError),

    #[error(transparent)]
    Loader(#[from] polycall_loader::LoaderError),

    #[error(transparent)]
    Dispatch(#[from] polycall_dispatch::DispatchError),

    #[error(transparent)]
    Fork(#[from] polycall_fork::ForkError),

    #[error(transparent)]
    Serial(#[from] polycall_serial::SerialError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type PolycallResult<T> = Result<T, PolycallError>;
