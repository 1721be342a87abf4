use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("adapter '{0}' is not registered")]
    UnknownAdapter(String),

    #[error("adapter '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("failed to load '{path}' via adapter '{tag}': {message}")]
    Load {
        tag: String,
        path: PathBuf,
        message: String,
    },

    #[error("adapter '{tag}' discover failed: {message}")]
    Discover { tag: String, message: String },

    #[error("symbol '{0}' already defined by a different adapter")]
    DuplicateSymbol(String),

    #[error(transparent)]
    Registry(#[from] polycall_registry::RegistryError),

    #[error(transparent)]
    Reflect(#[from] polycall_reflect::ReflectError),

    #[error(transparent)]
    Serial(#[from] polycall_serial::SerialError),

    #[error("malformed configuration document: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type LoaderResult<T> = Result<T, LoaderError>;
