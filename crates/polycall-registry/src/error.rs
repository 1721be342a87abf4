use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to load library at {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("entry symbol '{symbol}' not found in {path}: {source}")]
    Symbol {
        symbol: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("plugin '{0}' not found")]
    NotFound(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
