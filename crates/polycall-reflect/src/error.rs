use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("descriptor '{0}' is sealed and can no longer be mutated")]
    Sealed(String),

    #[error("adapter invocation failed for '{name}': {message}")]
    Invocation { name: String, message: String },

    #[error("'{name}' has no asynchronous implementation")]
    NotAsync { name: String },

    #[error("symbol '{0}' not found")]
    NotFound(String),

    #[error("'{name}' is already registered")]
    AlreadyRegistered { name: String },
}

pub type ReflectResult<T> = Result<T, ReflectError>;
