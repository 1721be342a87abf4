use polycall_value::ValueKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("symbol '{0}' not found")]
    SymbolNotFound(String),

    #[error("'{0}' is not a function")]
    NotAFunction(String),

    #[error("'{0}' has no asynchronous implementation")]
    NotAsync(String),

    #[error("calling '{name}': expected {expected} argument(s), got {supplied}")]
    Arity {
        name: String,
        expected: usize,
        supplied: usize,
    },

    #[error("calling '{name}' argument {index}: cannot coerce {from} to {to}")]
    ArgumentType {
        name: String,
        index: usize,
        from: ValueKind,
        to: ValueKind,
    },

    #[error("calling '{name}': no argument supplied for named parameter '{param}'")]
    MissingNamedArgument { name: String, param: String },

    #[error("future already settled")]
    AlreadySettled,

    #[error("future value did not carry a recognized future implementation")]
    UnsupportedFuture,

    #[error(transparent)]
    Loader(#[from] polycall_loader::LoaderError),

    #[error(transparent)]
    Reflect(#[from] polycall_reflect::ReflectError),

    #[error(transparent)]
    Serial(#[from] polycall_serial::SerialError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
