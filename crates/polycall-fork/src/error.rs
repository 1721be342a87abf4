use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForkError {
    #[error("fork(2) failed: {0}")]
    Fork(#[source] std::io::Error),

    #[error("fork is not supported on this platform")]
    Unsupported,
}

pub type ForkResult<T> = Result<T, ForkError>;
