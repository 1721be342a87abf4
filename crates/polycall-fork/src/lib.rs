//! Fork-safety trampoline (§4.8): many embedded runtimes keep
//! thread-local scheduler state that cannot safely survive `fork(2)`, so
//! rather than auditing every adapter for fork-safety, `ForkManager`
//! quiesces them, tears the loader stack down, forks, and rebuilds it
//! fresh in both halves before handing control back.

mod error;
mod trampoline;

pub use error::{ForkError, ForkResult};
pub use trampoline::{ChildCallback, ForkManager, ForkOutcome, ReinitFn};
