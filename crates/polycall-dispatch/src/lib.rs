//! Top-level call surfaces: positional, named, serialized and
//! asynchronous invocation by name, plus the numeric coercion table and
//! Future state machine those surfaces share.

mod coerce;
mod dispatcher;
mod error;
mod future;

pub use coerce::{are_adjacent, coerce};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult};
pub use future::Future;
