//! First-class deferred cross-runtime results.
//!
//! Modeled as an explicit `Pending -> {Resolved, Rejected}` state machine
//! with at-most-once settlement, which is the "most consistent reading"
//! of §4.6's Futures paragraph (DESIGN.md Open Question 2). `on_settle`
//! fires synchronously when registered against an already-settled
//! Future, matching "`await_future` on an already-settled Future invokes
//! the supplied continuation synchronously on the current thread."

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use polycall_value::{FutureRef, Value, ValueKind};

const PENDING: u8 = 0;
const RESOLVED: u8 = 1;
const REJECTED: u8 = 2;

type Continuation = Box<dyn FnOnce(Result<Value, Value>) + Send>;

struct FutureInner {
    state: AtomicU8,
    settlement: Mutex<Option<Result<Value, Value>>>,
    callbacks: Mutex<Vec<Continuation>>,
}

/// A pending/resolved/rejected cross-runtime result, shareable across
/// adapters the same way a `Value` is.
pub struct Future(Arc<FutureInner>);

impl Clone for Future {
    fn clone(&self) -> Self {
        Future(Arc::clone(&self.0))
    }
}

impl Future {
    pub fn pending() -> Future {
        Future(Arc::new(FutureInner {
            state: AtomicU8::new(PENDING),
            settlement: Mutex::new(None),
            callbacks: Mutex::new(Vec::new()),
        }))
    }

    pub fn resolved(value: Value) -> Future {
        let f = Future::pending();
        f.resolve(value);
        f
    }

    pub fn rejected(value: Value) -> Future {
        let f = Future::pending();
        f.reject(value);
        f
    }

    /// At-most-once settlement, enforced by a `compare_exchange` on the
    /// state tag. Returns `false` (a no-op) if already settled — "never
    /// both, never neither" per the §8 testable property, modulo a
    /// caller who calls both `resolve` and `reject`, whichever loses the
    /// race is simply dropped.
    fn settle(&self, outcome: Result<Value, Value>) -> bool {
        let target = if outcome.is_ok() { RESOLVED } else { REJECTED };
        if self
            .0
            .state
            .compare_exchange(PENDING, target, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        *self.0.settlement.lock().expect("lock poisoned") = Some(outcome.clone());
        let callbacks = std::mem::take(&mut *self.0.callbacks.lock().expect("lock poisoned"));
        for cb in callbacks {
            cb(outcome.clone());
        }
        true
    }

    pub fn resolve(&self, value: Value) -> bool {
        self.settle(Ok(value))
    }

    pub fn reject(&self, value: Value) -> bool {
        self.settle(Err(value))
    }

    pub fn is_settled(&self) -> bool {
        self.0.state.load(Ordering::Acquire) != PENDING
    }

    /// Register a continuation. Runs synchronously on the calling thread
    /// if already settled; otherwise queued for `resolve`/`reject` to run
    /// on whichever thread the owning adapter settles it from.
    pub fn on_settle(&self, cb: impl FnOnce(Result<Value, Value>) + Send + 'static) {
        if self.is_settled() {
            let settlement = self.0.settlement.lock().expect("lock poisoned").clone();
            if let Some(outcome) = settlement {
                cb(outcome);
            }
            return;
        }
        // Re-check after acquiring the callback queue lock: `resolve`
        // could have settled us between the `is_settled` read above and
        // here. `settle` drains whatever is queued at the moment it
        // fires, so anything pushed after that drain would otherwise
        // wait forever.
        let mut callbacks = self.0.callbacks.lock().expect("lock poisoned");
        if self.is_settled() {
            let settlement = self.0.settlement.lock().expect("lock poisoned").clone();
            drop(callbacks);
            if let Some(outcome) = settlement {
                cb(outcome);
            }
            return;
        }
        callbacks.push(Box::new(cb));
    }

    /// Future composition (§2 C6): produce a new Future whose resolution
    /// is whatever `on_resolve` returns when this one resolves, or whose
    /// rejection is whatever `on_reject` returns when this one rejects —
    /// the chaining behavior scenario S3 exercises.
    pub fn and_then(
        &self,
        on_resolve: impl FnOnce(Value) -> Value + Send + 'static,
        on_reject: impl FnOnce(Value) -> Value + Send + 'static,
    ) -> Future {
        let next = Future::pending();
        let settling = next.clone();
        self.on_settle(move |outcome| match outcome {
            Ok(v) => {
                settling.resolve(on_resolve(v));
            }
            Err(v) => {
                settling.reject(on_reject(v));
            }
        });
        next
    }

    pub fn into_value(self) -> Value {
        Value::future(Arc::new(self) as Arc<dyn FutureRef>)
    }

    /// Extract the Future backing a `future`-kind Value produced by this
    /// crate. Returns `None` for a Value produced by a FutureRef
    /// implementation this crate does not own (the dispatcher treats
    /// that as an unrecognized future implementation, §4.6's `await`
    /// contract only covers Futures this crate mints).
    pub fn from_value(value: &Value) -> Option<Future> {
        if value.kind() != ValueKind::Future {
            return None;
        }
        let future_ref = value.as_future()?;
        future_ref.as_any().downcast_ref::<Future>().cloned()
    }
}

impl fmt::Debug for Future {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl FutureRef for Future {
    fn is_settled(&self) -> bool {
        Future::is_settled(self)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn resolve_runs_queued_callback_exactly_once() {
        let f = Future::pending();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        f.on_settle(move |outcome| {
            assert!(outcome.is_ok());
            fired2.store(true, Ordering::SeqCst);
        });
        assert!(f.resolve(Value::long(75)));
        assert!(fired.load(Ordering::SeqCst));
        // Second resolve/reject is a no-op: at-most-once settlement.
        assert!(!f.resolve(Value::long(1)));
        assert!(!f.reject(Value::null()));
    }

    #[test]
    fn on_settle_fires_synchronously_for_already_settled_future() {
        let f = Future::resolved(Value::long(34));
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        f.on_settle(move |outcome| {
            assert_eq!(outcome.unwrap().as_long(), 34);
            fired2.store(true, Ordering::SeqCst);
        });
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn and_then_chains_to_a_new_future() {
        let f = Future::resolved(Value::long(34));
        let chained = f.and_then(|_| Value::long(155), |v| v);
        assert!(chained.is_settled());
        chained.on_settle(|outcome| assert_eq!(outcome.unwrap().as_long(), 155));
    }

    #[test]
    fn reject_never_calls_the_resolve_continuation() {
        let f = Future::rejected(Value::string("boom"));
        let resolved = Arc::new(AtomicBool::new(false));
        let rejected = Arc::new(AtomicBool::new(false));
        let (r1, r2) = (resolved.clone(), rejected.clone());
        f.on_settle(move |outcome| match outcome {
            Ok(_) => r1.store(true, Ordering::SeqCst),
            Err(_) => r2.store(true, Ordering::SeqCst),
        });
        assert!(!resolved.load(Ordering::SeqCst));
        assert!(rejected.load(Ordering::SeqCst));
    }

    #[test]
    fn round_trips_through_a_value() {
        let f = Future::resolved(Value::long(1));
        let value = f.into_value();
        let back = Future::from_value(&value).expect("future value round-trips");
        assert!(back.is_settled());
    }
}
