//! Tagged, refcounted dynamic value container.
//!
//! Every cross-boundary argument and result in a polyglot call flows through
//! [`Value`]. See the crate-level design notes in `SPEC_FULL.md` §[C1] for
//! the rationale behind using `Arc<RwLock<_>>` as the backing cell.

mod error;
mod exception;
mod handles;
mod kind;
mod ptr;
mod stringify;
mod value;

pub use error::{ValueError, ValueResult};
pub use exception::ExceptionPayload;
pub use handles::{ClassRef, FunctionRef, FutureRef, ObjectRef};
pub use kind::ValueKind;
pub use ptr::PtrPayload;
pub use stringify::{display_string, stringify, StringifyResult};
pub use value::{Value, ValueCell, MAX_DEPTH};

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::Arc;

    #[derive(Debug)]
    struct DummyFunction(&'static str);
    impl FunctionRef for DummyFunction {
        fn name(&self) -> &str {
            self.0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn round_trip_primitives() {
        let v = Value::int(42);
        assert_eq!(v.kind(), ValueKind::Int);
        assert_eq!(v.as_long(), 42);

        let copied = v.copy().unwrap();
        assert!(copied.compare(&v));
        assert_eq!(copied.as_long(), 42);
    }

    #[test]
    fn refcount_never_negative_and_reference_is_shallow() {
        let v = Value::string("hi");
        assert_eq!(v.ref_count(), 1);
        let r = v.reference();
        // reference() does not bump v's own Arc, it wraps a clone of the cell.
        assert_eq!(v.ref_count(), 2);
        let deref = r.dereference().unwrap();
        assert!(deref.compare(&v));
        drop(r);
        drop(deref);
        assert_eq!(v.ref_count(), 1);
    }

    #[test]
    fn destroying_a_reference_does_not_destroy_the_original() {
        let v = Value::int(7);
        let r = v.reference();
        r.destroy();
        assert_eq!(v.as_long(), 7);
    }

    #[test]
    fn array_deep_copy_is_independent() {
        let inner = Value::array(vec![Value::int(1), Value::int(2)]).unwrap();
        let outer = Value::array(vec![inner.clone()]).unwrap();
        let copied = outer.copy().unwrap();
        assert!(copied.compare(&outer));

        // Mutating-by-replacement: build a fresh outer array that reuses the
        // original `inner` Arc and confirm the deep copy does not share it.
        let items = copied.as_array();
        let copied_inner = &items[0];
        assert!(copied_inner.compare(&inner));
    }

    #[test]
    fn kind_mismatch_returns_sentinel_not_panic() {
        let v = Value::string("nope");
        assert_eq!(v.as_long(), 0);
        assert_eq!(v.as_bool(), false);
    }

    #[test]
    fn stringify_composites() {
        let arr = Value::array(vec![Value::int(1), Value::int(2)]).unwrap();
        let s = stringify(&arr, None);
        assert_eq!(s, StringifyResult::RequiredLen(5)); // "[1,2]"

        let mut buf = [0u8; 3];
        let truncated = stringify(&arr, Some(&mut buf));
        assert_eq!(truncated, StringifyResult::Written(3));
        assert_eq!(&buf, b"[1,");
    }

    #[test]
    fn function_value_erases_the_descriptor_type() {
        let f: Arc<dyn FunctionRef> = Arc::new(DummyFunction("multiply"));
        let v = Value::function(Arc::clone(&f));
        let back = v.as_function().unwrap();
        assert_eq!(back.name(), "multiply");
    }
}
