use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Type-erased handle to a Reflection `Function` descriptor.
///
/// `polycall-value` cannot depend on `polycall-reflect` (the dependency runs
/// the other way: Reflection's `Signature`/`metadata()` hold `Value`s), so a
/// `Value` of kind `function` holds a trait object instead of the concrete
/// descriptor type. This is the same shape as the teacher's
/// `Dynamic::Native(Box<dyn Any + Send + Sync>)` variant, applied to the
/// specific case of a descriptor living one layer up.
pub trait FunctionRef: Debug + Send + Sync {
    fn name(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

/// Type-erased handle to a Reflection `Object`.
pub trait ObjectRef: Debug + Send + Sync {
    fn class_name(&self) -> &str;
    fn as_any(&self) -> &dyn Any;

    /// Same erasure as [`ObjectRef::as_any`], but over the owning `Arc`
    /// rather than a borrow — callers that need to invoke a method taking
    /// `self: &Arc<Self>` on the concrete `Object` (method dispatch bumps
    /// the receiver's refcount for the call's duration) have no other way
    /// back to an owned `Arc<Object>` from a type-erased handle.
    fn as_arc_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Type-erased handle to a Reflection `Class`.
pub trait ClassRef: Debug + Send + Sync {
    fn name(&self) -> &str;
    fn as_any(&self) -> &dyn Any;

    /// See [`ObjectRef::as_arc_any`] — `Class::new_instance` likewise
    /// takes `self: &Arc<Self>`.
    fn as_arc_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Type-erased handle to a Dispatcher `Future`.
pub trait FutureRef: Debug + Send + Sync {
    fn is_settled(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}
