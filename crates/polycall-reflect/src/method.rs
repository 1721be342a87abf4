use std::fmt;
use std::sync::Arc;

use polycall_value::{ObjectRef, Value};

use crate::error::ReflectResult;
use crate::hash::DescriptorHash;
use crate::signature::Signature;
use crate::visibility::Visibility;

/// Adapter-owned implementation behind a [`Method`]. Distinct from
/// [`crate::function::FunctionImpl`] only in that it receives the
/// receiver object, per the Adapter Interface's
/// `method_invoke`/`method_await` operations.
pub trait MethodImpl: fmt::Debug + Send + Sync {
    fn invoke(&self, receiver: &Arc<dyn ObjectRef>, args: &[Value]) -> ReflectResult<Value>;

    fn invoke_async(&self, receiver: &Arc<dyn ObjectRef>, args: &[Value]) -> ReflectResult<Value> {
        let _ = (receiver, args);
        Err(crate::error::ReflectError::NotAsync {
            name: "<method>".to_string(),
        })
    }
}

/// An instance method on a Class.
#[derive(Clone)]
pub struct Method {
    pub owner: DescriptorHash,
    pub name: String,
    pub signature: Signature,
    pub visibility: Visibility,
    pub is_async: bool,
    implementation: Arc<dyn MethodImpl>,
}

impl Method {
    pub fn new(
        owner: DescriptorHash,
        name: impl Into<String>,
        signature: Signature,
        visibility: Visibility,
        is_async: bool,
        implementation: Arc<dyn MethodImpl>,
    ) -> Method {
        Method {
            owner,
            name: name.into(),
            signature,
            visibility,
            is_async,
            implementation,
        }
    }

    pub fn invoke(&self, receiver: &Arc<dyn ObjectRef>, args: &[Value]) -> ReflectResult<Value> {
        self.implementation.invoke(receiver, args)
    }

    pub fn invoke_async(
        &self,
        receiver: &Arc<dyn ObjectRef>,
        args: &[Value],
    ) -> ReflectResult<Value> {
        if !self.is_async {
            return Err(crate::error::ReflectError::NotAsync {
                name: self.name.clone(),
            });
        }
        self.implementation.invoke_async(receiver, args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("is_async", &self.is_async)
            .finish()
    }
}
