//! Reflection model: typed descriptors (Type, Signature, Function, Class,
//! Object, Method, Attribute, Constructor) plus the Scope/Context pair that
//! ties a set of loaded symbols back to the Loader that produced them.
//!
//! Adapters supply the behavior behind each descriptor through a small
//! "vtable" trait (`TypeImpl`, `FunctionImpl`, `MethodImpl`, `ObjectImpl`,
//! `ClassImpl`); the descriptor itself only owns identity, signature, and
//! bookkeeping (refcounts, seal state).

mod attribute;
mod class;
mod constructor;
mod error;
mod function;
mod hash;
mod metadata;
mod method;
mod object;
mod scope;
mod signature;
mod type_;
mod visibility;

pub use attribute::Attribute;
pub use class::{Class, ClassImpl};
pub use constructor::Constructor;
pub use error::{ReflectError, ReflectResult};
pub use function::{Function, FunctionImpl};
pub use hash::DescriptorHash;
pub use metadata::{
    attribute_metadata, class_metadata, constructor_metadata, function_metadata, method_metadata,
    object_metadata, signature_metadata, type_metadata,
};
pub use method::{Method, MethodImpl};
pub use object::{Object, ObjectImpl};
pub use scope::{Context, Scope};
pub use signature::Signature;
pub use type_::{builtin_types, Type, TypeImpl};
pub use visibility::Visibility;

#[cfg(test)]
mod tests {
    use super::*;
    use polycall_value::{Value, ValueKind};
    use std::sync::Arc;

    #[derive(Debug)]
    struct EchoClass;
    impl ClassImpl for EchoClass {
        fn static_get(&self, _name: &str) -> ReflectResult<Value> {
            Ok(Value::null())
        }
        fn static_set(&self, _name: &str, _value: Value) -> ReflectResult<()> {
            Ok(())
        }
        fn instantiate(
            &self,
            _ctor: &Constructor,
            _args: &[Value],
        ) -> ReflectResult<Arc<dyn ObjectImpl>> {
            Ok(Arc::new(EchoObject))
        }
    }

    #[derive(Debug)]
    struct EchoObject;
    impl ObjectImpl for EchoObject {
        fn get(&self, _attribute: &str) -> ReflectResult<Value> {
            Ok(Value::int(42))
        }
        fn set(&self, _attribute: &str, _value: Value) -> ReflectResult<()> {
            Ok(())
        }
    }

    #[test]
    fn class_seals_after_discover_and_rejects_further_mutation() {
        let class = Arc::new(Class::new(
            "Echo",
            Visibility::Public,
            vec![Constructor::new(vec![], Visibility::Public)],
            Arc::new(EchoClass),
        ));
        class
            .insert_attribute(Attribute::new("x", Type::primitive(ValueKind::Int), Visibility::Public))
            .unwrap();
        class.seal();
        assert!(class
            .insert_attribute(Attribute::new("y", Type::primitive(ValueKind::Int), Visibility::Public))
            .is_err());
    }

    #[test]
    fn new_instance_resolves_constructor_by_arity() {
        let class = Arc::new(Class::new(
            "Echo",
            Visibility::Public,
            vec![Constructor::new(vec![], Visibility::Public)],
            Arc::new(EchoClass),
        ));
        class.seal();
        let obj = class.new_instance(&[]).unwrap();
        assert_eq!(obj.get("anything").unwrap().as_long(), 42);
    }

    #[test]
    fn metadata_tree_reports_class_name() {
        let class = Class::new(
            "Echo",
            Visibility::Public,
            vec![],
            Arc::new(EchoClass),
        );
        let meta = class_metadata(&class);
        let map = meta.as_map();
        let (_, name) = map.iter().find(|(k, _)| k.as_str() == "name").unwrap();
        assert_eq!(name.as_str(), "Echo");
    }
}
