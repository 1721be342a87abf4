//! `metadata()` on every descriptor: a nested `Value::map` tree describing
//! the descriptor's own shape, per the data model's "metadata(d) produces a
//! Value tree" wording. `polycall-serial`'s JSON backend is what the `pc_inspect`
//! surface pipes this through; reflection itself never touches JSON.

use polycall_value::Value;

use crate::attribute::Attribute;
use crate::class::Class;
use crate::constructor::Constructor;
use crate::function::Function;
use crate::method::Method;
use crate::object::Object;
use crate::signature::Signature;
use crate::type_::Type;

fn entry_map(pairs: Vec<(&str, Value)>) -> Value {
    let pairs = pairs
        .into_iter()
        .map(|(k, v)| (Value::string(k), v))
        .collect();
    Value::map(pairs).expect("metadata map construction cannot overflow")
}

fn entry_array(elements: Vec<Value>) -> Value {
    Value::array(elements).expect("metadata array construction cannot overflow")
}

pub fn type_metadata(ty: &Type) -> Value {
    entry_map(vec![
        ("name", Value::string(ty.name.clone())),
        ("kind", Value::string(ty.kind.name())),
        ("hash", Value::string(ty.hash.to_string())),
    ])
}

pub fn signature_metadata(sig: &Signature) -> Value {
    let params = sig
        .params()
        .iter()
        .map(|(name, ty)| {
            entry_map(vec![
                ("name", Value::string(name.clone())),
                ("type", type_metadata(ty)),
            ])
        })
        .collect();
    entry_map(vec![
        ("params", entry_array(params)),
        ("return_type", type_metadata(sig.return_type())),
    ])
}

pub fn attribute_metadata(attr: &Attribute) -> Value {
    entry_map(vec![
        ("name", Value::string(attr.name.clone())),
        ("type", type_metadata(&attr.ty)),
        ("visibility", Value::string(attr.visibility.to_string())),
    ])
}

pub fn constructor_metadata(ctor: &Constructor) -> Value {
    let params = ctor
        .params
        .iter()
        .map(|(name, ty)| {
            entry_map(vec![
                ("name", Value::string(name.clone())),
                ("type", type_metadata(ty)),
            ])
        })
        .collect();
    entry_map(vec![
        ("params", entry_array(params)),
        ("visibility", Value::string(ctor.visibility.to_string())),
    ])
}

pub fn function_metadata(func: &Function) -> Value {
    entry_map(vec![
        ("name", Value::string(func.name().to_string())),
        ("hash", Value::string(func.hash().to_string())),
        ("signature", signature_metadata(func.signature())),
        ("is_async", Value::bool(func.is_async())),
        ("ref_count", Value::long(func.ref_count() as i64)),
    ])
}

pub fn method_metadata(method: &Method) -> Value {
    entry_map(vec![
        ("name", Value::string(method.name.clone())),
        ("owner", Value::string(method.owner.to_string())),
        ("signature", signature_metadata(&method.signature)),
        ("visibility", Value::string(method.visibility.to_string())),
        ("is_async", Value::bool(method.is_async)),
    ])
}

pub fn class_metadata(class: &Class) -> Value {
    let attributes = class.attributes().iter().map(attribute_metadata).collect();
    let static_attributes = class
        .static_attributes()
        .iter()
        .map(attribute_metadata)
        .collect();
    let methods = class.methods().iter().map(method_metadata).collect();
    let constructors = class.constructors().iter().map(constructor_metadata).collect();
    entry_map(vec![
        ("name", Value::string(class.name().to_string())),
        ("hash", Value::string(class.hash().to_string())),
        ("visibility", Value::string(class.visibility().to_string())),
        ("sealed", Value::bool(class.is_sealed())),
        ("attributes", entry_array(attributes)),
        ("static_attributes", entry_array(static_attributes)),
        ("methods", entry_array(methods)),
        ("constructors", entry_array(constructors)),
    ])
}

pub fn object_metadata(object: &Object) -> Value {
    entry_map(vec![
        ("class", Value::string(object.class().name().to_string())),
        ("ref_count", Value::long(object.ref_count() as i64)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::Visibility;
    use polycall_value::ValueKind;

    #[test]
    fn type_metadata_round_trips_name_and_kind() {
        let ty = Type::primitive(ValueKind::Int);
        let meta = type_metadata(&ty);
        let map = meta.as_map();
        let (_, name_val) = map.iter().find(|(k, _)| k.as_str() == "name").unwrap();
        assert_eq!(name_val.as_str(), "int");
    }

    #[test]
    fn attribute_metadata_carries_visibility() {
        let attr = Attribute::new("x", Type::primitive(ValueKind::Bool), Visibility::Private);
        let meta = attribute_metadata(&attr);
        let map = meta.as_map();
        let (_, vis) = map.iter().find(|(k, _)| k.as_str() == "visibility").unwrap();
        assert_eq!(vis.as_str(), "private");
    }
}
