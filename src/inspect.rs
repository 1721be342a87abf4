//! §6.3: `inspect()` builds a `Value::map` tree keyed by adapter tag,
//! then each tag's list of Handles, then each Handle's function/class
//! records — reusing Reflection's own `metadata()` builders rather than
//! walking descriptor fields by hand.

use std::collections::HashMap;

use polycall_loader::Handle;
use polycall_reflect::{class_metadata, function_metadata, Class, Function};
use polycall_value::{Value, ValueKind};

fn handle_metadata(handle: &Handle) -> Value {
    let scope = handle.scope();
    let mut functions = Vec::new();
    let mut classes = Vec::new();
    for name in scope.names() {
        let Some(value) = scope.get(&name) else { continue };
        match value.kind() {
            ValueKind::Function => {
                if let Some(func_ref) = value.as_function() {
                    if let Some(func) = func_ref.as_any().downcast_ref::<Function>() {
                        functions.push(function_metadata(func));
                    }
                }
            }
            ValueKind::Class => {
                if let Some(class_ref) = value.as_class() {
                    if let Some(class) = class_ref.as_any().downcast_ref::<Class>() {
                        classes.push(class_metadata(class));
                    }
                }
            }
            _ => {}
        }
    }
    Value::map(vec![
        (Value::string("id"), Value::long(handle.id() as i64)),
        (Value::string("functions"), Value::array(functions).expect("bounded by loaded symbol count")),
        (Value::string("classes"), Value::array(classes).expect("bounded by loaded symbol count")),
    ])
    .expect("handle metadata map construction cannot overflow")
}

/// `tag -> [handle metadata, ...]`, per the `Handle` tracking table
/// `Polycall` keeps (`polycall-loader` itself does not retain issued
/// Handles once a `load_*` call returns them).
pub(crate) fn inspect_tree(handles: &HashMap<String, Vec<Handle>>) -> Value {
    let pairs = handles
        .iter()
        .map(|(tag, list)| {
            let entries = list.iter().map(handle_metadata).collect();
            (
                Value::string(tag.clone()),
                Value::array(entries).expect("bounded by loaded handle count"),
            )
        })
        .collect();
    Value::map(pairs).expect("inspect map construction cannot overflow")
}
