//! End-to-end exercises of the `Polycall` facade against natively
//! registered functions — the one adapter this crate owns outright
//! (§4.7's Host Loader), since real language adapters are out of scope
//! per §1. These mirror §8's scenarios as closely as the Host surface
//! allows: S1/S2 (positional call, native callback calling back into the
//! dispatcher), S3 (Future chaining), S4 (map-by-serial).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use polycall::{Polycall, Signature, Type, Value, ValueKind};

fn sig(ret: ValueKind, params: &[(&str, ValueKind)]) -> Signature {
    params
        .iter()
        .fold(Signature::new(Type::primitive(ret)), |s, (name, kind)| {
            s.with_param(*name, Type::primitive(*kind))
        })
}

#[test]
fn positional_call_multiplies_two_longs() {
    let runtime = Polycall::initialize().unwrap();
    runtime
        .register(
            "multiply",
            sig(ValueKind::Long, &[("a", ValueKind::Long), ("b", ValueKind::Long)]),
            Box::new(|args| Ok(Value::long(args[0].as_long() * args[1].as_long()))),
        )
        .unwrap();

    let result = runtime.call("multiply", &[Value::long(5), Value::long(15)]).unwrap();
    assert_eq!(result.kind(), ValueKind::Long);
    assert_eq!(result.as_long(), 75);
}

#[test]
fn native_callback_can_call_back_into_the_dispatcher() {
    let runtime = Polycall::initialize().unwrap();
    runtime
        .register(
            "sum_callback",
            sig(ValueKind::Int, &[("a", ValueKind::Int), ("b", ValueKind::Int)]),
            Box::new(|args| Ok(Value::int((args[0].as_long() + args[1].as_long()) as i32))),
        )
        .unwrap();

    // Stands in for a guest adapter's `c_callback`: a native routine that
    // re-enters the Dispatcher to invoke another registered function,
    // exercising §5's reentrancy guarantee.
    let runtime_for_callback = runtime.clone();
    runtime
        .register(
            "c_callback",
            sig(ValueKind::Int, &[("a", ValueKind::Int), ("b", ValueKind::Int)]),
            Box::new(move |args| {
                runtime_for_callback
                    .call("sum_callback", args)
                    .map_err(|e| polycall::ReflectError::Invocation {
                        name: "sum_callback".into(),
                        message: e.to_string(),
                    })
            }),
        )
        .unwrap();

    let result = runtime.call("c_callback", &[Value::int(3), Value::int(4)]).unwrap();
    assert_eq!(result.as_long(), 7);
}

#[test]
fn coercion_widens_int_argument_to_declared_long_parameter() {
    let runtime = Polycall::initialize().unwrap();
    runtime
        .register(
            "identity",
            sig(ValueKind::Long, &[("x", ValueKind::Long)]),
            Box::new(|args| Ok(args[0].clone())),
        )
        .unwrap();

    let result = runtime.call("identity", &[Value::int(9)]).unwrap();
    assert_eq!(result.kind(), ValueKind::Long);
    assert_eq!(result.as_long(), 9);
}

#[test]
fn callms_decodes_a_json_named_argument_map() {
    let runtime = Polycall::initialize().unwrap();
    runtime
        .register(
            "hello_boy_await",
            sig(ValueKind::Long, &[("a", ValueKind::Long), ("b", ValueKind::Long)]),
            Box::new(|args| Ok(Value::long(args[0].as_long() + args[1].as_long()))),
        )
        .unwrap();

    let result = runtime.callms("hello_boy_await", br#"{"a":10,"b":2}"#).unwrap();
    assert_eq!(result.as_long(), 12);
}

#[test]
fn callmv_reorders_arguments_by_signature_parameter_name() {
    let runtime = Polycall::initialize().unwrap();
    runtime
        .register(
            "hello_boy_await",
            sig(ValueKind::Long, &[("a", ValueKind::Long), ("b", ValueKind::Long)]),
            Box::new(|args| Ok(Value::long(args[0].as_long() + args[1].as_long()))),
        )
        .unwrap();

    let result = runtime
        .callmv(
            "hello_boy_await",
            &["b".to_string(), "a".to_string()],
            &[Value::long(2), Value::long(10)],
        )
        .unwrap();
    assert_eq!(result.as_long(), 12);
}

#[test]
fn unknown_function_name_is_reported_as_an_error() {
    let runtime = Polycall::initialize().unwrap();
    let err = runtime.call("does_not_exist", &[]).unwrap_err();
    assert!(matches!(err, polycall::PolycallError::Dispatch(_)));
}

#[test]
fn await_future_chains_a_resolved_value_through_on_resolve() {
    let runtime = Polycall::initialize().unwrap();
    let count = Arc::new(AtomicI64::new(0));
    let counter = count.clone();
    let future = runtime.await_future(
        &polycall::Future::resolved(Value::long(34)),
        move |v| {
            counter.store(v.as_long(), Ordering::SeqCst);
            Value::long(155)
        },
        |v| v,
    );
    assert!(future.is_settled());
    assert_eq!(count.load(Ordering::SeqCst), 34);
    future.on_settle(|outcome| assert_eq!(outcome.unwrap().as_long(), 155));
}

#[test]
fn function_handle_reports_signature_metadata() {
    let runtime = Polycall::initialize().unwrap();
    runtime
        .register(
            "multiply",
            sig(ValueKind::Long, &[("a", ValueKind::Long), ("b", ValueKind::Long)]),
            Box::new(|args| Ok(Value::long(args[0].as_long() * args[1].as_long()))),
        )
        .unwrap();

    let handle = runtime.function("multiply").unwrap();
    assert_eq!(handle.size(), 2);
    assert_eq!(handle.return_type(), ValueKind::Long);
    assert_eq!(handle.parameter_type(0), Some(ValueKind::Long));
    assert!(!handle.is_async());
}

#[test]
fn inspect_reports_loaded_handles_as_a_json_document() {
    let runtime = Polycall::initialize().unwrap();
    runtime.load_from_memory("host", "anonymous", &[]).unwrap();
    let report = runtime.inspect().unwrap();
    assert!(report.contains("\"host\""));
}

#[test]
fn destroy_is_idempotent() {
    let runtime = Polycall::initialize().unwrap();
    runtime.destroy().unwrap();
    runtime.destroy().unwrap();
}
