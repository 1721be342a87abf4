//! Value-type coercion between adjacent numeric kinds, per §4.6.
//!
//! The chain is exactly the one spec.md names:
//! `bool ↔ char ↔ short ↔ int ↔ long ↔ float ↔ double`. Only *adjacent*
//! pairs convert in one step — there is no multi-hop coercion, so a
//! `bool` argument supplied where a `double` parameter is declared is an
//! argument-type failure, not three silent widenings.

use polycall_value::{display_string, Value, ValueKind};

use crate::error::DispatchError;

const NUMERIC_CHAIN: [ValueKind; 7] = [
    ValueKind::Bool,
    ValueKind::Char,
    ValueKind::Short,
    ValueKind::Int,
    ValueKind::Long,
    ValueKind::Float,
    ValueKind::Double,
];

fn chain_index(kind: ValueKind) -> Option<usize> {
    NUMERIC_CHAIN.iter().position(|k| *k == kind)
}

/// True when `a` and `b` are next to each other in the numeric chain.
pub fn are_adjacent(a: ValueKind, b: ValueKind) -> bool {
    match (chain_index(a), chain_index(b)) {
        (Some(i), Some(j)) => i.abs_diff(j) == 1,
        _ => false,
    }
}

/// Coerce `value` to `target`, per the rules in §4.6:
/// - identical kind: no-op (cheap clone of the `Arc`).
/// - any kind to `string`: stringified.
/// - `ptr`: passes through unchanged regardless of target.
/// - `array`/`map`: never implicitly converted.
/// - adjacent numeric pair: widened/narrowed via the host language's
///   natural `as` cast; narrowing that loses data logs a warning and
///   proceeds rather than failing.
/// - anything else: `ArgumentType` failure.
pub fn coerce(value: &Value, target: ValueKind, name: &str, index: usize) -> Result<Value, DispatchError> {
    let from = value.kind();
    if from == target {
        return Ok(value.clone());
    }
    if target == ValueKind::String {
        return Ok(Value::string(display_string(value)));
    }
    if from == ValueKind::Ptr || target == ValueKind::Ptr {
        return Ok(value.clone());
    }
    if from.is_composite() || target.is_composite() {
        return Err(DispatchError::ArgumentType {
            name: name.to_string(),
            index,
            from,
            to: target,
        });
    }
    if from.is_numeric() && target.is_numeric() && are_adjacent(from, target) {
        return Ok(coerce_numeric(value, from, target, name, index));
    }
    Err(DispatchError::ArgumentType {
        name: name.to_string(),
        index,
        from,
        to: target,
    })
}

fn coerce_numeric(value: &Value, from: ValueKind, to: ValueKind, name: &str, index: usize) -> Value {
    use ValueKind::*;
    match (from, to) {
        (Bool, Char) => Value::char(if value.as_bool() { '\u{1}' } else { '\0' }),
        (Char, Bool) => Value::bool(value.as_long() != 0),
        (Char, Short) => {
            let codepoint = value.as_long() as u32;
            let narrowed = codepoint as i16;
            if narrowed as u32 != codepoint {
                log::warn!(
                    "narrowing char->short lost data calling '{name}' argument {index}: {codepoint:#x}"
                );
            }
            Value::short(narrowed)
        }
        (Short, Char) => {
            let raw = value.as_long() as i16 as u16 as u32;
            Value::char(char::from_u32(raw).unwrap_or('\0'))
        }
        (Short, Int) => Value::int(value.as_long() as i32),
        (Int, Short) => {
            let v = value.as_long();
            let narrowed = v as i16;
            if narrowed as i64 != v {
                log::warn!("narrowing int->short lost data calling '{name}' argument {index}: {v}");
            }
            Value::short(narrowed)
        }
        (Int, Long) => Value::long(value.as_long()),
        (Long, Int) => {
            let v = value.as_long();
            let narrowed = v as i32;
            if narrowed as i64 != v {
                log::warn!("narrowing long->int lost data calling '{name}' argument {index}: {v}");
            }
            Value::int(narrowed)
        }
        (Long, Float) => {
            let v = value.as_long();
            let narrowed = v as f32;
            if narrowed as i64 != v {
                log::warn!(
                    "narrowing long->float lost precision calling '{name}' argument {index}: {v}"
                );
            }
            Value::float(narrowed)
        }
        (Float, Long) => {
            let v = value.as_double();
            if v.fract() != 0.0 {
                log::warn!(
                    "narrowing float->long truncates the fractional part calling '{name}' argument {index}: {v}"
                );
            }
            Value::long(v as i64)
        }
        (Float, Double) => Value::double(value.as_double()),
        (Double, Float) => {
            // Rust's `as f32` cast rounds to nearest, ties to even — IEEE
            // 754's default and the host language's own, per the open
            // question in SPEC_FULL.md.
            let v = value.as_double();
            let narrowed = v as f32;
            if narrowed as f64 != v {
                log::warn!(
                    "narrowing double->float lost precision (round-to-nearest-ties-to-even) calling '{name}' argument {index}: {v}"
                );
            }
            Value::float(narrowed)
        }
        _ => unreachable!("coerce_numeric called with non-adjacent pair {from:?} -> {to:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_kind_is_a_no_op() {
        let v = Value::int(7);
        let out = coerce(&v, ValueKind::Int, "f", 0).unwrap();
        assert_eq!(out.as_long(), 7);
    }

    #[test]
    fn any_kind_coerces_to_string() {
        let v = Value::int(7);
        let out = coerce(&v, ValueKind::String, "f", 0).unwrap();
        assert_eq!(out.as_str(), "7");
    }

    #[test]
    fn adjacent_widening_succeeds() {
        let v = Value::int(7);
        let out = coerce(&v, ValueKind::Long, "f", 0).unwrap();
        assert_eq!(out.kind(), ValueKind::Long);
        assert_eq!(out.as_long(), 7);
    }

    #[test]
    fn non_adjacent_numeric_pair_fails() {
        let v = Value::bool(true);
        assert!(coerce(&v, ValueKind::Double, "f", 0).is_err());
    }

    #[test]
    fn array_never_implicitly_converts() {
        let v = Value::array(vec![Value::int(1)]).unwrap();
        assert!(coerce(&v, ValueKind::String, "f", 0).is_err());
    }

    #[test]
    fn ptr_passes_through_regardless_of_target() {
        let v = Value::ptr_external(0xdead, None);
        let out = coerce(&v, ValueKind::Int, "f", 0).unwrap();
        assert_eq!(out.kind(), ValueKind::Ptr);
    }

    #[test]
    fn double_to_float_narrows_with_rounding() {
        let v = Value::double(1.0 / 3.0);
        let out = coerce(&v, ValueKind::Float, "f", 0).unwrap();
        assert_eq!(out.kind(), ValueKind::Float);
    }
}
