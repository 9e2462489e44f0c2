//! Array methods, including the higher-order `map`/`filter`/`reduce`.
//!
//! Callback exceptions propagate and abort the traversal. Methods that
//! insert enforce the element-type constraint of typed arrays.

use super::{clamp_slice, int_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::interp::call_function;
use crate::types;
use crate::value::{ArrayRef, Value};

pub fn call(ctx: &mut Context, receiver: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
    let handle = match receiver {
        Value::Array(a) => a.clone(),
        _ => unreachable!("array dispatch"),
    };

    match name {
        "length" => {
            want_args("array.length", &args, 0)?;
            Ok(Value::int(handle.lock().len() as i64))
        }

        "push" => {
            want_args("array.push", &args, 1)?;
            let value = args.into_iter().next().unwrap();
            check_constraint(&handle, &value)?;
            let mut arr = handle.lock();
            arr.elements.push(value);
            Ok(Value::int(arr.len() as i64))
        }
        "pop" => {
            want_args("array.pop", &args, 0)?;
            Ok(handle.lock().elements.pop().unwrap_or(Value::Null))
        }
        "shift" => {
            want_args("array.shift", &args, 0)?;
            let mut arr = handle.lock();
            if arr.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(arr.elements.remove(0))
            }
        }
        "unshift" => {
            want_args("array.unshift", &args, 1)?;
            let value = args.into_iter().next().unwrap();
            check_constraint(&handle, &value)?;
            let mut arr = handle.lock();
            arr.elements.insert(0, value);
            Ok(Value::int(arr.len() as i64))
        }

        "insert" => {
            want_args("array.insert", &args, 2)?;
            let i = int_arg("array.insert", &args, 0)?;
            let value = args[1].clone();
            check_constraint(&handle, &value)?;
            let mut arr = handle.lock();
            if i < 0 || i as usize > arr.len() {
                return throw_msg(format!(
                    "insert index {} out of bounds (length {})",
                    i,
                    arr.len()
                ));
            }
            arr.elements.insert(i as usize, value);
            Ok(Value::int(arr.len() as i64))
        }
        "remove" => {
            want_args("array.remove", &args, 1)?;
            let i = int_arg("array.remove", &args, 0)?;
            let mut arr = handle.lock();
            if i < 0 || i as usize >= arr.len() {
                return throw_msg(format!(
                    "remove index {} out of bounds (length {})",
                    i,
                    arr.len()
                ));
            }
            Ok(arr.elements.remove(i as usize))
        }

        "find" => {
            want_args("array.find", &args, 1)?;
            let needle = &args[0];
            let arr = handle.lock();
            let found = arr
                .elements
                .iter()
                .position(|v| v.equals(needle))
                .map(|i| i as i64)
                .unwrap_or(-1);
            Ok(Value::int(found))
        }
        "contains" => {
            want_args("array.contains", &args, 1)?;
            let needle = &args[0];
            Ok(Value::Bool(
                handle.lock().elements.iter().any(|v| v.equals(needle)),
            ))
        }

        "slice" => {
            want_args("array.slice", &args, 2)?;
            let start = int_arg("array.slice", &args, 0)?;
            let end = int_arg("array.slice", &args, 1)?;
            let arr = handle.lock();
            let (s, e) = clamp_slice(start, end, arr.len());
            Ok(Value::array(arr.elements[s..e].to_vec()))
        }

        "join" => {
            want_args("array.join", &args, 1)?;
            let delim = match &args[0] {
                Value::Str(s) => s.lock().data.clone(),
                other => {
                    return throw_msg(format!(
                        "join delimiter must be a string, got {}",
                        other.type_name()
                    ))
                }
            };
            let rendered: Vec<String> =
                handle.lock().elements.iter().map(Value::render).collect();
            Ok(Value::str(rendered.join(&delim)))
        }

        "join_as_string" => {
            want_args("array.join_as_string", &args, 0)?;
            let elements = handle.lock().elements.clone();
            let mut bytes = Vec::with_capacity(elements.len());
            for element in &elements {
                match element {
                    Value::Rune(c) => {
                        let mut buf = [0u8; 4];
                        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                    v if v.is_integer() => {
                        let b = v.as_i64();
                        if !(0..=255).contains(&b) {
                            return throw_msg("join_as_string byte out of range");
                        }
                        bytes.push(b as u8);
                    }
                    other => {
                        return throw_msg(format!(
                            "join_as_string expects runes or bytes, got {}",
                            other.type_name()
                        ))
                    }
                }
            }
            match String::from_utf8(bytes) {
                Ok(s) => Ok(Value::str(s)),
                Err(_) => throw_msg("join_as_string produced invalid UTF-8"),
            }
        }

        "concat" => {
            want_args("array.concat", &args, 1)?;
            let other = match &args[0] {
                Value::Array(a) => a.lock().elements.clone(),
                other => {
                    return throw_msg(format!(
                        "concat expects an array, got {}",
                        other.type_name()
                    ))
                }
            };
            let mut combined = handle.lock().elements.clone();
            combined.extend(other);
            Ok(Value::array(combined))
        }

        "reverse" => {
            want_args("array.reverse", &args, 0)?;
            handle.lock().elements.reverse();
            Ok(receiver.clone())
        }

        "first" => {
            want_args("array.first", &args, 0)?;
            Ok(handle.lock().elements.first().cloned().unwrap_or(Value::Null))
        }
        "last" => {
            want_args("array.last", &args, 0)?;
            Ok(handle.lock().elements.last().cloned().unwrap_or(Value::Null))
        }
        "clear" => {
            want_args("array.clear", &args, 0)?;
            handle.lock().elements.clear();
            Ok(Value::Null)
        }

        "map" => {
            want_args("array.map", &args, 1)?;
            let callback = args.into_iter().next().unwrap();
            let snapshot = handle.lock().elements.clone();
            let mut mapped = Vec::with_capacity(snapshot.len());
            for element in snapshot {
                mapped.push(call_function(ctx, &callback, vec![element], None, None)?);
            }
            Ok(Value::array(mapped))
        }
        "filter" => {
            want_args("array.filter", &args, 1)?;
            let callback = args.into_iter().next().unwrap();
            let snapshot = handle.lock().elements.clone();
            let mut kept = Vec::new();
            for element in snapshot {
                let verdict =
                    call_function(ctx, &callback, vec![element.clone()], None, None)?;
                if verdict.truthy() {
                    kept.push(element);
                }
            }
            Ok(Value::array(kept))
        }
        "reduce" => {
            if args.is_empty() || args.len() > 2 {
                return throw_msg(format!(
                    "array.reduce expects 1 or 2 arguments, got {}",
                    args.len()
                ));
            }
            let mut args = args.into_iter();
            let callback = args.next().unwrap();
            let init = args.next();
            let snapshot = handle.lock().elements.clone();
            let mut iter = snapshot.into_iter();
            let mut acc = match init {
                Some(v) => v,
                None => match iter.next() {
                    Some(v) => v,
                    None => return throw_msg("reduce of empty array with no initial value"),
                },
            };
            for element in iter {
                acc = call_function(ctx, &callback, vec![acc, element], None, None)?;
            }
            Ok(acc)
        }

        other => throw_msg(format!("array has no method `{}`", other)),
    }
}

fn check_constraint(handle: &ArrayRef, value: &Value) -> Exec<()> {
    let constraint = handle.lock().elem_type.clone();
    if let Some(constraint) = constraint {
        if !types::satisfies(value, &constraint) {
            return throw_msg(format!(
                "typed array expects {}, got {}",
                constraint.render(),
                value.type_name()
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Output;
    use crate::types::{TypeKind, TypeValue};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn ctx() -> Context {
        let out: Output = Arc::new(Mutex::new(std::io::sink()));
        Context::new(out)
    }

    fn ints(ns: &[i64]) -> Value {
        Value::array(ns.iter().map(|&n| Value::int(n)).collect())
    }

    #[test]
    fn pop_on_empty_returns_null() {
        let v = call(&mut ctx(), &ints(&[]), "pop", vec![]).unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn push_returns_new_length() {
        let arr = ints(&[1]);
        let v = call(&mut ctx(), &arr, "push", vec![Value::int(2)]).unwrap();
        assert!(matches!(v, Value::I32(2)));
    }

    #[test]
    fn find_returns_minus_one_when_absent() {
        let arr = ints(&[1, 2, 3]);
        let v = call(&mut ctx(), &arr, "find", vec![Value::int(2)]).unwrap();
        assert!(matches!(v, Value::I32(1)));
        let v = call(&mut ctx(), &arr, "find", vec![Value::int(9)]).unwrap();
        assert!(matches!(v, Value::I32(-1)));
    }

    #[test]
    fn double_reverse_restores_order() {
        let arr = ints(&[1, 2, 3]);
        call(&mut ctx(), &arr, "reverse", vec![]).unwrap();
        call(&mut ctx(), &arr, "reverse", vec![]).unwrap();
        if let Value::Array(a) = &arr {
            let elems = a.lock().elements.clone();
            assert!(elems[0].equals(&Value::int(1)));
            assert!(elems[2].equals(&Value::int(3)));
        }
    }

    #[test]
    fn slice_clamps() {
        let arr = ints(&[1, 2, 3]);
        let v = call(
            &mut ctx(),
            &arr,
            "slice",
            vec![Value::int(-5), Value::int(99)],
        )
        .unwrap();
        if let Value::Array(a) = v {
            assert_eq!(a.lock().len(), 3);
        } else {
            panic!("expected array");
        }
    }

    #[test]
    fn typed_array_rejects_mismatched_push() {
        let arr = ints(&[]);
        if let Value::Array(a) = &arr {
            a.lock().elem_type = Some(TypeValue::Kind(TypeKind::I32));
        }
        assert!(call(&mut ctx(), &arr, "push", vec![Value::int(1)]).is_ok());
        assert!(call(&mut ctx(), &arr, "push", vec![Value::str("x")]).is_err());
    }

    #[test]
    fn join_renders_elements() {
        let arr = Value::array(vec![Value::int(1), Value::str("a")]);
        let v = call(&mut ctx(), &arr, "join", vec![Value::str("-")]).unwrap();
        assert_eq!(v.render(), "1-a");
    }

    #[test]
    fn ascii_bytes_round_trip_via_join_as_string() {
        let bytes: Vec<Value> = "hemlock".bytes().map(Value::U8).collect();
        let arr = Value::array(bytes);
        let v = call(&mut ctx(), &arr, "join_as_string", vec![]).unwrap();
        assert_eq!(v.render(), "hemlock");
    }
}
