//! String methods. Indexing is codepoint-based unless the name says
//! `byte`.

use super::{clamp_slice, int_arg, str_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::json;
use crate::value::Value;

pub fn call(ctx: &mut Context, receiver: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
    let _ = ctx;
    let handle = match receiver {
        Value::Str(s) => s.clone(),
        _ => unreachable!("string dispatch"),
    };

    match name {
        "length" => {
            want_args("string.length", &args, 0)?;
            Ok(Value::int(handle.lock().char_count() as i64))
        }
        "byte_length" => {
            want_args("string.byte_length", &args, 0)?;
            Ok(Value::int(handle.lock().byte_len() as i64))
        }

        "char_at" => {
            want_args("string.char_at", &args, 1)?;
            let i = int_arg("string.char_at", &args, 0)?;
            let data = handle.lock().data.clone();
            match usize::try_from(i).ok().and_then(|i| data.chars().nth(i)) {
                Some(c) => Ok(Value::Rune(c)),
                None => throw_msg(format!("char_at index {} out of bounds", i)),
            }
        }
        "byte_at" => {
            want_args("string.byte_at", &args, 1)?;
            let i = int_arg("string.byte_at", &args, 0)?;
            let guard = handle.lock();
            match usize::try_from(i)
                .ok()
                .and_then(|i| guard.data.as_bytes().get(i).copied())
            {
                Some(b) => Ok(Value::U8(b)),
                None => throw_msg(format!("byte_at index {} out of bounds", i)),
            }
        }

        "substr" => {
            want_args("string.substr", &args, 2)?;
            let start = int_arg("string.substr", &args, 0)?;
            let len = int_arg("string.substr", &args, 1)?;
            let data = handle.lock().data.clone();
            let count = data.chars().count() as i64;
            let (s, e) = clamp_slice(start, start.saturating_add(len.max(0)), count as usize);
            Ok(Value::str(char_range(&data, s, e)))
        }
        "slice" => {
            want_args("string.slice", &args, 2)?;
            let start = int_arg("string.slice", &args, 0)?;
            let end = int_arg("string.slice", &args, 1)?;
            let data = handle.lock().data.clone();
            let count = data.chars().count();
            let (s, e) = clamp_slice(start, end, count);
            Ok(Value::str(char_range(&data, s, e)))
        }

        "find" => {
            want_args("string.find", &args, 1)?;
            let needle = str_arg("string.find", &args, 0)?;
            let data = handle.lock().data.clone();
            match data.find(&needle) {
                // Byte offset back to codepoint index.
                Some(pos) => Ok(Value::int(data[..pos].chars().count() as i64)),
                None => Ok(Value::int(-1)),
            }
        }
        "contains" => {
            want_args("string.contains", &args, 1)?;
            let needle = str_arg("string.contains", &args, 0)?;
            Ok(Value::Bool(handle.lock().data.contains(&needle)))
        }

        "split" => {
            want_args("string.split", &args, 1)?;
            let delim = str_arg("string.split", &args, 0)?;
            let data = handle.lock().data.clone();
            let parts: Vec<Value> = if delim.is_empty() {
                data.chars().map(|c| Value::str(c.to_string())).collect()
            } else {
                data.split(&delim).map(Value::str).collect()
            };
            Ok(Value::array(parts))
        }

        "trim" => {
            want_args("string.trim", &args, 0)?;
            Ok(Value::str(handle.lock().data.trim().to_string()))
        }
        "to_upper" => {
            want_args("string.to_upper", &args, 0)?;
            Ok(Value::str(handle.lock().data.to_uppercase()))
        }
        "to_lower" => {
            want_args("string.to_lower", &args, 0)?;
            Ok(Value::str(handle.lock().data.to_lowercase()))
        }

        "starts_with" => {
            want_args("string.starts_with", &args, 1)?;
            let prefix = str_arg("string.starts_with", &args, 0)?;
            Ok(Value::Bool(handle.lock().data.starts_with(&prefix)))
        }
        "ends_with" => {
            want_args("string.ends_with", &args, 1)?;
            let suffix = str_arg("string.ends_with", &args, 0)?;
            Ok(Value::Bool(handle.lock().data.ends_with(&suffix)))
        }

        "replace" => {
            want_args("string.replace", &args, 2)?;
            let from = str_arg("string.replace", &args, 0)?;
            let to = str_arg("string.replace", &args, 1)?;
            Ok(Value::str(handle.lock().data.replacen(&from, &to, 1)))
        }
        "replace_all" => {
            want_args("string.replace_all", &args, 2)?;
            let from = str_arg("string.replace_all", &args, 0)?;
            let to = str_arg("string.replace_all", &args, 1)?;
            Ok(Value::str(handle.lock().data.replace(&from, &to)))
        }

        "repeat" => {
            want_args("string.repeat", &args, 1)?;
            let n = int_arg("string.repeat", &args, 0)?;
            if n < 0 {
                return throw_msg("repeat count must be non-negative");
            }
            Ok(Value::str(handle.lock().data.repeat(n as usize)))
        }

        "chars" => {
            want_args("string.chars", &args, 0)?;
            let runes: Vec<Value> = handle.lock().data.chars().map(Value::Rune).collect();
            Ok(Value::array(runes))
        }
        "bytes" => {
            want_args("string.bytes", &args, 0)?;
            let bytes: Vec<Value> = handle.lock().data.bytes().map(Value::U8).collect();
            Ok(Value::array(bytes))
        }
        "to_bytes" => {
            want_args("string.to_bytes", &args, 0)?;
            Ok(Value::buffer(handle.lock().data.clone().into_bytes()))
        }

        "deserialize" => {
            want_args("string.deserialize", &args, 0)?;
            let data = handle.lock().data.clone();
            json::parse(&data).or_else(|e| throw_msg(format!("JSON parse error: {}", e)))
        }

        other => throw_msg(format!("string has no method `{}`", other)),
    }
}

/// Substring by codepoint range.
fn char_range(data: &str, start: usize, end: usize) -> String {
    data.chars().skip(start).take(end - start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Output;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn ctx() -> Context {
        let out: Output = Arc::new(Mutex::new(std::io::sink()));
        Context::new(out)
    }

    fn invoke(s: &str, name: &str, args: Vec<Value>) -> Exec<Value> {
        call(&mut ctx(), &Value::str(s), name, args)
    }

    #[test]
    fn slice_clamps_negative_and_overflowing_bounds() {
        let v = invoke("hello", "slice", vec![Value::int(-1), Value::int(1_000_000)]).unwrap();
        assert_eq!(v.render(), "hello");
        let v = invoke("hello", "slice", vec![Value::int(1), Value::int(3)]).unwrap();
        assert_eq!(v.render(), "el");
    }

    #[test]
    fn substr_takes_start_and_len() {
        let v = invoke("hello", "substr", vec![Value::int(1), Value::int(3)]).unwrap();
        assert_eq!(v.render(), "ell");
        let v = invoke("hello", "substr", vec![Value::int(3), Value::int(99)]).unwrap();
        assert_eq!(v.render(), "lo");
    }

    #[test]
    fn find_returns_codepoint_index_or_minus_one() {
        let v = invoke("héllo", "find", vec![Value::str("llo")]).unwrap();
        assert!(matches!(v, Value::I32(2)));
        let v = invoke("héllo", "find", vec![Value::str("zzz")]).unwrap();
        assert!(matches!(v, Value::I32(-1)));
    }

    #[test]
    fn replace_first_vs_all() {
        let v = invoke("aaa", "replace", vec![Value::str("a"), Value::str("b")]).unwrap();
        assert_eq!(v.render(), "baa");
        let v = invoke("aaa", "replace_all", vec![Value::str("a"), Value::str("b")]).unwrap();
        assert_eq!(v.render(), "bbb");
    }

    #[test]
    fn char_at_is_codepoint_indexed() {
        let v = invoke("héllo", "char_at", vec![Value::int(1)]).unwrap();
        assert!(matches!(v, Value::Rune('é')));
        assert!(invoke("hi", "char_at", vec![Value::int(5)]).is_err());
    }

    #[test]
    fn split_and_empty_delimiter() {
        let v = invoke("a,b,c", "split", vec![Value::str(",")]).unwrap();
        if let Value::Array(a) = v {
            assert_eq!(a.lock().len(), 3);
        } else {
            panic!("expected array");
        }
        let v = invoke("ab", "split", vec![Value::str("")]).unwrap();
        if let Value::Array(a) = v {
            assert_eq!(a.lock().len(), 2);
        } else {
            panic!("expected array");
        }
    }

    #[test]
    fn deserialize_rejects_trailing_garbage() {
        assert!(invoke("1 trailing", "deserialize", vec![]).is_err());
        let v = invoke("{\"a\": 1}", "deserialize", vec![]).unwrap();
        assert!(matches!(v, Value::Object(_)));
    }

    #[test]
    fn unknown_method_throws() {
        assert!(invoke("x", "nope", vec![]).is_err());
    }
}
