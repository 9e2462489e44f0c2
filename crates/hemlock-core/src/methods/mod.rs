//! Heap method dispatch: per-kind method tables consulted by name.
//!
//! Errors raised here are routed through the exception substrate, never
//! process exit.

mod array;
mod channel;
mod file;
mod object;
mod socket;
mod string;

use crate::context::{throw_msg, Context, Exec};
use crate::value::Value;

/// Invoke `receiver.name(args)` for the non-object heap kinds (object
/// fields holding functions are handled by the evaluator first).
pub fn dispatch(
    ctx: &mut Context,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
) -> Exec<Value> {
    match receiver {
        Value::Str(_) => string::call(ctx, receiver, name, args),
        Value::Array(_) => array::call(ctx, receiver, name, args),
        Value::Object(_) => object::call(ctx, receiver, name, args),
        Value::Channel(_) => channel::call(ctx, receiver, name, args),
        Value::File(_) => file::call(ctx, receiver, name, args),
        Value::Socket(_) => socket::call(ctx, receiver, name, args),
        Value::Buffer(_) => match property(receiver, name) {
            Some(v) if args.is_empty() => Ok(v),
            _ => throw_msg(format!("buffer has no method `{}`", name)),
        },
        other => throw_msg(format!(
            "{} has no method `{}`",
            other.type_name(),
            name
        )),
    }
}

/// Property reads (`a.length`, `f.closed`, ...). Returns None when the
/// kind has no such property, letting the caller report the error.
pub fn property(receiver: &Value, name: &str) -> Option<Value> {
    match (receiver, name) {
        (Value::Str(s), "length") => Some(Value::int(s.lock().char_count() as i64)),
        (Value::Str(s), "byte_length") => Some(Value::int(s.lock().byte_len() as i64)),

        (Value::Array(a), "length") => Some(Value::int(a.lock().len() as i64)),
        (Value::Array(a), "capacity") => Some(Value::int(a.lock().capacity() as i64)),

        (Value::Buffer(b), "length") => Some(Value::int(b.lock().len() as i64)),
        (Value::Buffer(b), "capacity") => Some(Value::int(b.lock().data.capacity() as i64)),

        (Value::Channel(c), "length") => Some(Value::int(c.len() as i64)),
        (Value::Channel(c), "capacity") => Some(Value::int(c.capacity() as i64)),
        (Value::Channel(c), "closed") => Some(Value::Bool(c.is_closed())),

        (Value::File(f), "path") => Some(Value::str(f.lock().path.clone())),
        (Value::File(f), "mode") => Some(Value::str(f.lock().mode.clone())),
        (Value::File(f), "closed") => Some(Value::Bool(f.lock().is_closed())),

        (Value::Socket(s), "closed") => Some(Value::Bool(s.lock().is_closed())),

        (Value::Task(t), "id") => Some(Value::I64(t.id() as i64)),
        (Value::Task(t), "state") => Some(Value::str(t.phase().name())),
        (Value::Task(t), "detached") => Some(Value::Bool(t.is_detached())),
        (Value::Task(t), "joined") => Some(Value::Bool(t.is_joined())),

        _ => None,
    }
}

// ── Shared argument helpers ─────────────────────────────────────────

pub(crate) fn want_args(what: &str, args: &[Value], n: usize) -> Exec<()> {
    if args.len() == n {
        Ok(())
    } else {
        throw_msg(format!("{} expects {} arguments, got {}", what, n, args.len()))
    }
}

pub(crate) fn int_arg(what: &str, args: &[Value], i: usize) -> Exec<i64> {
    match args.get(i) {
        Some(v) if v.is_integer() => Ok(v.as_i64()),
        Some(v) => throw_msg(format!(
            "{}: argument {} must be an integer, got {}",
            what,
            i + 1,
            v.type_name()
        )),
        None => throw_msg(format!("{}: missing argument {}", what, i + 1)),
    }
}

pub(crate) fn str_arg(what: &str, args: &[Value], i: usize) -> Exec<String> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s.lock().data.clone()),
        Some(v) => throw_msg(format!(
            "{}: argument {} must be a string, got {}",
            what,
            i + 1,
            v.type_name()
        )),
        None => throw_msg(format!("{}: missing argument {}", what, i + 1)),
    }
}

/// Python-style clamp for slice bounds: negative and overflowing bounds
/// clamp to the valid range, and an inverted range is empty.
pub(crate) fn clamp_slice(start: i64, end: i64, len: usize) -> (usize, usize) {
    let len = len as i64;
    let s = start.clamp(0, len);
    let e = end.clamp(0, len);
    (s as usize, e.max(s) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_slice_handles_negative_and_overflow() {
        assert_eq!(clamp_slice(-1, 1_000_000, 5), (0, 5));
        assert_eq!(clamp_slice(1, 3, 5), (1, 3));
        assert_eq!(clamp_slice(4, 2, 5), (4, 4));
        assert_eq!(clamp_slice(9, 12, 5), (5, 5));
    }

    #[test]
    fn string_properties() {
        let s = Value::str("héllo");
        assert!(matches!(property(&s, "length"), Some(Value::I32(5))));
        assert!(matches!(property(&s, "byte_length"), Some(Value::I32(6))));
        assert!(property(&s, "missing").is_none());
    }
}
