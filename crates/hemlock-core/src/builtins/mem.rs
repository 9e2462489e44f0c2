//! Memory builtins: raw buffer fills/copies, typed-array construction,
//! and explicit release via `free`.

use super::{int_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::heap;
use crate::value::Value;

/// `memset(buf, byte, n)`: fill the first `n` bytes.
pub fn memset(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("memset", args, 3)?;
    let byte = int_arg("memset", args, 1)?;
    let n = int_arg("memset", args, 2)?;
    if !(0..=255).contains(&byte) {
        return throw_msg("memset byte must be in 0..=255");
    }
    if n < 0 {
        return throw_msg("memset length must be non-negative");
    }
    match &args[0] {
        Value::Buffer(b) => {
            let mut buf = b.lock();
            let len = buf.len();
            if n as usize > len {
                return throw_msg(format!(
                    "memset length {} exceeds buffer length {}",
                    n, len
                ));
            }
            for slot in buf.data.iter_mut().take(n as usize) {
                *slot = byte as u8;
            }
            Ok(Value::Null)
        }
        other => throw_msg(format!("memset expects a buffer, got {}", other.type_name())),
    }
}

/// `memcpy(dst, src, n)`: copy `n` bytes between buffers.
pub fn memcpy(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("memcpy", args, 3)?;
    let n = int_arg("memcpy", args, 2)?;
    if n < 0 {
        return throw_msg("memcpy length must be non-negative");
    }
    let n = n as usize;
    let (dst, src) = match (&args[0], &args[1]) {
        (Value::Buffer(d), Value::Buffer(s)) => (d.clone(), s.clone()),
        _ => return throw_msg("memcpy expects two buffers"),
    };
    // Same-handle copies are a no-op; locking twice would deadlock.
    if std::sync::Arc::ptr_eq(&dst, &src) {
        return Ok(Value::Null);
    }
    let data: Vec<u8> = {
        let src = src.lock();
        if n > src.len() {
            return throw_msg(format!(
                "memcpy length {} exceeds source length {}",
                n,
                src.len()
            ));
        }
        src.data[..n].to_vec()
    };
    let mut dst = dst.lock();
    if n > dst.len() {
        return throw_msg(format!(
            "memcpy length {} exceeds destination length {}",
            n,
            dst.len()
        ));
    }
    dst.data[..n].copy_from_slice(&data);
    Ok(Value::Null)
}

/// `free(v)`: explicit release. The payload is emptied and the handle
/// address recorded in the manually-freed set; surviving handles observe
/// the emptied value, and a second free is a no-op.
pub fn free(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("free", args, 1)?;
    let value = &args[0];
    if !matches!(
        value,
        Value::Array(_) | Value::Object(_) | Value::Buffer(_) | Value::Str(_)
    ) {
        return throw_msg(format!("cannot free {}", value.type_name()));
    }
    // Record the release; emptying an already-freed payload again is a
    // no-op observably, so membership never gates the clear below (heap
    // addresses can be reused by later allocations).
    heap::mark_freed(value.heap_addr().unwrap());
    match value {
        Value::Array(a) => a.lock().elements.clear(),
        Value::Object(o) => o.lock().clear(),
        Value::Buffer(b) => b.lock().data.clear(),
        Value::Str(s) => s.lock().replace_data(String::new()),
        _ => unreachable!(),
    }
    Ok(Value::Null)
}

/// `typed_array(t)`: empty array with an element-type constraint;
/// insertions that do not satisfy `t` throw.
pub fn typed_array(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("typed_array", args, 1)?;
    let constraint = match &args[0] {
        Value::Type(t) => t.clone(),
        other => {
            return throw_msg(format!(
                "typed_array expects a type, got {}",
                other.type_name()
            ))
        }
    };
    let array = Value::array(Vec::new());
    if let Value::Array(a) = &array {
        a.lock().elem_type = Some(constraint);
    }
    Ok(array)
}
