//! Introspection and conversion builtins.

use super::{str_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::value::Value;

/// `typeof(v)`: type name; duck-typed objects report their validated
/// type name.
pub fn type_of(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("typeof", args, 1)?;
    Ok(Value::str(args[0].type_name()))
}

/// `len(v)`: string codepoints, array/buffer length, object field count.
pub fn len(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("len", args, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.lock().char_count() as i64,
        Value::Array(a) => a.lock().len() as i64,
        Value::Buffer(b) => b.lock().len() as i64,
        Value::Object(o) => o.lock().len() as i64,
        other => return throw_msg(format!("len of {}", other.type_name())),
    };
    Ok(Value::int(n))
}

/// `clone(v)`: deep copy.
pub fn clone(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("clone", args, 1)?;
    Ok(args[0].deep_copy())
}

pub fn to_string(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("to_string", args, 1)?;
    Ok(Value::str(args[0].render()))
}

pub fn parse_int(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("parse_int", args, 1)?;
    let text = str_arg("parse_int", args, 0)?;
    let trimmed = text.trim();
    let parsed = if let Some(hex) = trimmed.strip_prefix("0x") {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = trimmed.strip_prefix("0b") {
        i64::from_str_radix(bin, 2)
    } else {
        trimmed.parse::<i64>()
    };
    match parsed {
        Ok(n) => Ok(Value::int(n)),
        Err(_) => throw_msg(format!("cannot parse `{}` as integer", trimmed)),
    }
}

pub fn parse_float(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("parse_float", args, 1)?;
    let text = str_arg("parse_float", args, 0)?;
    match text.trim().parse::<f64>() {
        Ok(f) => Ok(Value::F64(f)),
        Err(_) => throw_msg(format!("cannot parse `{}` as float", text.trim())),
    }
}
