//! Process and environment builtins.

use super::{str_arg, want_args};
use crate::context::{throw_msg, Context, Control, Exec};
use crate::value::Value;

pub fn getenv(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("getenv", args, 1)?;
    let name = str_arg("getenv", args, 0)?;
    match std::env::var(&name) {
        Ok(value) => Ok(Value::str(value)),
        Err(_) => Ok(Value::Null),
    }
}

pub fn setenv(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("setenv", args, 2)?;
    let name = str_arg("setenv", args, 0)?;
    let value = str_arg("setenv", args, 1)?;
    if name.is_empty() || name.contains('=') {
        return throw_msg(format!("invalid environment variable name `{}`", name));
    }
    std::env::set_var(name, value);
    Ok(Value::Null)
}

pub fn unsetenv(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("unsetenv", args, 1)?;
    let name = str_arg("unsetenv", args, 0)?;
    std::env::remove_var(name);
    Ok(Value::Null)
}

/// `exit(code?)`: unwind everything and terminate the process.
pub fn exit(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    let code = match args.len() {
        0 => 0,
        1 if args[0].is_integer() => args[0].as_i64() as i32,
        _ => return throw_msg("exit expects an optional integer code"),
    };
    Err(Control::Exit(code))
}

/// `panic(message?)`: fatal, uncatchable. Prints the message and the
/// stack, terminates nonzero.
pub fn panic(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    let message = match args.first() {
        Some(v) => v.render(),
        None => "explicit panic".to_string(),
    };
    Err(Control::Panic(message))
}

/// `assert(cond, message?)`: throws when the condition is falsy.
pub fn assert(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    if args.is_empty() || args.len() > 2 {
        return throw_msg(format!("assert expects 1 or 2 arguments, got {}", args.len()));
    }
    if args[0].truthy() {
        return Ok(Value::Null);
    }
    let message = match args.get(1) {
        Some(v) => format!("assertion failed: {}", v.render()),
        None => "assertion failed".to_string(),
    };
    throw_msg(message)
}
