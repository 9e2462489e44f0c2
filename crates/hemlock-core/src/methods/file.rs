//! File methods. Host I/O errors surface as thrown strings carrying the
//! underlying system error.

use super::{int_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::value::Value;

pub fn call(ctx: &mut Context, receiver: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
    let _ = ctx;
    let handle = match receiver {
        Value::File(f) => f.clone(),
        _ => unreachable!("file dispatch"),
    };

    match name {
        "read" => {
            let n = match args.len() {
                0 => None,
                1 => {
                    let n = int_arg("file.read", &args, 0)?;
                    if n < 0 {
                        return throw_msg("read length must be non-negative");
                    }
                    Some(n as usize)
                }
                n => {
                    return throw_msg(format!("file.read expects 0 or 1 arguments, got {}", n))
                }
            };
            let bytes = handle.lock().read(n).or_else(|e| throw_msg(e))?;
            Ok(Value::str(String::from_utf8_lossy(&bytes).into_owned()))
        }
        "write" => {
            want_args("file.write", &args, 1)?;
            let bytes = match &args[0] {
                Value::Str(s) => s.lock().data.clone().into_bytes(),
                Value::Buffer(b) => b.lock().data.clone(),
                other => {
                    return throw_msg(format!(
                        "file.write expects a string or buffer, got {}",
                        other.type_name()
                    ))
                }
            };
            let written = handle.lock().write(&bytes).or_else(|e| throw_msg(e))?;
            Ok(Value::int(written as i64))
        }
        "seek" => {
            want_args("file.seek", &args, 1)?;
            let pos = int_arg("file.seek", &args, 0)?;
            if pos < 0 {
                return throw_msg("seek position must be non-negative");
            }
            let new_pos = handle.lock().seek(pos as u64).or_else(|e| throw_msg(e))?;
            Ok(Value::int(new_pos as i64))
        }
        "tell" => {
            want_args("file.tell", &args, 0)?;
            let pos = handle.lock().tell().or_else(|e| throw_msg(e))?;
            Ok(Value::int(pos as i64))
        }
        "close" => {
            want_args("file.close", &args, 0)?;
            handle.lock().close();
            Ok(Value::Null)
        }
        other => throw_msg(format!("file has no method `{}`", other)),
    }
}
