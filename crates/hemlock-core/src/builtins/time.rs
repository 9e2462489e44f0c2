//! Time builtins.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{int_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::value::Value;

/// `time_ms()`: milliseconds since the Unix epoch.
pub fn time_ms(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("time_ms", args, 0)?;
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    Ok(Value::I64(ms))
}

/// `sleep(ms)`: block the calling task.
pub fn sleep(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("sleep", args, 1)?;
    let ms = int_arg("sleep", args, 0)?;
    if ms < 0 {
        return throw_msg("sleep duration must be non-negative");
    }
    std::thread::sleep(Duration::from_millis(ms as u64));
    Ok(Value::Null)
}
