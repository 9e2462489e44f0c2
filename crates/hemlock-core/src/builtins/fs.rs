//! Filesystem builtins.

use std::sync::Arc;

use super::{str_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::handles::FileHandle;
use crate::value::Value;
use parking_lot::Mutex;

/// `open(path, mode)` with C-style modes (`r`, `w`, `a`, `r+`, ...).
pub fn open(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("open", args, 2)?;
    let path = str_arg("open", args, 0)?;
    let mode = str_arg("open", args, 1)?;
    match FileHandle::open(&path, &mode) {
        Ok(handle) => Ok(Value::File(Arc::new(Mutex::new(handle)))),
        Err(e) => throw_msg(e),
    }
}
