//! Concurrency builtins: channel construction, task lifecycle, select.

use std::sync::Arc;
use std::time::Duration;

use super::{int_arg, want_args};
use crate::channel::{self, Channel};
use crate::context::{throw_msg, Context, Exec};
use crate::task::Task;
use crate::value::{ChannelRef, Value};

/// `channel()` for a rendezvous channel, `channel(n)` for a buffered
/// one.
pub fn channel(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    let capacity = match args.len() {
        0 => 0,
        1 => {
            let n = int_arg("channel", args, 0)?;
            if n < 0 {
                return throw_msg("channel capacity must be non-negative");
            }
            n as usize
        }
        n => return throw_msg(format!("channel expects 0 or 1 arguments, got {}", n)),
    };
    Ok(Value::Channel(Arc::new(Channel::new(capacity))))
}

/// `spawn(fn, args...)`: start a task; arguments are deep-copied for
/// isolation.
pub fn spawn(ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    if args.is_empty() {
        return throw_msg("spawn expects a function");
    }
    let task = Task::spawn(args[0].clone(), &args[1..], ctx.output())?;
    Ok(Value::Task(task))
}

/// `join(t)`: await completion; re-raises a stored exception.
pub fn join(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("join", args, 1)?;
    match &args[0] {
        Value::Task(task) => Task::join(task),
        other => throw_msg(format!("join expects a task, got {}", other.type_name())),
    }
}

/// `detach(t)` marks an existing task detached; `detach(fn, args...)`
/// is the fused spawn-then-detach form. The returned handle keeps the
/// task alive until the caller drops it.
pub fn detach(ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    match args.first() {
        Some(Value::Task(task)) => {
            want_args("detach", args, 1)?;
            Task::detach(task)?;
            Ok(Value::Null)
        }
        Some(Value::Function(_)) => {
            let task = Task::spawn(args[0].clone(), &args[1..], ctx.output())?;
            Task::detach(&task)?;
            Ok(Value::Task(task))
        }
        Some(other) => throw_msg(format!(
            "detach expects a task or function, got {}",
            other.type_name()
        )),
        None => throw_msg("detach expects a task or function"),
    }
}

/// `select(channels, timeout_ms?)`: first ready channel in array order,
/// or null on timeout.
pub fn select(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    if args.is_empty() || args.len() > 2 {
        return throw_msg(format!("select expects 1 or 2 arguments, got {}", args.len()));
    }
    let channels: Vec<ChannelRef> = match &args[0] {
        Value::Array(arr) => {
            let elements = arr.lock().elements.clone();
            let mut channels = Vec::with_capacity(elements.len());
            for element in &elements {
                match element {
                    Value::Channel(c) => channels.push(c.clone()),
                    other => {
                        return throw_msg(format!(
                            "select expects an array of channels, got {}",
                            other.type_name()
                        ))
                    }
                }
            }
            channels
        }
        other => {
            return throw_msg(format!(
                "select expects an array of channels, got {}",
                other.type_name()
            ))
        }
    };
    if channels.is_empty() {
        return throw_msg("select on an empty channel array");
    }
    let timeout = if args.len() == 2 {
        let ms = int_arg("select", args, 1)?;
        if ms < 0 {
            return throw_msg("timeout must be non-negative");
        }
        Some(Duration::from_millis(ms as u64))
    } else {
        None
    };
    channel::select(&channels, timeout)
}
