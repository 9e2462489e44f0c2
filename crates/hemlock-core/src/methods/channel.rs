//! Channel methods: blocking and timed send/recv plus idempotent close.

use std::time::Duration;

use super::{int_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::value::Value;

pub fn call(ctx: &mut Context, receiver: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
    let _ = ctx;
    let channel = match receiver {
        Value::Channel(c) => c.clone(),
        _ => unreachable!("channel dispatch"),
    };

    match name {
        "send" => {
            want_args("channel.send", &args, 1)?;
            channel.send(args.into_iter().next().unwrap())?;
            Ok(Value::Null)
        }
        "recv" => {
            want_args("channel.recv", &args, 0)?;
            Ok(channel.recv())
        }
        "send_timeout" => {
            want_args("channel.send_timeout", &args, 2)?;
            let ms = int_arg("channel.send_timeout", &args, 1)?;
            if ms < 0 {
                return throw_msg("timeout must be non-negative");
            }
            let value = args.into_iter().next().unwrap();
            let sent = channel.send_timeout(value, Duration::from_millis(ms as u64))?;
            Ok(Value::Bool(sent))
        }
        "recv_timeout" => {
            want_args("channel.recv_timeout", &args, 1)?;
            let ms = int_arg("channel.recv_timeout", &args, 0)?;
            if ms < 0 {
                return throw_msg("timeout must be non-negative");
            }
            Ok(channel
                .recv_timeout(Duration::from_millis(ms as u64))
                .unwrap_or(Value::Null))
        }
        "close" => {
            want_args("channel.close", &args, 0)?;
            channel.close();
            Ok(Value::Null)
        }
        other => throw_msg(format!("channel has no method `{}`", other)),
    }
}
