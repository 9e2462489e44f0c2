//! Socket methods (IPv4). Thin wrappers over the socket handle; errors
//! carry the host error string.

use std::sync::Arc;
use std::time::Duration;

use super::{int_arg, str_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::heap::Object;
use crate::value::Value;
use parking_lot::Mutex;

pub fn call(ctx: &mut Context, receiver: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
    let _ = ctx;
    let handle = match receiver {
        Value::Socket(s) => s.clone(),
        _ => unreachable!("socket dispatch"),
    };

    match name {
        "bind" => {
            want_args("socket.bind", &args, 2)?;
            let host = str_arg("socket.bind", &args, 0)?;
            let port = port_arg("socket.bind", &args, 1)?;
            handle.lock().bind(&host, port).or_else(throw_host)?;
            Ok(Value::Null)
        }
        "listen" => {
            let backlog = match args.len() {
                0 => 128,
                1 => int_arg("socket.listen", &args, 0)?.max(0) as u32,
                n => {
                    return throw_msg(format!(
                        "socket.listen expects 0 or 1 arguments, got {}",
                        n
                    ))
                }
            };
            handle.lock().listen(backlog).or_else(throw_host)?;
            Ok(Value::Null)
        }
        "accept" => {
            want_args("socket.accept", &args, 0)?;
            let (peer, _addr) = handle.lock().accept().or_else(throw_host)?;
            Ok(Value::Socket(Arc::new(Mutex::new(peer))))
        }
        "connect" => {
            want_args("socket.connect", &args, 2)?;
            let host = str_arg("socket.connect", &args, 0)?;
            let port = port_arg("socket.connect", &args, 1)?;
            handle.lock().connect(&host, port).or_else(throw_host)?;
            Ok(Value::Null)
        }
        "send" => {
            want_args("socket.send", &args, 1)?;
            let bytes = payload("socket.send", &args[0])?;
            let sent = handle.lock().send(&bytes).or_else(throw_host)?;
            Ok(Value::int(sent as i64))
        }
        "recv" => {
            want_args("socket.recv", &args, 1)?;
            let max = int_arg("socket.recv", &args, 0)?;
            if max <= 0 {
                return throw_msg("recv length must be positive");
            }
            let bytes = handle.lock().recv(max as usize).or_else(throw_host)?;
            Ok(Value::str(String::from_utf8_lossy(&bytes).into_owned()))
        }
        "sendto" => {
            want_args("socket.sendto", &args, 3)?;
            let bytes = payload("socket.sendto", &args[0])?;
            let host = str_arg("socket.sendto", &args, 1)?;
            let port = port_arg("socket.sendto", &args, 2)?;
            let sent = handle
                .lock()
                .sendto(&bytes, &host, port)
                .or_else(throw_host)?;
            Ok(Value::int(sent as i64))
        }
        "recvfrom" => {
            want_args("socket.recvfrom", &args, 1)?;
            let max = int_arg("socket.recvfrom", &args, 0)?;
            if max <= 0 {
                return throw_msg("recvfrom length must be positive");
            }
            let (bytes, addr) = handle.lock().recvfrom(max as usize).or_else(throw_host)?;
            let mut result = Object::new();
            result.set(
                "data".to_string(),
                Value::str(String::from_utf8_lossy(&bytes).into_owned()),
            );
            result.set("addr".to_string(), Value::str(addr));
            Ok(Value::object(result))
        }
        "set_timeout" => {
            want_args("socket.set_timeout", &args, 1)?;
            let ms = int_arg("socket.set_timeout", &args, 0)?;
            let timeout = if ms <= 0 {
                None
            } else {
                Some(Duration::from_millis(ms as u64))
            };
            handle.lock().set_timeout(timeout).or_else(throw_host)?;
            Ok(Value::Null)
        }
        "setsockopt" => {
            want_args("socket.setsockopt", &args, 2)?;
            let option = str_arg("socket.setsockopt", &args, 0)?;
            let enabled = args[1].truthy();
            let mut guard = handle.lock();
            match option.as_str() {
                "reuseaddr" => {
                    guard.set_reuse_addr(enabled).or_else(throw_host)?;
                    Ok(Value::Null)
                }
                "nodelay" => {
                    guard.set_nodelay(enabled).or_else(throw_host)?;
                    Ok(Value::Null)
                }
                other => throw_msg(format!("unsupported socket option `{}`", other)),
            }
        }
        "close" => {
            want_args("socket.close", &args, 0)?;
            handle.lock().close();
            Ok(Value::Null)
        }
        other => throw_msg(format!("socket has no method `{}`", other)),
    }
}

fn port_arg(what: &str, args: &[Value], i: usize) -> Exec<u16> {
    let port = int_arg(what, args, i)?;
    u16::try_from(port).map_err(|_| {
        crate::context::Control::Throw(Value::str(format!("invalid port {}", port)))
    })
}

fn payload(what: &str, value: &Value) -> Exec<Vec<u8>> {
    match value {
        Value::Str(s) => Ok(s.lock().data.clone().into_bytes()),
        Value::Buffer(b) => Ok(b.lock().data.clone()),
        other => throw_msg(format!(
            "{} expects a string or buffer, got {}",
            what,
            other.type_name()
        )),
    }
}

fn throw_host<T>(error: String) -> Exec<T> {
    throw_msg(error)
}
