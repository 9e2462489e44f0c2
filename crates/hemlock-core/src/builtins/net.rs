//! Networking builtins.

use std::sync::Arc;

use super::{int_arg, want_args};
use crate::context::{throw_msg, Context, Exec};
use crate::handles::SocketHandle;
use crate::value::Value;
use parking_lot::Mutex;

const AF_INET: i64 = 2;
const SOCK_STREAM: i64 = 1;
const SOCK_DGRAM: i64 = 2;

/// `socket(AF_INET, SOCK_STREAM | SOCK_DGRAM)`. IPv4 only.
pub fn socket(_ctx: &mut Context, args: &[Value]) -> Exec<Value> {
    want_args("socket", args, 2)?;
    let domain = int_arg("socket", args, 0)?;
    let kind = int_arg("socket", args, 1)?;
    if domain != AF_INET {
        return throw_msg("only AF_INET sockets are supported");
    }
    let handle = match kind {
        SOCK_STREAM => SocketHandle::new_tcp(),
        SOCK_DGRAM => SocketHandle::new_udp(),
        _ => return throw_msg("socket type must be SOCK_STREAM or SOCK_DGRAM"),
    };
    Ok(Value::Socket(Arc::new(Mutex::new(handle))))
}
