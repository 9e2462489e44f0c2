//! Builtin registry: the closed set of native functions and constants
//! installed into the root environment at startup.

mod conc;
mod convert;
mod fs;
mod io;
mod math;
mod mem;
mod net;
mod process;
mod time;

use crate::context::{throw_msg, Exec};
use crate::env::{Env, EnvRef};
use crate::types::{TypeKind, TypeValue};
use crate::value::{Builtin, Value};

/// The builtin table. Closed at startup; no user extension.
static BUILTINS: &[Builtin] = &[
    // I/O
    Builtin { name: "print", func: io::print },
    // Introspection and conversion
    Builtin { name: "typeof", func: convert::type_of },
    Builtin { name: "len", func: convert::len },
    Builtin { name: "clone", func: convert::clone },
    Builtin { name: "to_string", func: convert::to_string },
    Builtin { name: "parse_int", func: convert::parse_int },
    Builtin { name: "parse_float", func: convert::parse_float },
    // Memory
    Builtin { name: "memset", func: mem::memset },
    Builtin { name: "memcpy", func: mem::memcpy },
    Builtin { name: "free", func: mem::free },
    Builtin { name: "typed_array", func: mem::typed_array },
    // Concurrency
    Builtin { name: "channel", func: conc::channel },
    Builtin { name: "spawn", func: conc::spawn },
    Builtin { name: "join", func: conc::join },
    Builtin { name: "detach", func: conc::detach },
    Builtin { name: "select", func: conc::select },
    // Filesystem
    Builtin { name: "open", func: fs::open },
    // Networking
    Builtin { name: "socket", func: net::socket },
    // Math
    Builtin { name: "abs", func: math::abs },
    Builtin { name: "min", func: math::min },
    Builtin { name: "max", func: math::max },
    Builtin { name: "floor", func: math::floor },
    Builtin { name: "ceil", func: math::ceil },
    Builtin { name: "sqrt", func: math::sqrt },
    Builtin { name: "pow", func: math::pow },
    Builtin { name: "random", func: math::random },
    // Time
    Builtin { name: "time_ms", func: time::time_ms },
    Builtin { name: "sleep", func: time::sleep },
    // Process and environment
    Builtin { name: "getenv", func: process::getenv },
    Builtin { name: "setenv", func: process::setenv },
    Builtin { name: "unsetenv", func: process::unsetenv },
    Builtin { name: "exit", func: process::exit },
    Builtin { name: "panic", func: process::panic },
    Builtin { name: "assert", func: process::assert },
];

/// Type-kind constants bound at the root. Calling one constructs or
/// converts (`buffer(64)`, `i32(x)`).
const TYPE_CONSTANTS: &[TypeKind] = &[
    TypeKind::I8,
    TypeKind::I16,
    TypeKind::I32,
    TypeKind::I64,
    TypeKind::U8,
    TypeKind::U16,
    TypeKind::U32,
    TypeKind::U64,
    TypeKind::F32,
    TypeKind::F64,
    TypeKind::Bool,
    TypeKind::String,
    TypeKind::Rune,
    TypeKind::Ptr,
    TypeKind::Buffer,
    TypeKind::Array,
    TypeKind::Object,
    TypeKind::Function,
    TypeKind::File,
    TypeKind::Task,
    TypeKind::Channel,
    TypeKind::Socket,
];

/// Populate the root environment: builtins, type-kind constants, math,
/// socket, and signal constants, and the program `args` array.
pub fn install(root: &EnvRef, program_args: &[String]) {
    for builtin in BUILTINS {
        Env::define(root, builtin.name, Value::Builtin(builtin), true);
    }

    for &kind in TYPE_CONSTANTS {
        Env::define(root, kind.name(), Value::Type(TypeValue::Kind(kind)), true);
    }

    // Math constants
    Env::define(root, "PI", Value::F64(std::f64::consts::PI), true);
    Env::define(root, "E", Value::F64(std::f64::consts::E), true);

    // Socket constants (IPv4 only in this version)
    Env::define(root, "AF_INET", Value::I32(2), true);
    Env::define(root, "SOCK_STREAM", Value::I32(1), true);
    Env::define(root, "SOCK_DGRAM", Value::I32(2), true);

    // Signal constants (delivery is main-thread only)
    Env::define(root, "SIGHUP", Value::I32(1), true);
    Env::define(root, "SIGINT", Value::I32(2), true);
    Env::define(root, "SIGKILL", Value::I32(9), true);
    Env::define(root, "SIGUSR1", Value::I32(10), true);
    Env::define(root, "SIGUSR2", Value::I32(12), true);
    Env::define(root, "SIGTERM", Value::I32(15), true);

    let args: Vec<Value> = program_args.iter().map(Value::str).collect();
    Env::define(root, "args", Value::array(args), false);
}

// ── Shared argument helpers ─────────────────────────────────────────

pub(crate) fn want_args(what: &str, args: &[Value], n: usize) -> Exec<()> {
    if args.len() == n {
        Ok(())
    } else {
        throw_msg(format!("{} expects {} arguments, got {}", what, n, args.len()))
    }
}

pub(crate) fn int_arg(what: &str, args: &[Value], i: usize) -> Exec<i64> {
    match args.get(i) {
        Some(v) if v.is_integer() => Ok(v.as_i64()),
        Some(v) => throw_msg(format!(
            "{}: argument {} must be an integer, got {}",
            what,
            i + 1,
            v.type_name()
        )),
        None => throw_msg(format!("{}: missing argument {}", what, i + 1)),
    }
}

pub(crate) fn str_arg(what: &str, args: &[Value], i: usize) -> Exec<String> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s.lock().data.clone()),
        Some(v) => throw_msg(format!(
            "{}: argument {} must be a string, got {}",
            what,
            i + 1,
            v.type_name()
        )),
        None => throw_msg(format!("{}: missing argument {}", what, i + 1)),
    }
}
