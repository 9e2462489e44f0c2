//! Hemlock runtime.
//!
//! The shared core behind the interpreter and any precompiled frontend:
//! tagged values with refcounted heap payloads, lexical environments
//! with shared closure capture, a tree-walking evaluator, structured
//! exceptions with a LIFO defer stack, pthread-style tasks with
//! deep-copied arguments, and buffered/rendezvous channels with
//! `select`.
//!
//! Embedders drive it through [`Session`]; a precompiled frontend links
//! against the value constructors, `binary_op`/`unary_op`, the
//! exception/defer substrate on [`Context`], closure-slot environments
//! in [`native`], and [`interp::call_function`].

pub mod builtins;
pub mod channel;
pub mod context;
pub mod env;
pub mod error;
pub mod handles;
pub mod heap;
pub mod interp;
pub mod json;
pub mod methods;
pub mod native;
pub mod ops;
pub mod session;
pub mod task;
pub mod types;
pub mod value;

pub use context::{Context, Control, Exec, Output};
pub use env::{Env, EnvRef};
pub use error::HemlockError;
pub use session::Session;
pub use value::Value;
