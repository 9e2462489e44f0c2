//! The single call path: interpreted bodies, native bodies, and
//! builtins all enter through [`call_function`].

use crate::context::{throw_msg, Context, Control, Exec};
use crate::env::{Env, EnvRef};
use crate::native::MAX_NATIVE_ARGS;
use crate::types::{self, TypeKind, TypeValue};
use crate::value::{FnBody, Function, FunctionRef, Value};
use hemlock_parser::token::Span;

use super::expr::eval_expr;
use super::stmt::exec_block_in;

/// Invoke a callable value.
///
/// For method calls `self_value` carries the receiver, bound for the
/// single activation only; nested calls do not inherit it. Arguments
/// were already evaluated left to right by the caller.
pub fn call_function(
    ctx: &mut Context,
    callee: &Value,
    args: Vec<Value>,
    self_value: Option<Value>,
    call_span: Option<Span>,
) -> Exec<Value> {
    match callee {
        Value::Builtin(builtin) => {
            let (line, column) = span_pos(call_span);
            ctx.push_frame(builtin.name.to_string(), line, column)?;
            let result = (builtin.func)(ctx, &args);
            if matches!(result, Err(Control::Throw(_) | Control::Panic(_))) {
                ctx.record_unwind();
            }
            ctx.pop_frame();
            result
        }
        Value::Function(func) => call_user_function(ctx, func, args, self_value, call_span),
        // Calling a type-kind constant constructs (`buffer(64)`) or
        // converts (`i32(x)`).
        Value::Type(TypeValue::Kind(kind)) => call_type_kind(*kind, &args),
        Value::Type(TypeValue::Defined(def)) => {
            throw_msg(format!("type {} is not callable; use an annotation", def.name))
        }
        other => throw_msg(format!("{} is not callable", other.type_name())),
    }
}

fn call_user_function(
    ctx: &mut Context,
    func: &FunctionRef,
    args: Vec<Value>,
    self_value: Option<Value>,
    call_span: Option<Span>,
) -> Exec<Value> {
    let (line, column) = span_pos(call_span);
    ctx.push_frame(func.trace_name().to_string(), line, column)?;

    let outcome = match &func.body {
        FnBody::Native { func: native, closure_env } => {
            if args.len() > MAX_NATIVE_ARGS {
                ctx.pop_frame();
                return throw_msg(format!(
                    "native functions accept at most {} arguments, got {}",
                    MAX_NATIVE_ARGS,
                    args.len()
                ));
            }
            native(ctx, closure_env.as_ref(), &args)
        }
        FnBody::Ast(body) => {
            // Fresh frame chained to the captured closure environment.
            let frame = Env::child(&func.closure);
            match bind_params(ctx, &frame, func, args, self_value) {
                Ok(()) => {
                    let watermark = ctx.defers.len();
                    let mut outcome = exec_block_in(ctx, &frame, body);

                    // Drain this frame's defers LIFO, each in the
                    // environment captured when it was scheduled. A
                    // defer-raised exception overrides the pending unwind.
                    while ctx.defers.len() > watermark {
                        let deferred = ctx.defers.pop().unwrap();
                        if let Err(control) = eval_expr(ctx, &deferred.env, &deferred.expr) {
                            outcome = Err(control);
                        }
                    }

                    match outcome {
                        Ok(()) => Ok(Value::Null),
                        Err(Control::Return(value)) => Ok(value),
                        Err(Control::Break) | Err(Control::Continue) => {
                            throw_msg("loop control outside a loop")
                        }
                        Err(other) => Err(other),
                    }
                }
                Err(control) => Err(control),
            }
        }
    };

    // Return-annotation conversion applies to whatever value the body
    // produced.
    let outcome = match (outcome, &func.return_type) {
        (Ok(value), Some(annot)) => {
            let frame = Env::child(&func.closure);
            types::resolve_annot(&frame, &annot.name)
                .and_then(|target| types::convert(ctx, &frame, &value, &target))
        }
        (outcome, _) => outcome,
    };

    if matches!(outcome, Err(Control::Throw(_) | Control::Panic(_))) {
        ctx.record_unwind();
    }
    ctx.pop_frame();
    outcome
}

/// Bind `self`, then each parameter: positional argument, declared
/// default (evaluated in the callee frame), or a missing-argument error.
/// Annotated parameters convert on the way in.
fn bind_params(
    ctx: &mut Context,
    frame: &EnvRef,
    func: &Function,
    args: Vec<Value>,
    self_value: Option<Value>,
) -> Exec<()> {
    if let Some(receiver) = self_value {
        Env::define(frame, "self", receiver, false);
    }

    if args.len() > func.params.len() {
        return throw_msg(format!(
            "{} expects {} arguments, got {}",
            func.trace_name(),
            func.params.len(),
            args.len()
        ));
    }

    let mut args = args.into_iter();
    for param in &func.params {
        let mut value = match args.next() {
            Some(v) => v,
            None => match &param.default {
                Some(default) => eval_expr(ctx, frame, default)?,
                None => {
                    return throw_msg(format!(
                        "missing argument `{}` for {}",
                        param.name,
                        func.trace_name()
                    ))
                }
            },
        };
        if let Some(annot) = &param.annot {
            let target = types::resolve_annot(frame, &annot.name)?;
            value = types::convert(ctx, frame, &value, &target)?;
        }
        Env::define(frame, param.name.clone(), value, false);
    }
    Ok(())
}

fn call_type_kind(kind: TypeKind, args: &[Value]) -> Exec<Value> {
    if kind == TypeKind::Buffer {
        if args.len() != 1 || !args[0].is_integer() {
            return throw_msg("buffer expects a length argument");
        }
        let len = args[0].as_i64();
        if len < 0 {
            return throw_msg("buffer length must be non-negative");
        }
        return Ok(Value::Buffer(std::sync::Arc::new(parking_lot::Mutex::new(
            crate::heap::Buffer::zeroed(len as usize),
        ))));
    }
    if args.len() != 1 {
        return throw_msg(format!("{} conversion expects one argument", kind.name()));
    }
    types::convert_kind(&args[0], kind)
}

fn span_pos(span: Option<Span>) -> (u32, u32) {
    match span {
        Some(s) => (s.line, s.column),
        None => (0, 0),
    }
}
