//! Expression evaluation.

use std::sync::Arc;

use crate::context::{throw_msg, Context, Exec};
use crate::env::{Env, EnvRef};
use crate::heap::Object;
use crate::methods;
use crate::ops;
use crate::value::{FnBody, Function, Value};
use hemlock_parser::ast::{BinaryOp, Expr, ExprKind, FnExpr};

use super::call::call_function;

/// Evaluate an expression to a value.
///
/// Every composite case propagates a pending control (`throw`, etc.)
/// from its sub-evaluations before doing further work, so no side
/// effects happen past a pending unwind.
pub fn eval_expr(ctx: &mut Context, env: &EnvRef, expr: &Expr) -> Exec<Value> {
    match &expr.kind {
        ExprKind::Int(n) => Ok(Value::int(*n)),
        ExprKind::Float(f) => Ok(Value::F64(*f)),
        ExprKind::Str(s) => Ok(Value::str(s.clone())),
        ExprKind::Bool(b) => Ok(Value::Bool(*b)),
        ExprKind::Null => Ok(Value::Null),

        ExprKind::Ident(name) => match Env::get(env, name) {
            Some(value) => Ok(value),
            None => throw_msg(format!("undefined variable `{}`", name)),
        },

        ExprKind::Unary { op, operand } => {
            let value = eval_expr(ctx, env, operand)?;
            ops::unary_op(*op, &value)
        }

        ExprKind::Binary { op, left, right } => match op {
            // Short-circuit: the right operand is not evaluated when the
            // left decides the result.
            BinaryOp::And => {
                let lhs = eval_expr(ctx, env, left)?;
                if !lhs.truthy() {
                    return Ok(Value::Bool(false));
                }
                let rhs = eval_expr(ctx, env, right)?;
                Ok(Value::Bool(rhs.truthy()))
            }
            BinaryOp::Or => {
                let lhs = eval_expr(ctx, env, left)?;
                if lhs.truthy() {
                    return Ok(Value::Bool(true));
                }
                let rhs = eval_expr(ctx, env, right)?;
                Ok(Value::Bool(rhs.truthy()))
            }
            _ => {
                let lhs = eval_expr(ctx, env, left)?;
                let rhs = eval_expr(ctx, env, right)?;
                ops::binary_op(*op, &lhs, &rhs)
            }
        },

        ExprKind::Index { target, index } => {
            let target = eval_expr(ctx, env, target)?;
            let index = eval_expr(ctx, env, index)?;
            index_get(&target, &index)
        }

        ExprKind::Member { target, field } => {
            let target = eval_expr(ctx, env, target)?;
            member_get(&target, field)
        }

        ExprKind::Call { callee, args } => eval_call(ctx, env, expr, callee, args),

        ExprKind::Array(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(eval_expr(ctx, env, element)?);
            }
            Ok(Value::array(values))
        }

        ExprKind::Object(fields) => {
            let mut obj = Object::new();
            for (name, value_expr) in fields {
                let value = eval_expr(ctx, env, value_expr)?;
                obj.set(name.clone(), value);
            }
            Ok(Value::object(obj))
        }

        ExprKind::Function(func) => Ok(make_function(env, None, func)),
    }
}

/// Build a function value capturing the current environment.
pub fn make_function(env: &EnvRef, name: Option<String>, func: &FnExpr) -> Value {
    Value::Function(Arc::new(Function {
        name,
        params: func.params.clone(),
        return_type: func.return_type.clone(),
        body: FnBody::Ast(Arc::new(func.body.clone())),
        closure: env.clone(),
        is_async: false,
    }))
}

fn eval_call(
    ctx: &mut Context,
    env: &EnvRef,
    call: &Expr,
    callee: &Expr,
    args: &[Expr],
) -> Exec<Value> {
    // Method-call shape: evaluate the receiver once, then either invoke
    // a function-valued object field (binding `self`) or dispatch to the
    // receiver kind's method table.
    if let ExprKind::Member { target, field } = &callee.kind {
        let receiver = eval_expr(ctx, env, target)?;

        if let Value::Object(obj) = &receiver {
            let method = obj.lock().get(field).cloned();
            if let Some(method) = method {
                if matches!(method, Value::Function(_) | Value::Builtin(_)) {
                    let arg_values = eval_args(ctx, env, args)?;
                    return call_function(
                        ctx,
                        &method,
                        arg_values,
                        Some(receiver.clone()),
                        Some(call.span),
                    );
                }
                return throw_msg(format!("field `{}` is not a function", field));
            }
        }

        let arg_values = eval_args(ctx, env, args)?;
        return methods::dispatch(ctx, &receiver, field, arg_values);
    }

    let callee_value = eval_expr(ctx, env, callee)?;
    let arg_values = eval_args(ctx, env, args)?;
    call_function(ctx, &callee_value, arg_values, None, Some(call.span))
}

/// Arguments evaluate left to right, stopping on a pending throw.
fn eval_args(ctx: &mut Context, env: &EnvRef, args: &[Expr]) -> Exec<Vec<Value>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval_expr(ctx, env, arg)?);
    }
    Ok(values)
}

/// `a[i]`: array get (bounds-checked), string char-at, buffer get
/// (bounds-checked), or object field when the index is a string.
pub fn index_get(target: &Value, index: &Value) -> Exec<Value> {
    match target {
        Value::Array(arr) => {
            let i = index_to_usize(index, "array")?;
            let arr = arr.lock();
            match arr.elements.get(i) {
                Some(v) => Ok(v.clone()),
                None => throw_msg(format!(
                    "array index {} out of bounds (length {})",
                    i,
                    arr.len()
                )),
            }
        }
        Value::Str(s) => {
            let i = index_to_usize(index, "string")?;
            let mut s = s.lock();
            let count = s.char_count();
            match s.data.chars().nth(i) {
                Some(c) => Ok(Value::Rune(c)),
                None => throw_msg(format!(
                    "string index {} out of bounds (length {})",
                    i, count
                )),
            }
        }
        Value::Buffer(buf) => {
            let i = index_to_usize(index, "buffer")?;
            let buf = buf.lock();
            match buf.get(i) {
                Some(b) => Ok(Value::U8(b)),
                None => throw_msg(format!(
                    "buffer index {} out of bounds (length {})",
                    i,
                    buf.len()
                )),
            }
        }
        Value::Object(obj) => {
            let key = match index {
                Value::Str(s) => s.lock().data.clone(),
                _ => {
                    return throw_msg(format!(
                        "object index must be a string, got {}",
                        index.type_name()
                    ))
                }
            };
            match obj.lock().get(&key) {
                Some(v) => Ok(v.clone()),
                None => throw_msg(format!("object has no field `{}`", key)),
            }
        }
        other => throw_msg(format!("cannot index {}", other.type_name())),
    }
}

/// `a.b` as a read: object field, or a kind property (`length`,
/// `capacity`, `closed`, ...).
pub fn member_get(target: &Value, field: &str) -> Exec<Value> {
    if let Value::Object(obj) = target {
        if let Some(value) = obj.lock().get(field) {
            return Ok(value.clone());
        }
    }
    if let Some(value) = methods::property(target, field) {
        return Ok(value);
    }
    match target {
        Value::Object(_) => throw_msg(format!("object has no field `{}`", field)),
        other => throw_msg(format!(
            "{} has no property `{}`",
            other.type_name(),
            field
        )),
    }
}

fn index_to_usize(index: &Value, what: &str) -> Exec<usize> {
    if !index.is_integer() {
        return throw_msg(format!(
            "{} index must be an integer, got {}",
            what,
            index.type_name()
        ));
    }
    let i = index.as_i64();
    if i < 0 {
        return throw_msg(format!("{} index {} out of bounds", what, i));
    }
    Ok(i as usize)
}
