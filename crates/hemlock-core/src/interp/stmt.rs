//! Statement execution.

use std::sync::Arc;

use crate::context::{throw_msg, Context, Control, Deferred, Exec};
use crate::env::{Env, EnvRef, SetError};
use crate::ops;
use crate::types::{self, TypeDef, TypeField, TypeValue};
use crate::value::Value;
use hemlock_parser::ast::{AssignOp, Block, Expr, ExprKind, Stmt, StmtKind};

use super::expr::{eval_expr, index_get, make_function};

/// Execute a block in a fresh environment chained to `env`.
pub fn exec_block(ctx: &mut Context, env: &EnvRef, block: &Block) -> Exec<()> {
    let inner = Env::child(env);
    exec_block_in(ctx, &inner, block)
}

/// Execute a block's statements directly in `env` (used for function
/// bodies, whose parameter frame is the block's frame).
pub fn exec_block_in(ctx: &mut Context, env: &EnvRef, block: &Block) -> Exec<()> {
    for stmt in block {
        exec_stmt(ctx, env, stmt)?;
    }
    Ok(())
}

pub fn exec_stmt(ctx: &mut Context, env: &EnvRef, stmt: &Stmt) -> Exec<()> {
    match &stmt.kind {
        StmtKind::Let {
            name,
            annot,
            init,
            constant,
        } => {
            let mut value = eval_expr(ctx, env, init)?;
            if let Some(annot) = annot {
                let target = types::resolve_annot(env, &annot.name)?;
                value = types::convert(ctx, env, &value, &target)?;
            }
            Env::define(env, name.clone(), value, *constant);
            Ok(())
        }

        StmtKind::Assign { target, op, value } => exec_assign(ctx, env, target, *op, value),

        StmtKind::Expr(e) => {
            eval_expr(ctx, env, e)?;
            Ok(())
        }

        StmtKind::Block(block) => exec_block(ctx, env, block),

        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            if eval_expr(ctx, env, cond)?.truthy() {
                exec_block(ctx, env, then_block)
            } else if let Some(else_block) = else_block {
                exec_block(ctx, env, else_block)
            } else {
                Ok(())
            }
        }

        StmtKind::While { cond, body } => {
            while eval_expr(ctx, env, cond)?.truthy() {
                match exec_block(ctx, env, body) {
                    Ok(()) => {}
                    Err(Control::Break) => break,
                    Err(Control::Continue) => continue,
                    Err(other) => return Err(other),
                }
            }
            Ok(())
        }

        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            // The loop header gets its own scope so `let i` does not
            // leak into the enclosing environment.
            let header = Env::child(env);
            if let Some(init) = init {
                exec_stmt(ctx, &header, init)?;
            }
            loop {
                if let Some(cond) = cond {
                    if !eval_expr(ctx, &header, cond)?.truthy() {
                        break;
                    }
                }
                match exec_block(ctx, &header, body) {
                    Ok(()) => {}
                    Err(Control::Break) => break,
                    Err(Control::Continue) => {}
                    Err(other) => return Err(other),
                }
                if let Some(step) = step {
                    exec_stmt(ctx, &header, step)?;
                }
            }
            Ok(())
        }

        StmtKind::ForIn {
            key,
            value,
            iterable,
            body,
        } => exec_for_in(ctx, env, key, value, iterable, body),

        StmtKind::Switch {
            scrutinee,
            cases,
            default,
        } => {
            let subject = eval_expr(ctx, env, scrutinee)?;
            for case in cases {
                let candidate = eval_expr(ctx, env, &case.value)?;
                if subject.equals(&candidate) {
                    // Cases never fall through.
                    return exec_block(ctx, env, &case.body);
                }
            }
            if let Some(default) = default {
                return exec_block(ctx, env, default);
            }
            Ok(())
        }

        StmtKind::Break => Err(Control::Break),
        StmtKind::Continue => Err(Control::Continue),

        StmtKind::Return(value) => {
            let value = match value {
                Some(e) => eval_expr(ctx, env, e)?,
                None => Value::Null,
            };
            Err(Control::Return(value))
        }

        StmtKind::Throw(e) => {
            let value = eval_expr(ctx, env, e)?;
            Err(Control::Throw(value))
        }

        StmtKind::Try {
            body,
            catch,
            finally,
        } => exec_try(ctx, env, body, catch, finally),

        StmtKind::Defer(expr) => {
            ctx.defers.push(Deferred {
                expr: expr.clone(),
                env: env.clone(),
            });
            Ok(())
        }

        StmtKind::FnDecl { name, func } => {
            let value = make_function(env, Some(name.clone()), func);
            Env::define(env, name.clone(), value, false);
            Ok(())
        }

        StmtKind::Define { name, fields } => {
            let def = TypeDef {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|f| TypeField {
                        name: f.name.clone(),
                        optional: f.optional,
                        annot: f.annot.as_ref().map(|a| a.name.clone()),
                        default: f.default.clone(),
                    })
                    .collect(),
            };
            Env::define(
                env,
                name.clone(),
                Value::Type(TypeValue::Defined(Arc::new(def))),
                false,
            );
            Ok(())
        }

        StmtKind::Import(path) => exec_import(ctx, env, path),

        StmtKind::Export(inner) => exec_stmt(ctx, env, inner),
    }
}

fn exec_assign(
    ctx: &mut Context,
    env: &EnvRef,
    target: &Expr,
    op: AssignOp,
    value: &Expr,
) -> Exec<()> {
    match &target.kind {
        ExprKind::Ident(name) => {
            let new_value = match op.binary_op() {
                Some(binop) => {
                    let current = match Env::get(env, name) {
                        Some(v) => v,
                        None => return throw_msg(format!("undefined variable `{}`", name)),
                    };
                    let rhs = eval_expr(ctx, env, value)?;
                    ops::binary_op(binop, &current, &rhs)?
                }
                None => eval_expr(ctx, env, value)?,
            };
            match Env::set(env, name, new_value) {
                Ok(()) => Ok(()),
                Err(SetError::NotFound) => {
                    throw_msg(format!("undefined variable `{}`", name))
                }
                Err(SetError::Constant) => {
                    throw_msg(format!("cannot assign to constant `{}`", name))
                }
            }
        }

        ExprKind::Index {
            target: base,
            index,
        } => {
            let base = eval_expr(ctx, env, base)?;
            let index = eval_expr(ctx, env, index)?;
            let new_value = match op.binary_op() {
                Some(binop) => {
                    let current = index_get(&base, &index)?;
                    let rhs = eval_expr(ctx, env, value)?;
                    ops::binary_op(binop, &current, &rhs)?
                }
                None => eval_expr(ctx, env, value)?,
            };
            index_set(&base, &index, new_value)
        }

        ExprKind::Member {
            target: base,
            field,
        } => {
            let base = eval_expr(ctx, env, base)?;
            let new_value = match op.binary_op() {
                Some(binop) => {
                    let current = super::expr::member_get(&base, field)?;
                    let rhs = eval_expr(ctx, env, value)?;
                    ops::binary_op(binop, &current, &rhs)?
                }
                None => eval_expr(ctx, env, value)?,
            };
            match &base {
                Value::Object(obj) => {
                    obj.lock().set(field.clone(), new_value);
                    Ok(())
                }
                other => throw_msg(format!(
                    "cannot assign property `{}` on {}",
                    field,
                    other.type_name()
                )),
            }
        }

        _ => throw_msg("invalid assignment target"),
    }
}

/// `a[i] = v`: array element (typed-array constraint enforced), buffer
/// byte, or object field.
fn index_set(target: &Value, index: &Value, value: Value) -> Exec<()> {
    match target {
        Value::Array(arr) => {
            let i = match index.is_integer().then(|| index.as_i64()) {
                Some(i) if i >= 0 => i as usize,
                _ => return throw_msg("array index must be a non-negative integer"),
            };
            let mut arr = arr.lock();
            if let Some(constraint) = &arr.elem_type {
                if !types::satisfies(&value, constraint) {
                    return throw_msg(format!(
                        "typed array expects {}, got {}",
                        constraint.render(),
                        value.type_name()
                    ));
                }
            }
            match arr.elements.get_mut(i) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => throw_msg(format!(
                    "array index {} out of bounds (length {})",
                    i,
                    arr.len()
                )),
            }
        }
        Value::Buffer(buf) => {
            let i = match index.is_integer().then(|| index.as_i64()) {
                Some(i) if i >= 0 => i as usize,
                _ => return throw_msg("buffer index must be a non-negative integer"),
            };
            let byte = value.as_i64();
            if !value.is_integer() || !(0..=255).contains(&byte) {
                return throw_msg("buffer elements must be integers in 0..=255");
            }
            let mut buf = buf.lock();
            if buf.set(i, byte as u8) {
                Ok(())
            } else {
                throw_msg(format!(
                    "buffer index {} out of bounds (length {})",
                    i,
                    buf.len()
                ))
            }
        }
        Value::Object(obj) => {
            let key = match index {
                Value::Str(s) => s.lock().data.clone(),
                _ => return throw_msg("object index must be a string"),
            };
            obj.lock().set(key, value);
            Ok(())
        }
        other => throw_msg(format!("cannot index-assign {}", other.type_name())),
    }
}

/// `for (k, v in coll)`: array index/element pairs or insertion-ordered
/// object fields. Iterates over a snapshot, so body mutations of the
/// collection do not affect the traversal.
fn exec_for_in(
    ctx: &mut Context,
    env: &EnvRef,
    key: &str,
    value: &str,
    iterable: &Expr,
    body: &Block,
) -> Exec<()> {
    let subject = eval_expr(ctx, env, iterable)?;
    let pairs: Vec<(Value, Value)> = match &subject {
        Value::Array(arr) => arr
            .lock()
            .elements
            .iter()
            .enumerate()
            .map(|(i, v)| (Value::int(i as i64), v.clone()))
            .collect(),
        Value::Object(obj) => obj
            .lock()
            .entries()
            .map(|(k, v)| (Value::str(k.clone()), v.clone()))
            .collect(),
        other => {
            return throw_msg(format!("cannot iterate over {}", other.type_name()));
        }
    };

    for (k, v) in pairs {
        let scope = Env::child(env);
        Env::define(&scope, key, k, false);
        Env::define(&scope, value, v, false);
        match exec_block_in(ctx, &scope, body) {
            Ok(()) => {}
            Err(Control::Break) => break,
            Err(Control::Continue) => continue,
            Err(other) => return Err(other),
        }
    }
    Ok(())
}

/// try/catch/finally. A `finally` block runs through every unwind kind
/// (throw, return, break, continue) and re-raises the pending control
/// afterwards unless it raised its own.
fn exec_try(
    ctx: &mut Context,
    env: &EnvRef,
    body: &Block,
    catch: &Option<hemlock_parser::ast::CatchClause>,
    finally: &Option<Block>,
) -> Exec<()> {
    let mut outcome = exec_block(ctx, env, body);

    if let Err(Control::Throw(exception)) = outcome {
        match catch {
            Some(clause) => {
                ctx.clear_unwind();
                let scope = Env::child(env);
                Env::define(&scope, clause.name.clone(), exception, false);
                outcome = exec_block_in(ctx, &scope, &clause.body);
            }
            None => outcome = Err(Control::Throw(exception)),
        }
    }

    if let Some(finally) = finally {
        let finally_outcome = exec_block(ctx, env, finally);
        if finally_outcome.is_err() {
            // The finally block's own unwind wins over a pending one.
            return finally_outcome;
        }
    }

    outcome
}

/// `import "path"` evaluates the module file into the current
/// environment; the core only observes the resulting bindings.
fn exec_import(ctx: &mut Context, env: &EnvRef, path: &str) -> Exec<()> {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => return throw_msg(format!("cannot import {}: {}", path, e)),
    };
    let program = match hemlock_parser::parse(&source) {
        Ok(p) => p,
        Err(e) => return throw_msg(format!("parse error in {}: {}", path, e)),
    };
    super::run_program(ctx, env, &program).map(|_| ())
}
