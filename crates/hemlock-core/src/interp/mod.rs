//! The tree-walking evaluator: mutually recursive expression and
//! statement walks over the AST, plus the single call path shared by
//! interpreted, native, and builtin functions.

mod call;
mod expr;
mod stmt;

pub use call::call_function;
pub use expr::eval_expr;
pub use stmt::{exec_block, exec_stmt};

use crate::context::{Context, Control, Exec};
use crate::env::EnvRef;
use crate::value::Value;
use hemlock_parser::ast::{Program, StmtKind};

/// Execute a program's top-level statements.
///
/// Returns the value of the last expression statement (the REPL echoes
/// it). Top-level defers drain when the program finishes or unwinds.
pub fn run_program(ctx: &mut Context, env: &EnvRef, program: &Program) -> Exec<Value> {
    let watermark = ctx.defers.len();
    let mut last = Value::Null;
    let mut outcome: Exec<()> = Ok(());

    for stmt in &program.statements {
        let result = match &stmt.kind {
            StmtKind::Expr(e) => eval_expr(ctx, env, e).map(|v| last = v),
            _ => exec_stmt(ctx, env, stmt),
        };
        if let Err(control) = result {
            outcome = Err(control);
            break;
        }
    }

    // Drain top-level defers LIFO; a defer-raised exception overrides
    // any pending unwind.
    while ctx.defers.len() > watermark {
        let deferred = ctx.defers.pop().unwrap();
        if let Err(control) = eval_expr(ctx, &deferred.env, &deferred.expr) {
            outcome = Err(control);
        }
    }

    match outcome {
        Ok(()) => Ok(last),
        Err(Control::Return(v)) => Ok(v),
        Err(other) => Err(other),
    }
}
