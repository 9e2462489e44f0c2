//! Tasks: 1:1 native-thread concurrency with deep-copied arguments.
//!
//! Each task runs on a dedicated worker thread with all signals blocked
//! (signal delivery stays on the main thread). The worker stores the
//! result or the pending exception under the state mutex before
//! signaling completion; `join` re-raises a stored exception in the
//! caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::context::{throw_msg, Context, Control, Exec, Output};
use crate::interp::call_function;
use crate::value::{TaskRef, Value};
use parking_lot::{Condvar, Mutex};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// State of a task. Transitions are READY → RUNNING → COMPLETED;
/// COMPLETED is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskPhase {
    Ready,
    Running,
    Completed,
}

impl TaskPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TaskPhase::Ready => "ready",
            TaskPhase::Running => "running",
            TaskPhase::Completed => "completed",
        }
    }
}

struct TaskState {
    phase: TaskPhase,
    result: Option<Value>,
    exception: Option<Value>,
    joined: bool,
    detached: bool,
}

/// A spawned task handle. The worker holds one reference; every language
/// handle is another.
pub struct Task {
    id: u64,
    state: Mutex<TaskState>,
    done: Condvar,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("phase", &state.phase)
            .field("detached", &state.detached)
            .finish()
    }
}

impl Task {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> TaskPhase {
        self.state.lock().phase
    }

    pub fn is_detached(&self) -> bool {
        self.state.lock().detached
    }

    pub fn is_joined(&self) -> bool {
        self.state.lock().joined
    }

    /// Spawn a worker thread running `func` with deep-copied arguments.
    ///
    /// The copy happens on the caller's thread, so the parent and the
    /// task share no mutable heap state other than channels, tasks,
    /// files, and sockets.
    pub fn spawn(func: Value, args: &[Value], out: Output) -> Exec<TaskRef> {
        if !matches!(func, Value::Function(_)) {
            return throw_msg(format!("spawn expects a function, got {}", func.type_name()));
        }
        let isolated: Vec<Value> = args.iter().map(Value::deep_copy).collect();

        let task = Arc::new(Task {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(TaskState {
                phase: TaskPhase::Ready,
                result: None,
                exception: None,
                joined: false,
                detached: false,
            }),
            done: Condvar::new(),
        });

        let worker_task = task.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("hemlock-task-{}", task.id))
            .spawn(move || {
                block_signals();
                worker_task.state.lock().phase = TaskPhase::Running;

                let mut ctx = Context::new(out);
                let outcome = call_function(&mut ctx, &func, isolated, None, None);

                let mut state = worker_task.state.lock();
                match outcome {
                    Ok(value) => state.result = Some(value),
                    Err(Control::Throw(value)) => state.exception = Some(value),
                    Err(Control::Exit(code)) => std::process::exit(code),
                    Err(Control::Panic(message)) => {
                        eprintln!("panic: {}", message);
                        for line in ctx.stack_trace() {
                            eprintln!("{}", line);
                        }
                        std::process::exit(101);
                    }
                    Err(Control::Return(value)) => state.result = Some(value),
                    Err(Control::Break) | Err(Control::Continue) => {
                        state.exception = Some(Value::str("stray loop control in task body"));
                    }
                }
                state.phase = TaskPhase::Completed;
                worker_task.done.notify_all();
            });

        if spawned.is_err() {
            return Err(Control::Panic("failed to spawn task thread".to_string()));
        }
        Ok(task)
    }

    /// Await completion and publish the result. Re-raises a stored
    /// exception in the caller's context.
    pub fn join(task: &TaskRef) -> Exec<Value> {
        let mut state = task.state.lock();
        if state.detached {
            return throw_msg("cannot join a detached task");
        }
        if state.joined {
            return throw_msg("task already joined");
        }
        while state.phase != TaskPhase::Completed {
            task.done.wait(&mut state);
        }
        state.joined = true;
        if let Some(exception) = state.exception.clone() {
            return Err(Control::Throw(exception));
        }
        Ok(state.result.clone().unwrap_or(Value::Null))
    }

    /// Mark the task detached; its worker-side reference is released on
    /// completion when the handle drops. Joining afterwards errors.
    pub fn detach(task: &TaskRef) -> Exec<()> {
        let mut state = task.state.lock();
        if state.joined {
            return throw_msg("cannot detach a joined task");
        }
        state.detached = true;
        Ok(())
    }
}

/// Block all signals on the worker so delivery stays main-thread only.
#[cfg(unix)]
fn block_signals() {
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigfillset(&mut set);
        libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut());
    }
}

#[cfg(not(unix))]
fn block_signals() {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;
    use crate::value::{FnBody, Function};
    use hemlock_parser::ast::{Expr, ExprKind, Stmt, StmtKind};
    use hemlock_parser::token::Span;
    use std::io;

    fn stdout_sink() -> Output {
        Arc::new(Mutex::new(io::sink()))
    }

    /// `fn () { return 41 + 1; }` built by hand.
    fn const_fn() -> Value {
        let body = vec![Stmt::new(
            StmtKind::Return(Some(Expr::new(
                ExprKind::Binary {
                    op: hemlock_parser::ast::BinaryOp::Add,
                    left: Box::new(Expr::new(ExprKind::Int(41), Span::dummy())),
                    right: Box::new(Expr::new(ExprKind::Int(1), Span::dummy())),
                },
                Span::dummy(),
            ))),
            Span::dummy(),
        )];
        Value::Function(Arc::new(Function {
            name: Some("answer".to_string()),
            params: vec![],
            return_type: None,
            body: FnBody::Ast(Arc::new(body)),
            closure: Env::root(),
            is_async: false,
        }))
    }

    /// `fn () { throw "boom"; }` built by hand.
    fn throwing_fn() -> Value {
        let body = vec![Stmt::new(
            StmtKind::Throw(Expr::new(ExprKind::Str("boom".to_string()), Span::dummy())),
            Span::dummy(),
        )];
        Value::Function(Arc::new(Function {
            name: Some("boom".to_string()),
            params: vec![],
            return_type: None,
            body: FnBody::Ast(Arc::new(body)),
            closure: Env::root(),
            is_async: false,
        }))
    }

    #[test]
    fn spawn_join_returns_result() {
        let task = Task::spawn(const_fn(), &[], stdout_sink()).unwrap();
        let result = Task::join(&task).unwrap();
        assert!(matches!(result, Value::I32(42)));
        assert_eq!(task.phase(), TaskPhase::Completed);
        assert!(task.is_joined());
    }

    #[test]
    fn join_reraises_stored_exception() {
        let task = Task::spawn(throwing_fn(), &[], stdout_sink()).unwrap();
        match Task::join(&task) {
            Err(Control::Throw(v)) => assert_eq!(v.render(), "boom"),
            other => panic!("expected rethrow, got {:?}", other.map(|v| v.render())),
        }
    }

    #[test]
    fn double_join_errors() {
        let task = Task::spawn(const_fn(), &[], stdout_sink()).unwrap();
        Task::join(&task).unwrap();
        assert!(Task::join(&task).is_err());
    }

    #[test]
    fn join_after_detach_errors() {
        let task = Task::spawn(const_fn(), &[], stdout_sink()).unwrap();
        Task::detach(&task).unwrap();
        assert!(Task::join(&task).is_err());
        assert!(task.is_detached());
        assert!(!task.is_joined());
    }

    #[test]
    fn detach_after_join_errors() {
        let task = Task::spawn(const_fn(), &[], stdout_sink()).unwrap();
        Task::join(&task).unwrap();
        assert!(Task::detach(&task).is_err());
    }

    #[test]
    fn task_ids_are_monotonic() {
        let a = Task::spawn(const_fn(), &[], stdout_sink()).unwrap();
        let b = Task::spawn(const_fn(), &[], stdout_sink()).unwrap();
        assert!(b.id() > a.id());
        Task::join(&a).unwrap();
        Task::join(&b).unwrap();
    }

    #[test]
    fn spawn_rejects_non_function() {
        assert!(Task::spawn(Value::I32(1), &[], stdout_sink()).is_err());
    }
}
