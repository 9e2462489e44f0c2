//! Per-thread execution context: call stack, defer stack, and the
//! control-flow channel for exceptions, returns, and loop breaks.
//!
//! Non-local control travels on the `Err` side of [`Exec`]; every
//! composite evaluator step propagates it with `?` before doing further
//! work, so no side effects happen past a pending unwind.

use std::io::{self, Write};
use std::sync::Arc;

use crate::env::EnvRef;
use crate::value::Value;
use hemlock_parser::ast::Expr;
use parking_lot::Mutex;

/// Call depth limit; exceeding it throws rather than exhausting the
/// native stack (worker threads default to 2 MiB).
pub const MAX_CALL_DEPTH: usize = 256;

/// Non-local control raised during evaluation.
#[derive(Debug, Clone)]
pub enum Control {
    /// User-raised or runtime-recoverable exception; caught by `try`.
    Throw(Value),
    /// `return` unwinding to the enclosing function.
    Return(Value),
    /// `break` consumed by the nearest enclosing loop.
    Break,
    /// `continue` consumed by the nearest enclosing loop.
    Continue,
    /// `exit(code)`: unwinds everything, process terminates.
    Exit(i32),
    /// Fatal, uncatchable failure. Prints a diagnostic and terminates.
    Panic(String),
}

pub type Exec<T> = Result<T, Control>;

/// Raise a runtime-recoverable error carrying a string payload.
pub fn throw_msg<T>(message: impl Into<String>) -> Exec<T> {
    Err(Control::Throw(Value::str(message.into())))
}

/// Where `print` and friends write. Shared with spawned tasks.
pub type Output = Arc<Mutex<dyn Write + Send>>;

/// One entry of the recorded call stack.
#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,
    pub line: u32,
    pub column: u32,
}

impl Frame {
    pub fn describe(&self) -> String {
        format!("  at {} ({}:{})", self.name, self.line, self.column)
    }
}

/// A deferred expression paired with the environment captured when it
/// was scheduled.
pub struct Deferred {
    pub expr: Expr,
    pub env: EnvRef,
}

/// Per-thread execution state. Each task owns one; the main program owns
/// one rooted in the session.
pub struct Context {
    /// Call stack, innermost last.
    frames: Vec<Frame>,
    /// LIFO defer stack; frames record a watermark on entry.
    pub defers: Vec<Deferred>,
    /// Frames recorded while an exception unwinds, for the final trace.
    exception_trace: Vec<Frame>,
    out: Output,
}

impl Context {
    pub fn new(out: Output) -> Self {
        Self {
            frames: Vec::new(),
            defers: Vec::new(),
            exception_trace: Vec::new(),
            out,
        }
    }

    /// Context writing to process stdout.
    pub fn with_stdout() -> Self {
        Self::new(Arc::new(Mutex::new(io::stdout())))
    }

    pub fn output(&self) -> Output {
        self.out.clone()
    }

    /// Write a line of program output.
    pub fn write_line(&self, text: &str) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }

    pub fn push_frame(&mut self, name: String, line: u32, column: u32) -> Exec<()> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return throw_msg(format!(
                "stack overflow: call depth exceeded {}",
                MAX_CALL_DEPTH
            ));
        }
        self.frames.push(Frame { name, line, column });
        Ok(())
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Record the current frame into the unwind trace. Called as a throw
    /// propagates out of a function body.
    pub fn record_unwind(&mut self) {
        if let Some(frame) = self.frames.last() {
            self.exception_trace.push(frame.clone());
        }
    }

    /// A `catch` handled the exception; the recorded trace is stale.
    pub fn clear_unwind(&mut self) {
        self.exception_trace.clear();
    }

    /// Rendered stack trace of the most recent uncaught unwind.
    pub fn unwind_trace(&self) -> Vec<String> {
        self.exception_trace
            .iter()
            .map(Frame::describe)
            .collect()
    }

    /// Rendered snapshot of the live call stack (used by `panic`).
    pub fn stack_trace(&self) -> Vec<String> {
        self.frames.iter().rev().map(Frame::describe).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> (Output, Arc<Mutex<Vec<u8>>>) {
        let buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let out: Output = buf.clone();
        (out, buf)
    }

    #[test]
    fn write_line_appends_newline() {
        let (out, buf) = sink();
        let ctx = Context::new(out);
        ctx.write_line("hello");
        assert_eq!(String::from_utf8(buf.lock().clone()).unwrap(), "hello\n");
    }

    #[test]
    fn frame_depth_is_bounded() {
        let (out, _) = sink();
        let mut ctx = Context::new(out);
        for i in 0..MAX_CALL_DEPTH {
            ctx.push_frame(format!("f{}", i), 1, 1).unwrap();
        }
        assert!(matches!(
            ctx.push_frame("overflow".to_string(), 1, 1),
            Err(Control::Throw(_))
        ));
    }

    #[test]
    fn unwind_trace_accumulates_and_clears() {
        let (out, _) = sink();
        let mut ctx = Context::new(out);
        ctx.push_frame("inner".to_string(), 3, 1).unwrap();
        ctx.record_unwind();
        assert_eq!(ctx.unwind_trace().len(), 1);
        ctx.clear_unwind();
        assert!(ctx.unwind_trace().is_empty());
    }
}
