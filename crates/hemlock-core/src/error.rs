//! Session-level error type: what the embedder (CLI, REPL, tests) sees
//! when a program does not complete normally.

/// Terminal outcome of evaluating a source unit.
#[derive(Debug, thiserror::Error)]
pub enum HemlockError {
    /// Frontend rejected the source.
    #[error("{0}")]
    Parse(#[from] hemlock_parser::ParseError),

    /// An exception unwound past the top level.
    #[error("Uncaught exception: {message}")]
    Uncaught {
        message: String,
        trace: Vec<String>,
    },

    /// Fatal runtime failure (`panic` builtin or internal invariant).
    #[error("panic: {message}")]
    Panic {
        message: String,
        trace: Vec<String>,
    },

    /// The program requested termination via `exit(code)`.
    #[error("exit({0})")]
    Exit(i32),
}

impl HemlockError {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            HemlockError::Parse(_) => 1,
            HemlockError::Uncaught { .. } => 1,
            HemlockError::Panic { .. } => 101,
            HemlockError::Exit(code) => *code,
        }
    }

    /// Recorded stack trace lines, innermost frame first.
    pub fn trace(&self) -> &[String] {
        match self {
            HemlockError::Uncaught { trace, .. } | HemlockError::Panic { trace, .. } => trace,
            _ => &[],
        }
    }
}
