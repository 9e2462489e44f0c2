//! Persistent evaluation session.
//!
//! Owns the root environment (builtins installed once) and the main
//! execution context. The CLI evaluates one script through it; the REPL
//! feeds it statements and keeps bindings across inputs; tests capture
//! its output.

use crate::builtins;
use crate::context::{Context, Control, Output};
use crate::env::{Env, EnvRef};
use crate::error::HemlockError;
use crate::interp;
use crate::value::Value;

pub struct Session {
    root: EnvRef,
    ctx: Context,
}

impl Session {
    /// Session writing to process stdout.
    pub fn new(program_args: &[String]) -> Self {
        Self::build(Context::with_stdout(), program_args)
    }

    /// Session writing to the given sink (REPL echo, test capture).
    pub fn with_output(out: Output, program_args: &[String]) -> Self {
        Self::build(Context::new(out), program_args)
    }

    fn build(ctx: Context, program_args: &[String]) -> Self {
        let root = Env::root();
        builtins::install(&root, program_args);
        Self { root, ctx }
    }

    pub fn output(&self) -> Output {
        self.ctx.output()
    }

    pub fn root(&self) -> &EnvRef {
        &self.root
    }

    /// Parse and evaluate one source unit against the persistent root
    /// environment. Returns the value of the last expression statement.
    pub fn eval(&mut self, source: &str) -> Result<Value, HemlockError> {
        let program = hemlock_parser::parse(source)?;
        match interp::run_program(&mut self.ctx, &self.root, &program) {
            Ok(value) => Ok(value),
            Err(Control::Throw(value)) => {
                let trace = self.ctx.unwind_trace();
                self.ctx.clear_unwind();
                Err(HemlockError::Uncaught {
                    message: value.render(),
                    trace,
                })
            }
            Err(Control::Panic(message)) => {
                let trace = self.ctx.unwind_trace();
                self.ctx.clear_unwind();
                Err(HemlockError::Panic { message, trace })
            }
            Err(Control::Exit(code)) => Err(HemlockError::Exit(code)),
            Err(Control::Return(value)) => Ok(value),
            Err(Control::Break) | Err(Control::Continue) => Err(HemlockError::Uncaught {
                message: "loop control outside a loop".to_string(),
                trace: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn capture_session() -> (Session, Arc<Mutex<Vec<u8>>>) {
        let buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let out: Output = buf.clone();
        (Session::with_output(out, &[]), buf)
    }

    fn drain(buf: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(buf.lock().clone()).unwrap()
    }

    #[test]
    fn bindings_persist_across_inputs() {
        let (mut session, _) = capture_session();
        session.eval("let x = 2;").unwrap();
        let v = session.eval("x * 21").unwrap();
        assert!(matches!(v, Value::I32(42)));
    }

    #[test]
    fn print_goes_to_the_session_output() {
        let (mut session, buf) = capture_session();
        session.eval(r#"print("hello");"#).unwrap();
        assert_eq!(drain(&buf), "hello\n");
    }

    #[test]
    fn uncaught_throw_reports_message() {
        let (mut session, _) = capture_session();
        let err = session.eval(r#"throw "nope";"#).unwrap_err();
        match err {
            HemlockError::Uncaught { message, .. } => assert_eq!(message, "nope"),
            other => panic!("expected uncaught, got {:?}", other),
        }
    }

    #[test]
    fn uncaught_throw_in_function_records_a_trace() {
        let (mut session, _) = capture_session();
        let err = session
            .eval("fn inner() { throw \"deep\"; } fn outer() { inner(); } outer();")
            .unwrap_err();
        let trace = err.trace().to_vec();
        assert!(trace.iter().any(|line| line.contains("inner")));
        assert!(trace.iter().any(|line| line.contains("outer")));
    }

    #[test]
    fn session_recovers_after_error() {
        let (mut session, _) = capture_session();
        assert!(session.eval("undefined_name;").is_err());
        assert!(session.eval("1 + 1").is_ok());
    }

    #[test]
    fn exit_maps_to_exit_code() {
        let (mut session, _) = capture_session();
        let err = session.eval("exit(7);").unwrap_err();
        assert_eq!(err.exit_code(), 7);
    }
}
