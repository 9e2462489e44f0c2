//! Hemlock command-line interface.
//!
//! `hemlock script.hml [args...]` runs one source file with `args`
//! bound in-language (`args[0]` is the script path). With no script,
//! enters the REPL. Exit code is 0 on normal completion, nonzero on an
//! uncaught exception or panic.

mod output;
mod repl;

use anyhow::Context as _;
use clap::Parser;
use hemlock_core::{HemlockError, Session};

#[derive(Parser)]
#[command(name = "hemlock")]
#[command(about = "Hemlock programming language")]
#[command(version)]
struct Cli {
    /// Script file to run; omit to start the REPL
    script: Option<String>,

    /// Arguments passed through to the program as `args[1..]`
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.script {
        Some(script) => run_script(&script, &cli.args),
        None => repl::run(),
    };
    std::process::exit(code);
}

fn run_script(script: &str, user_args: &[String]) -> i32 {
    let source = match std::fs::read_to_string(script)
        .with_context(|| format!("cannot read {}", script))
    {
        Ok(source) => source,
        Err(e) => {
            output::error(&format!("{:#}", e));
            return 1;
        }
    };

    let mut program_args = vec![script.to_string()];
    program_args.extend_from_slice(user_args);

    let mut session = Session::new(&program_args);
    match session.eval(&source) {
        Ok(_) => 0,
        Err(HemlockError::Exit(code)) => code,
        Err(err) => {
            output::error_with_trace(&err.to_string(), err.trace());
            err.exit_code()
        }
    }
}
