//! Colored diagnostic output for the CLI.
//!
//! Uses `termcolor` for cross-platform colored stderr and respects the
//! `NO_COLOR` environment variable.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn choice() -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Print an error headline in red, followed by plain trace lines.
pub fn error_with_trace(headline: &str, trace: &[String]) {
    let mut stderr = StandardStream::stderr(choice());
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = writeln!(stderr, "{}", headline);
    let _ = stderr.reset();
    for line in trace {
        let _ = writeln!(stderr, "{}", line);
    }
}

/// Plain error line (parse errors, I/O failures).
pub fn error(message: &str) {
    error_with_trace(message, &[]);
}
