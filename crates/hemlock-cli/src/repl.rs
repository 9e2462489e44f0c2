//! Interactive REPL.
//!
//! Persistent evaluation session with line editing, history, and
//! multi-line input: when the parser reports the input ended mid-
//! construct, the REPL prompts for a continuation line instead of
//! reporting an error. Bindings persist across inputs.

use hemlock_core::{HemlockError, Session};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::output;

const PROMPT: &str = "hemlock> ";
const CONTINUATION_PROMPT: &str = "    ... ";

pub fn run() -> i32 {
    let mut session = Session::new(&[]);
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            output::error(&format!("cannot start line editor: {}", e));
            return 1;
        }
    };

    let history_path = dirs::home_dir().map(|h| h.join(".hemlock").join("repl_history"));
    if let Some(path) = &history_path {
        let _ = editor.load_history(path);
    }

    println!("Hemlock v{} REPL", env!("CARGO_PKG_VERSION"));
    println!("Type exit to quit\n");

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if buffer.is_empty() && (trimmed == "exit" || trimmed == "quit") {
                    break;
                }

                if buffer.is_empty() {
                    buffer = line;
                } else {
                    buffer.push('\n');
                    buffer.push_str(&line);
                }

                match session.eval(&buffer) {
                    Ok(value) => {
                        let _ = editor.add_history_entry(&buffer);
                        buffer.clear();
                        if !value.is_null() {
                            println!("{}", value.render());
                        }
                    }
                    Err(HemlockError::Parse(e)) if e.is_incomplete() => {
                        // Wait for the rest of the construct.
                    }
                    Err(HemlockError::Exit(code)) => {
                        save_history(&mut editor, &history_path);
                        return code;
                    }
                    Err(err) => {
                        let _ = editor.add_history_entry(&buffer);
                        buffer.clear();
                        output::error_with_trace(&err.to_string(), err.trace());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C: discard any pending multi-line input.
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                output::error(&format!("input error: {}", e));
                break;
            }
        }
    }

    save_history(&mut editor, &history_path);
    0
}

fn save_history(editor: &mut DefaultEditor, path: &Option<std::path::PathBuf>) {
    if let Some(path) = path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = editor.save_history(path);
    }
}
