//! Frontend error types.

/// Error produced while tokenizing source text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character `{text}` at {line}:{column}")]
    UnexpectedCharacter {
        text: String,
        line: u32,
        column: u32,
    },
}

/// Error produced by the parser.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("{0}")]
    Lex(#[from] LexError),

    #[error("expected {expected}, found {found} at {line}:{column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: u32,
        column: u32,
    },

    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("invalid assignment target at {line}:{column}")]
    InvalidAssignmentTarget { line: u32, column: u32 },

    #[error("duplicate field `{name}` at {line}:{column}")]
    DuplicateField {
        name: String,
        line: u32,
        column: u32,
    },
}

impl ParseError {
    /// True when the input ended before a construct was complete.
    ///
    /// The REPL uses this to decide whether to prompt for a continuation
    /// line instead of reporting an error.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ParseError::UnexpectedEof { .. })
    }
}
