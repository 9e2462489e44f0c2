//! Lexer for the Hemlock programming language.
//!
//! This module implements the lexer using the logos library. It converts
//! source code into a stream of tokens with source location information.

use crate::error::LexError;
use crate::token::{Span, SpannedToken, Token};
use logos::Logos;

/// Logos-based token enum for lexing.
///
/// This enum is used internally by logos for efficient tokenization.
/// It's converted to the main Token enum after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace (skip)
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*", lex_block_comment)]
    BlockComment,

    // Keywords (must come before identifiers)
    #[token("fn")]
    Fn,

    #[token("let")]
    Let,

    #[token("const")]
    Const,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("switch")]
    Switch,

    #[token("case")]
    Case,

    #[token("default")]
    Default,

    #[token("for")]
    For,

    #[token("while")]
    While,

    #[token("break")]
    Break,

    #[token("continue")]
    Continue,

    #[token("return")]
    Return,

    #[token("in")]
    In,

    #[token("try")]
    Try,

    #[token("catch")]
    Catch,

    #[token("finally")]
    Finally,

    #[token("throw")]
    Throw,

    #[token("defer")]
    Defer,

    #[token("define")]
    Define,

    #[token("import")]
    Import,

    #[token("export")]
    Export,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    // Literals
    #[regex(r"0[xX][0-9a-fA-F][0-9a-fA-F_]*", parse_hex)]
    #[regex(r"0[bB][01][01_]*", parse_binary)]
    #[regex(r"[0-9][0-9_]*", parse_int)]
    IntLiteral(i64),

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", parse_float)]
    FloatLiteral(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    StringLiteral(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Punctuation
    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token("?")]
    Question,

    // Operators (longest first where prefixes overlap)
    #[token("+=")]
    PlusAssign,

    #[token("-=")]
    MinusAssign,

    #[token("*=")]
    StarAssign,

    #[token("/=")]
    SlashAssign,

    #[token("%=")]
    PercentAssign,

    #[token("==")]
    Eq,

    #[token("!=")]
    NotEq,

    #[token("<=")]
    LtEq,

    #[token(">=")]
    GtEq,

    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    #[token("<<")]
    Shl,

    #[token(">>")]
    Shr,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("=")]
    Assign,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token("!")]
    Not,

    #[token("&")]
    Amp,

    #[token("|")]
    Pipe,

    #[token("^")]
    Caret,

    #[token("~")]
    Tilde,
}

// Helper parsing callbacks

fn lex_block_comment(lex: &mut logos::Lexer<LogosToken>) -> logos::Skip {
    // "/*" is consumed; find the matching "*/"
    let remainder = lex.remainder();
    if let Some(end) = remainder.find("*/") {
        lex.bump(end + 2);
    } else {
        // Unterminated comment - consume to end
        lex.bump(remainder.len());
    }
    logos::Skip
}

fn parse_hex(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    let s = lex.slice()[2..].replace('_', "");
    u64::from_str_radix(&s, 16).ok().map(|v| v as i64)
}

fn parse_binary(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    let s = lex.slice()[2..].replace('_', "");
    u64::from_str_radix(&s, 2).ok().map(|v| v as i64)
}

fn parse_int(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_float(lex: &mut logos::Lexer<LogosToken>) -> Option<f64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    unescape_string(inner)
}

fn unescape_string(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            't' => result.push('\t'),
            '\\' => result.push('\\'),
            '"' => result.push('"'),
            '\'' => result.push('\''),
            '0' => result.push('\0'),
            'x' => {
                let hi = chars.next()?;
                let lo = chars.next()?;
                let mut hex = String::new();
                hex.push(hi);
                hex.push(lo);
                let byte = u8::from_str_radix(&hex, 16).ok()?;
                result.push(byte as char);
            }
            'u' => {
                // \u{XXXXXX}
                if chars.next()? != '{' {
                    return None;
                }
                let mut hex = String::new();
                for ch in chars.by_ref() {
                    if ch == '}' {
                        break;
                    }
                    hex.push(ch);
                }
                let code_point = u32::from_str_radix(&hex, 16).ok()?;
                result.push(char::from_u32(code_point)?);
            }
            _ => return None,
        }
    }
    Some(result)
}

impl LogosToken {
    fn into_token(self) -> Token {
        match self {
            LogosToken::Fn => Token::Fn,
            LogosToken::Let => Token::Let,
            LogosToken::Const => Token::Const,
            LogosToken::If => Token::If,
            LogosToken::Else => Token::Else,
            LogosToken::Switch => Token::Switch,
            LogosToken::Case => Token::Case,
            LogosToken::Default => Token::Default,
            LogosToken::For => Token::For,
            LogosToken::While => Token::While,
            LogosToken::Break => Token::Break,
            LogosToken::Continue => Token::Continue,
            LogosToken::Return => Token::Return,
            LogosToken::In => Token::In,
            LogosToken::Try => Token::Try,
            LogosToken::Catch => Token::Catch,
            LogosToken::Finally => Token::Finally,
            LogosToken::Throw => Token::Throw,
            LogosToken::Defer => Token::Defer,
            LogosToken::Define => Token::Define,
            LogosToken::Import => Token::Import,
            LogosToken::Export => Token::Export,
            LogosToken::True => Token::True,
            LogosToken::False => Token::False,
            LogosToken::Null => Token::Null,
            LogosToken::IntLiteral(n) => Token::IntLiteral(n),
            LogosToken::FloatLiteral(n) => Token::FloatLiteral(n),
            LogosToken::StringLiteral(s) => Token::StringLiteral(s),
            LogosToken::Identifier(name) => Token::Identifier(name),
            LogosToken::LeftParen => Token::LeftParen,
            LogosToken::RightParen => Token::RightParen,
            LogosToken::LeftBrace => Token::LeftBrace,
            LogosToken::RightBrace => Token::RightBrace,
            LogosToken::LeftBracket => Token::LeftBracket,
            LogosToken::RightBracket => Token::RightBracket,
            LogosToken::Comma => Token::Comma,
            LogosToken::Semicolon => Token::Semicolon,
            LogosToken::Colon => Token::Colon,
            LogosToken::Dot => Token::Dot,
            LogosToken::Question => Token::Question,
            LogosToken::PlusAssign => Token::PlusAssign,
            LogosToken::MinusAssign => Token::MinusAssign,
            LogosToken::StarAssign => Token::StarAssign,
            LogosToken::SlashAssign => Token::SlashAssign,
            LogosToken::PercentAssign => Token::PercentAssign,
            LogosToken::Eq => Token::Eq,
            LogosToken::NotEq => Token::NotEq,
            LogosToken::LtEq => Token::LtEq,
            LogosToken::GtEq => Token::GtEq,
            LogosToken::AndAnd => Token::AndAnd,
            LogosToken::OrOr => Token::OrOr,
            LogosToken::Shl => Token::Shl,
            LogosToken::Shr => Token::Shr,
            LogosToken::Plus => Token::Plus,
            LogosToken::Minus => Token::Minus,
            LogosToken::Star => Token::Star,
            LogosToken::Slash => Token::Slash,
            LogosToken::Percent => Token::Percent,
            LogosToken::Assign => Token::Assign,
            LogosToken::Lt => Token::Lt,
            LogosToken::Gt => Token::Gt,
            LogosToken::Not => Token::Not,
            LogosToken::Amp => Token::Amp,
            LogosToken::Pipe => Token::Pipe,
            LogosToken::Caret => Token::Caret,
            LogosToken::Tilde => Token::Tilde,
            LogosToken::Whitespace | LogosToken::LineComment | LogosToken::BlockComment => {
                unreachable!("skipped by logos")
            }
        }
    }
}

/// Tokenize Hemlock source into a spanned token stream.
///
/// The returned stream always ends with a single `Token::Eof`.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexError> {
    let line_starts = compute_line_starts(source);
    let mut tokens = Vec::new();
    let mut lexer = LogosToken::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let (line, column) = position_at(&line_starts, range.start);
        let span = Span::new(range.start, range.end, line, column);
        match result {
            Ok(tok) => tokens.push(SpannedToken {
                token: tok.into_token(),
                span,
            }),
            Err(()) => {
                return Err(LexError::UnexpectedCharacter {
                    text: source[range.clone()].to_string(),
                    line,
                    column,
                });
            }
        }
    }

    let (line, column) = position_at(&line_starts, source.len());
    tokens.push(SpannedToken {
        token: Token::Eof,
        span: Span::new(source.len(), source.len(), line, column),
    });
    Ok(tokens)
}

/// Byte offsets at which each line begins.
fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// 1-based (line, column) for a byte offset.
fn position_at(line_starts: &[usize], offset: usize) -> (u32, u32) {
    let line_idx = match line_starts.binary_search(&offset) {
        Ok(i) => i,
        Err(i) => i - 1,
    };
    let column = offset - line_starts[line_idx] + 1;
    (line_idx as u32 + 1, column as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        let toks = kinds("fn main() { let x = 1; }");
        assert_eq!(toks[0], Token::Fn);
        assert_eq!(toks[1], Token::Identifier("main".to_string()));
        assert_eq!(toks[5], Token::Let);
    }

    #[test]
    fn lexes_numeric_literals() {
        assert_eq!(kinds("42")[0], Token::IntLiteral(42));
        assert_eq!(kinds("0xff")[0], Token::IntLiteral(255));
        assert_eq!(kinds("0b1010")[0], Token::IntLiteral(10));
        assert_eq!(kinds("2.5")[0], Token::FloatLiteral(2.5));
        assert_eq!(kinds("1e3")[0], Token::FloatLiteral(1000.0));
        assert_eq!(kinds("1_000_000")[0], Token::IntLiteral(1_000_000));
    }

    #[test]
    fn lexes_string_escapes() {
        assert_eq!(
            kinds(r#""a\nb""#)[0],
            Token::StringLiteral("a\nb".to_string())
        );
        assert_eq!(
            kinds(r#""\u{1F600}""#)[0],
            Token::StringLiteral("\u{1F600}".to_string())
        );
        assert_eq!(
            kinds(r#""\x41""#)[0],
            Token::StringLiteral("A".to_string())
        );
    }

    #[test]
    fn skips_comments() {
        let toks = kinds("1 // line\n/* block\nstill */ 2");
        assert_eq!(toks[0], Token::IntLiteral(1));
        assert_eq!(toks[1], Token::IntLiteral(2));
    }

    #[test]
    fn tracks_line_and_column() {
        let toks = tokenize("let x;\nlet y;").unwrap();
        let y_let = &toks[3];
        assert_eq!(y_let.token, Token::Let);
        assert_eq!(y_let.span.line, 2);
        assert_eq!(y_let.span.column, 1);
    }

    #[test]
    fn two_char_operators_win_over_prefixes() {
        let toks = kinds("a <= b << c");
        assert_eq!(toks[1], Token::LtEq);
        assert_eq!(toks[3], Token::Shl);
    }

    #[test]
    fn rejects_stray_characters() {
        assert!(tokenize("let $x = 1;").is_err());
    }

    #[test]
    fn always_ends_with_eof() {
        let toks = tokenize("").unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].token, Token::Eof);
    }
}
