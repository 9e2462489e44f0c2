//! Recursive-descent parser for Hemlock.
//!
//! Consumes the spanned token stream produced by the lexer and builds the
//! AST. Binary expressions use precedence climbing; statements are
//! dispatched on their leading token.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::tokenize;
use crate::token::{Span, SpannedToken, Token};

/// Nesting limit shared by statements and expressions, so pathological
/// input fails with a parse error instead of exhausting the stack.
const MAX_PARSE_DEPTH: usize = 256;

/// Parse a complete source file or REPL input into a `Program`.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

/// Parser state over a token stream.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !self.check(&Token::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Program::new(statements))
    }

    // ── Token stream helpers ────────────────────────────────────────

    fn current(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn peek(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn advance(&mut self) -> SpannedToken {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, token: &Token) -> bool {
        self.current() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<SpannedToken, ParseError> {
        if self.check(token) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.current().clone() {
            Token::Identifier(name) => {
                let span = self.current_span();
                self.advance();
                Ok((name, span))
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.check(&Token::Eof) {
            return ParseError::UnexpectedEof {
                expected: expected.to_string(),
            };
        }
        let span = self.current_span();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current().describe(),
            line: span.line,
            column: span.column,
        }
    }

    /// Consume an optional statement-terminating semicolon.
    fn terminator(&mut self) {
        self.eat(&Token::Semicolon);
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            self.depth -= 1;
            let span = self.current_span();
            return Err(ParseError::UnexpectedToken {
                expected: "shallower nesting".to_string(),
                found: format!("nesting deeper than {}", MAX_PARSE_DEPTH),
                line: span.line,
                column: span.column,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ── Statements ──────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        self.enter()?;
        let result = self.parse_statement_inner();
        self.leave();
        result
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, ParseError> {
        match self.current() {
            Token::Let | Token::Const => self.parse_let(),
            Token::Fn => {
                // `fn name(...)` declares; `fn (...)` is a literal expression
                if matches!(self.peek(1), Token::Identifier(_)) {
                    self.parse_fn_decl()
                } else {
                    self.parse_expr_or_assign()
                }
            }
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::For => self.parse_for(),
            Token::Switch => self.parse_switch(),
            Token::Try => self.parse_try(),
            Token::Break => {
                let span = self.advance().span;
                self.terminator();
                Ok(Stmt::new(StmtKind::Break, span))
            }
            Token::Continue => {
                let span = self.advance().span;
                self.terminator();
                Ok(Stmt::new(StmtKind::Continue, span))
            }
            Token::Return => self.parse_return(),
            Token::Throw => {
                let start = self.advance().span;
                let value = self.parse_expression()?;
                self.terminator();
                let span = start.merge(&value.span);
                Ok(Stmt::new(StmtKind::Throw(value), span))
            }
            Token::Defer => {
                let start = self.advance().span;
                let expr = self.parse_expression()?;
                self.terminator();
                let span = start.merge(&expr.span);
                Ok(Stmt::new(StmtKind::Defer(expr), span))
            }
            Token::Define => self.parse_define(),
            Token::Import => {
                let start = self.advance().span;
                let path = match self.current().clone() {
                    Token::StringLiteral(s) => {
                        self.advance();
                        s
                    }
                    _ => return Err(self.unexpected("module path string")),
                };
                self.terminator();
                Ok(Stmt::new(StmtKind::Import(path), start))
            }
            Token::Export => {
                let start = self.advance().span;
                let inner = match self.current() {
                    Token::Let | Token::Const | Token::Fn | Token::Define => {
                        self.parse_statement()?
                    }
                    _ => return Err(self.unexpected("`let`, `const`, `fn` or `define`")),
                };
                let span = start.merge(&inner.span);
                Ok(Stmt::new(StmtKind::Export(Box::new(inner)), span))
            }
            Token::LeftBrace => {
                let start = self.current_span();
                let block = self.parse_block()?;
                Ok(Stmt::new(StmtKind::Block(block), start))
            }
            _ => self.parse_expr_or_assign(),
        }
    }

    /// `let`/`const` declaration. An initializer is required; `const`
    /// additionally freezes the binding.
    fn parse_let(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_span();
        let constant = matches!(self.current(), Token::Const);
        self.advance();
        let (name, _) = self.expect_identifier("binding name")?;
        let annot = self.parse_optional_annotation()?;
        self.expect(&Token::Assign)?;
        let init = self.parse_expression()?;
        self.terminator();
        let span = start.merge(&init.span);
        Ok(Stmt::new(
            StmtKind::Let {
                name,
                annot,
                init,
                constant,
            },
            span,
        ))
    }

    fn parse_optional_annotation(&mut self) -> Result<Option<TypeAnnot>, ParseError> {
        if !self.eat(&Token::Colon) {
            return Ok(None);
        }
        let (name, span) = self.expect_identifier("type name")?;
        Ok(Some(TypeAnnot { name, span }))
    }

    fn parse_fn_decl(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // `fn`
        let (name, _) = self.expect_identifier("function name")?;
        let func = self.parse_fn_rest()?;
        Ok(Stmt::new(StmtKind::FnDecl { name, func }, start))
    }

    /// Parameter list, optional return annotation, and body.
    fn parse_fn_rest(&mut self) -> Result<FnExpr, ParseError> {
        self.expect(&Token::LeftParen)?;
        let mut params = Vec::new();
        while !self.check(&Token::RightParen) {
            let (name, span) = self.expect_identifier("parameter name")?;
            let annot = self.parse_optional_annotation()?;
            let default = if self.eat(&Token::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Param {
                name,
                annot,
                default,
                span,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RightParen)?;
        let return_type = self.parse_optional_annotation()?;
        let body = self.parse_block()?;
        Ok(FnExpr {
            params,
            return_type,
            body,
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(&Token::LeftBrace)?;
        let mut statements = Vec::new();
        while !self.check(&Token::RightBrace) {
            if self.check(&Token::Eof) {
                return Err(ParseError::UnexpectedEof {
                    expected: "`}`".to_string(),
                });
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(&Token::RightBrace)?;
        Ok(statements)
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // `if`
        self.expect(&Token::LeftParen)?;
        let cond = self.parse_expression()?;
        self.expect(&Token::RightParen)?;
        let then_block = self.parse_block()?;
        let else_block = if self.eat(&Token::Else) {
            if self.check(&Token::If) {
                // Desugar `else if` into `else { if ... }`
                let nested = self.parse_if()?;
                Some(vec![nested])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If {
                cond,
                then_block,
                else_block,
            },
            start,
        ))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // `while`
        self.expect(&Token::LeftParen)?;
        let cond = self.parse_expression()?;
        self.expect(&Token::RightParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::new(StmtKind::While { cond, body }, start))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // `for`
        self.expect(&Token::LeftParen)?;

        // `for (k, v in coll)` - two identifiers, comma, `in`
        if matches!(self.current(), Token::Identifier(_))
            && self.peek(1) == &Token::Comma
            && matches!(self.peek(2), Token::Identifier(_))
            && self.peek(3) == &Token::In
        {
            let (key, _) = self.expect_identifier("loop key")?;
            self.expect(&Token::Comma)?;
            let (value, _) = self.expect_identifier("loop value")?;
            self.expect(&Token::In)?;
            let iterable = self.parse_expression()?;
            self.expect(&Token::RightParen)?;
            let body = self.parse_block()?;
            return Ok(Stmt::new(
                StmtKind::ForIn {
                    key,
                    value,
                    iterable,
                    body,
                },
                start,
            ));
        }

        // C-style `for (init; cond; step)`
        let init = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect(&Token::Semicolon)?;
        let cond = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::Semicolon)?;
        let step = if self.check(&Token::RightParen) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect(&Token::RightParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::For {
                init,
                cond,
                step,
                body,
            },
            start,
        ))
    }

    /// A `let` or assignment/expression without a terminator, as allowed
    /// in `for` headers.
    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        if matches!(self.current(), Token::Let | Token::Const) {
            let start = self.current_span();
            let constant = matches!(self.current(), Token::Const);
            self.advance();
            let (name, _) = self.expect_identifier("binding name")?;
            let annot = self.parse_optional_annotation()?;
            self.expect(&Token::Assign)?;
            let init = self.parse_expression()?;
            let span = start.merge(&init.span);
            return Ok(Stmt::new(
                StmtKind::Let {
                    name,
                    annot,
                    init,
                    constant,
                },
                span,
            ));
        }
        self.parse_assign_tail(false)
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // `switch`
        self.expect(&Token::LeftParen)?;
        let scrutinee = self.parse_expression()?;
        self.expect(&Token::RightParen)?;
        self.expect(&Token::LeftBrace)?;

        let mut cases = Vec::new();
        let mut default = None;
        while !self.check(&Token::RightBrace) {
            if self.eat(&Token::Case) {
                let value = self.parse_expression()?;
                self.expect(&Token::Colon)?;
                cases.push(SwitchCase {
                    value,
                    body: self.parse_case_body()?,
                });
            } else if self.eat(&Token::Default) {
                self.expect(&Token::Colon)?;
                if default.is_some() {
                    return Err(self.unexpected("a single `default` arm"));
                }
                default = Some(self.parse_case_body()?);
            } else {
                return Err(self.unexpected("`case`, `default` or `}`"));
            }
        }
        self.expect(&Token::RightBrace)?;
        Ok(Stmt::new(
            StmtKind::Switch {
                scrutinee,
                cases,
                default,
            },
            start,
        ))
    }

    /// Statements of a switch arm, up to the next `case`/`default`/`}`.
    fn parse_case_body(&mut self) -> Result<Block, ParseError> {
        let mut body = Vec::new();
        while !matches!(
            self.current(),
            Token::Case | Token::Default | Token::RightBrace
        ) {
            if self.check(&Token::Eof) {
                return Err(ParseError::UnexpectedEof {
                    expected: "`}`".to_string(),
                });
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // `try`
        let body = self.parse_block()?;
        let catch = if self.eat(&Token::Catch) {
            self.expect(&Token::LeftParen)?;
            let (name, _) = self.expect_identifier("catch parameter")?;
            self.expect(&Token::RightParen)?;
            Some(CatchClause {
                name,
                body: self.parse_block()?,
            })
        } else {
            None
        };
        let finally = if self.eat(&Token::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catch.is_none() && finally.is_none() {
            return Err(self.unexpected("`catch` or `finally`"));
        }
        Ok(Stmt::new(
            StmtKind::Try {
                body,
                catch,
                finally,
            },
            start,
        ))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // `return`
        let value = if matches!(
            self.current(),
            Token::Semicolon | Token::RightBrace | Token::Eof
        ) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.terminator();
        Ok(Stmt::new(StmtKind::Return(value), start))
    }

    fn parse_define(&mut self) -> Result<Stmt, ParseError> {
        let start = self.advance().span; // `define`
        let (name, _) = self.expect_identifier("type name")?;
        self.expect(&Token::LeftBrace)?;

        let mut fields: Vec<FieldDef> = Vec::new();
        while !self.check(&Token::RightBrace) {
            let (field_name, field_span) = self.expect_identifier("field name")?;
            if fields.iter().any(|f| f.name == field_name) {
                return Err(ParseError::DuplicateField {
                    name: field_name,
                    line: field_span.line,
                    column: field_span.column,
                });
            }
            let optional = self.eat(&Token::Question);
            let mut annot = None;
            let mut default = None;
            if self.eat(&Token::Colon) {
                if optional {
                    // Optional fields declare a default-value expression
                    default = Some(self.parse_expression()?);
                } else {
                    let (ty, span) = self.expect_identifier("type name")?;
                    annot = Some(TypeAnnot { name: ty, span });
                }
            } else if !optional {
                return Err(self.unexpected("`:` after required field"));
            }
            fields.push(FieldDef {
                name: field_name,
                optional,
                annot,
                default,
                span: field_span,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RightBrace)?;
        Ok(Stmt::new(StmtKind::Define { name, fields }, start))
    }

    /// Expression statement or (compound) assignment, with terminator.
    fn parse_expr_or_assign(&mut self) -> Result<Stmt, ParseError> {
        let stmt = self.parse_assign_tail(true)?;
        Ok(stmt)
    }

    fn parse_assign_tail(&mut self, terminated: bool) -> Result<Stmt, ParseError> {
        let expr = self.parse_expression()?;
        let op = match self.current() {
            Token::Assign => Some(AssignOp::Assign),
            Token::PlusAssign => Some(AssignOp::Add),
            Token::MinusAssign => Some(AssignOp::Sub),
            Token::StarAssign => Some(AssignOp::Mul),
            Token::SlashAssign => Some(AssignOp::Div),
            Token::PercentAssign => Some(AssignOp::Mod),
            _ => None,
        };
        let stmt = match op {
            Some(op) => {
                if !expr.is_lvalue() {
                    return Err(ParseError::InvalidAssignmentTarget {
                        line: expr.span.line,
                        column: expr.span.column,
                    });
                }
                self.advance();
                let value = self.parse_expression()?;
                let span = expr.span.merge(&value.span);
                Stmt::new(
                    StmtKind::Assign {
                        target: expr,
                        op,
                        value,
                    },
                    span,
                )
            }
            None => {
                let span = expr.span;
                Stmt::new(StmtKind::Expr(expr), span)
            }
        };
        if terminated {
            self.terminator();
        }
        Ok(stmt)
    }

    // ── Expressions ─────────────────────────────────────────────────

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let result = self.parse_binary(0);
        self.leave();
        result
    }

    /// Binary operators at `min_level` or tighter, by precedence climbing.
    fn parse_binary(&mut self, min_level: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let (op, level) = match self.current() {
                Token::OrOr => (BinaryOp::Or, 1),
                Token::AndAnd => (BinaryOp::And, 2),
                Token::Pipe => (BinaryOp::BitOr, 3),
                Token::Caret => (BinaryOp::BitXor, 4),
                Token::Amp => (BinaryOp::BitAnd, 5),
                Token::Eq => (BinaryOp::Eq, 6),
                Token::NotEq => (BinaryOp::Ne, 6),
                Token::Lt => (BinaryOp::Lt, 7),
                Token::LtEq => (BinaryOp::Le, 7),
                Token::Gt => (BinaryOp::Gt, 7),
                Token::GtEq => (BinaryOp::Ge, 7),
                Token::Shl => (BinaryOp::Shl, 8),
                Token::Shr => (BinaryOp::Shr, 8),
                Token::Plus => (BinaryOp::Add, 9),
                Token::Minus => (BinaryOp::Sub, 9),
                Token::Star => (BinaryOp::Mul, 10),
                Token::Slash => (BinaryOp::Div, 10),
                Token::Percent => (BinaryOp::Mod, 10),
                _ => break,
            };
            if level < min_level {
                break;
            }
            self.advance();
            let right = self.parse_binary(level + 1)?;
            let span = left.span.merge(&right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current() {
            Token::Minus => Some(UnaryOp::Neg),
            Token::Not => Some(UnaryOp::Not),
            Token::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.merge(&operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    /// Calls, indexing, and member access bind tightest.
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current() {
                Token::LeftParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check(&Token::RightParen) {
                        args.push(self.parse_expression()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    let close = self.expect(&Token::RightParen)?;
                    let span = expr.span.merge(&close.span);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let close = self.expect(&Token::RightBracket)?;
                    let span = expr.span.merge(&close.span);
                    expr = Expr::new(
                        ExprKind::Index {
                            target: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                Token::Dot => {
                    self.advance();
                    let (field, field_span) = self.expect_identifier("field name")?;
                    let span = expr.span.merge(&field_span);
                    expr = Expr::new(
                        ExprKind::Member {
                            target: Box::new(expr),
                            field,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        let kind = match self.current().clone() {
            Token::IntLiteral(n) => {
                self.advance();
                ExprKind::Int(n)
            }
            Token::FloatLiteral(n) => {
                self.advance();
                ExprKind::Float(n)
            }
            Token::StringLiteral(s) => {
                self.advance();
                ExprKind::Str(s)
            }
            Token::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            Token::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            Token::Null => {
                self.advance();
                ExprKind::Null
            }
            Token::Identifier(name) => {
                self.advance();
                ExprKind::Ident(name)
            }
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                return Ok(inner);
            }
            Token::LeftBracket => return self.parse_array_literal(),
            Token::LeftBrace => return self.parse_object_literal(),
            Token::Fn => {
                self.advance();
                let func = self.parse_fn_rest()?;
                ExprKind::Function(func)
            }
            _ => return Err(self.unexpected("an expression")),
        };
        Ok(Expr::new(kind, span))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&Token::LeftBracket)?.span;
        let mut elements = Vec::new();
        while !self.check(&Token::RightBracket) {
            elements.push(self.parse_expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let close = self.expect(&Token::RightBracket)?;
        Ok(Expr::new(ExprKind::Array(elements), start.merge(&close.span)))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(&Token::LeftBrace)?.span;
        let mut fields: Vec<(String, Expr)> = Vec::new();
        while !self.check(&Token::RightBrace) {
            let (name, name_span) = self.expect_identifier("field name")?;
            if fields.iter().any(|(n, _)| n == &name) {
                return Err(ParseError::DuplicateField {
                    name,
                    line: name_span.line,
                    column: name_span.column,
                });
            }
            self.expect(&Token::Colon)?;
            let value = self.parse_expression()?;
            fields.push((name, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let close = self.expect(&Token::RightBrace)?;
        Ok(Expr::new(ExprKind::Object(fields), start.merge(&close.span)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_stmt(source: &str) -> Stmt {
        parse(source).unwrap().statements.into_iter().next().unwrap()
    }

    #[test]
    fn parses_let_with_annotation() {
        let stmt = first_stmt("let x: i32 = 1;");
        match stmt.kind {
            StmtKind::Let {
                name,
                annot,
                constant,
                ..
            } => {
                assert_eq!(name, "x");
                assert_eq!(annot.unwrap().name, "i32");
                assert!(!constant);
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn precedence_mul_binds_over_add() {
        let stmt = first_stmt("1 + 2 * 3;");
        match stmt.kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Binary { op, right, .. },
                ..
            }) => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn parses_method_call_chain() {
        let stmt = first_stmt(r#"a.b(1)[2].c;"#);
        assert!(matches!(
            stmt.kind,
            StmtKind::Expr(Expr {
                kind: ExprKind::Member { .. },
                ..
            })
        ));
    }

    #[test]
    fn parses_for_in() {
        let stmt = first_stmt("for (k, v in obj) { }");
        match stmt.kind {
            StmtKind::ForIn { key, value, .. } => {
                assert_eq!(key, "k");
                assert_eq!(value, "v");
            }
            other => panic!("expected for-in, got {:?}", other),
        }
    }

    #[test]
    fn parses_c_style_for() {
        let stmt = first_stmt("for (let i = 0; i < 10; i += 1) { }");
        assert!(matches!(stmt.kind, StmtKind::For { .. }));
    }

    #[test]
    fn parses_try_catch_finally() {
        let stmt = first_stmt(r#"try { } catch (e) { } finally { }"#);
        match stmt.kind {
            StmtKind::Try { catch, finally, .. } => {
                assert_eq!(catch.unwrap().name, "e");
                assert!(finally.is_some());
            }
            other => panic!("expected try, got {:?}", other),
        }
    }

    #[test]
    fn try_requires_catch_or_finally() {
        assert!(parse("try { }").is_err());
    }

    #[test]
    fn parses_define_with_optional_field() {
        let stmt = first_stmt("define P { name: string, active?: true }");
        match stmt.kind {
            StmtKind::Define { name, fields } => {
                assert_eq!(name, "P");
                assert_eq!(fields.len(), 2);
                assert!(!fields[0].optional);
                assert_eq!(fields[0].annot.as_ref().unwrap().name, "string");
                assert!(fields[1].optional);
                assert!(fields[1].default.is_some());
            }
            other => panic!("expected define, got {:?}", other),
        }
    }

    #[test]
    fn rejects_duplicate_define_field() {
        assert!(matches!(
            parse("define P { a: i32, a: i32 }"),
            Err(ParseError::DuplicateField { .. })
        ));
    }

    #[test]
    fn assignment_requires_lvalue() {
        assert!(matches!(
            parse("1 + 2 = 3;"),
            Err(ParseError::InvalidAssignmentTarget { .. })
        ));
    }

    #[test]
    fn unclosed_block_is_incomplete() {
        let err = parse("fn f() {").unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn parses_fn_literal_expression() {
        let stmt = first_stmt("let f = fn (a, b = 2) { return a + b; };");
        match stmt.kind {
            StmtKind::Let { init, .. } => match init.kind {
                ExprKind::Function(func) => {
                    assert_eq!(func.params.len(), 2);
                    assert!(func.params[1].default.is_some());
                }
                other => panic!("expected fn literal, got {:?}", other),
            },
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn parses_switch() {
        let src = r#"
            switch (x) {
                case 1: print("one");
                case 2: print("two");
                default: print("other");
            }
        "#;
        let stmt = first_stmt(src);
        match stmt.kind {
            StmtKind::Switch { cases, default, .. } => {
                assert_eq!(cases.len(), 2);
                assert!(default.is_some());
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn else_if_desugars_to_nested_if() {
        let stmt = first_stmt("if (a) { } else if (b) { } else { }");
        match stmt.kind {
            StmtKind::If { else_block, .. } => {
                let nested = else_block.unwrap();
                assert_eq!(nested.len(), 1);
                assert!(matches!(nested[0].kind, StmtKind::If { .. }));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn statement_level_brace_is_block() {
        let stmt = first_stmt("{ let x = 1; }");
        assert!(matches!(stmt.kind, StmtKind::Block(_)));
    }
}
