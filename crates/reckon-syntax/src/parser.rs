//! Recursive descent parser that drives an expression [`Builder`].
//!
//! Parsing never produces a syntax tree: every construct is appended to the
//! builder as soon as its operands are known, so parsed expressions go
//! through the same deduplication and validation as hand-built ones.

use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};
use reckon_eval::{
    BinOp, BuildError, Builder, Expression, OpId, Pool, Scalar, Store, UnaryOp,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Maximum nesting depth of parenthesized constructs.
pub const MAX_DEPTH: usize = 256;

/// Parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected token at {span}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("invalid syntax at {span}: {message}")]
    InvalidSyntax { message: String, span: Span },
    #[error("invalid {label} constant at {span}: {message}")]
    InvalidLiteral {
        label: String,
        message: String,
        span: Span,
    },
    #[error("{label} constants are not supported by this store at {span} (supported: {kinds})")]
    Store {
        label: String,
        kinds: String,
        span: Span,
    },
    #[error("expression nesting exceeds {limit} levels at {span}")]
    TooDeep { limit: usize, span: Span },
    #[error(transparent)]
    Build(#[from] BuildError),
}

impl ParseError {
    /// Source span where this error occurred, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::InvalidSyntax { span, .. }
            | ParseError::InvalidLiteral { span, .. }
            | ParseError::Store { span, .. }
            | ParseError::TooDeep { span, .. } => Some(*span),
            ParseError::Build(_) => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse `source` into an expression, with the built-in extension functions.
pub fn parse<S: Store>(source: &str) -> ParseResult<Expression<S>> {
    Parser::new(source, Builder::with_pool(Arc::new(Pool::builtin()))).parse()
}

/// Parse a single constant: a typed literal such as `int{11}`, or `null`.
pub fn parse_value<S: Store>(source: &str) -> ParseResult<S> {
    let mut tokens = Lexer::new(source).tokenize().into_iter();
    let first = tokens.next().unwrap_or_else(|| Token::new(TokenKind::Eof, Span::default()));
    let value = match first.kind {
        TokenKind::Literal { label, body } => literal(&label, &body, first.span)?,
        TokenKind::Ident(name) if name == "null" => S::null(),
        TokenKind::Error(message) => {
            return Err(ParseError::InvalidSyntax {
                message,
                span: first.span,
            })
        }
        other => {
            return Err(ParseError::UnexpectedToken {
                expected: "constant".to_string(),
                found: other.to_string(),
                span: first.span,
            })
        }
    };
    match tokens.next() {
        Some(token) if !token.is_eof() => Err(ParseError::UnexpectedToken {
            expected: TokenKind::Eof.to_string(),
            found: token.kind.to_string(),
            span: token.span,
        }),
        _ => Ok(value),
    }
}

/// Build a store value from a typed literal.
fn literal<S: Store>(label: &str, body: &str, span: Span) -> ParseResult<S> {
    let unsupported = || ParseError::Store {
        label: label.to_string(),
        kinds: S::kinds().join(", "),
        span,
    };
    if !S::kinds().contains(&label) {
        return Err(unsupported());
    }
    let invalid = |message: String| ParseError::InvalidLiteral {
        label: label.to_string(),
        message,
        span,
    };
    let scalar = match label {
        "bool" => match body.trim() {
            "true" => Scalar::Bool(true),
            "false" => Scalar::Bool(false),
            other => return Err(invalid(format!("expected true or false, found '{other}'"))),
        },
        "int" => Scalar::Int(body.trim().parse().map_err(|e| invalid(format!("{e}")))?),
        "double" => Scalar::Float(body.trim().parse().map_err(|e| invalid(format!("{e}")))?),
        "text" => Scalar::Text(body.to_string()),
        _ => return Err(unsupported()),
    };
    S::admit(scalar).ok_or_else(unsupported)
}

/// Parser for reckon source text.
pub struct Parser<S: Store> {
    tokens: Vec<Token>,
    pos: usize,
    builder: Builder<S>,
    /// Current nesting depth.
    depth: usize,
}

impl<S: Store> Parser<S> {
    /// Create a parser that appends to `builder`.
    pub fn new(source: &str, builder: Builder<S>) -> Self {
        Self {
            tokens: Lexer::new(source).tokenize(),
            pos: 0,
            builder,
            depth: 0,
        }
    }

    /// Parse a complete expression and build it.
    pub fn parse(mut self) -> ParseResult<Expression<S>> {
        self.parse_expr()?;
        self.expect(TokenKind::Eof)?;
        debug!(ops = self.builder.len(), "parsed expression");
        Ok(self.builder.build()?)
    }

    fn parse_expr(&mut self) -> ParseResult<OpId> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Literal { label, body } => {
                self.advance();
                let value: S = literal(&label, &body, token.span)?;
                Ok(self.builder.constant(value)?)
            }
            TokenKind::Var(name) => {
                self.advance();
                Ok(self.builder.var(&name)?)
            }
            TokenKind::Ident(name) if name == "null" => {
                self.advance();
                Ok(self.builder.null()?)
            }
            TokenKind::Ident(name) if name == "if" => {
                self.advance();
                self.nested(token.span, Self::parse_branch)
            }
            TokenKind::At => {
                self.advance();
                self.nested(token.span, Self::parse_call)
            }
            TokenKind::LParen => {
                self.advance();
                self.nested(token.span, Self::parse_arithmetic)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn nested(
        &mut self,
        span: Span,
        inner: fn(&mut Self) -> ParseResult<OpId>,
    ) -> ParseResult<OpId> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep {
                limit: MAX_DEPTH,
                span,
            });
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    /// `(op expr)` or `(expr op expr)`, after the opening parenthesis.
    fn parse_arithmetic(&mut self) -> ParseResult<OpId> {
        if let TokenKind::Sign(sign) = self.peek().kind {
            if let Some(op) = UnaryOp::from_sign(sign) {
                self.advance();
                let arg = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                return Ok(self.builder.unary(op, arg)?);
            }
        }

        let lhs = self.parse_expr()?;
        let op = self.binary_op()?;
        let rhs = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(self.builder.binary(op, lhs, rhs)?)
    }

    fn binary_op(&mut self) -> ParseResult<BinOp> {
        if let TokenKind::Sign(sign) = self.peek().kind {
            if let Some(op) = BinOp::from_sign(sign) {
                self.advance();
                return Ok(op);
            }
        }
        Err(self.unexpected("binary operator"))
    }

    /// `(cond, then, otherwise)` after `if`.
    fn parse_branch(&mut self) -> ParseResult<OpId> {
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Comma)?;
        let then = self.parse_expr()?;
        self.expect(TokenKind::Comma)?;
        let otherwise = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(self.builder.branch(cond, then, otherwise)?)
    }

    /// `name(args...)` after `@`.
    fn parse_call(&mut self) -> ParseResult<OpId> {
        let TokenKind::Ident(name) = self.peek().kind.clone() else {
            return Err(self.unexpected("function name"));
        };
        self.advance();
        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(self.builder.fun(&name, args)?)
    }

    fn peek(&self) -> &Token {
        // The token stream always ends with Eof, and `advance` never moves
        // past it.
        &self.tokens[self.pos]
    }

    fn advance(&mut self) {
        if !self.peek().is_eof() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    /// Error for the current token: lexing errors are reported as such.
    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        match &token.kind {
            TokenKind::Error(message) => ParseError::InvalidSyntax {
                message: message.clone(),
                span: token.span,
            },
            found => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
                span: token.span,
            },
        }
    }
}
