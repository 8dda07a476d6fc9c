//! Lexer for the reckon expression grammar.
//!
//! Braced bodies (`int{42}`, `${name}`) are read raw: any character may be
//! escaped with a backslash, which is how `{`, `}` and `\` appear inside them.

use crate::token::{Span, Token, TokenKind};
use std::str::Chars;

/// Operator signs, longest first so that `>=` wins over `>`.
const SIGNS: [&str; 17] = [
    "==", "!=", ">=", "<=", "&&", "||", "+", "-", "*", "/", "%", ">", "<", "&", "|", "^", "!",
];

/// Lexer for reckon source text.
pub struct Lexer<'a> {
    /// Source text being lexed.
    source: &'a str,
    /// Character iterator.
    chars: Chars<'a>,
    /// Current byte position.
    pos: usize,
    /// Current line number (1-indexed).
    line: u32,
    /// Current column number (1-indexed).
    column: u32,
    /// Start position of current token.
    token_start: usize,
    token_start_line: u32,
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            pos: 0,
            line: 1,
            column: 1,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Tokenize the entire source, returning all tokens including EOF.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.mark_token_start();

        let Some(c) = self.peek() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            ',' => self.single(TokenKind::Comma),
            '@' => self.single(TokenKind::At),
            '~' => self.single(TokenKind::Sign("~")),
            '$' => self.lex_variable(),
            c if c.is_alphabetic() || c == '_' => self.lex_identifier(),
            _ => self.lex_sign(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn mark_token_start(&mut self) {
        self.token_start = self.pos;
        self.token_start_line = self.line;
        self.token_start_column = self.column;
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            Span::new(
                self.token_start,
                self.pos,
                self.token_start_line,
                self.token_start_column,
            ),
        )
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.advance();
        self.make_token(kind)
    }

    /// Identifier, or a typed constant when a `{` follows.
    fn lex_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let label = self.source[self.token_start..self.pos].to_string();

        let rest = self.chars.as_str().trim_start();
        if !rest.starts_with('{') {
            return self.make_token(TokenKind::Ident(label));
        }
        self.skip_whitespace();
        self.advance();
        match self.lex_body() {
            Ok(body) => self.make_token(TokenKind::Literal { label, body }),
            Err(message) => self.make_token(TokenKind::Error(message)),
        }
    }

    /// `${name}`
    fn lex_variable(&mut self) -> Token {
        self.advance();
        if self.peek() != Some('{') {
            return self.make_token(TokenKind::Error("expected '{' after '$'".to_string()));
        }
        self.advance();
        match self.lex_body() {
            Ok(name) if name.is_empty() => {
                self.make_token(TokenKind::Error("empty variable name".to_string()))
            }
            Ok(name) => self.make_token(TokenKind::Var(name)),
            Err(message) => self.make_token(TokenKind::Error(message)),
        }
    }

    /// Raw body after an opening `{`, up to the closing `}`.
    fn lex_body(&mut self) -> Result<String, String> {
        let mut body = String::new();
        loop {
            match self.advance() {
                Some('}') => return Ok(body),
                Some('\\') => match self.advance() {
                    Some(c) => body.push(c),
                    None => return Err("unterminated escape".to_string()),
                },
                Some(c) => body.push(c),
                None => return Err("unterminated '{'".to_string()),
            }
        }
    }

    fn lex_sign(&mut self) -> Token {
        let rest = self.chars.as_str();
        match SIGNS.into_iter().find(|sign| rest.starts_with(sign)) {
            Some(sign) => {
                for _ in 0..sign.len() {
                    self.advance();
                }
                self.make_token(TokenKind::Sign(sign))
            }
            None => {
                let c = self.advance().unwrap_or_default();
                self.make_token(TokenKind::Error(format!("unexpected character: {c}")))
            }
        }
    }
}

/// Escape `{`, `}` and `\` for use inside a braced body.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '{' | '}' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_literals_and_variables() {
        assert_eq!(
            kinds("int{42} ${a b} text { x\\}y }"),
            vec![
                TokenKind::Literal {
                    label: "int".to_string(),
                    body: "42".to_string()
                },
                TokenKind::Var("a b".to_string()),
                TokenKind::Literal {
                    label: "text".to_string(),
                    body: " x}y ".to_string()
                },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_signs() {
        assert_eq!(
            kinds(">= > ! != ~ &&"),
            vec![
                TokenKind::Sign(">="),
                TokenKind::Sign(">"),
                TokenKind::Sign("!"),
                TokenKind::Sign("!="),
                TokenKind::Sign("~"),
                TokenKind::Sign("&&"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_call_tokens() {
        assert_eq!(
            kinds("@avail(null, if)"),
            vec![
                TokenKind::At,
                TokenKind::Ident("avail".to_string()),
                TokenKind::LParen,
                TokenKind::Ident("null".to_string()),
                TokenKind::Comma,
                TokenKind::Ident("if".to_string()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(kinds("int{42")[0], TokenKind::Error(_)));
        assert!(matches!(kinds("${}")[0], TokenKind::Error(_)));
        assert!(matches!(kinds("$a")[0], TokenKind::Error(_)));
        assert!(matches!(kinds("42")[0], TokenKind::Error(_)));
        assert!(matches!(kinds("=")[0], TokenKind::Error(_)));
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::new("(\n  ${x}").tokenize();
        assert_eq!(tokens[1].span, Span::new(4, 8, 2, 3));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a{b}\\c"), "a\\{b\\}\\\\c");
    }
}
