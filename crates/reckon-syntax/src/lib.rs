//! Lexer, parser, and printer for reckon expression text.

pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod token;

pub use lexer::{escape, Lexer};
pub use parser::{parse, parse_value, ParseError, ParseResult, Parser, MAX_DEPTH};
pub use pretty::{print, print_bounded, print_value, printed_len};
pub use token::{Span, Token, TokenKind};
