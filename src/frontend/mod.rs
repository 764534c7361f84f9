pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod token;
pub mod token_dumper;

pub use lexer::{Lexer, LexerError, Span, Spanned};
pub use parser::Parser;
pub use parser_error::ParserError;
pub use token::Token;
pub use token_dumper::TokenDumper;

use crate::lang::Program;

/// Lex and parse `source` in one go.
pub fn parse_source(source: &str) -> Result<Program, ParserError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}
