//! cusp-syntax
//!
//! A hand-written, round-trippable parser for the C# 4 grammar: generics,
//! nullable value types, pointer types, query comprehensions, lambdas and
//! anonymous methods, operator overloading, explicit interface members,
//! partial types, iterators and user-defined conversions.
//!
//! The pipeline is `source text -> tokens -> recursive descent -> AST`;
//! the printer regenerates source that is whitespace-insensitively equal
//! to the input. On a syntax error the [`syntax::parser::ParseError`]
//! carries the best-effort partial tree built so far, so tooling can show
//! structure alongside the diagnostic.
//!
//! ```
//! let doc = cusp_syntax::parse_document("class C { int f = 1, g; }").unwrap();
//! assert_eq!(doc.types.len(), 1);
//! let printed = cusp_syntax::document_to_source(&doc);
//! assert!(printed.contains("int f = 1, g;"));
//! ```

pub mod diagnostics;
pub mod syntax;

pub use syntax::ast;
pub use syntax::parser::{ParseError, Partial};
pub use syntax::printer::{document_to_source, expr_to_source, statement_to_source};

use syntax::ast::{Document, Expr, Statement};
use syntax::lexer::{LexError, Lexer};
use syntax::parser::Parser;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(ParseError),
}

/// Parses a whole compilation unit.
pub fn parse_document(source: &str) -> Result<Document, SyntaxError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens)
        .parse_document()
        .map_err(SyntaxError::Parse)
}

/// Parses a single expression spanning the whole input.
pub fn parse_expression(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr(0).map_err(SyntaxError::Parse)?;
    if !parser.at_end() {
        return Err(SyntaxError::Parse(ParseError::new(
            "EXPECTED: end of input",
            parser.pos(),
        )));
    }
    Ok(expr)
}

/// Parses a single statement spanning the whole input.
pub fn parse_statement(source: &str) -> Result<Statement, SyntaxError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let stmt = parser.parse_statement().map_err(SyntaxError::Parse)?;
    if !parser.at_end() {
        return Err(SyntaxError::Parse(ParseError::new(
            "EXPECTED: end of input",
            parser.pos(),
        )));
    }
    Ok(stmt)
}
