//! Rendering of lexer and parser failures with source context.

use crate::syntax::lexer::LexError;
use crate::syntax::parser::ParseError;
use crate::syntax::tokens::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A rendered diagnostic with source context.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: Option<usize>,
    pub col: Option<usize>,
    pub source_line: Option<String>,
    pub underline: Option<String>,
}

impl Diagnostic {
    /// Builds a diagnostic from a parse error, resolving the token index
    /// through the token stream the parser consumed.
    pub fn from_parse_error(err: &ParseError, tokens: &[Token], source: &str) -> Self {
        let (line, col, width) = match tokens.get(err.pos) {
            Some(t) => (t.span.line, t.span.col, t.text.chars().count().max(1)),
            None => match tokens.last() {
                // Failure at the end-of-file sentinel: point just past the
                // last real token.
                Some(t) => (t.span.line, t.span.col + t.text.chars().count(), 1),
                None => (1, 1, 1),
            },
        };
        let source_line = source.lines().nth(line.saturating_sub(1)).map(String::from);
        let underline = source_line.as_ref().map(|_| {
            let mut u = " ".repeat(col.saturating_sub(1));
            u.push_str(&"^".repeat(width));
            u
        });
        Self {
            severity: Severity::Error,
            message: err.message.clone(),
            line: Some(line),
            col: Some(col),
            source_line,
            underline,
        }
    }

    pub fn from_lex_error(err: &LexError, source: &str) -> Self {
        let (line, col) = match err {
            LexError::UnexpectedChar { line, col, .. }
            | LexError::UnterminatedString { line, col }
            | LexError::UnterminatedChar { line, col }
            | LexError::UnterminatedComment { line, col } => (*line, *col),
        };
        let source_line = source.lines().nth(line.saturating_sub(1)).map(String::from);
        let underline = source_line.as_ref().map(|_| {
            let mut u = " ".repeat(col.saturating_sub(1));
            u.push('^');
            u
        });
        Self {
            severity: Severity::Error,
            message: err.to_string(),
            line: Some(line),
            col: Some(col),
            source_line,
            underline,
        }
    }

    /// Renders with ANSI colors for a terminal.
    pub fn render_ansi(&self) -> String {
        let label = match self.severity {
            Severity::Error => "\x1b[1;31merror\x1b[0m",
            Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            Severity::Note => "\x1b[1;36mnote\x1b[0m",
        };
        self.render_with_label(label)
    }

    pub fn render_plain(&self) -> String {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        self.render_with_label(label)
    }

    fn render_with_label(&self, label: &str) -> String {
        let mut out = format!("{}: {}", label, self.message);
        if let (Some(line), Some(col)) = (self.line, self.col) {
            out.push_str(&format!("\n  --> line {}, col {}", line, col));
        }
        if let Some(src) = &self.source_line {
            out.push_str(&format!("\n   |\n   | {}", src));
            if let Some(u) = &self.underline {
                out.push_str(&format!("\n   | {}", u));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;
    use crate::syntax::parser::Parser;

    #[test]
    fn parse_error_resolves_token_position() {
        let source = "class C {\n    int = 5;\n}";
        let tokens = Lexer::new(source).tokenize().unwrap();
        let err = Parser::new(tokens.clone()).parse_document().unwrap_err();
        let d = Diagnostic::from_parse_error(&err, &tokens, source);
        assert_eq!(d.line, Some(2));
        assert!(d.source_line.unwrap().contains("int = 5"));
        assert!(d.message.starts_with("EXPECTED:"));
    }

    #[test]
    fn plain_rendering_has_no_escapes() {
        let source = "class C { int = 5; }";
        let tokens = Lexer::new(source).tokenize().unwrap();
        let err = Parser::new(tokens.clone()).parse_document().unwrap_err();
        let d = Diagnostic::from_parse_error(&err, &tokens, source);
        let plain = d.render_plain();
        assert!(!plain.contains('\x1b'));
        assert!(plain.contains("error:"));
    }
}
