//! cusp — parse C# source files and print regenerated source, JSON ASTs,
//! or diagnostics with the best-effort partial tree.

use clap::{Parser as CliParser, Subcommand};
use cusp_syntax::diagnostics::Diagnostic;
use cusp_syntax::syntax::lexer::Lexer;
use cusp_syntax::syntax::parser::{Parser, Partial};
use cusp_syntax::syntax::printer;
use cusp_syntax::syntax::tokens::Token;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(CliParser)]
#[command(
    name = "cusp",
    version,
    about = "A faithful, round-trippable parser for the C# 4 grammar"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a file and write the regenerated source to stdout
    Print { file: PathBuf },
    /// Parse a file and report diagnostics; exits non-zero on error
    Check {
        file: PathBuf,
        /// Disable ANSI colors
        #[arg(long)]
        plain: bool,
    },
    /// Dump the parsed AST as JSON
    Ast {
        file: PathBuf,
        /// Single-line output instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Print { file } => with_parsed(&file, |doc, _, _| {
            print!("{}", printer::document_to_source(&doc));
            ExitCode::SUCCESS
        }),
        Command::Check { file, plain } => check(&file, plain),
        Command::Ast { file, compact } => with_parsed(&file, |doc, _, _| {
            let json = if compact {
                serde_json::to_string(&doc)
            } else {
                serde_json::to_string_pretty(&doc)
            };
            match json {
                Ok(s) => {
                    println!("{}", s);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error: failed to serialize AST: {}", e);
                    ExitCode::FAILURE
                }
            }
        }),
    }
}

fn read_source(file: &PathBuf) -> Result<String, ExitCode> {
    std::fs::read_to_string(file).map_err(|e| {
        eprintln!("error: cannot read {}: {}", file.display(), e);
        ExitCode::FAILURE
    })
}

fn with_parsed(
    file: &PathBuf,
    f: impl FnOnce(cusp_syntax::ast::Document, Vec<Token>, String) -> ExitCode,
) -> ExitCode {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let tokens = match Lexer::new(&source).tokenize() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", Diagnostic::from_lex_error(&e, &source).render_ansi());
            return ExitCode::FAILURE;
        }
    };
    match Parser::new(tokens.clone()).parse_document() {
        Ok(doc) => f(doc, tokens, source),
        Err(e) => {
            eprintln!("{}", Diagnostic::from_parse_error(&e, &tokens, &source).render_ansi());
            ExitCode::FAILURE
        }
    }
}

fn check(file: &PathBuf, plain: bool) -> ExitCode {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let tokens = match Lexer::new(&source).tokenize() {
        Ok(t) => t,
        Err(e) => {
            let d = Diagnostic::from_lex_error(&e, &source);
            eprintln!("{}", if plain { d.render_plain() } else { d.render_ansi() });
            return ExitCode::FAILURE;
        }
    };
    match Parser::new(tokens.clone()).parse_document() {
        Ok(_) => {
            println!("{}: ok", file.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            let d = Diagnostic::from_parse_error(&e, &tokens, &source);
            eprintln!("{}", if plain { d.render_plain() } else { d.render_ansi() });
            if let Some(partial) = &e.partial {
                eprintln!("\npartial parse up to the error:");
                eprint!("{}", partial_to_source(partial));
            }
            ExitCode::FAILURE
        }
    }
}

fn partial_to_source(partial: &Partial) -> String {
    match partial {
        Partial::Document(d) => printer::document_to_source(d),
        Partial::Namespace(n) => printer::namespace_to_source(n),
        Partial::Member(m) => printer::member_to_source(m),
        Partial::Statement(s) => printer::statement_to_source(s),
        Partial::Expr(e) => {
            let mut s = printer::expr_to_source(e);
            s.push('\n');
            s
        }
        Partial::Type(t) => {
            let mut s = printer::type_ref_to_source(t);
            s.push('\n');
            s
        }
    }
}
