//! Error-path tests: message wording, token positions, and the partial
//! tree carried by the error through every enclosing production.

use cusp_syntax::ast::*;
use cusp_syntax::syntax::lexer::Lexer;
use cusp_syntax::syntax::parser::{ParseError, Parser, Partial};

fn parse_err(source: &str) -> ParseError {
    let tokens = Lexer::new(source).tokenize().unwrap();
    match Parser::new(tokens).parse_document() {
        Ok(_) => panic!("source unexpectedly parsed\n--- source ---\n{}", source),
        Err(e) => e,
    }
}

/// The partial document every failed parse carries at the outermost level.
fn partial_doc(source: &str) -> (ParseError, Document) {
    let mut e = parse_err(source);
    let doc = match e.partial.take() {
        Some(Partial::Document(d)) => *d,
        other => panic!(
            "expected a partial document, got {:?}\n--- source ---\n{}",
            other, source
        ),
    };
    (e, doc)
}

struct ErrorCase {
    id: &'static str,
    source: &'static str,
    expect_substring: &'static str,
}

fn assert_error(case: &ErrorCase) {
    let e = parse_err(case.source);
    let msg = e.message.to_lowercase();
    assert!(
        msg.contains(&case.expect_substring.to_lowercase()),
        "case '{}' message mismatch\nexpected substring: {}\nactual: {}",
        case.id,
        case.expect_substring,
        e.message
    );
}

// ── Message wording ────────────────────────────────────────────────────

#[test]
fn expected_messages_and_invalid_constructions() {
    let cases = [
        ErrorCase {
            id: "missing-semicolon",
            source: "class C { int f = 1 }",
            expect_substring: "EXPECTED:",
        },
        ErrorCase {
            id: "stray-semicolon-member",
            source: "class C { ; }",
            expect_substring: "EXPECTED:",
        },
        ErrorCase {
            id: "disallowed-modifier-field",
            source: "class C { virtual int f; }",
            expect_substring: "modifier 'virtual' is not valid on a field",
        },
        ErrorCase {
            id: "disallowed-modifier-ctor",
            source: "class C { abstract C() { } }",
            expect_substring: "modifier 'abstract' is not valid on a constructor",
        },
        ErrorCase {
            id: "destructor-with-parameters",
            source: "class C { ~C(int x) { } }",
            expect_substring: "destructor cannot have parameters",
        },
        ErrorCase {
            id: "duplicate-constraint-clause",
            source: "class C<T> where T : class where T : new() { }",
            expect_substring: "duplicate constraint clause for 'T'",
        },
        ErrorCase {
            id: "duplicate-get",
            source: "class C { int P { get; get; } }",
            expect_substring: "duplicate 'get' accessor",
        },
        ErrorCase {
            id: "operator-without-return-type",
            source: "class C { operator +(C a, C b) { } }",
            expect_substring: "'operator' must be preceded by a return type",
        },
        ErrorCase {
            id: "conversion-arity",
            source: "class C { static implicit operator int(C a, C b) { return 0; } }",
            expect_substring: "exactly one parameter",
        },
        ErrorCase {
            id: "bad-overload-operator",
            source: "class C { static C operator =>(C a) { return a; } }",
            expect_substring: "not an overloadable unary operator",
        },
        ErrorCase {
            id: "try-without-handlers",
            source: "class C { void M() { try { } } }",
            expect_substring: "EXPECTED: 'catch' or 'finally'",
        },
        ErrorCase {
            id: "fixed-needs-pointer",
            source: "class C { unsafe void M() { fixed (int p = 0) { } } }",
            expect_substring: "pointer",
        },
        ErrorCase {
            id: "event-accessor-pair",
            source: "class C { event EventHandler E { add { } } }",
            expect_substring: "both add and remove",
        },
    ];
    for case in &cases {
        assert_error(case);
    }
}

#[test]
fn error_position_is_a_token_index() {
    // `class C { int = 5; }` fails at the `=`, which is token 4.
    let e = parse_err("class C { int = 5; }");
    assert_eq!(e.pos, 4);
}

// ── Partial trees ──────────────────────────────────────────────────────

#[test]
fn partial_document_keeps_completed_types() {
    let (_, doc) = partial_doc("class A { } class B { int f = ; }");
    // A completed fine; B is present with its shell.
    assert_eq!(doc.types.len(), 2);
    assert_eq!(doc.types[0].name(), "A");
    assert_eq!(doc.types[1].name(), "B");
}

#[test]
fn partial_tree_reaches_through_method_bodies() {
    let (_, doc) = partial_doc("class C { void M() { int a = 1; var x = ; } int g; }");
    let TypeDecl::Class(c) = &doc.types[0] else {
        panic!("expected a class")
    };
    // The trailing field was never reached, but the method shell with the
    // statements before the failure is there.
    assert_eq!(c.members.len(), 1);
    let Member::Method(m) = &c.members[0] else {
        panic!("expected a method")
    };
    let body = m.body.as_ref().expect("partial body spliced in");
    assert_eq!(body.statements.len(), 1);
    assert!(matches!(body.statements[0], Statement::VarDecl(_)));
}

#[test]
fn partial_expression_is_spliced_into_statement() {
    let (_, doc) = partial_doc("class C { void M() { return 1 + ; } }");
    let TypeDecl::Class(c) = &doc.types[0] else {
        panic!("expected a class")
    };
    let Member::Method(m) = &c.members[0] else {
        panic!("expected a method")
    };
    let body = m.body.as_ref().unwrap();
    // The return statement carries the best-effort left operand.
    let Statement::Return { expr: Some(e), .. } = &body.statements[0] else {
        panic!("expected a return with a partial expression")
    };
    assert!(matches!(
        e,
        Expr::Literal { value: Lit::Number(_), .. }
    ));
}

#[test]
fn partial_namespace_is_spliced_into_document() {
    let (_, doc) = partial_doc("namespace N { class C { } class D { int = 1; } }");
    assert_eq!(doc.namespaces.len(), 1);
    let ns = &doc.namespaces[0];
    assert_eq!(ns.name, vec!["N".to_string()]);
    assert_eq!(ns.types.len(), 2);
    assert_eq!(ns.types[0].name(), "C");
}

#[test]
fn partial_switch_keeps_earlier_groups() {
    let source =
        "class C { void M(int x) { switch (x) { case 1: F(); break; case 2: var y = ; } } }";
    let (_, doc) = partial_doc(source);
    let TypeDecl::Class(c) = &doc.types[0] else {
        panic!("expected a class")
    };
    let Member::Method(m) = &c.members[0] else {
        panic!("expected a method")
    };
    let Statement::Switch { groups, .. } = &m.body.as_ref().unwrap().statements[0] else {
        panic!("expected a partial switch")
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].statements.len(), 2);
}

#[test]
fn unclosed_type_body_still_yields_partial() {
    let (_, doc) = partial_doc("class C { int f;");
    let TypeDecl::Class(c) = &doc.types[0] else {
        panic!("expected a class")
    };
    assert_eq!(c.members.len(), 1);
}

#[test]
fn lenient_contexts_do_not_leak_errors() {
    // Both sanctioned speculations back out silently: the generic-argument
    // attempt on `a < b` and the cast attempt on `(a) / 2`.
    let source = "class C { void M() { var r = a < b; var s = (a) / 2; } }";
    let tokens = Lexer::new(source).tokenize().unwrap();
    assert!(Parser::new(tokens).parse_document().is_ok());
}
