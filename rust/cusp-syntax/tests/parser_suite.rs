//! Shape tests for the parser: one assertion block per grammar area,
//! driven through the public `parse_document` entry point.

use cusp_syntax::ast::*;
use cusp_syntax::parse_document;

fn doc(source: &str) -> Document {
    match parse_document(source) {
        Ok(d) => d,
        Err(e) => panic!("failed to parse\n--- source ---\n{}\n--- error ---\n{}", source, e),
    }
}

/// The members of the single top-level class in `source`.
fn class_members(source: &str) -> Vec<Member> {
    let d = doc(source);
    assert_eq!(d.types.len(), 1, "expected exactly one top-level type");
    match d.types.into_iter().next().unwrap() {
        TypeDecl::Class(c) => c.members,
        other => panic!("expected a class, got {:?}", other.name()),
    }
}

fn single_member(source: &str) -> Member {
    let mut members = class_members(source);
    assert_eq!(members.len(), 1, "expected exactly one member");
    members.remove(0)
}

/// The statements of `void M() { ... }` wrapped around `body`.
fn method_statements(body: &str) -> Vec<Statement> {
    let source = format!("class C {{ void M() {{ {} }} }}", body);
    match single_member(&source) {
        Member::Method(m) => m.body.expect("method has a body").statements,
        other => panic!("expected a method, got {:?}", other),
    }
}

fn single_statement(body: &str) -> Statement {
    let mut stmts = method_statements(body);
    assert_eq!(stmts.len(), 1, "expected exactly one statement");
    stmts.remove(0)
}

// ── Documents and namespaces ───────────────────────────────────────────

#[test]
fn using_directive() {
    let d = doc("using System;");
    assert_eq!(d.usings.len(), 1);
    assert_eq!(d.usings[0].name, vec!["System".to_string()]);
    assert!(d.types.is_empty());
}

#[test]
fn using_alias() {
    let d = doc("using Dict = System.Collections.Generic.Dictionary<string, int>;");
    assert_eq!(d.aliases.len(), 1);
    assert_eq!(d.aliases[0].alias, "Dict");
}

#[test]
fn namespace_with_class() {
    let d = doc("namespace N { class C { } }");
    assert_eq!(d.namespaces.len(), 1);
    let ns = &d.namespaces[0];
    assert_eq!(ns.name, vec!["N".to_string()]);
    assert_eq!(ns.types.len(), 1);
    let TypeDecl::Class(c) = &ns.types[0] else {
        panic!("expected a class")
    };
    assert_eq!(c.name, "C");
    assert!(c.members.is_empty());
}

#[test]
fn nested_and_dotted_namespaces() {
    let d = doc("namespace A.B { namespace C { interface I { } } }");
    let outer = &d.namespaces[0];
    assert_eq!(outer.name, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(outer.namespaces.len(), 1);
    assert!(matches!(
        outer.namespaces[0].types[0],
        TypeDecl::Interface(_)
    ));
}

#[test]
fn assembly_attributes_stand_alone() {
    let d = doc("[assembly: AssemblyTitle(\"x\")]\n[module: Something]\nclass C { }");
    assert_eq!(d.attributes.len(), 2);
    assert_eq!(d.attributes[0].target, Some(AttributeTarget::Assembly));
    assert_eq!(d.attributes[1].target, Some(AttributeTarget::Module));
    assert_eq!(d.types.len(), 1);
}

// ── Type declarations ──────────────────────────────────────────────────

#[test]
fn generic_class_with_variance_and_constraints() {
    let d = doc("interface I<in T, out U> where T : class, new() where U : IComparable<U> { }");
    let TypeDecl::Interface(i) = &d.types[0] else {
        panic!("expected an interface")
    };
    let params = i.generic_params.as_ref().unwrap();
    assert_eq!(params[0].variance, Variance::Contravariant);
    assert_eq!(params[1].variance, Variance::Covariant);
    assert_eq!(i.constraints.len(), 2);
    assert_eq!(i.constraints[0].param, "T");
    assert!(matches!(i.constraints[0].constraints[0], Constraint::Class));
    assert!(matches!(i.constraints[0].constraints[1], Constraint::New));
    assert!(matches!(
        i.constraints[1].constraints[0],
        Constraint::Type(_)
    ));
}

#[test]
fn enum_with_underlying_type_and_values() {
    let d = doc("enum E : byte { A = 1, B, C = 4 }");
    let TypeDecl::Enum(e) = &d.types[0] else {
        panic!("expected an enum")
    };
    assert!(e.underlying.is_some());
    assert_eq!(e.entries.len(), 3);
    assert_eq!(e.entries[0].name, "A");
    assert!(e.entries[0].value.is_some());
    assert!(e.entries[1].value.is_none());
}

#[test]
fn delegate_declaration() {
    let d = doc("public delegate TResult Func<T, TResult>(T arg);");
    let TypeDecl::Delegate(del) = &d.types[0] else {
        panic!("expected a delegate")
    };
    assert_eq!(del.name, "Func");
    assert_eq!(del.generic_params.as_ref().unwrap().len(), 2);
    assert_eq!(del.params.len(), 1);
}

#[test]
fn partial_struct_and_nested_type() {
    let members = class_members("class C { partial struct S { } }");
    let Member::Type(TypeDecl::Struct(s)) = &members[0] else {
        panic!("expected a nested struct")
    };
    assert_eq!(s.modifiers, vec![Modifier::Partial]);
}

// ── Members ────────────────────────────────────────────────────────────

#[test]
fn field_with_two_declarators() {
    let Member::Field(f) = single_member("class C { int f = 1, g; }") else {
        panic!("expected a field")
    };
    assert_eq!(f.declarators.len(), 2);
    assert_eq!(f.declarators[0].name, "f");
    let Some(Expr::Literal { value: Lit::Number(n), .. }) = &f.declarators[0].init else {
        panic!("expected a number initializer")
    };
    assert_eq!(n, "1");
    assert_eq!(f.declarators[1].name, "g");
    assert!(f.declarators[1].init.is_none());
}

#[test]
fn auto_property() {
    let Member::Property(p) = single_member("class C { public int P { get; set; } }") else {
        panic!("expected a property")
    };
    assert_eq!(p.name, "P");
    assert_eq!(p.modifiers, vec![Modifier::Public]);
    assert_eq!(p.accessors.len(), 2);
    assert_eq!(p.accessors[0].kind, AccessorKind::Get);
    assert!(p.accessors[0].body.is_none());
    assert_eq!(p.accessors[1].kind, AccessorKind::Set);
    assert!(p.accessors[1].body.is_none());
}

#[test]
fn explicit_interface_method_with_yield_break() {
    let source =
        "class C { IEnumerator<int> IEnumerable<int>.GetEnumerator() { yield break; } }";
    let Member::Method(m) = single_member(source) else {
        panic!("expected a method")
    };
    assert_eq!(m.name, "GetEnumerator");
    let q = m.implements_from.expect("explicit interface qualifier");
    assert_eq!(q.parts.len(), 1);
    assert_eq!(q.parts[0].name, "IEnumerable");
    assert_eq!(q.parts[0].args.as_ref().unwrap().len(), 1);
    let body = m.body.unwrap();
    assert_eq!(body.statements.len(), 1);
    assert!(matches!(body.statements[0], Statement::YieldBreak { .. }));
}

#[test]
fn generic_method() {
    let Member::Method(m) = single_member("class C { T Max<T>(T a, T b) { return a; } }")
    else {
        panic!("expected a method")
    };
    assert_eq!(m.name, "Max");
    let params = m.generic_params.unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "T");
    assert!(m.implements_from.is_none());
}

#[test]
fn binary_operator_overload() {
    let source = "class C { static int operator +(C a, C b) { return 0; } }";
    let Member::OperatorBinary(o) = single_member(source) else {
        panic!("expected a binary operator overload")
    };
    assert_eq!(o.op, OverloadableBinaryOp::Add);
    assert_eq!(o.left.name, "a");
    assert_eq!(o.right.name, "b");
    assert!(o.body.is_some());
}

#[test]
fn unary_true_false_overloads() {
    let members = class_members(
        "class C { static bool operator true(C a) { return true; } \
         static bool operator false(C a) { return false; } }",
    );
    assert!(matches!(
        &members[0],
        Member::OperatorUnary(o) if o.op == OverloadableUnaryOp::True
    ));
    assert!(matches!(
        &members[1],
        Member::OperatorUnary(o) if o.op == OverloadableUnaryOp::False
    ));
}

#[test]
fn user_defined_conversions() {
    let members = class_members(
        "class C { public static implicit operator int(C c) { return 0; } \
         public static explicit operator C(int i) { return null; } }",
    );
    let Member::Conversion(implicit) = &members[0] else {
        panic!("expected a conversion")
    };
    assert_eq!(implicit.kind, ConversionKind::Implicit);
    assert_eq!(implicit.param.name, "c");
    let Member::Conversion(explicit) = &members[1] else {
        panic!("expected a conversion")
    };
    assert_eq!(explicit.kind, ConversionKind::Explicit);
}

#[test]
fn constructor_with_base_chain_and_destructor() {
    let members = class_members("class C { C(int x) : base(x) { } ~C() { } }");
    let Member::Constructor(ctor) = &members[0] else {
        panic!("expected a constructor")
    };
    assert_eq!(ctor.name, "C");
    let init = ctor.initializer.as_ref().unwrap();
    assert_eq!(init.kind, CtorInitKind::Base);
    assert_eq!(init.args.len(), 1);
    assert!(matches!(&members[1], Member::Destructor(d) if d.name == "C"));
}

#[test]
fn field_like_and_property_like_events() {
    let members = class_members(
        "class C { public event EventHandler Changed; \
         public event EventHandler Closed { add { } remove { } } }",
    );
    let Member::Event(e) = &members[0] else {
        panic!("expected a field-like event")
    };
    assert_eq!(e.declarators[0].name, "Changed");
    let Member::EventProperty(ep) = &members[1] else {
        panic!("expected a property-like event")
    };
    assert_eq!(ep.name, "Closed");
    assert_eq!(ep.accessors.len(), 2);
    assert_eq!(ep.accessors[0].kind, AccessorKind::Add);
    assert_eq!(ep.accessors[1].kind, AccessorKind::Remove);
    assert!(ep.accessors[0].body.is_some());
}

#[test]
fn indexer_with_explicit_interface() {
    let members = class_members(
        "class C { int this[int i] { get { return 0; } } \
         string IDict.this[string k] { get { return null; } set { } } }",
    );
    let Member::Indexer(plain) = &members[0] else {
        panic!("expected an indexer")
    };
    assert!(plain.implements_from.is_none());
    assert_eq!(plain.params.len(), 1);
    let Member::Indexer(explicit) = &members[1] else {
        panic!("expected an indexer")
    };
    let q = explicit.implements_from.as_ref().unwrap();
    assert_eq!(q.parts[0].name, "IDict");
}

#[test]
fn parameter_modifiers() {
    let Member::Method(m) = single_member(
        "class C { static void M(this string s, ref int a, out int b, params object[] rest) { } }",
    ) else {
        panic!("expected a method")
    };
    let mods: Vec<ParamModifier> = m.params.iter().map(|p| p.modifier).collect();
    assert_eq!(
        mods,
        vec![
            ParamModifier::This,
            ParamModifier::Ref,
            ParamModifier::Out,
            ParamModifier::Params
        ]
    );
}

#[test]
fn optional_parameter_and_named_argument() {
    let stmts = method_statements("F(count: 3, ref x);");
    let Statement::Expr { expr: Expr::Invoke { args, .. }, .. } = &stmts[0] else {
        panic!("expected a call statement")
    };
    assert_eq!(args[0].name.as_deref(), Some("count"));
    assert_eq!(args[1].modifier, ArgModifier::Ref);

    let Member::Method(m) = single_member("class C { void M(int x = 5) { } }") else {
        panic!("expected a method")
    };
    assert!(m.params[0].default.is_some());
}

// ── Statements ─────────────────────────────────────────────────────────

#[test]
fn cast_of_unary_minus_in_declaration() {
    let Statement::VarDecl(d) = single_statement("var x = (int) -1;") else {
        panic!("expected a declaration")
    };
    let Some(Expr::Cast { expr, .. }) = &d.declarators[0].init else {
        panic!("expected a cast initializer")
    };
    assert!(matches!(**expr, Expr::Unary { op: UnaryOp::Minus, .. }));
}

#[test]
fn query_with_from_where_select() {
    let Statement::VarDecl(d) =
        single_statement("var q = from i in xs where i > 0 select i;")
    else {
        panic!("expected a declaration")
    };
    let Some(Expr::Query { clauses, .. }) = &d.declarators[0].init else {
        panic!("expected a query initializer")
    };
    assert_eq!(clauses.len(), 3);
    assert!(matches!(clauses[0], QueryClause::From { .. }));
    assert!(matches!(clauses[1], QueryClause::Where { .. }));
    assert!(matches!(clauses[2], QueryClause::Select { .. }));
}

#[test]
fn query_with_join_orderby_group_into() {
    let body = "var q = from c in cs join o in os on c.Id equals o.Cid into g \
                orderby c.Name descending, c.Id \
                group c by c.City into byCity select byCity;";
    let Statement::VarDecl(d) = single_statement(body) else {
        panic!("expected a declaration")
    };
    let Some(Expr::Query { clauses, .. }) = &d.declarators[0].init else {
        panic!("expected a query")
    };
    assert!(matches!(
        &clauses[1],
        QueryClause::Join { into: Some(g), .. } if g == "g"
    ));
    let QueryClause::OrderBy { orderings, .. } = &clauses[2] else {
        panic!("expected orderby")
    };
    assert_eq!(orderings.len(), 2);
    assert_eq!(orderings[0].direction, OrderDirection::Descending);
    assert!(matches!(clauses[3], QueryClause::GroupBy { .. }));
    assert!(matches!(clauses[4], QueryClause::Into { .. }));
    assert!(matches!(clauses[5], QueryClause::Select { .. }));
}

#[test]
fn switch_case_grouping() {
    let body = "switch (x) { case 1: case 2: a(); break; default: b(); break; }";
    let Statement::Switch { groups, .. } = single_statement(body) else {
        panic!("expected a switch")
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].labels.len(), 2);
    assert!(matches!(groups[0].labels[0], CaseLabel::Case(_)));
    assert_eq!(groups[0].statements.len(), 2);
    assert!(matches!(groups[1].labels[0], CaseLabel::Default));
    assert_eq!(groups[1].statements.len(), 2);
}

#[test]
fn for_with_init_list_and_iteration_list() {
    let body = "for (int i = 0, j = 10; i < j; i++, j--) { }";
    let Statement::For { init, condition, iter, .. } = single_statement(body) else {
        panic!("expected a for")
    };
    assert_eq!(init.len(), 1);
    let Statement::VarDecl(d) = &init[0] else {
        panic!("expected a declaration in the init clause")
    };
    assert_eq!(d.declarators.len(), 2);
    assert!(condition.is_some());
    assert_eq!(iter.len(), 2);
}

#[test]
fn for_with_expression_inits() {
    let body = "for (i = 0, j = 1; ; ) { }";
    let Statement::For { init, condition, iter, .. } = single_statement(body) else {
        panic!("expected a for")
    };
    assert_eq!(init.len(), 2);
    assert!(condition.is_none());
    assert!(iter.is_empty());
}

#[test]
fn foreach_shorthand_without_type() {
    let Statement::Foreach { ty, var, .. } = single_statement("foreach (x in xs) { }") else {
        panic!("expected a foreach")
    };
    assert!(ty.is_none());
    assert_eq!(var, "x");

    let Statement::Foreach { ty, .. } = single_statement("foreach (var x in xs) { }") else {
        panic!("expected a foreach")
    };
    assert!(ty.is_some());
}

#[test]
fn try_catch_finally_forms() {
    let body = "try { } catch (IOException e) { } catch (Exception) { } catch { } finally { }";
    let Statement::Try { catches, finally, .. } = single_statement(body) else {
        panic!("expected a try")
    };
    assert_eq!(catches.len(), 3);
    assert_eq!(catches[0].name.as_deref(), Some("e"));
    assert!(catches[1].ty.is_some());
    assert!(catches[1].name.is_none());
    assert!(catches[2].ty.is_none());
    assert!(finally.is_some());
}

#[test]
fn goto_flavours_and_labels() {
    let body = "start: again: x = 1; goto start; switch (x) { case 1: goto case 2; \
                case 2: goto default; default: break; }";
    let stmts = method_statements(body);
    let Statement::Labelled { labels, inner, .. } = &stmts[0] else {
        panic!("expected a labelled statement")
    };
    assert_eq!(labels, &vec!["start".to_string(), "again".to_string()]);
    assert!(matches!(**inner, Statement::Expr { .. }));
    assert!(matches!(stmts[1], Statement::GotoLabel { .. }));
    let Statement::Switch { groups, .. } = &stmts[2] else {
        panic!("expected a switch")
    };
    assert!(matches!(groups[0].statements[0], Statement::GotoCase { .. }));
    assert!(matches!(groups[1].statements[0], Statement::GotoDefault { .. }));
}

#[test]
fn fixed_requires_pointer_declaration() {
    let ok = "class C { unsafe void M(int[] a) { fixed (int* p = a) { } } }";
    assert!(parse_document(ok).is_ok());
    let bad = "class C { unsafe void M(int[] a) { fixed (int p = 0) { } } }";
    let err = parse_document(bad).unwrap_err();
    assert!(err.to_string().contains("pointer"));
}

#[test]
fn using_lock_checked_unsafe_statements() {
    let body = "using (var r = Open()) { } lock (gate) { } checked { x++; } \
                unchecked { x--; } unsafe { }";
    let stmts = method_statements(body);
    assert!(matches!(stmts[0], Statement::Using { .. }));
    assert!(matches!(stmts[1], Statement::Lock { .. }));
    assert!(matches!(stmts[2], Statement::Checked { .. }));
    assert!(matches!(stmts[3], Statement::Unchecked { .. }));
    assert!(matches!(stmts[4], Statement::Unsafe { .. }));
}

#[test]
fn yield_return_and_contextual_yield() {
    let stmts = method_statements("yield return 1; int yield = 2; yield = 3;");
    assert!(matches!(stmts[0], Statement::YieldReturn { .. }));
    assert!(matches!(stmts[1], Statement::VarDecl(_)));
    assert!(matches!(stmts[2], Statement::Expr { .. }));
}

#[test]
fn do_while_and_else_binding() {
    let body = "do x--; while (x > 0); if (a) if (b) F(); else G();";
    let stmts = method_statements(body);
    assert!(matches!(stmts[0], Statement::DoWhile { .. }));
    // `else` binds to the closest `if`.
    let Statement::If { else_branch: outer_else, then_branch, .. } = &stmts[1] else {
        panic!("expected an if")
    };
    assert!(outer_else.is_none());
    assert!(matches!(
        **then_branch,
        Statement::If { else_branch: Some(_), .. }
    ));
}

// ── Expressions through declarations ───────────────────────────────────

#[test]
fn pointer_declaration_not_multiplication() {
    // `a* b;` declares a pointer variable; `a * b;` alone is the same
    // token stream, so both commit to the declaration reading.
    let Statement::VarDecl(d) = single_statement("a* b;") else {
        panic!("expected a pointer declaration")
    };
    assert!(matches!(d.ty, TypeRef::Pointer { .. }));
}

#[test]
fn member_call_is_not_a_declaration() {
    let stmts = method_statements("Console.WriteLine(s);");
    assert!(matches!(stmts[0], Statement::Expr { .. }));
}

#[test]
fn stackalloc_and_sizeof() {
    let body = "int* p = stackalloc int[16]; var n = sizeof(long);";
    let stmts = method_statements(body);
    let Statement::VarDecl(d) = &stmts[0] else {
        panic!("expected a declaration")
    };
    assert!(matches!(
        d.declarators[0].init,
        Some(Expr::Stackalloc { .. })
    ));
    let Statement::VarDecl(d) = &stmts[1] else {
        panic!("expected a declaration")
    };
    assert!(matches!(d.declarators[0].init, Some(Expr::Sizeof { .. })));
}

#[test]
fn anonymous_method_and_object() {
    let body = "var f = delegate(int a) { return a; }; var o = new { A = 1, x.B };";
    let stmts = method_statements(body);
    let Statement::VarDecl(d) = &stmts[0] else {
        panic!("expected a declaration")
    };
    let Some(Expr::AnonymousMethod { params, .. }) = &d.declarators[0].init else {
        panic!("expected an anonymous method")
    };
    assert_eq!(params.as_ref().unwrap().len(), 1);
    let Statement::VarDecl(d) = &stmts[1] else {
        panic!("expected a declaration")
    };
    let Some(Expr::NewAnonymous { inits, .. }) = &d.declarators[0].init else {
        panic!("expected an anonymous object")
    };
    assert_eq!(inits[0].name.as_deref(), Some("A"));
    assert!(inits[1].name.is_none());
}

#[test]
fn pointer_member_access() {
    let stmts = method_statements("p->next->value = 1;");
    let Statement::Expr { expr: Expr::Assign { target, .. }, .. } = &stmts[0] else {
        panic!("expected an assignment")
    };
    assert!(matches!(
        **target,
        Expr::MemberAccess { is_pointer: true, .. }
    ));
}

#[test]
fn determinism_across_runs() {
    let source = "class C { int f = 1; void M() { for (int i = 0; i < f; i++) F(i); } }";
    assert_eq!(doc(source), doc(source));
}
