//! Round-trip properties: stripping whitespace from the regenerated
//! source yields the original byte-for-byte, and re-parsing the printed
//! text reproduces the tree exactly (spans included, since both texts lex
//! to the same token sequence).

use cusp_syntax::{document_to_source, parse_document};

struct Case {
    id: &'static str,
    source: &'static str,
}

fn strip_ws(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn assert_roundtrip(case: &Case) {
    let doc = match parse_document(case.source) {
        Ok(d) => d,
        Err(e) => panic!(
            "case '{}' failed to parse\n--- source ---\n{}\n--- error ---\n{}",
            case.id, case.source, e
        ),
    };
    let printed = document_to_source(&doc);
    assert_eq!(
        strip_ws(&printed),
        strip_ws(case.source),
        "case '{}' print mismatch\n--- source ---\n{}\n--- printed ---\n{}",
        case.id,
        case.source,
        printed
    );
    let reparsed = match parse_document(&printed) {
        Ok(d) => d,
        Err(e) => panic!(
            "case '{}' failed to re-parse its own output\n--- printed ---\n{}\n--- error ---\n{}",
            case.id, printed, e
        ),
    };
    assert_eq!(doc, reparsed, "case '{}' is not idempotent", case.id);
}

const CASES: &[Case] = &[
    Case {
        id: "empty",
        source: "",
    },
    Case {
        id: "usings-and-alias",
        source: "using System; using System.IO; using D = System.Collections.Generic.Dictionary<string, int>;",
    },
    Case {
        id: "assembly-attributes",
        source: "[assembly: AssemblyTitle(\"cusp\")] [module: Something] class C { }",
    },
    Case {
        id: "namespace-nesting",
        source: "namespace A.B { using System; namespace C { class D { } } }",
    },
    Case {
        id: "generic-type-with-constraints",
        source: "class Cache<TKey, TValue> : IDisposable where TKey : IComparable<TKey>, new() where TValue : class { }",
    },
    Case {
        id: "variance",
        source: "interface IPipe<in TIn, out TOut> { }",
    },
    Case {
        id: "enum-with-underlying",
        source: "enum Flags : byte { None = 0, A = 1, B = 2 }",
    },
    Case {
        id: "delegate-decl",
        source: "public delegate TResult Func<T, TResult>(T arg) where T : class;",
    },
    Case {
        id: "fields-and-constants",
        source: "class C { int f = 1, g; const double Pi = 3.14; static readonly int[] Empty = new int[0]; }",
    },
    Case {
        id: "array-literal-field",
        source: "class C { int[] xs = { 1, 2, 3 }; int[,][] grid; }",
    },
    Case {
        id: "auto-and-bodied-property",
        source: "class C { public int P { get; set; } int Q { get { return 1; } private set { } } }",
    },
    Case {
        id: "indexers",
        source: "class C { int this[int i] { get { return i; } } string IDict.this[string k] { get { return null; } set { } } }",
    },
    Case {
        id: "events",
        source: "class C { public event EventHandler Changed; event EventHandler Closed { add { } remove { } } }",
    },
    Case {
        id: "constructor-chain-and-destructor",
        source: "class C { C() : this(0) { } C(int x) : base() { } ~C() { } }",
    },
    Case {
        id: "operators-and-conversions",
        source: "class V { public static V operator +(V a, V b) { return a; } public static bool operator true(V a) { return false; } public static bool operator false(V a) { return true; } public static implicit operator int(V v) { return 0; } }",
    },
    Case {
        id: "explicit-interface-members",
        source: "class C { IEnumerator<int> IEnumerable<int>.GetEnumerator() { yield break; } int ICounter.Count { get { return 0; } } }",
    },
    Case {
        id: "generic-method-with-constraint",
        source: "class C { T Max<T>(T a, T b) where T : IComparable<T> { return a; } }",
    },
    Case {
        id: "nested-generics-token-split",
        source: "class C { Dictionary<string, List<int>> map; List<List<int>> grid; }",
    },
    Case {
        id: "parameters",
        source: "static class Ext { static void M(this string s, ref int a, out int b, params object[] rest) { b = 0; } static void N(int x = 5) { } }",
    },
    Case {
        id: "control-flow",
        source: "class C { void M(int n) { if (n > 0) F(); else G(); while (n > 0) n--; do n++; while (n < 10); for (int i = 0, j = n; i < j; i++, j--) F(); foreach (var x in Items()) F(); foreach (x in Items()) F(); } }",
    },
    Case {
        id: "switch-grouping",
        source: "class C { void M(int x) { switch (x) { case 1: case 2: F(); break; default: G(); break; } } }",
    },
    Case {
        id: "try-catch-finally",
        source: "class C { void M() { try { F(); } catch (IOException e) { G(e); } catch (Exception) { } catch { } finally { H(); } } }",
    },
    Case {
        id: "goto-and-labels",
        source: "class C { void M(int x) { start: again: x = 1; goto start; switch (x) { case 1: goto case 2; case 2: goto default; default: break; } } }",
    },
    Case {
        id: "unsafe-and-fixed",
        source: "class C { unsafe void M(int[] a) { int* p = stackalloc int[16]; fixed (int* q = a) { *q = 1; } p->next = null; var n = sizeof(long); } }",
    },
    Case {
        id: "using-lock-checked",
        source: "class C { void M() { using (var r = Open()) { } lock (gate) { } checked { x++; } unchecked { x--; } var y = checked(x + 1); var z = unchecked(x * 2); } }",
    },
    Case {
        id: "cast-shapes",
        source: "class C { void M() { var a = (int) -1; var b = (X) -1; var c = (a) / 2; var d = f((a)); var e = (List<int>) xs; } }",
    },
    Case {
        id: "nullable-ternary",
        source: "class C { void M() { var a = x is int ? 5 : 1; var b = x is int? ? 5 : 1; var c = x is int?; var d = y as List<int> ?? z; } }",
    },
    Case {
        id: "operator-zoo",
        source: "class C { void M() { x = a ?? b || c && d | e ^ f & g == h; y = i < j >> (k + l * m); n += o; n <<= 2; n >>= 2; p = -q; r = !s; t = ~u; v = ++w; v = w--; } }",
    },
    Case {
        id: "lambdas-and-delegates",
        source: "class C { void M() { var f = x => x + 1; var g = (a, b) => a; var h = () => { return 1; }; var i = (x) => x; var j = delegate(int a) { return a; }; var k = delegate { }; } }",
    },
    Case {
        id: "object-and-collection-initializers",
        source: "class C { void M() { var p = new Point { X = 1, Y = 2 }; var l = new List<int>(4) { 1, 2, 3 }; var m = new Map { { 1, \"a\" }, { 2, \"b\" } }; var n = new C(); var o = new { A = 1, q.B }; } }",
    },
    Case {
        id: "array-creations",
        source: "class C { void M() { var a = new int[5]; var b = new int[] { 1, 2, 3 }; var c = new[] { 1, 2, 3 }; var d = new int[2, 3]; var e = new int[5][]; } }",
    },
    Case {
        id: "typeof-and-default",
        source: "class C { void M() { var a = typeof(List<,>); var b = typeof(void); var c = default(int?); var d = int.Parse(s); var e = global::System.Console.Out; } }",
    },
    Case {
        id: "literals",
        source: "class C { void M() { var a = 1.5f; var b = 0x1F; var c = 100UL; var d = \"a\\nb\"; var e = @\"c:\\dir\"; var f = 'x'; var g = '\\n'; var h = true; object i = null; } }",
    },
    Case {
        id: "query-comprehensions",
        source: "class C { void M() { var q = from i in xs where i > 0 orderby i descending, i ascending select i; var r = from c in cs join o in os on c.Id equals o.Cid into g let n = g.Count() group n by c.City into byCity select byCity; } }",
    },
    Case {
        id: "verbatim-identifier",
        source: "class C { int @class = 1; }",
    },
];

#[test]
fn roundtrip_corpus() {
    for case in CASES {
        assert_roundtrip(case);
    }
}

#[test]
fn roundtrip_is_whitespace_shape_independent() {
    // The same program, formatted differently, prints identically.
    let dense = "class C{int f=1;void M(){if(f>0)f--;}}";
    let airy = "class C {\n    int f = 1;\n    void M() {\n        if (f > 0)\n            f--;\n    }\n}\n";
    let a = document_to_source(&parse_document(dense).unwrap());
    let b = document_to_source(&parse_document(airy).unwrap());
    assert_eq!(a, b);
}

#[test]
fn token_split_equals_pre_split_source() {
    // A stream where the lexer produced `>>` and the parser split it must
    // yield the same tree as a stream lexed with two `>` tokens.
    let merged = parse_document("class C { List<List<int>> grid; }").unwrap();
    let spaced = parse_document("class C { List<List<int> > grid; }").unwrap();
    assert_eq!(merged, spaced);
}

#[test]
fn ast_survives_json_serialization() {
    let source = "namespace N { class C { int f = 1; void M() { f = f + 1; } } }";
    let doc = parse_document(source).unwrap();
    let json = serde_json::to_string(&doc).unwrap();
    let back: cusp_syntax::ast::Document = serde_json::from_str(&json).unwrap();
    assert_eq!(doc, back);
}

#[test]
fn span_containment_holds_for_a_mixed_document() {
    // Every child span nests inside its parent's span; spot-check through
    // the document root against its types and members.
    let source = "namespace N { class C { int f = 1; void M() { f = f + 1; } } }";
    let doc = parse_document(source).unwrap();
    let ns = &doc.namespaces[0];
    assert!(doc.span.start <= ns.span.start && ns.span.end <= doc.span.end);
    let ty = &ns.types[0];
    let ty_span = ty.span();
    assert!(ns.span.start <= ty_span.start && ty_span.end <= ns.span.end);
    if let cusp_syntax::ast::TypeDecl::Class(c) = ty {
        for m in &c.members {
            let ms = m.span();
            assert!(ty_span.start <= ms.start && ms.end <= ty_span.end);
            assert!(ms.start <= ms.end);
        }
    }
}
