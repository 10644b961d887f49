//! Source regeneration from the AST.
//!
//! Output is canonical one-construct-per-line source with four-space
//! indentation. The contract with the parser: stripping every whitespace
//! character from the printed text yields the same byte sequence as
//! stripping the original source, and re-parsing the printed text yields
//! a structurally equal tree.

use crate::syntax::ast::*;

pub fn document_to_source(doc: &Document) -> String {
    let mut p = Printer::new();
    p.document(doc);
    p.out
}

pub fn namespace_to_source(ns: &NamespaceDecl) -> String {
    let mut p = Printer::new();
    p.namespace(ns);
    p.out
}

pub fn member_to_source(member: &Member) -> String {
    let mut p = Printer::new();
    p.member(member);
    p.out
}

pub fn statement_to_source(stmt: &Statement) -> String {
    let mut p = Printer::new();
    p.stmt(stmt);
    p.out
}

pub fn expr_to_source(expr: &Expr) -> String {
    let mut p = Printer::new();
    p.expr(expr);
    p.out
}

pub fn type_ref_to_source(ty: &TypeRef) -> String {
    let mut p = Printer::new();
    p.type_ref(ty);
    p.out
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    // ── Documents ──────────────────────────────────────────────────────

    fn document(&mut self, d: &Document) {
        for u in &d.usings {
            self.pad();
            self.push("using ");
            self.push(&u.name.join("."));
            self.push(";\n");
        }
        for a in &d.aliases {
            self.pad();
            self.push("using ");
            self.push(&a.alias);
            self.push(" = ");
            self.type_ref(&a.target);
            self.push(";\n");
        }
        for g in &d.attributes {
            self.pad();
            self.attribute_group(g);
            self.push("\n");
        }
        for ns in &d.namespaces {
            self.namespace(ns);
        }
        for t in &d.types {
            self.type_decl(t);
        }
    }

    fn namespace(&mut self, ns: &NamespaceDecl) {
        self.pad();
        self.push("namespace ");
        self.push(&ns.name.join("."));
        self.push(" {\n");
        self.indent += 1;
        for u in &ns.usings {
            self.pad();
            self.push("using ");
            self.push(&u.name.join("."));
            self.push(";\n");
        }
        for a in &ns.aliases {
            self.pad();
            self.push("using ");
            self.push(&a.alias);
            self.push(" = ");
            self.type_ref(&a.target);
            self.push(";\n");
        }
        for inner in &ns.namespaces {
            self.namespace(inner);
        }
        for t in &ns.types {
            self.type_decl(t);
        }
        self.indent -= 1;
        self.pad();
        self.push("}\n");
    }

    // ── Attributes and modifiers ───────────────────────────────────────

    fn attribute_group(&mut self, g: &AttributeGroup) {
        self.push("[");
        if let Some(target) = &g.target {
            self.push(target.as_str());
            self.push(": ");
        }
        for (i, a) in g.attributes.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.concrete_type(&a.name);
            if a.parens {
                self.push("(");
                for (j, arg) in a.args.iter().enumerate() {
                    if j > 0 {
                        self.push(", ");
                    }
                    match arg {
                        AttributeArg::Positional(e) => self.expr(e),
                        AttributeArg::Named { name, value } => {
                            self.push(name);
                            self.push(" = ");
                            self.expr(value);
                        }
                    }
                }
                self.push(")");
            }
        }
        self.push("]");
    }

    fn attribute_lines(&mut self, groups: &[AttributeGroup]) {
        for g in groups {
            self.pad();
            self.attribute_group(g);
            self.push("\n");
        }
    }

    fn modifiers(&mut self, mods: &[Modifier]) {
        for m in mods {
            self.push(m.as_str());
            self.push(" ");
        }
    }

    // ── Type declarations ──────────────────────────────────────────────

    fn type_decl(&mut self, t: &TypeDecl) {
        match t {
            TypeDecl::Class(d) => self.composite(d, "class"),
            TypeDecl::Struct(d) => self.composite(d, "struct"),
            TypeDecl::Interface(d) => self.composite(d, "interface"),
            TypeDecl::Delegate(d) => self.delegate(d),
            TypeDecl::Enum(d) => self.enum_decl(d),
        }
    }

    fn composite(&mut self, d: &CompositeDecl, keyword: &str) {
        self.attribute_lines(&d.attributes);
        self.pad();
        self.modifiers(&d.modifiers);
        self.push(keyword);
        self.push(" ");
        self.push(&d.name);
        if let Some(params) = &d.generic_params {
            self.generic_params(params);
        }
        if !d.bases.is_empty() {
            self.push(" : ");
            for (i, b) in d.bases.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.type_ref(b);
            }
        }
        self.constraint_clauses(&d.constraints);
        self.push(" {\n");
        self.indent += 1;
        for m in &d.members {
            self.member(m);
        }
        self.indent -= 1;
        self.pad();
        self.push("}\n");
    }

    fn delegate(&mut self, d: &DelegateDecl) {
        self.attribute_lines(&d.attributes);
        self.pad();
        self.modifiers(&d.modifiers);
        self.push("delegate ");
        self.type_ref(&d.return_type);
        self.push(" ");
        self.push(&d.name);
        if let Some(params) = &d.generic_params {
            self.generic_params(params);
        }
        self.push("(");
        self.params(&d.params);
        self.push(")");
        self.constraint_clauses(&d.constraints);
        self.push(";\n");
    }

    fn enum_decl(&mut self, d: &EnumDecl) {
        self.attribute_lines(&d.attributes);
        self.pad();
        self.modifiers(&d.modifiers);
        self.push("enum ");
        self.push(&d.name);
        if let Some(u) = &d.underlying {
            self.push(" : ");
            self.type_ref(u);
        }
        self.push(" {\n");
        self.indent += 1;
        for (i, e) in d.entries.iter().enumerate() {
            self.attribute_lines(&e.attributes);
            self.pad();
            self.push(&e.name);
            if let Some(v) = &e.value {
                self.push(" = ");
                self.expr(v);
            }
            if i + 1 < d.entries.len() {
                self.push(",");
            }
            self.push("\n");
        }
        self.indent -= 1;
        self.pad();
        self.push("}\n");
    }

    fn generic_params(&mut self, params: &[GenericParam]) {
        self.push("<");
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            for g in &p.attributes {
                self.attribute_group(g);
                self.push(" ");
            }
            match p.variance {
                Variance::Invariant => {}
                Variance::Covariant => self.push("out "),
                Variance::Contravariant => self.push("in "),
            }
            self.push(&p.name);
        }
        self.push(">");
    }

    fn constraint_clauses(&mut self, clauses: &[ConstraintClause]) {
        for c in clauses {
            self.push(" where ");
            self.push(&c.param);
            self.push(" : ");
            for (i, constraint) in c.constraints.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                match constraint {
                    Constraint::Class => self.push("class"),
                    Constraint::Struct => self.push("struct"),
                    Constraint::New => self.push("new()"),
                    Constraint::Type(t) => self.type_ref(t),
                }
            }
        }
    }

    // ── Members ────────────────────────────────────────────────────────

    fn member(&mut self, m: &Member) {
        match m {
            Member::Field(f) => {
                self.attribute_lines(&f.attributes);
                self.pad();
                self.modifiers(&f.modifiers);
                self.type_ref(&f.ty);
                self.push(" ");
                self.declarators(&f.declarators);
                self.push(";\n");
            }
            Member::Event(e) => {
                self.attribute_lines(&e.attributes);
                self.pad();
                self.modifiers(&e.modifiers);
                self.push("event ");
                self.type_ref(&e.ty);
                self.push(" ");
                self.declarators(&e.declarators);
                self.push(";\n");
            }
            Member::EventProperty(e) => {
                self.attribute_lines(&e.attributes);
                self.pad();
                self.modifiers(&e.modifiers);
                self.push("event ");
                self.type_ref(&e.ty);
                self.push(" ");
                if let Some(q) = &e.implements_from {
                    self.concrete_type(q);
                    self.push(".");
                }
                self.push(&e.name);
                self.accessor_block(&e.accessors);
            }
            Member::Method(m) => {
                self.attribute_lines(&m.attributes);
                self.pad();
                self.modifiers(&m.modifiers);
                self.type_ref(&m.return_type);
                self.push(" ");
                if let Some(q) = &m.implements_from {
                    self.concrete_type(q);
                    self.push(".");
                }
                self.push(&m.name);
                if let Some(params) = &m.generic_params {
                    self.generic_params(params);
                }
                self.push("(");
                self.params(&m.params);
                self.push(")");
                self.constraint_clauses(&m.constraints);
                match &m.body {
                    Some(b) => {
                        self.push(" ");
                        self.block_expr(b);
                        self.push("\n");
                    }
                    None => self.push(";\n"),
                }
            }
            Member::Property(p) => {
                self.attribute_lines(&p.attributes);
                self.pad();
                self.modifiers(&p.modifiers);
                self.type_ref(&p.ty);
                self.push(" ");
                if let Some(q) = &p.implements_from {
                    self.concrete_type(q);
                    self.push(".");
                }
                self.push(&p.name);
                self.accessor_block(&p.accessors);
            }
            Member::Indexer(ix) => {
                self.attribute_lines(&ix.attributes);
                self.pad();
                self.modifiers(&ix.modifiers);
                self.type_ref(&ix.ty);
                self.push(" ");
                if let Some(q) = &ix.implements_from {
                    self.concrete_type(q);
                    self.push(".");
                }
                self.push("this[");
                self.params(&ix.params);
                self.push("]");
                self.accessor_block(&ix.accessors);
            }
            Member::Constructor(c) => {
                self.attribute_lines(&c.attributes);
                self.pad();
                self.modifiers(&c.modifiers);
                self.push(&c.name);
                self.push("(");
                self.params(&c.params);
                self.push(")");
                if let Some(init) = &c.initializer {
                    self.push(" : ");
                    self.push(match init.kind {
                        CtorInitKind::This => "this",
                        CtorInitKind::Base => "base",
                    });
                    self.push("(");
                    self.arguments(&init.args);
                    self.push(")");
                }
                self.push(" ");
                self.block_expr(&c.body);
                self.push("\n");
            }
            Member::Destructor(d) => {
                self.attribute_lines(&d.attributes);
                self.pad();
                self.modifiers(&d.modifiers);
                self.push("~");
                self.push(&d.name);
                self.push("() ");
                self.block_expr(&d.body);
                self.push("\n");
            }
            Member::OperatorUnary(o) => {
                self.attribute_lines(&o.attributes);
                self.pad();
                self.modifiers(&o.modifiers);
                self.type_ref(&o.return_type);
                self.push(" operator ");
                self.push(o.op.as_str());
                self.push("(");
                self.param(&o.param);
                self.push(")");
                match &o.body {
                    Some(b) => {
                        self.push(" ");
                        self.block_expr(b);
                        self.push("\n");
                    }
                    None => self.push(";\n"),
                }
            }
            Member::OperatorBinary(o) => {
                self.attribute_lines(&o.attributes);
                self.pad();
                self.modifiers(&o.modifiers);
                self.type_ref(&o.return_type);
                self.push(" operator ");
                self.push(o.op.as_str());
                self.push("(");
                self.param(&o.left);
                self.push(", ");
                self.param(&o.right);
                self.push(")");
                match &o.body {
                    Some(b) => {
                        self.push(" ");
                        self.block_expr(b);
                        self.push("\n");
                    }
                    None => self.push(";\n"),
                }
            }
            Member::Conversion(c) => {
                self.attribute_lines(&c.attributes);
                self.pad();
                self.modifiers(&c.modifiers);
                self.push(match c.kind {
                    ConversionKind::Implicit => "implicit operator ",
                    ConversionKind::Explicit => "explicit operator ",
                });
                self.type_ref(&c.target_type);
                self.push("(");
                self.param(&c.param);
                self.push(")");
                match &c.body {
                    Some(b) => {
                        self.push(" ");
                        self.block_expr(b);
                        self.push("\n");
                    }
                    None => self.push(";\n"),
                }
            }
            Member::Type(t) => self.type_decl(t),
        }
    }

    fn accessor_block(&mut self, accessors: &[Accessor]) {
        self.push(" {\n");
        self.indent += 1;
        for a in accessors {
            self.attribute_lines(&a.attributes);
            self.pad();
            self.modifiers(&a.modifiers);
            self.push(a.kind.as_str());
            match &a.body {
                Some(b) => {
                    self.push(" ");
                    self.block_expr(b);
                    self.push("\n");
                }
                None => self.push(";\n"),
            }
        }
        self.indent -= 1;
        self.pad();
        self.push("}\n");
    }

    fn params(&mut self, params: &[Param]) {
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.param(p);
        }
    }

    fn param(&mut self, p: &Param) {
        for g in &p.attributes {
            self.attribute_group(g);
            self.push(" ");
        }
        match p.modifier {
            ParamModifier::None => {}
            ParamModifier::Ref => self.push("ref "),
            ParamModifier::Out => self.push("out "),
            ParamModifier::Params => self.push("params "),
            ParamModifier::This => self.push("this "),
        }
        self.type_ref(&p.ty);
        self.push(" ");
        self.push(&p.name);
        if let Some(d) = &p.default {
            self.push(" = ");
            self.expr(d);
        }
    }

    fn arguments(&mut self, args: &[Argument]) {
        for (i, a) in args.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            if let Some(name) = &a.name {
                self.push(name);
                self.push(": ");
            }
            match a.modifier {
                ArgModifier::None => {}
                ArgModifier::Ref => self.push("ref "),
                ArgModifier::Out => self.push("out "),
            }
            self.expr(&a.value);
        }
    }

    fn declarators(&mut self, list: &[NameAndInitializer]) {
        for (i, d) in list.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(&d.name);
            if let Some(init) = &d.init {
                self.push(" = ");
                self.expr(init);
            }
        }
    }

    // ── Type references ────────────────────────────────────────────────

    fn type_ref(&mut self, t: &TypeRef) {
        match t {
            TypeRef::Concrete(c) => self.concrete_type(c),
            TypeRef::Array { inner, ranks, .. } => {
                self.type_ref(inner);
                for rank in ranks {
                    self.push("[");
                    for _ in 1..*rank {
                        self.push(",");
                    }
                    self.push("]");
                }
            }
            TypeRef::Pointer { inner, .. } => {
                self.type_ref(inner);
                self.push("*");
            }
            TypeRef::Nullable { inner, .. } => {
                self.type_ref(inner);
                self.push("?");
            }
            TypeRef::Placeholder { .. } => {}
        }
    }

    fn concrete_type(&mut self, c: &ConcreteType) {
        if c.global {
            self.push("global::");
        }
        for (i, part) in c.parts.iter().enumerate() {
            if i > 0 {
                self.push(".");
            }
            self.push(&part.name);
            if let Some(args) = &part.args {
                self.type_args(args);
            }
        }
    }

    fn type_args(&mut self, args: &[TypeRef]) {
        self.push("<");
        for (i, a) in args.iter().enumerate() {
            if i > 0 {
                // Placeholder lists print as `<,,>`.
                self.push(if matches!(a, TypeRef::Placeholder { .. }) {
                    ","
                } else {
                    ", "
                });
            }
            self.type_ref(a);
        }
        self.push(">");
    }

    // ── Statements ─────────────────────────────────────────────────────

    /// A block printed mid-line: `{`, its statements, and a closing `}` at
    /// the current indent, with no trailing newline.
    fn block_expr(&mut self, b: &Block) {
        self.push("{\n");
        self.indent += 1;
        for s in &b.statements {
            self.stmt(s);
        }
        self.indent -= 1;
        self.pad();
        self.push("}");
    }

    /// An embedded statement (loop/if body) on its own indented line.
    fn embedded(&mut self, s: &Statement) {
        self.indent += 1;
        self.stmt(s);
        self.indent -= 1;
    }

    /// A `for`/`using`/`fixed` clause fragment: a declaration or
    /// expression with no indentation, semicolon or newline.
    fn stmt_fragment(&mut self, s: &Statement) {
        match s {
            Statement::VarDecl(d) => self.var_decl(d),
            Statement::Expr { expr, .. } => self.expr(expr),
            other => self.stmt(other),
        }
    }

    fn var_decl(&mut self, d: &VarDeclStatement) {
        if d.is_const {
            self.push("const ");
        }
        self.type_ref(&d.ty);
        self.push(" ");
        self.declarators(&d.declarators);
    }

    fn stmt(&mut self, s: &Statement) {
        match s {
            Statement::Empty { .. } => {
                self.pad();
                self.push(";\n");
            }
            Statement::Block(b) => {
                self.pad();
                self.block_expr(b);
                self.push("\n");
            }
            Statement::VarDecl(d) => {
                self.pad();
                self.var_decl(d);
                self.push(";\n");
            }
            Statement::Expr { expr, .. } => {
                self.pad();
                self.expr(expr);
                self.push(";\n");
            }
            Statement::Return { expr, .. } => {
                self.pad();
                self.push("return");
                if let Some(e) = expr {
                    self.push(" ");
                    self.expr(e);
                }
                self.push(";\n");
            }
            Statement::Throw { expr, .. } => {
                self.pad();
                self.push("throw");
                if let Some(e) = expr {
                    self.push(" ");
                    self.expr(e);
                }
                self.push(";\n");
            }
            Statement::Checked { body, .. } => {
                self.pad();
                self.push("checked ");
                self.block_expr(body);
                self.push("\n");
            }
            Statement::Unchecked { body, .. } => {
                self.pad();
                self.push("unchecked ");
                self.block_expr(body);
                self.push("\n");
            }
            Statement::Unsafe { body, .. } => {
                self.pad();
                self.push("unsafe ");
                self.block_expr(body);
                self.push("\n");
            }
            Statement::Switch {
                discriminant,
                groups,
                ..
            } => {
                self.pad();
                self.push("switch (");
                self.expr(discriminant);
                self.push(") {\n");
                self.indent += 1;
                for g in groups {
                    for label in &g.labels {
                        self.pad();
                        match label {
                            CaseLabel::Case(e) => {
                                self.push("case ");
                                self.expr(e);
                                self.push(":\n");
                            }
                            CaseLabel::Default => self.push("default:\n"),
                        }
                    }
                    self.indent += 1;
                    for s in &g.statements {
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.pad();
                self.push("}\n");
            }
            Statement::For {
                init,
                condition,
                iter,
                body,
                ..
            } => {
                self.pad();
                self.push("for (");
                for (i, s) in init.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.stmt_fragment(s);
                }
                self.push("; ");
                if let Some(c) = condition {
                    self.expr(c);
                }
                self.push("; ");
                for (i, e) in iter.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(e);
                }
                self.push(")\n");
                self.embedded(body);
            }
            Statement::Foreach {
                ty,
                var,
                source,
                body,
                ..
            } => {
                self.pad();
                self.push("foreach (");
                if let Some(t) = ty {
                    self.type_ref(t);
                    self.push(" ");
                }
                self.push(var);
                self.push(" in ");
                self.expr(source);
                self.push(")\n");
                self.embedded(body);
            }
            Statement::While {
                condition, body, ..
            } => {
                self.pad();
                self.push("while (");
                self.expr(condition);
                self.push(")\n");
                self.embedded(body);
            }
            Statement::DoWhile {
                body, condition, ..
            } => {
                self.pad();
                self.push("do\n");
                self.embedded(body);
                self.pad();
                self.push("while (");
                self.expr(condition);
                self.push(");\n");
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.pad();
                self.push("if (");
                self.expr(condition);
                self.push(")\n");
                self.embedded(then_branch);
                if let Some(e) = else_branch {
                    self.pad();
                    self.push("else\n");
                    self.embedded(e);
                }
            }
            Statement::Using { resource, body, .. } => {
                self.pad();
                self.push("using (");
                self.stmt_fragment(resource);
                self.push(")\n");
                self.embedded(body);
            }
            Statement::Fixed { decl, body, .. } => {
                self.pad();
                self.push("fixed (");
                self.var_decl(decl);
                self.push(")\n");
                self.embedded(body);
            }
            Statement::Lock { expr, body, .. } => {
                self.pad();
                self.push("lock (");
                self.expr(expr);
                self.push(")\n");
                self.embedded(body);
            }
            Statement::Try {
                body,
                catches,
                finally,
                ..
            } => {
                self.pad();
                self.push("try ");
                self.block_expr(body);
                self.push("\n");
                for c in catches {
                    self.pad();
                    self.push("catch");
                    if let Some(t) = &c.ty {
                        self.push(" (");
                        self.type_ref(t);
                        if let Some(n) = &c.name {
                            self.push(" ");
                            self.push(n);
                        }
                        self.push(")");
                    }
                    self.push(" ");
                    self.block_expr(&c.body);
                    self.push("\n");
                }
                if let Some(f) = finally {
                    self.pad();
                    self.push("finally ");
                    self.block_expr(f);
                    self.push("\n");
                }
            }
            Statement::GotoLabel { label, .. } => {
                self.pad();
                self.push("goto ");
                self.push(label);
                self.push(";\n");
            }
            Statement::GotoCase { expr, .. } => {
                self.pad();
                self.push("goto case ");
                self.expr(expr);
                self.push(";\n");
            }
            Statement::GotoDefault { .. } => {
                self.pad();
                self.push("goto default;\n");
            }
            Statement::Continue { .. } => {
                self.pad();
                self.push("continue;\n");
            }
            Statement::Break { .. } => {
                self.pad();
                self.push("break;\n");
            }
            Statement::YieldReturn { expr, .. } => {
                self.pad();
                self.push("yield return ");
                self.expr(expr);
                self.push(";\n");
            }
            Statement::YieldBreak { .. } => {
                self.pad();
                self.push("yield break;\n");
            }
            Statement::Labelled { labels, inner, .. } => {
                for l in labels {
                    self.pad();
                    self.push(l);
                    self.push(":\n");
                }
                self.stmt(inner);
            }
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn expr(&mut self, e: &Expr) {
        match e {
            Expr::Literal { value, .. } => match value {
                Lit::Number(s) | Lit::Str(s) | Lit::Char(s) => self.push(s),
                Lit::Bool(true) => self.push("true"),
                Lit::Bool(false) => self.push("false"),
                Lit::Null => self.push("null"),
            },
            Expr::This { .. } => self.push("this"),
            Expr::Base { .. } => self.push("base"),
            Expr::Ident {
                name, type_args, ..
            } => {
                self.push(name);
                if let Some(args) = type_args {
                    self.type_args(args);
                }
            }
            Expr::QualifiedType { ty, .. } => self.concrete_type(ty),
            Expr::MemberAccess {
                target,
                is_pointer,
                member,
                type_args,
                ..
            } => {
                self.expr(target);
                self.push(if *is_pointer { "->" } else { "." });
                self.push(member);
                if let Some(args) = type_args {
                    self.type_args(args);
                }
            }
            Expr::Invoke {
                target,
                args,
                is_indexer,
                ..
            } => {
                self.expr(target);
                self.push(if *is_indexer { "[" } else { "(" });
                self.arguments(args);
                self.push(if *is_indexer { "]" } else { ")" });
            }
            Expr::Assign {
                op, target, value, ..
            } => {
                self.expr(target);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr(value);
            }
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                self.expr(condition);
                self.push(" ? ");
                self.expr(then_expr);
                self.push(" : ");
                self.expr(else_expr);
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                self.expr(left);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr(right);
            }
            Expr::Is { expr, ty, .. } => {
                self.expr(expr);
                self.push(" is ");
                self.type_ref(ty);
            }
            Expr::As { expr, ty, .. } => {
                self.expr(expr);
                self.push(" as ");
                self.type_ref(ty);
            }
            Expr::Unary { op, operand, .. } => {
                self.push(op.as_str());
                // The space keeps `- -1` from re-lexing as a decrement.
                self.push(" ");
                self.expr(operand);
            }
            Expr::Postfix { op, operand, .. } => {
                self.expr(operand);
                self.push(op.as_str());
            }
            Expr::Cast { ty, expr, .. } => {
                self.push("(");
                self.type_ref(ty);
                self.push(") ");
                self.expr(expr);
            }
            Expr::Typeof { ty, .. } => {
                self.push("typeof(");
                self.type_ref(ty);
                self.push(")");
            }
            Expr::Sizeof { ty, .. } => {
                self.push("sizeof(");
                self.type_ref(ty);
                self.push(")");
            }
            Expr::Default { ty, .. } => {
                self.push("default(");
                self.type_ref(ty);
                self.push(")");
            }
            Expr::CheckedExpr { expr, .. } => {
                self.push("checked(");
                self.expr(expr);
                self.push(")");
            }
            Expr::UncheckedExpr { expr, .. } => {
                self.push("unchecked(");
                self.expr(expr);
                self.push(")");
            }
            Expr::Paren { expr, .. } => {
                self.push("(");
                self.expr(expr);
                self.push(")");
            }
            Expr::NewObject {
                ty,
                parens,
                args,
                initializer,
                ..
            } => {
                self.push("new ");
                self.type_ref(ty);
                if *parens {
                    self.push("(");
                    self.arguments(args);
                    self.push(")");
                }
                if let Some(init) = initializer {
                    self.push(" ");
                    self.initializer(init);
                }
            }
            Expr::NewAnonymous { inits, .. } => {
                self.push("new { ");
                for (i, init) in inits.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    if let Some(name) = &init.name {
                        self.push(name);
                        self.push(" = ");
                    }
                    self.expr(&init.value);
                }
                self.push(" }");
            }
            Expr::NewImplicitArray { items, .. } => {
                self.push("new[] ");
                self.brace_list(items);
            }
            Expr::NewArray {
                element,
                sizes,
                extra_ranks,
                initializer,
                ..
            } => {
                self.push("new ");
                self.type_ref(element);
                if !sizes.is_empty() {
                    self.push("[");
                    for (i, s) in sizes.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.expr(s);
                    }
                    self.push("]");
                }
                for rank in extra_ranks {
                    self.push("[");
                    for _ in 1..*rank {
                        self.push(",");
                    }
                    self.push("]");
                }
                if let Some(items) = initializer {
                    self.push(" ");
                    self.brace_list(items);
                }
            }
            Expr::Stackalloc { ty, size, .. } => {
                self.push("stackalloc ");
                self.type_ref(ty);
                self.push("[");
                self.expr(size);
                self.push("]");
            }
            Expr::Lambda {
                params,
                parenthesized,
                body,
                ..
            } => {
                if *parenthesized {
                    self.push("(");
                    for (i, p) in params.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.push(p);
                    }
                    self.push(")");
                } else {
                    self.push(&params[0]);
                }
                self.push(" => ");
                match body {
                    LambdaBody::Expr(e) => self.expr(e),
                    LambdaBody::Block(b) => self.block_expr(b),
                }
            }
            Expr::AnonymousMethod { params, body, .. } => {
                self.push("delegate");
                if let Some(ps) = params {
                    self.push(" (");
                    self.params(ps);
                    self.push(")");
                }
                self.push(" ");
                self.block_expr(body);
            }
            Expr::ArrayLiteral { items, .. } => self.brace_list(items),
            Expr::Query { clauses, .. } => {
                for (i, c) in clauses.iter().enumerate() {
                    if i > 0 {
                        self.push(" ");
                    }
                    self.query_clause(c);
                }
            }
        }
    }

    fn initializer(&mut self, init: &Initializer) {
        match init {
            Initializer::Object { members, .. } => {
                self.push("{ ");
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(&m.name);
                    self.push(" = ");
                    self.expr(&m.value);
                }
                self.push(" }");
            }
            Initializer::Collection { items, .. } => self.brace_list(items),
        }
    }

    fn brace_list(&mut self, items: &[Expr]) {
        if items.is_empty() {
            self.push("{ }");
            return;
        }
        self.push("{ ");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(item);
        }
        self.push(" }");
    }

    fn query_clause(&mut self, c: &QueryClause) {
        match c {
            QueryClause::From {
                ty, var, source, ..
            } => {
                self.push("from ");
                if let Some(t) = ty {
                    self.type_ref(t);
                    self.push(" ");
                }
                self.push(var);
                self.push(" in ");
                self.expr(source);
            }
            QueryClause::Let { var, value, .. } => {
                self.push("let ");
                self.push(var);
                self.push(" = ");
                self.expr(value);
            }
            QueryClause::Where { condition, .. } => {
                self.push("where ");
                self.expr(condition);
            }
            QueryClause::Join {
                ty,
                var,
                source,
                on,
                equals,
                into,
                ..
            } => {
                self.push("join ");
                if let Some(t) = ty {
                    self.type_ref(t);
                    self.push(" ");
                }
                self.push(var);
                self.push(" in ");
                self.expr(source);
                self.push(" on ");
                self.expr(on);
                self.push(" equals ");
                self.expr(equals);
                if let Some(g) = into {
                    self.push(" into ");
                    self.push(g);
                }
            }
            QueryClause::OrderBy { orderings, .. } => {
                self.push("orderby ");
                for (i, o) in orderings.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(&o.expr);
                    match o.direction {
                        OrderDirection::Unspecified => {}
                        OrderDirection::Ascending => self.push(" ascending"),
                        OrderDirection::Descending => self.push(" descending"),
                    }
                }
            }
            QueryClause::Select { expr, .. } => {
                self.push("select ");
                self.expr(expr);
            }
            QueryClause::GroupBy { expr, by, .. } => {
                self.push("group ");
                self.expr(expr);
                self.push(" by ");
                self.expr(by);
            }
            QueryClause::Into { var, .. } => {
                self.push("into ");
                self.push(var);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;
    use crate::syntax::parser::Parser;

    fn strip_ws(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn roundtrip(src: &str) {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let doc = Parser::new(tokens).parse_document().unwrap();
        let printed = document_to_source(&doc);
        assert_eq!(
            strip_ws(&printed),
            strip_ws(src),
            "print mismatch\n--- source ---\n{}\n--- printed ---\n{}",
            src,
            printed
        );
    }

    #[test]
    fn prints_using_and_namespace() {
        roundtrip("using System; namespace N { class C { } }");
    }

    #[test]
    fn prints_field_with_two_declarators() {
        roundtrip("class C { int f = 1, g; }");
    }

    #[test]
    fn prints_property_accessors() {
        roundtrip("class C { public int P { get; set; } }");
    }

    #[test]
    fn prints_nullable_ternary_distinctly() {
        roundtrip("class C { void M() { var a = x is int ? 5 : 1; } }");
        roundtrip("class C { void M() { var a = x is int? ? 5 : 1; } }");
    }

    #[test]
    fn prints_typeof_placeholders() {
        roundtrip("class C { object t = typeof(List<,>); }");
    }

    #[test]
    fn prints_new_forms() {
        roundtrip("class C { int[] a = new int[5]; }");
        roundtrip("class C { int[] a = new int[] { 1, 2, 3 }; }");
        roundtrip("class C { object a = new[] { 1, 2, 3 }; }");
    }
}
