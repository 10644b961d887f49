//! Typed AST for C# 4 compilation units.
//!
//! Every node carries a `Span` of token indices (start inclusive, end
//! exclusive) into the stream the parser consumed. A node's span contains
//! the spans of all of its descendants. Trees are never shared: the
//! document root owns everything transitively.

use serde::{Deserialize, Serialize};

/// Token-index range of a node: `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty() -> Self {
        Self { start: 0, end: 0 }
    }
}

// ── Documents and namespaces ───────────────────────────────────────────

/// A whole compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub usings: Vec<UsingNamespace>,
    pub aliases: Vec<UsingAlias>,
    /// Assembly- and module-scoped attribute groups.
    pub attributes: Vec<AttributeGroup>,
    pub namespaces: Vec<NamespaceDecl>,
    pub types: Vec<TypeDecl>,
    pub span: Span,
}

impl Document {
    pub fn empty() -> Self {
        Self {
            usings: Vec::new(),
            aliases: Vec::new(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
            types: Vec::new(),
            span: Span::empty(),
        }
    }
}

/// `using System.Collections;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsingNamespace {
    pub name: Vec<String>,
    pub span: Span,
}

/// `using Dict = System.Collections.Generic.Dictionary<string, int>;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsingAlias {
    pub alias: String,
    pub target: TypeRef,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub name: Vec<String>,
    pub usings: Vec<UsingNamespace>,
    pub aliases: Vec<UsingAlias>,
    pub namespaces: Vec<NamespaceDecl>,
    pub types: Vec<TypeDecl>,
    pub span: Span,
}

// ── Attributes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeGroup {
    pub target: Option<AttributeTarget>,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeTarget {
    Assembly,
    Event,
    Field,
    Method,
    Module,
    Param,
    Property,
    Return,
    Type,
    Typevar,
}

impl AttributeTarget {
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "assembly" => Self::Assembly,
            "event" => Self::Event,
            "field" => Self::Field,
            "method" => Self::Method,
            "module" => Self::Module,
            "param" => Self::Param,
            "property" => Self::Property,
            "return" => Self::Return,
            "type" => Self::Type,
            "typevar" => Self::Typevar,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assembly => "assembly",
            Self::Event => "event",
            Self::Field => "field",
            Self::Method => "method",
            Self::Module => "module",
            Self::Param => "param",
            Self::Property => "property",
            Self::Return => "return",
            Self::Type => "type",
            Self::Typevar => "typevar",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: ConcreteType,
    /// Whether an argument list was written, even an empty one
    /// (`[Serializable()]` vs `[Serializable]`).
    pub parens: bool,
    pub args: Vec<AttributeArg>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeArg {
    Positional(Expr),
    Named { name: String, value: Expr },
}

// ── Modifiers ──────────────────────────────────────────────────────────

/// Member and type modifiers, kept in source order for round-tripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    Abstract,
    Const,
    Extern,
    Internal,
    New,
    Override,
    Partial,
    Private,
    Protected,
    Public,
    Readonly,
    Sealed,
    Static,
    Unsafe,
    Virtual,
    Volatile,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abstract => "abstract",
            Self::Const => "const",
            Self::Extern => "extern",
            Self::Internal => "internal",
            Self::New => "new",
            Self::Override => "override",
            Self::Partial => "partial",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Public => "public",
            Self::Readonly => "readonly",
            Self::Sealed => "sealed",
            Self::Static => "static",
            Self::Unsafe => "unsafe",
            Self::Virtual => "virtual",
            Self::Volatile => "volatile",
        }
    }
}

// ── Type references ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeRef {
    Concrete(ConcreteType),
    /// `T[]`, `T[,]`; each rank is comma-count + 1, in source order.
    Array {
        inner: Box<TypeRef>,
        ranks: Vec<usize>,
        span: Span,
    },
    Pointer {
        inner: Box<TypeRef>,
        span: Span,
    },
    Nullable {
        inner: Box<TypeRef>,
        span: Span,
    },
    /// Unnamed generic argument inside `typeof(List<,>)`.
    Placeholder { span: Span },
}

impl TypeRef {
    pub fn span(&self) -> Span {
        match self {
            TypeRef::Concrete(c) => c.span,
            TypeRef::Array { span, .. } => *span,
            TypeRef::Pointer { span, .. } => *span,
            TypeRef::Nullable { span, .. } => *span,
            TypeRef::Placeholder { span } => *span,
        }
    }
}

/// A dotted name with optional generic arguments and optional `global::`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteType {
    pub global: bool,
    pub parts: Vec<TypePart>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypePart {
    pub name: String,
    pub args: Option<Vec<TypeRef>>,
    pub span: Span,
}

// ── Type declarations ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDecl {
    Class(CompositeDecl),
    Struct(CompositeDecl),
    Interface(CompositeDecl),
    Delegate(DelegateDecl),
    Enum(EnumDecl),
}

impl TypeDecl {
    pub fn span(&self) -> Span {
        match self {
            TypeDecl::Class(d) | TypeDecl::Struct(d) | TypeDecl::Interface(d) => d.span,
            TypeDecl::Delegate(d) => d.span,
            TypeDecl::Enum(d) => d.span,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Class(d) | TypeDecl::Struct(d) | TypeDecl::Interface(d) => &d.name,
            TypeDecl::Delegate(d) => &d.name,
            TypeDecl::Enum(d) => &d.name,
        }
    }
}

/// Shared shape of class, struct and interface declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeDecl {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub generic_params: Option<Vec<GenericParam>>,
    pub bases: Vec<TypeRef>,
    pub constraints: Vec<ConstraintClause>,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericParam {
    pub attributes: Vec<AttributeGroup>,
    pub variance: Variance,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variance {
    Invariant,
    /// `out T`
    Covariant,
    /// `in T`
    Contravariant,
}

/// `where T : IComparable<T>, new()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintClause {
    pub param: String,
    pub constraints: Vec<Constraint>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Class,
    Struct,
    New,
    Type(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateDecl {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub return_type: TypeRef,
    pub name: String,
    pub generic_params: Option<Vec<GenericParam>>,
    pub params: Vec<Param>,
    pub constraints: Vec<ConstraintClause>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub underlying: Option<TypeRef>,
    pub entries: Vec<EnumEntry>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub attributes: Vec<AttributeGroup>,
    pub name: String,
    pub value: Option<Expr>,
    pub span: Span,
}

// ── Members ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Member {
    Field(FieldMember),
    /// Field-like event: `event EventHandler Changed;`
    Event(EventMember),
    /// Property-like event with explicit `add`/`remove` accessors.
    EventProperty(EventPropertyMember),
    Method(MethodMember),
    Property(PropertyMember),
    Indexer(IndexerMember),
    Constructor(ConstructorMember),
    Destructor(DestructorMember),
    OperatorUnary(UnaryOperatorMember),
    OperatorBinary(BinaryOperatorMember),
    Conversion(ConversionMember),
    Type(TypeDecl),
}

impl Member {
    pub fn span(&self) -> Span {
        match self {
            Member::Field(m) => m.span,
            Member::Event(m) => m.span,
            Member::EventProperty(m) => m.span,
            Member::Method(m) => m.span,
            Member::Property(m) => m.span,
            Member::Indexer(m) => m.span,
            Member::Constructor(m) => m.span,
            Member::Destructor(m) => m.span,
            Member::OperatorUnary(m) => m.span,
            Member::OperatorBinary(m) => m.span,
            Member::Conversion(m) => m.span,
            Member::Type(t) => t.span(),
        }
    }
}

/// One `name = initializer` pair of a field or variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameAndInitializer {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub declarators: Vec<NameAndInitializer>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub declarators: Vec<NameAndInitializer>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPropertyMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub implements_from: Option<ConcreteType>,
    pub name: String,
    pub accessors: Vec<Accessor>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accessor {
    pub kind: AccessorKind,
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessorKind {
    Get,
    Set,
    Add,
    Remove,
}

impl AccessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub return_type: TypeRef,
    /// Qualifying interface of an explicit interface implementation.
    pub implements_from: Option<ConcreteType>,
    pub name: String,
    pub generic_params: Option<Vec<GenericParam>>,
    pub params: Vec<Param>,
    pub constraints: Vec<ConstraintClause>,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub implements_from: Option<ConcreteType>,
    pub name: String,
    pub accessors: Vec<Accessor>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub implements_from: Option<ConcreteType>,
    pub params: Vec<Param>,
    pub accessors: Vec<Accessor>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub params: Vec<Param>,
    pub initializer: Option<ConstructorInitializer>,
    pub body: Block,
    pub span: Span,
}

/// `: this(...)` or `: base(...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorInitializer {
    pub kind: CtorInitKind,
    pub args: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CtorInitKind {
    This,
    Base,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestructorMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOperatorMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub return_type: TypeRef,
    pub op: OverloadableUnaryOp,
    pub param: Param,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverloadableUnaryOp {
    Plus,
    Minus,
    Not,
    BitwiseNot,
    Increment,
    Decrement,
    True,
    False,
}

impl OverloadableUnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "!",
            Self::BitwiseNot => "~",
            Self::Increment => "++",
            Self::Decrement => "--",
            Self::True => "true",
            Self::False => "false",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOperatorMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub return_type: TypeRef,
    pub op: OverloadableBinaryOp,
    pub left: Param,
    pub right: Param,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverloadableBinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
}

impl OverloadableBinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::BitwiseAnd => "&",
            Self::BitwiseOr => "|",
            Self::BitwiseXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEq => "<=",
            Self::GreaterEq => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionMember {
    pub attributes: Vec<AttributeGroup>,
    pub modifiers: Vec<Modifier>,
    pub kind: ConversionKind,
    pub target_type: TypeRef,
    pub param: Param,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionKind {
    Implicit,
    Explicit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub attributes: Vec<AttributeGroup>,
    pub modifier: ParamModifier,
    pub ty: TypeRef,
    pub name: String,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamModifier {
    None,
    Ref,
    Out,
    Params,
    /// Extension-method receiver marker.
    This,
}

/// One argument of a call, indexing, or constructor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// C# 4 named argument: `f(count: 3)`.
    pub name: Option<String>,
    pub modifier: ArgModifier,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgModifier {
    None,
    Ref,
    Out,
}

// ── Statements ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Empty {
        span: Span,
    },
    Block(Block),
    VarDecl(VarDeclStatement),
    Expr {
        expr: Expr,
        span: Span,
    },
    Return {
        expr: Option<Expr>,
        span: Span,
    },
    Throw {
        expr: Option<Expr>,
        span: Span,
    },
    Checked {
        body: Block,
        span: Span,
    },
    Unchecked {
        body: Block,
        span: Span,
    },
    Unsafe {
        body: Block,
        span: Span,
    },
    Switch {
        discriminant: Expr,
        groups: Vec<CaseGroup>,
        span: Span,
    },
    For {
        init: Vec<Statement>,
        condition: Option<Expr>,
        iter: Vec<Expr>,
        body: Box<Statement>,
        span: Span,
    },
    Foreach {
        ty: Option<TypeRef>,
        var: String,
        source: Expr,
        body: Box<Statement>,
        span: Span,
    },
    While {
        condition: Expr,
        body: Box<Statement>,
        span: Span,
    },
    DoWhile {
        body: Box<Statement>,
        condition: Expr,
        span: Span,
    },
    If {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        span: Span,
    },
    Using {
        resource: Box<Statement>,
        body: Box<Statement>,
        span: Span,
    },
    Fixed {
        decl: VarDeclStatement,
        body: Box<Statement>,
        span: Span,
    },
    Lock {
        expr: Expr,
        body: Box<Statement>,
        span: Span,
    },
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
        span: Span,
    },
    GotoLabel {
        label: String,
        span: Span,
    },
    GotoCase {
        expr: Expr,
        span: Span,
    },
    GotoDefault {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Break {
        span: Span,
    },
    YieldReturn {
        expr: Expr,
        span: Span,
    },
    YieldBreak {
        span: Span,
    },
    /// Goto-target labels stacked on the statement that follows them.
    Labelled {
        labels: Vec<String>,
        inner: Box<Statement>,
        span: Span,
    },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Empty { span } => *span,
            Statement::Block(b) => b.span,
            Statement::VarDecl(d) => d.span,
            Statement::Expr { span, .. } => *span,
            Statement::Return { span, .. } => *span,
            Statement::Throw { span, .. } => *span,
            Statement::Checked { span, .. } => *span,
            Statement::Unchecked { span, .. } => *span,
            Statement::Unsafe { span, .. } => *span,
            Statement::Switch { span, .. } => *span,
            Statement::For { span, .. } => *span,
            Statement::Foreach { span, .. } => *span,
            Statement::While { span, .. } => *span,
            Statement::DoWhile { span, .. } => *span,
            Statement::If { span, .. } => *span,
            Statement::Using { span, .. } => *span,
            Statement::Fixed { span, .. } => *span,
            Statement::Lock { span, .. } => *span,
            Statement::Try { span, .. } => *span,
            Statement::GotoLabel { span, .. } => *span,
            Statement::GotoCase { span, .. } => *span,
            Statement::GotoDefault { span } => *span,
            Statement::Continue { span } => *span,
            Statement::Break { span } => *span,
            Statement::YieldReturn { span, .. } => *span,
            Statement::YieldBreak { span } => *span,
            Statement::Labelled { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDeclStatement {
    pub is_const: bool,
    pub ty: TypeRef,
    pub declarators: Vec<NameAndInitializer>,
    pub span: Span,
}

impl VarDeclStatement {
    /// Whether the declared type is a pointer type (the `fixed` statement
    /// requires one).
    pub fn is_pointer(&self) -> bool {
        matches!(self.ty, TypeRef::Pointer { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseGroup {
    pub labels: Vec<CaseLabel>,
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaseLabel {
    Case(Expr),
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub ty: Option<TypeRef>,
    pub name: Option<String>,
    pub body: Block,
    pub span: Span,
}

// ── Expressions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lit {
    /// Verbatim source text, suffixes included.
    Number(String),
    /// Verbatim source text, quotes included.
    Str(String),
    /// Verbatim source text, quotes included.
    Char(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    ShiftLeft,
    ShiftRight,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Subtract => "-=",
            Self::Multiply => "*=",
            Self::Divide => "/=",
            Self::Modulo => "%=",
            Self::ShiftLeft => "<<=",
            Self::ShiftRight => ">>=",
            Self::BitwiseAnd => "&=",
            Self::BitwiseXor => "^=",
            Self::BitwiseOr => "|=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Coalesce,
    Or,
    And,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coalesce => "??",
            Self::Or => "||",
            Self::And => "&&",
            Self::BitwiseOr => "|",
            Self::BitwiseXor => "^",
            Self::BitwiseAnd => "&",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitwiseNot,
    PreIncrement,
    PreDecrement,
    Dereference,
    AddressOf,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "!",
            Self::BitwiseNot => "~",
            Self::PreIncrement => "++",
            Self::PreDecrement => "--",
            Self::Dereference => "*",
            Self::AddressOf => "&",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

impl PostfixOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal {
        value: Lit,
        span: Span,
    },
    This {
        span: Span,
    },
    Base {
        span: Span,
    },
    Ident {
        name: String,
        type_args: Option<Vec<TypeRef>>,
        span: Span,
    },
    /// A name used in expression position that can only be a type path:
    /// `int.Parse`, `global::System.Console`.
    QualifiedType {
        ty: ConcreteType,
        span: Span,
    },
    MemberAccess {
        target: Box<Expr>,
        /// `->` instead of `.`
        is_pointer: bool,
        member: String,
        type_args: Option<Vec<TypeRef>>,
        span: Span,
    },
    /// Call `f(...)` or indexing `a[...]`, distinguished by `is_indexer`.
    Invoke {
        target: Box<Expr>,
        args: Vec<Argument>,
        is_indexer: bool,
        span: Span,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Is {
        expr: Box<Expr>,
        ty: TypeRef,
        span: Span,
    },
    As {
        expr: Box<Expr>,
        ty: TypeRef,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
        span: Span,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
        span: Span,
    },
    Typeof {
        ty: TypeRef,
        span: Span,
    },
    Sizeof {
        ty: TypeRef,
        span: Span,
    },
    Default {
        ty: TypeRef,
        span: Span,
    },
    CheckedExpr {
        expr: Box<Expr>,
        span: Span,
    },
    UncheckedExpr {
        expr: Box<Expr>,
        span: Span,
    },
    Paren {
        expr: Box<Expr>,
        span: Span,
    },
    NewObject {
        ty: TypeRef,
        /// Whether an argument list was written; `new C { ... }` omits it.
        parens: bool,
        args: Vec<Argument>,
        initializer: Option<Initializer>,
        span: Span,
    },
    NewAnonymous {
        inits: Vec<AnonymousInit>,
        span: Span,
    },
    /// `new[] { 1, 2, 3 }`
    NewImplicitArray {
        items: Vec<Expr>,
        span: Span,
    },
    /// `new T[n, m][]...` with optional `{ ... }` initializer.
    NewArray {
        element: TypeRef,
        sizes: Vec<Expr>,
        /// Additional empty rank groups, each comma-count + 1.
        extra_ranks: Vec<usize>,
        initializer: Option<Vec<Expr>>,
        span: Span,
    },
    Stackalloc {
        ty: TypeRef,
        size: Box<Expr>,
        span: Span,
    },
    Lambda {
        params: Vec<String>,
        /// `(x) => ...` vs `x => ...`; always true for zero or several
        /// parameters.
        parenthesized: bool,
        body: LambdaBody,
        span: Span,
    },
    AnonymousMethod {
        params: Option<Vec<Param>>,
        body: Block,
        span: Span,
    },
    /// Braced expression list `{ e, ... }` used by variable initializers,
    /// array initializers and collection-initializer items.
    ArrayLiteral {
        items: Vec<Expr>,
        span: Span,
    },
    Query {
        clauses: Vec<QueryClause>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. } => *span,
            Expr::This { span } => *span,
            Expr::Base { span } => *span,
            Expr::Ident { span, .. } => *span,
            Expr::QualifiedType { span, .. } => *span,
            Expr::MemberAccess { span, .. } => *span,
            Expr::Invoke { span, .. } => *span,
            Expr::Assign { span, .. } => *span,
            Expr::Conditional { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Is { span, .. } => *span,
            Expr::As { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Postfix { span, .. } => *span,
            Expr::Cast { span, .. } => *span,
            Expr::Typeof { span, .. } => *span,
            Expr::Sizeof { span, .. } => *span,
            Expr::Default { span, .. } => *span,
            Expr::CheckedExpr { span, .. } => *span,
            Expr::UncheckedExpr { span, .. } => *span,
            Expr::Paren { span, .. } => *span,
            Expr::NewObject { span, .. } => *span,
            Expr::NewAnonymous { span, .. } => *span,
            Expr::NewImplicitArray { span, .. } => *span,
            Expr::NewArray { span, .. } => *span,
            Expr::Stackalloc { span, .. } => *span,
            Expr::Lambda { span, .. } => *span,
            Expr::AnonymousMethod { span, .. } => *span,
            Expr::ArrayLiteral { span, .. } => *span,
            Expr::Query { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

/// Object vs collection initializer after `new T(...)`: an object
/// initializer starts with `identifier = expression`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    Object { members: Vec<NameAndExpr>, span: Span },
    Collection { items: Vec<Expr>, span: Span },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameAndExpr {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

/// One member of `new { A = 1, b.C }` — the name is inferred when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousInit {
    pub name: Option<String>,
    pub value: Expr,
    pub span: Span,
}

// ── Query comprehensions ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryClause {
    From {
        ty: Option<TypeRef>,
        var: String,
        source: Expr,
        span: Span,
    },
    Let {
        var: String,
        value: Expr,
        span: Span,
    },
    Where {
        condition: Expr,
        span: Span,
    },
    Join {
        ty: Option<TypeRef>,
        var: String,
        source: Expr,
        on: Expr,
        equals: Expr,
        into: Option<String>,
        span: Span,
    },
    OrderBy {
        orderings: Vec<Ordering>,
        span: Span,
    },
    Select {
        expr: Expr,
        span: Span,
    },
    GroupBy {
        expr: Expr,
        by: Expr,
        span: Span,
    },
    /// Query continuation: `select x into g ...`
    Into {
        var: String,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub expr: Expr,
    pub direction: OrderDirection,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Unspecified,
    Ascending,
    Descending,
}
