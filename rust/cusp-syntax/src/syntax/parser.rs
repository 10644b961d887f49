//! Recursive descent parser for C# 4 compilation units.
//!
//! A single token cursor threads through all productions. Two speculative
//! contexts rewind it (lenient generic arguments and the cast-vs-
//! parenthesised split); everywhere else errors propagate outward, each
//! enclosing production splicing the failure's partial subtree into the
//! composite it was building and re-raising with that composite as the
//! new payload. The outermost error therefore carries a best-effort
//! partial document.

use crate::syntax::ast::*;
use crate::syntax::tokens::{SourceSpan, Token, TokenKind};
use thiserror::Error;

// ── Error carrier ──────────────────────────────────────────────────────

/// The single syntax-error kind: a message, the zero-based index of the
/// offending token, and the best-effort partial subtree built so far.
#[derive(Debug, Clone, Error)]
#[error("{message} (at token {pos})")]
pub struct ParseError {
    pub message: String,
    pub pos: usize,
    pub partial: Option<Partial>,
}

/// Best-effort partial result attached to a [`ParseError`].
#[derive(Debug, Clone)]
pub enum Partial {
    Document(Box<Document>),
    Namespace(Box<NamespaceDecl>),
    Member(Box<Member>),
    Statement(Box<Statement>),
    Expr(Box<Expr>),
    Type(Box<TypeRef>),
}

impl ParseError {
    pub fn new(message: impl Into<String>, pos: usize) -> Self {
        Self {
            message: message.into(),
            pos,
            partial: None,
        }
    }

    pub fn with_partial(mut self, partial: Partial) -> Self {
        self.partial = Some(partial);
        self
    }

    /// Pops the payload if it is an expression; otherwise leaves it alone.
    pub fn take_expr(&mut self) -> Option<Expr> {
        match self.partial.take() {
            Some(Partial::Expr(e)) => Some(*e),
            other => {
                self.partial = other;
                None
            }
        }
    }

    pub fn take_statement(&mut self) -> Option<Statement> {
        match self.partial.take() {
            Some(Partial::Statement(s)) => Some(*s),
            other => {
                self.partial = other;
                None
            }
        }
    }

    pub fn take_member(&mut self) -> Option<Member> {
        match self.partial.take() {
            Some(Partial::Member(m)) => Some(*m),
            other => {
                self.partial = other;
                None
            }
        }
    }

    pub fn take_namespace(&mut self) -> Option<NamespaceDecl> {
        match self.partial.take() {
            Some(Partial::Namespace(n)) => Some(*n),
            other => {
                self.partial = other;
                None
            }
        }
    }
}

/// Parses an embedded statement; on failure, splices the failed child's
/// partial payload into the enclosing statement `$build` constructs and
/// re-raises with that composite. The enclosing pieces are moved only on
/// the diverging error path.
macro_rules! child_stmt {
    ($self:expr, $start:expr, |$child:ident, $span:ident| $build:expr) => {
        match $self.parse_statement() {
            Ok(s) => s,
            Err(mut e) => {
                let $child = Box::new(e.take_statement().unwrap_or(Statement::Empty {
                    span: Span::new($self.pos, $self.pos),
                }));
                let $span = Span::new($start, $self.pos);
                return Err(e.with_partial(Partial::Statement(Box::new($build))));
            }
        }
    };
}

// ── Token buffer ───────────────────────────────────────────────────────

/// Random-access view over the lexed tokens with an end-of-file sentinel
/// past the last real token, and the in-place split of `>>`-shaped tokens
/// used when closing nested generic argument lists.
pub struct TokenBuffer {
    tokens: Vec<Token>,
    eof: Token,
    /// Indices at which a split was performed, in order. Speculative
    /// callers snapshot the length and undo back to it when they rewind,
    /// so a backed-out parse sees the original `>>`-shaped tokens again.
    splits: Vec<usize>,
}

impl TokenBuffer {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            eof: Token::eof(),
            splits: Vec::new(),
        }
    }

    pub fn get(&self, index: usize) -> &Token {
        self.tokens.get(index).unwrap_or(&self.eof)
    }

    pub fn has(&self, index: usize) -> bool {
        index < self.tokens.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Splits `>>`, `>=` or `>>=` at `index` into `>` plus the remainder so
    /// the first half can close a generic argument list. Any other token is
    /// left untouched.
    pub fn split_closer(&mut self, index: usize) {
        let Some(tok) = self.tokens.get(index) else {
            return;
        };
        let rest_kind = match tok.kind {
            TokenKind::Shr => TokenKind::Gt,
            TokenKind::GtEq => TokenKind::Assign,
            TokenKind::ShrAssign => TokenKind::GtEq,
            _ => return,
        };
        let span = tok.span;
        let first = Token::new(
            TokenKind::Gt,
            ">",
            SourceSpan::new(span.start, span.start + 1, span.line, span.col),
        );
        let rest_text: String = tok.text.chars().skip(1).collect();
        let rest = Token::new(
            rest_kind,
            rest_text,
            SourceSpan::new(span.start + 1, span.end, span.line, span.col + 1),
        );
        self.tokens[index] = first;
        self.tokens.insert(index + 1, rest);
        self.splits.push(index);
    }

    pub fn split_count(&self) -> usize {
        self.splits.len()
    }

    /// Reverses splits performed after a speculation snapshot, restoring
    /// the merged tokens.
    pub fn undo_splits(&mut self, to_count: usize) {
        while self.splits.len() > to_count {
            let index = self.splits.pop().expect("split log is non-empty");
            let rest = self.tokens.remove(index + 1);
            let first = &self.tokens[index];
            let kind = match rest.kind {
                TokenKind::Gt => TokenKind::Shr,
                TokenKind::Assign => TokenKind::GtEq,
                TokenKind::GtEq => TokenKind::ShrAssign,
                other => other,
            };
            let text = format!("{}{}", first.text, rest.text);
            let span = SourceSpan::new(
                first.span.start,
                rest.span.end,
                first.span.line,
                first.span.col,
            );
            self.tokens[index] = Token::new(kind, text, span);
        }
    }
}

// ── Type-reference flags ───────────────────────────────────────────────

/// Leniency and shape flags for [`Parser::parse_type_ref`].
#[derive(Debug, Clone, Copy)]
struct TypeRefFlags {
    /// Built-in type keywords (`int`, `string`, `void`, ...) may start the
    /// reference.
    allow_keywords: bool,
    /// Accept `<,,>` placeholder lists (for `typeof`).
    allow_empty_generics: bool,
    /// Accept `*` and `?` suffixes.
    allow_suffixes: bool,
    /// Accept `[]`, `[,]`, ... rank suffixes.
    allow_arrays: bool,
    /// On a malformed generic argument list, rewind and return the longest
    /// valid prefix instead of failing.
    lenient: bool,
}

impl TypeRefFlags {
    /// Everything a declared type can be: keywords, suffixes, arrays.
    const FULL: Self = Self {
        allow_keywords: true,
        allow_empty_generics: false,
        allow_suffixes: true,
        allow_arrays: true,
        lenient: false,
    };

    /// [`Self::FULL`] plus the lenient generic-argument fallback, used when
    /// a statement prefix may turn out to be an expression.
    const FULL_LENIENT: Self = Self {
        lenient: true,
        ..Self::FULL
    };

    /// `typeof` operand: additionally accepts `List<,>` placeholders.
    const TYPEOF: Self = Self {
        allow_empty_generics: true,
        ..Self::FULL
    };

    /// Plain dotted name, possibly generic; no keywords, no suffixes.
    const NAME: Self = Self {
        allow_keywords: false,
        allow_empty_generics: false,
        allow_suffixes: false,
        allow_arrays: false,
        lenient: false,
    };

    /// Lenient dotted name, used to re-read a member-name region that may
    /// be an explicit interface implementation or a generic method.
    const NAME_LENIENT: Self = Self {
        lenient: true,
        ..Self::NAME
    };

    /// Base-type lists and constraints: keywords but no suffixes.
    const BASE: Self = Self {
        allow_keywords: true,
        allow_empty_generics: false,
        allow_suffixes: false,
        allow_arrays: false,
        lenient: false,
    };

    /// Element type of a `new` expression: the brackets belong to the
    /// creation, not the type.
    const NEW_TYPE: Self = Self {
        allow_keywords: true,
        allow_empty_generics: false,
        allow_suffixes: true,
        allow_arrays: false,
        lenient: false,
    };
}

/// Whether a token can begin a unary expression. Drives the commit side of
/// the cast-vs-parenthesised split.
fn can_begin_expression(kind: &TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Ident(_)
            | Number(_)
            | Str(_)
            | Char(_)
            | True
            | False
            | Null
            | This
            | Base
            | New
            | Typeof
            | Sizeof
            | Default
            | Checked
            | Unchecked
            | Delegate
            | Stackalloc
            | LParen
            | Bang
            | Tilde
            | Plus
            | Minus
            | Star
            | Amp
            | PlusPlus
            | MinusMinus
    ) || kind.is_type_keyword()
}

/// Tokens that commit a speculative `<...>` in expression position to a
/// generic name rather than a chain of comparisons.
fn commits_generic_name(kind: &TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        LParen | RParen | RBracket | RBrace | Colon | Semicolon | Comma | Dot | Question | EqEq
            | NotEq
    )
}

// ── Parser ─────────────────────────────────────────────────────────────

pub struct Parser {
    buf: TokenBuffer,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            buf: TokenBuffer::new(tokens),
            pos: 0,
        }
    }

    // ── Cursor helpers ─────────────────────────────────────────────────

    fn peek_kind(&self) -> &TokenKind {
        &self.buf.get(self.pos).kind
    }

    fn peek_n_kind(&self, n: usize) -> &TokenKind {
        &self.buf.get(self.pos + n).kind
    }

    pub fn at_end(&self) -> bool {
        !self.buf.has(self.pos)
    }

    /// Current token index (for end-of-input checks by the entry points).
    pub fn pos(&self) -> usize {
        self.pos
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos;
        if self.buf.has(index) {
            self.pos += 1;
        }
        self.buf.get(index)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.peek_kind() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.err_expected(&format!("'{}'", kind)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.err_expected("identifier")),
        }
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek_kind() {
            TokenKind::Ident(name) => Some(name.as_str()),
            _ => None,
        }
    }

    fn expect_contextual(&mut self, word: &str) -> Result<(), ParseError> {
        if self.peek_ident() == Some(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.err_expected(&format!("'{}'", word)))
        }
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.pos)
    }

    fn err_expected(&self, what: &str) -> ParseError {
        ParseError::new(format!("EXPECTED: {}", what), self.pos)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.pos)
    }

    // ── Attributes ─────────────────────────────────────────────────────

    fn parse_attribute_groups(&mut self) -> Result<Vec<AttributeGroup>, ParseError> {
        let mut groups = Vec::new();
        while matches!(self.peek_kind(), TokenKind::LBracket) {
            groups.push(self.parse_attribute_group()?);
        }
        Ok(groups)
    }

    fn parse_attribute_group(&mut self) -> Result<AttributeGroup, ParseError> {
        let start = self.pos;
        self.expect(&TokenKind::LBracket)?;
        let target = self.parse_attribute_target();
        let mut attributes = vec![self.parse_attribute()?];
        while self.eat(&TokenKind::Comma) {
            if matches!(self.peek_kind(), TokenKind::RBracket) {
                break;
            }
            attributes.push(self.parse_attribute()?);
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(AttributeGroup {
            target,
            attributes,
            span: self.span_from(start),
        })
    }

    fn parse_attribute_target(&mut self) -> Option<AttributeTarget> {
        if !matches!(self.peek_n_kind(1), TokenKind::Colon) {
            return None;
        }
        let target = match self.peek_kind() {
            TokenKind::Ident(word) => AttributeTarget::from_word(word)?,
            TokenKind::Return => AttributeTarget::Return,
            TokenKind::Event => AttributeTarget::Event,
            _ => return None,
        };
        self.advance();
        self.advance();
        Some(target)
    }

    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let start = self.pos;
        let name = self.parse_concrete_name(TypeRefFlags::NAME)?;
        let mut args = Vec::new();
        let mut parens = false;
        if self.eat(&TokenKind::LParen) {
            parens = true;
            if !matches!(self.peek_kind(), TokenKind::RParen) {
                loop {
                    args.push(self.parse_attribute_arg()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        Ok(Attribute {
            name,
            parens,
            args,
            span: self.span_from(start),
        })
    }

    fn parse_attribute_arg(&mut self) -> Result<AttributeArg, ParseError> {
        if matches!(self.peek_kind(), TokenKind::Ident(_))
            && matches!(self.peek_n_kind(1), TokenKind::Assign)
        {
            let name = self.expect_ident()?;
            self.advance();
            let value = self.parse_expr(0)?;
            Ok(AttributeArg::Named { name, value })
        } else {
            Ok(AttributeArg::Positional(self.parse_expr(0)?))
        }
    }

    // ── Type references ────────────────────────────────────────────────

    fn parse_concrete_name(&mut self, flags: TypeRefFlags) -> Result<ConcreteType, ParseError> {
        match self.parse_type_ref(flags)? {
            TypeRef::Concrete(c) => Ok(c),
            other => Err(ParseError::new(
                "EXPECTED: type name",
                other.span().start,
            )),
        }
    }

    fn parse_type_ref(&mut self, flags: TypeRefFlags) -> Result<TypeRef, ParseError> {
        let start = self.pos;
        let mut global = false;
        if self.peek_ident() == Some("global")
            && matches!(self.peek_n_kind(1), TokenKind::ColonColon)
        {
            self.advance();
            self.advance();
            global = true;
        }
        let mut parts: Vec<TypePart> = Vec::new();
        loop {
            let part_start = self.pos;
            let name = match self.peek_kind() {
                TokenKind::Ident(name) => {
                    let name = name.clone();
                    self.advance();
                    name
                }
                kind if parts.is_empty() && flags.allow_keywords && kind.is_type_keyword() => {
                    let name = kind.to_string();
                    self.advance();
                    name
                }
                _ => return Err(self.err_expected("type name")),
            };
            let mut args = None;
            let mut bailed = false;
            if matches!(self.peek_kind(), TokenKind::Lt) {
                if flags.allow_empty_generics
                    && matches!(
                        self.peek_n_kind(1),
                        TokenKind::Comma
                            | TokenKind::Gt
                            | TokenKind::Shr
                            | TokenKind::GtEq
                            | TokenKind::ShrAssign
                    )
                {
                    args = Some(self.parse_placeholder_args()?);
                } else {
                    let save = self.pos;
                    let splits = self.buf.split_count();
                    match self.parse_generic_args() {
                        Ok(list) => args = Some(list),
                        Err(e) => {
                            if flags.lenient {
                                // Leave the `<` to be read as a relational
                                // operator by the caller.
                                self.pos = save;
                                self.buf.undo_splits(splits);
                                bailed = true;
                            } else {
                                return Err(e);
                            }
                        }
                    }
                }
            }
            parts.push(TypePart {
                name,
                args,
                span: self.span_from(part_start),
            });
            if bailed {
                break;
            }
            if matches!(self.peek_kind(), TokenKind::Dot)
                && matches!(self.peek_n_kind(1), TokenKind::Ident(_))
            {
                self.advance();
            } else {
                break;
            }
        }
        let mut ty = TypeRef::Concrete(ConcreteType {
            global,
            parts,
            span: self.span_from(start),
        });
        if flags.allow_suffixes {
            while matches!(self.peek_kind(), TokenKind::Star) {
                self.advance();
                ty = TypeRef::Pointer {
                    inner: Box::new(ty),
                    span: self.span_from(start),
                };
            }
            if matches!(self.peek_kind(), TokenKind::Question) {
                self.advance();
                ty = TypeRef::Nullable {
                    inner: Box::new(ty),
                    span: self.span_from(start),
                };
            }
        }
        if flags.allow_arrays {
            let mut ranks = Vec::new();
            while matches!(self.peek_kind(), TokenKind::LBracket)
                && matches!(
                    self.peek_n_kind(1),
                    TokenKind::Comma | TokenKind::RBracket
                )
            {
                self.advance();
                let mut rank = 1;
                while self.eat(&TokenKind::Comma) {
                    rank += 1;
                }
                self.expect(&TokenKind::RBracket)?;
                ranks.push(rank);
            }
            if !ranks.is_empty() {
                ty = TypeRef::Array {
                    inner: Box::new(ty),
                    ranks,
                    span: self.span_from(start),
                };
            }
        }
        Ok(ty)
    }

    /// `<T, U>` after a type part. Arguments are full type references; the
    /// closer may need a `>>`-style token split.
    fn parse_generic_args(&mut self) -> Result<Vec<TypeRef>, ParseError> {
        self.expect(&TokenKind::Lt)?;
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type_ref(TypeRefFlags::FULL)?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect_generic_close()?;
            return Ok(args);
        }
    }

    /// `<,,>` inside `typeof`: one placeholder per slot.
    fn parse_placeholder_args(&mut self) -> Result<Vec<TypeRef>, ParseError> {
        self.expect(&TokenKind::Lt)?;
        let mut args = vec![TypeRef::Placeholder {
            span: Span::new(self.pos, self.pos),
        }];
        while self.eat(&TokenKind::Comma) {
            args.push(TypeRef::Placeholder {
                span: Span::new(self.pos, self.pos),
            });
        }
        self.expect_generic_close()?;
        Ok(args)
    }

    /// Consumes a `>` closing a generic list, splitting a `>>`, `>=` or
    /// `>>=` token in place when needed.
    fn expect_generic_close(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Gt => {
                self.advance();
                Ok(())
            }
            TokenKind::Shr | TokenKind::GtEq | TokenKind::ShrAssign => {
                self.buf.split_closer(self.pos);
                self.advance();
                Ok(())
            }
            _ => Err(self.err_expected("'>'")),
        }
    }

    // ── Documents and namespaces ───────────────────────────────────────

    /// Parses a whole compilation unit. On failure the error's payload is
    /// the partial document with every completable node materialised.
    pub fn parse_document(&mut self) -> Result<Document, ParseError> {
        let start = self.pos;
        let mut doc = Document::empty();
        while !self.at_end() {
            if let Err(mut e) = self.parse_document_item(&mut doc) {
                match e.partial.take() {
                    Some(Partial::Namespace(n)) => doc.namespaces.push(*n),
                    Some(Partial::Member(m)) => match *m {
                        Member::Type(td) => doc.types.push(td),
                        other => e.partial = Some(Partial::Member(Box::new(other))),
                    },
                    other => e.partial = other,
                }
                doc.span = self.span_from(start);
                return Err(e.with_partial(Partial::Document(Box::new(doc))));
            }
        }
        doc.span = self.span_from(start);
        Ok(doc)
    }

    fn parse_document_item(&mut self, doc: &mut Document) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Using => self.parse_using_into(&mut doc.usings, &mut doc.aliases),
            TokenKind::Namespace => {
                let ns = self.parse_namespace()?;
                doc.namespaces.push(ns);
                Ok(())
            }
            TokenKind::LBracket => {
                // An assembly- or module-scoped attribute group stands
                // alone; any other group belongs to the type that follows.
                let save = self.pos;
                let group = self.parse_attribute_group()?;
                if matches!(
                    group.target,
                    Some(AttributeTarget::Assembly) | Some(AttributeTarget::Module)
                ) {
                    doc.attributes.push(group);
                    Ok(())
                } else {
                    self.pos = save;
                    let td = self.parse_scoped_type_decl()?;
                    doc.types.push(td);
                    Ok(())
                }
            }
            _ => {
                let td = self.parse_scoped_type_decl()?;
                doc.types.push(td);
                Ok(())
            }
        }
    }

    fn parse_namespace(&mut self) -> Result<NamespaceDecl, ParseError> {
        let start = self.pos;
        self.expect(&TokenKind::Namespace)?;
        let mut name = vec![self.expect_ident()?];
        while self.eat(&TokenKind::Dot) {
            name.push(self.expect_ident()?);
        }
        self.expect(&TokenKind::LBrace)?;
        let mut ns = NamespaceDecl {
            name,
            usings: Vec::new(),
            aliases: Vec::new(),
            namespaces: Vec::new(),
            types: Vec::new(),
            span: Span::empty(),
        };
        loop {
            let item = match self.peek_kind() {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => Err(self.err_expected("'}' or namespace member")),
                TokenKind::Using => self.parse_using_into(&mut ns.usings, &mut ns.aliases),
                TokenKind::Namespace => self.parse_namespace().map(|n| ns.namespaces.push(n)),
                _ => self.parse_scoped_type_decl().map(|t| ns.types.push(t)),
            };
            if let Err(mut e) = item {
                match e.partial.take() {
                    Some(Partial::Namespace(n)) => ns.namespaces.push(*n),
                    Some(Partial::Member(m)) => match *m {
                        Member::Type(td) => ns.types.push(td),
                        other => e.partial = Some(Partial::Member(Box::new(other))),
                    },
                    other => e.partial = other,
                }
                ns.span = self.span_from(start);
                return Err(e.with_partial(Partial::Namespace(Box::new(ns))));
            }
        }
        ns.span = self.span_from(start);
        Ok(ns)
    }

    fn parse_using_into(
        &mut self,
        usings: &mut Vec<UsingNamespace>,
        aliases: &mut Vec<UsingAlias>,
    ) -> Result<(), ParseError> {
        let start = self.pos;
        self.expect(&TokenKind::Using)?;
        let first = self.expect_ident()?;
        if self.eat(&TokenKind::Assign) {
            let target = self.parse_type_ref(TypeRefFlags::NAME)?;
            self.expect(&TokenKind::Semicolon)?;
            aliases.push(UsingAlias {
                alias: first,
                target,
                span: self.span_from(start),
            });
        } else {
            let mut name = vec![first];
            while self.eat(&TokenKind::Dot) {
                name.push(self.expect_ident()?);
            }
            self.expect(&TokenKind::Semicolon)?;
            usings.push(UsingNamespace {
                name,
                span: self.span_from(start),
            });
        }
        Ok(())
    }

    /// A type declaration at document or namespace scope, with its
    /// attributes and modifiers.
    fn parse_scoped_type_decl(&mut self) -> Result<TypeDecl, ParseError> {
        let start = self.pos;
        let attributes = self.parse_attribute_groups()?;
        let modifiers = self.parse_modifier_run();
        self.parse_type_decl(attributes, modifiers, start)
    }

    // ── Type declarations ──────────────────────────────────────────────

    fn parse_type_decl(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> Result<TypeDecl, ParseError> {
        self.validate_modifiers(&modifiers, TYPE_MODIFIERS, "a type declaration", start)?;
        match self.peek_kind() {
            TokenKind::Class | TokenKind::Struct | TokenKind::Interface => {
                self.parse_composite_decl(attributes, modifiers, start)
            }
            TokenKind::Enum => self.parse_enum_decl(attributes, modifiers, start),
            TokenKind::Delegate => self.parse_delegate_decl(attributes, modifiers, start),
            _ => Err(self.err_expected("type declaration")),
        }
    }

    fn parse_composite_decl(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> Result<TypeDecl, ParseError> {
        let keyword = self.advance().kind.clone();
        let name = self.expect_ident()?;
        let generic_params = if matches!(self.peek_kind(), TokenKind::Lt) {
            Some(self.parse_generic_param_list()?)
        } else {
            None
        };
        let mut bases = Vec::new();
        if self.eat(&TokenKind::Colon) {
            loop {
                bases.push(self.parse_type_ref(TypeRefFlags::BASE)?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let constraints = self.parse_constraint_clauses()?;
        self.expect(&TokenKind::LBrace)?;
        let mut members = Vec::new();
        let body = loop {
            match self.peek_kind() {
                TokenKind::RBrace => {
                    self.advance();
                    break Ok(());
                }
                TokenKind::Eof => break Err(self.err_expected("member declaration or '}'")),
                _ => match self.parse_member() {
                    Ok(m) => members.push(m),
                    Err(e) => break Err(e),
                },
            }
        };
        let wrap = |members: Vec<Member>, span: Span| {
            let decl = CompositeDecl {
                attributes,
                modifiers,
                name,
                generic_params,
                bases,
                constraints,
                members,
                span,
            };
            match keyword {
                TokenKind::Struct => TypeDecl::Struct(decl),
                TokenKind::Interface => TypeDecl::Interface(decl),
                _ => TypeDecl::Class(decl),
            }
        };
        match body {
            Ok(()) => {
                self.eat(&TokenKind::Semicolon);
                Ok(wrap(members, self.span_from(start)))
            }
            Err(mut e) => {
                if let Some(m) = e.take_member() {
                    members.push(m);
                }
                let td = wrap(members, self.span_from(start));
                Err(e.with_partial(Partial::Member(Box::new(Member::Type(td)))))
            }
        }
    }

    fn parse_enum_decl(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> Result<TypeDecl, ParseError> {
        self.advance();
        let name = self.expect_ident()?;
        let underlying = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type_ref(TypeRefFlags::BASE)?)
        } else {
            None
        };
        self.expect(&TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RBrace) {
            let e_start = self.pos;
            let attrs = self.parse_attribute_groups()?;
            let entry_name = self.expect_ident()?;
            let value = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expr(0)?)
            } else {
                None
            };
            entries.push(EnumEntry {
                attributes: attrs,
                name: entry_name,
                value,
                span: self.span_from(e_start),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        self.eat(&TokenKind::Semicolon);
        Ok(TypeDecl::Enum(EnumDecl {
            attributes,
            modifiers,
            name,
            underlying,
            entries,
            span: self.span_from(start),
        }))
    }

    fn parse_delegate_decl(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> Result<TypeDecl, ParseError> {
        self.advance();
        let return_type = self.parse_type_ref(TypeRefFlags::FULL)?;
        let name = self.expect_ident()?;
        let generic_params = if matches!(self.peek_kind(), TokenKind::Lt) {
            Some(self.parse_generic_param_list()?)
        } else {
            None
        };
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_param_list(TokenKind::RParen)?;
        let constraints = self.parse_constraint_clauses()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(TypeDecl::Delegate(DelegateDecl {
            attributes,
            modifiers,
            return_type,
            name,
            generic_params,
            params,
            constraints,
            span: self.span_from(start),
        }))
    }

    /// Declaration-side generic parameter list: per-parameter attributes
    /// and `in`/`out` variance are allowed.
    fn parse_generic_param_list(&mut self) -> Result<Vec<GenericParam>, ParseError> {
        self.expect(&TokenKind::Lt)?;
        let mut params = Vec::new();
        loop {
            let p_start = self.pos;
            let attributes = self.parse_attribute_groups()?;
            let variance = match self.peek_kind() {
                TokenKind::In => {
                    self.advance();
                    Variance::Contravariant
                }
                TokenKind::Out => {
                    self.advance();
                    Variance::Covariant
                }
                _ => Variance::Invariant,
            };
            let name = self.expect_ident()?;
            params.push(GenericParam {
                attributes,
                variance,
                name,
                span: self.span_from(p_start),
            });
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect_generic_close()?;
            return Ok(params);
        }
    }

    fn parse_constraint_clauses(&mut self) -> Result<Vec<ConstraintClause>, ParseError> {
        let mut clauses: Vec<ConstraintClause> = Vec::new();
        while self.peek_ident() == Some("where") {
            let start = self.pos;
            self.advance();
            let param = self.expect_ident()?;
            if clauses.iter().any(|c| c.param == param) {
                return Err(ParseError::new(
                    format!("duplicate constraint clause for '{}'", param),
                    start,
                ));
            }
            self.expect(&TokenKind::Colon)?;
            let mut constraints = Vec::new();
            loop {
                let c = match self.peek_kind() {
                    TokenKind::Class => {
                        self.advance();
                        Constraint::Class
                    }
                    TokenKind::Struct => {
                        self.advance();
                        Constraint::Struct
                    }
                    TokenKind::New => {
                        self.advance();
                        self.expect(&TokenKind::LParen)?;
                        self.expect(&TokenKind::RParen)?;
                        Constraint::New
                    }
                    _ => Constraint::Type(self.parse_type_ref(TypeRefFlags::BASE)?),
                };
                constraints.push(c);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            clauses.push(ConstraintClause {
                param,
                constraints,
                span: self.span_from(start),
            });
        }
        Ok(clauses)
    }

    // ── Members ────────────────────────────────────────────────────────

    /// Staged member recognition inside a type body: attributes, then the
    /// run of modifiers, then a branch on the first non-modifier token.
    fn parse_member(&mut self) -> Result<Member, ParseError> {
        let start = self.pos;
        let attributes = self.parse_attribute_groups()?;
        let modifiers = self.parse_modifier_run();
        match self.peek_kind() {
            TokenKind::Class
            | TokenKind::Struct
            | TokenKind::Interface
            | TokenKind::Enum
            | TokenKind::Delegate => {
                let td = self.parse_type_decl(attributes, modifiers, start)?;
                Ok(Member::Type(td))
            }
            TokenKind::Event => self.parse_event_member(attributes, modifiers, start),
            TokenKind::Tilde => self.parse_destructor(attributes, modifiers, start),
            TokenKind::Implicit | TokenKind::Explicit => {
                self.parse_conversion(attributes, modifiers, start)
            }
            TokenKind::Operator => {
                Err(self.err("'operator' must be preceded by a return type"))
            }
            TokenKind::Ident(_) if matches!(self.peek_n_kind(1), TokenKind::LParen) => {
                self.parse_constructor(attributes, modifiers, start)
            }
            _ => self.parse_typed_member(attributes, modifiers, start),
        }
    }

    /// Consumes the longest run of modifier keywords. `partial` is
    /// contextual: it counts only directly before a partial type or a
    /// partial (void) method.
    fn parse_modifier_run(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            let m = match self.peek_kind() {
                TokenKind::Abstract => Modifier::Abstract,
                TokenKind::Const => Modifier::Const,
                TokenKind::Extern => Modifier::Extern,
                TokenKind::Internal => Modifier::Internal,
                TokenKind::New => Modifier::New,
                TokenKind::Override => Modifier::Override,
                TokenKind::Private => Modifier::Private,
                TokenKind::Protected => Modifier::Protected,
                TokenKind::Public => Modifier::Public,
                TokenKind::Readonly => Modifier::Readonly,
                TokenKind::Sealed => Modifier::Sealed,
                TokenKind::Static => Modifier::Static,
                TokenKind::Unsafe => Modifier::Unsafe,
                TokenKind::Virtual => Modifier::Virtual,
                TokenKind::Volatile => Modifier::Volatile,
                TokenKind::Ident(word)
                    if word == "partial"
                        && matches!(
                            self.peek_n_kind(1),
                            TokenKind::Class
                                | TokenKind::Struct
                                | TokenKind::Interface
                                | TokenKind::Void
                        ) =>
                {
                    Modifier::Partial
                }
                _ => break,
            };
            self.advance();
            modifiers.push(m);
        }
        modifiers
    }

    fn validate_modifiers(
        &self,
        modifiers: &[Modifier],
        allowed: &[Modifier],
        kind_name: &str,
        at: usize,
    ) -> Result<(), ParseError> {
        for m in modifiers {
            if !allowed.contains(m) {
                return Err(ParseError::new(
                    format!("modifier '{}' is not valid on {}", m.as_str(), kind_name),
                    at,
                ));
            }
        }
        Ok(())
    }

    fn parse_event_member(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> Result<Member, ParseError> {
        self.advance();
        let ty = self.parse_type_ref(TypeRefFlags::FULL)?;
        let name_start = self.pos;
        let region = self.parse_member_name_region()?;
        let (implements_from, name, generic_params) = match region {
            MemberNameRegion::Simple {
                implements_from,
                name,
                generic_params,
            } => (implements_from, name, generic_params),
            MemberNameRegion::IndexerQualifier { .. } => {
                return Err(ParseError::new("an event cannot be an indexer", name_start))
            }
        };
        if generic_params.is_some() {
            return Err(ParseError::new(
                "an event cannot have generic parameters",
                name_start,
            ));
        }
        self.validate_modifiers(&modifiers, EVENT_MODIFIERS, "an event", start)?;
        if matches!(self.peek_kind(), TokenKind::LBrace) {
            let accessors = self.parse_accessor_list(true)?;
            return Ok(Member::EventProperty(EventPropertyMember {
                attributes,
                modifiers,
                ty,
                implements_from,
                name,
                accessors,
                span: self.span_from(start),
            }));
        }
        if implements_from.is_some() {
            return Err(ParseError::new(
                "an explicit interface event requires add and remove accessors",
                name_start,
            ));
        }
        let declarators = self.parse_declarators_with_first(name, name_start)?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(Member::Event(EventMember {
            attributes,
            modifiers,
            ty,
            declarators,
            span: self.span_from(start),
        }))
    }

    fn parse_destructor(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> Result<Member, ParseError> {
        self.expect(&TokenKind::Tilde)?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        if !matches!(self.peek_kind(), TokenKind::RParen) {
            return Err(self.err("a destructor cannot have parameters"));
        }
        self.advance();
        self.validate_modifiers(&modifiers, DESTRUCTOR_MODIFIERS, "a destructor", start)?;
        let body = self.parse_block()?;
        Ok(Member::Destructor(DestructorMember {
            attributes,
            modifiers,
            name,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_conversion(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> Result<Member, ParseError> {
        let kind = if matches!(self.peek_kind(), TokenKind::Implicit) {
            ConversionKind::Implicit
        } else {
            ConversionKind::Explicit
        };
        self.advance();
        self.expect(&TokenKind::Operator)?;
        let target_type = self.parse_type_ref(TypeRefFlags::FULL)?;
        self.expect(&TokenKind::LParen)?;
        let mut params = self.parse_param_list(TokenKind::RParen)?;
        if params.len() != 1 {
            return Err(ParseError::new(
                "a user-defined conversion must have exactly one parameter",
                start,
            ));
        }
        self.validate_modifiers(&modifiers, OPERATOR_MODIFIERS, "a user-defined conversion", start)?;
        let body = self.parse_optional_body()?;
        Ok(Member::Conversion(ConversionMember {
            attributes,
            modifiers,
            kind,
            target_type,
            param: params.remove(0),
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_constructor(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> Result<Member, ParseError> {
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_param_list(TokenKind::RParen)?;
        let initializer = if self.eat(&TokenKind::Colon) {
            let i_start = self.pos;
            let kind = match self.peek_kind() {
                TokenKind::This => CtorInitKind::This,
                TokenKind::Base => CtorInitKind::Base,
                _ => return Err(self.err_expected("'this' or 'base'")),
            };
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let args = self.parse_arguments(TokenKind::RParen)?;
            Some(ConstructorInitializer {
                kind,
                args,
                span: self.span_from(i_start),
            })
        } else {
            None
        };
        self.validate_modifiers(&modifiers, CONSTRUCTOR_MODIFIERS, "a constructor", start)?;
        let body = self.parse_block()?;
        Ok(Member::Constructor(ConstructorMember {
            attributes,
            modifiers,
            name,
            params,
            initializer,
            body,
            span: self.span_from(start),
        }))
    }

    /// Members that begin with a type reference: fields, methods,
    /// properties, indexers and operator overloads.
    fn parse_typed_member(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        start: usize,
    ) -> Result<Member, ParseError> {
        let ty = self.parse_type_ref(TypeRefFlags::FULL)?;
        match self.peek_kind() {
            TokenKind::This if matches!(self.peek_n_kind(1), TokenKind::LBracket) => {
                self.advance();
                self.parse_indexer(attributes, modifiers, ty, None, start)
            }
            TokenKind::Operator => self.parse_operator_overload(attributes, modifiers, ty, start),
            TokenKind::Ident(_) => {
                let name_start = self.pos;
                match self.parse_member_name_region()? {
                    MemberNameRegion::IndexerQualifier { implements_from } => {
                        self.parse_indexer(attributes, modifiers, ty, Some(implements_from), start)
                    }
                    MemberNameRegion::Simple {
                        implements_from,
                        name,
                        generic_params,
                    } => self.parse_named_member(
                        attributes,
                        modifiers,
                        ty,
                        implements_from,
                        name,
                        generic_params,
                        start,
                        name_start,
                    ),
                }
            }
            _ => Err(self.err_expected("member name")),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_named_member(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        ty: TypeRef,
        implements_from: Option<ConcreteType>,
        name: String,
        generic_params: Option<Vec<GenericParam>>,
        start: usize,
        name_start: usize,
    ) -> Result<Member, ParseError> {
        match self.peek_kind() {
            TokenKind::LBrace => {
                if generic_params.is_some() {
                    return Err(ParseError::new(
                        "a property cannot have generic parameters",
                        name_start,
                    ));
                }
                self.validate_modifiers(&modifiers, PROPERTY_MODIFIERS, "a property", start)?;
                let accessors = self.parse_accessor_list(false)?;
                Ok(Member::Property(PropertyMember {
                    attributes,
                    modifiers,
                    ty,
                    implements_from,
                    name,
                    accessors,
                    span: self.span_from(start),
                }))
            }
            TokenKind::LParen => {
                self.advance();
                let params = self.parse_param_list(TokenKind::RParen)?;
                let constraints = self.parse_constraint_clauses()?;
                self.validate_modifiers(&modifiers, METHOD_MODIFIERS, "a method", start)?;
                match self.parse_optional_body() {
                    Ok(body) => Ok(Member::Method(MethodMember {
                        attributes,
                        modifiers,
                        return_type: ty,
                        implements_from,
                        name,
                        generic_params,
                        params,
                        constraints,
                        body,
                        span: self.span_from(start),
                    })),
                    Err(mut e) => {
                        let body = match e.take_statement() {
                            Some(Statement::Block(b)) => Some(b),
                            Some(other) => {
                                e.partial = Some(Partial::Statement(Box::new(other)));
                                None
                            }
                            None => None,
                        };
                        let m = Member::Method(MethodMember {
                            attributes,
                            modifiers,
                            return_type: ty,
                            implements_from,
                            name,
                            generic_params,
                            params,
                            constraints,
                            body,
                            span: self.span_from(start),
                        });
                        Err(e.with_partial(Partial::Member(Box::new(m))))
                    }
                }
            }
            TokenKind::Assign | TokenKind::Semicolon | TokenKind::Comma => {
                if implements_from.is_some() {
                    return Err(ParseError::new(
                        "an explicit interface member must be a method, property, indexer or event",
                        name_start,
                    ));
                }
                if generic_params.is_some() {
                    return Err(ParseError::new(
                        "a field cannot have generic parameters",
                        name_start,
                    ));
                }
                self.validate_modifiers(&modifiers, FIELD_MODIFIERS, "a field", start)?;
                let declarators = self.parse_declarators_with_first(name, name_start)?;
                self.expect(&TokenKind::Semicolon)?;
                Ok(Member::Field(FieldMember {
                    attributes,
                    modifiers,
                    ty,
                    declarators,
                    span: self.span_from(start),
                }))
            }
            _ => Err(self.err_expected("'{', '(', '=', ',' or ';'")),
        }
    }

    fn parse_indexer(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        ty: TypeRef,
        implements_from: Option<ConcreteType>,
        start: usize,
    ) -> Result<Member, ParseError> {
        self.expect(&TokenKind::LBracket)?;
        let params = self.parse_param_list(TokenKind::RBracket)?;
        self.validate_modifiers(&modifiers, PROPERTY_MODIFIERS, "an indexer", start)?;
        let accessors = self.parse_accessor_list(false)?;
        Ok(Member::Indexer(IndexerMember {
            attributes,
            modifiers,
            ty,
            implements_from,
            params,
            accessors,
            span: self.span_from(start),
        }))
    }

    fn parse_operator_overload(
        &mut self,
        attributes: Vec<AttributeGroup>,
        modifiers: Vec<Modifier>,
        return_type: TypeRef,
        start: usize,
    ) -> Result<Member, ParseError> {
        self.expect(&TokenKind::Operator)?;
        let op_pos = self.pos;
        let op_kind = self.advance().kind.clone();
        self.expect(&TokenKind::LParen)?;
        let mut params = self.parse_param_list(TokenKind::RParen)?;
        self.validate_modifiers(&modifiers, OPERATOR_MODIFIERS, "an operator overload", start)?;
        match params.len() {
            1 => {
                let op = unary_overload_op(&op_kind).ok_or_else(|| {
                    ParseError::new(
                        format!("'{}' is not an overloadable unary operator", op_kind),
                        op_pos,
                    )
                })?;
                let body = self.parse_optional_body()?;
                Ok(Member::OperatorUnary(UnaryOperatorMember {
                    attributes,
                    modifiers,
                    return_type,
                    op,
                    param: params.remove(0),
                    body,
                    span: self.span_from(start),
                }))
            }
            2 => {
                let op = binary_overload_op(&op_kind).ok_or_else(|| {
                    ParseError::new(
                        format!("'{}' is not an overloadable binary operator", op_kind),
                        op_pos,
                    )
                })?;
                let body = self.parse_optional_body()?;
                let right = params.remove(1);
                let left = params.remove(0);
                Ok(Member::OperatorBinary(BinaryOperatorMember {
                    attributes,
                    modifiers,
                    return_type,
                    op,
                    left,
                    right,
                    body,
                    span: self.span_from(start),
                }))
            }
            _ => Err(ParseError::new(
                "an operator overload must have one or two parameters",
                op_pos,
            )),
        }
    }

    /// `{ ... }` or `;` (abstract, extern and interface members).
    fn parse_optional_body(&mut self) -> Result<Option<Block>, ParseError> {
        if self.eat(&TokenKind::Semicolon) {
            Ok(None)
        } else {
            Ok(Some(self.parse_block()?))
        }
    }

    /// Accessor list of a property, indexer or property-like event.
    fn parse_accessor_list(&mut self, for_event: bool) -> Result<Vec<Accessor>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut accessors: Vec<Accessor> = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            let a_start = self.pos;
            let attributes = self.parse_attribute_groups()?;
            let modifiers = self.parse_modifier_run();
            let kind = match self.peek_ident() {
                Some("get") if !for_event => AccessorKind::Get,
                Some("set") if !for_event => AccessorKind::Set,
                Some("add") if for_event => AccessorKind::Add,
                Some("remove") if for_event => AccessorKind::Remove,
                _ => {
                    return Err(self.err_expected(if for_event {
                        "'add' or 'remove'"
                    } else {
                        "'get' or 'set'"
                    }))
                }
            };
            self.advance();
            if accessors.iter().any(|a| a.kind == kind) {
                return Err(ParseError::new(
                    format!("duplicate '{}' accessor", kind.as_str()),
                    a_start,
                ));
            }
            self.validate_modifiers(&modifiers, ACCESSOR_MODIFIERS, "an accessor", a_start)?;
            let body = if self.eat(&TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_block()?)
            };
            accessors.push(Accessor {
                kind,
                attributes,
                modifiers,
                body,
                span: self.span_from(a_start),
            });
        }
        self.expect(&TokenKind::RBrace)?;
        if for_event && accessors.len() != 2 {
            return Err(self.err("an event must declare both add and remove accessors"));
        }
        Ok(accessors)
    }

    /// Resolves the name region of a member whose head contains `.` or `<`:
    /// an explicit interface implementation, a generic method, or both.
    fn parse_member_name_region(&mut self) -> Result<MemberNameRegion, ParseError> {
        let save = self.pos;
        let name = self.expect_ident()?;
        if !matches!(self.peek_kind(), TokenKind::Dot | TokenKind::Lt) {
            return Ok(MemberNameRegion::Simple {
                implements_from: None,
                name,
                generic_params: None,
            });
        }
        // Re-read the whole region as a lenient concrete type reference.
        self.pos = save;
        let mut reference = self.parse_concrete_name(TypeRefFlags::NAME_LENIENT)?;
        if matches!(self.peek_kind(), TokenKind::Dot)
            && matches!(self.peek_n_kind(1), TokenKind::This)
        {
            // `T IList.this[...]`: the reference is the qualifier of an
            // explicit interface indexer.
            self.advance();
            self.advance();
            return Ok(MemberNameRegion::IndexerQualifier {
                implements_from: reference,
            });
        }
        let last = reference.parts.pop().expect("a parsed name has parts");
        let implements_from = if reference.parts.is_empty() {
            None
        } else {
            reference.span.end = reference.parts.last().map(|p| p.span.end).unwrap_or(0);
            Some(reference)
        };
        let mut generic_params = None;
        if let Some(args) = last.args {
            // `M<T, U>`: arguments that are all plain identifiers are the
            // method's generic parameters (attributes are not possible in
            // this form).
            let mut params = Vec::new();
            for arg in args {
                match simple_ident_of(&arg) {
                    Some((param_name, span)) => params.push(GenericParam {
                        attributes: Vec::new(),
                        variance: Variance::Invariant,
                        name: param_name,
                        span,
                    }),
                    None => {
                        return Err(ParseError::new(
                            "generic parameters in a member declaration must be simple identifiers",
                            last.span.start,
                        ))
                    }
                }
            }
            generic_params = Some(params);
        } else if matches!(self.peek_kind(), TokenKind::Lt) {
            // The lenient read left the `<` behind (for example when a
            // parameter carries attributes); parse a declaration-side list.
            generic_params = Some(self.parse_generic_param_list()?);
        }
        Ok(MemberNameRegion::Simple {
            implements_from,
            name: last.name,
            generic_params,
        })
    }

    // ── Parameters, arguments, declarators ─────────────────────────────

    /// Parses parameters up to and including `closer` (the opener is
    /// already consumed).
    fn parse_param_list(&mut self, closer: TokenKind) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        if *self.peek_kind() != closer {
            loop {
                params.push(self.parse_param()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&closer)?;
        Ok(params)
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let start = self.pos;
        let attributes = self.parse_attribute_groups()?;
        let modifier = match self.peek_kind() {
            TokenKind::Ref => {
                self.advance();
                ParamModifier::Ref
            }
            TokenKind::Out => {
                self.advance();
                ParamModifier::Out
            }
            TokenKind::Params => {
                self.advance();
                ParamModifier::Params
            }
            TokenKind::This => {
                self.advance();
                ParamModifier::This
            }
            _ => ParamModifier::None,
        };
        let ty = self.parse_type_ref(TypeRefFlags::FULL)?;
        let name = self.expect_ident()?;
        let default = if self.eat(&TokenKind::Assign) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        Ok(Param {
            attributes,
            modifier,
            ty,
            name,
            default,
            span: self.span_from(start),
        })
    }

    /// Parses call/indexer arguments up to and including `closer`.
    fn parse_arguments(&mut self, closer: TokenKind) -> Result<Vec<Argument>, ParseError> {
        let mut args = Vec::new();
        if *self.peek_kind() != closer {
            loop {
                let a_start = self.pos;
                let name = if matches!(self.peek_kind(), TokenKind::Ident(_))
                    && matches!(self.peek_n_kind(1), TokenKind::Colon)
                {
                    let n = self.expect_ident()?;
                    self.advance();
                    Some(n)
                } else {
                    None
                };
                let modifier = match self.peek_kind() {
                    TokenKind::Ref => {
                        self.advance();
                        ArgModifier::Ref
                    }
                    TokenKind::Out => {
                        self.advance();
                        ArgModifier::Out
                    }
                    _ => ArgModifier::None,
                };
                let value = self.parse_expr(0)?;
                args.push(Argument {
                    name,
                    modifier,
                    value,
                    span: self.span_from(a_start),
                });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&closer)?;
        Ok(args)
    }

    fn parse_declarators_with_first(
        &mut self,
        first_name: String,
        first_start: usize,
    ) -> Result<Vec<NameAndInitializer>, ParseError> {
        let mut list = Vec::new();
        let mut name = first_name;
        let mut d_start = first_start;
        loop {
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_variable_initializer()?)
            } else {
                None
            };
            list.push(NameAndInitializer {
                name,
                init,
                span: self.span_from(d_start),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            d_start = self.pos;
            name = self.expect_ident()?;
        }
        Ok(list)
    }

    fn parse_declarators(&mut self) -> Result<Vec<NameAndInitializer>, ParseError> {
        let start = self.pos;
        let name = self.expect_ident()?;
        self.parse_declarators_with_first(name, start)
    }

    /// A variable initializer: an expression or a braced `{ ... }` list.
    fn parse_variable_initializer(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek_kind(), TokenKind::LBrace) {
            self.parse_array_literal_expr()
        } else {
            self.parse_expr(0)
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    pub fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.pos;
        self.expect(&TokenKind::LBrace)?;
        let mut statements = Vec::new();
        let body = loop {
            match self.peek_kind() {
                TokenKind::RBrace => {
                    self.advance();
                    break Ok(());
                }
                TokenKind::Eof => break Err(self.err_expected("statement or '}'")),
                _ => match self.parse_statement() {
                    Ok(s) => statements.push(s),
                    Err(e) => break Err(e),
                },
            }
        };
        match body {
            Ok(()) => Ok(Block {
                statements,
                span: self.span_from(start),
            }),
            Err(mut e) => {
                if let Some(s) = e.take_statement() {
                    statements.push(s);
                }
                let block = Block {
                    statements,
                    span: self.span_from(start),
                };
                Err(e.with_partial(Partial::Statement(Box::new(Statement::Block(block)))))
            }
        }
    }

    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty {
                    span: self.span_from(start),
                })
            }
            TokenKind::LBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::If => self.parse_if(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Using => self.parse_using_statement(),
            TokenKind::Fixed => self.parse_fixed(),
            TokenKind::Lock => self.parse_lock(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Return => {
                self.advance();
                let expr = if matches!(self.peek_kind(), TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_child_expr(start, |e, span| Statement::Return {
                        expr: Some(e),
                        span,
                    })?)
                };
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::Return {
                    expr,
                    span: self.span_from(start),
                })
            }
            TokenKind::Throw => {
                self.advance();
                let expr = if matches!(self.peek_kind(), TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_child_expr(start, |e, span| Statement::Throw {
                        expr: Some(e),
                        span,
                    })?)
                };
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::Throw {
                    expr,
                    span: self.span_from(start),
                })
            }
            TokenKind::Goto => self.parse_goto(),
            TokenKind::Continue => {
                self.advance();
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::Continue {
                    span: self.span_from(start),
                })
            }
            TokenKind::Break => {
                self.advance();
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::Break {
                    span: self.span_from(start),
                })
            }
            TokenKind::Checked if matches!(self.peek_n_kind(1), TokenKind::LBrace) => {
                self.advance();
                let body = self.parse_block()?;
                Ok(Statement::Checked {
                    body,
                    span: self.span_from(start),
                })
            }
            TokenKind::Unchecked if matches!(self.peek_n_kind(1), TokenKind::LBrace) => {
                self.advance();
                let body = self.parse_block()?;
                Ok(Statement::Unchecked {
                    body,
                    span: self.span_from(start),
                })
            }
            TokenKind::Unsafe => {
                self.advance();
                let body = self.parse_block()?;
                Ok(Statement::Unsafe {
                    body,
                    span: self.span_from(start),
                })
            }
            TokenKind::Const => {
                let decl = self.parse_var_decl_or_expr()?;
                self.expect(&TokenKind::Semicolon)?;
                Ok(decl_with_span(decl, self.span_from(start)))
            }
            TokenKind::Ident(word)
                if word == "yield"
                    && matches!(self.peek_n_kind(1), TokenKind::Return | TokenKind::Break) =>
            {
                self.advance();
                if matches!(self.peek_kind(), TokenKind::Return) {
                    self.advance();
                    let expr = self.parse_child_expr(start, |e, span| Statement::YieldReturn {
                        expr: e,
                        span,
                    })?;
                    self.expect(&TokenKind::Semicolon)?;
                    Ok(Statement::YieldReturn {
                        expr,
                        span: self.span_from(start),
                    })
                } else {
                    self.advance();
                    self.expect(&TokenKind::Semicolon)?;
                    Ok(Statement::YieldBreak {
                        span: self.span_from(start),
                    })
                }
            }
            TokenKind::Ident(_) if matches!(self.peek_n_kind(1), TokenKind::Colon) => {
                self.parse_labelled()
            }
            _ => {
                let stmt = self.parse_var_decl_or_expr()?;
                if let Err(mut e) = self.expect(&TokenKind::Semicolon) {
                    return Err(
                        e.with_partial(Partial::Statement(Box::new(decl_with_span(
                            stmt,
                            self.span_from(start),
                        )))),
                    );
                }
                Ok(decl_with_span(stmt, self.span_from(start)))
            }
        }
    }

    /// Parses a child expression; on failure, splices its partial payload
    /// into the statement `build` constructs and re-raises.
    fn parse_child_expr<F>(&mut self, start: usize, build: F) -> Result<Expr, ParseError>
    where
        F: FnOnce(Expr, Span) -> Statement,
    {
        match self.parse_expr(0) {
            Ok(e) => Ok(e),
            Err(mut e) => {
                if let Some(partial) = e.take_expr() {
                    let stmt = build(partial, Span::new(start, self.pos));
                    Err(e.with_partial(Partial::Statement(Box::new(stmt))))
                } else {
                    Err(e)
                }
            }
        }
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expr(0)?;
        self.expect(&TokenKind::RParen)?;
        let then_branch = child_stmt!(self, start, |child, span| Statement::If {
            condition,
            then_branch: child,
            else_branch: None,
            span,
        });
        let else_branch = if matches!(self.peek_kind(), TokenKind::Else) {
            self.advance();
            let inner = child_stmt!(self, start, |child, span| Statement::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch: Some(child),
                span,
            });
            Some(Box::new(inner))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
            span: self.span_from(start),
        })
    }

    fn parse_switch(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        self.expect(&TokenKind::LParen)?;
        let discriminant = self.parse_expr(0)?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::LBrace)?;
        let mut groups = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            let g_start = self.pos;
            let mut labels = Vec::new();
            loop {
                match self.peek_kind() {
                    TokenKind::Case => {
                        self.advance();
                        let value = self.parse_expr(0)?;
                        self.expect(&TokenKind::Colon)?;
                        labels.push(CaseLabel::Case(value));
                    }
                    // `default` not followed by `(` is a label, not the
                    // default(T) expression.
                    TokenKind::Default if !matches!(self.peek_n_kind(1), TokenKind::LParen) => {
                        self.advance();
                        self.expect(&TokenKind::Colon)?;
                        labels.push(CaseLabel::Default);
                    }
                    _ => break,
                }
            }
            if labels.is_empty() {
                return Err(self.err_expected("'case' or 'default'"));
            }
            let mut statements = Vec::new();
            loop {
                match self.peek_kind() {
                    TokenKind::Case | TokenKind::RBrace | TokenKind::Eof => break,
                    TokenKind::Default if !matches!(self.peek_n_kind(1), TokenKind::LParen) => {
                        break
                    }
                    _ => match self.parse_statement() {
                        Ok(s) => statements.push(s),
                        Err(mut e) => {
                            if let Some(s) = e.take_statement() {
                                statements.push(s);
                            }
                            groups.push(CaseGroup {
                                labels,
                                statements,
                                span: self.span_from(g_start),
                            });
                            let stmt = Statement::Switch {
                                discriminant,
                                groups,
                                span: Span::new(start, self.pos),
                            };
                            return Err(e.with_partial(Partial::Statement(Box::new(stmt))));
                        }
                    },
                }
            }
            groups.push(CaseGroup {
                labels,
                statements,
                span: self.span_from(g_start),
            });
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Statement::Switch {
            discriminant,
            groups,
            span: self.span_from(start),
        })
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expr(0)?;
        self.expect(&TokenKind::RParen)?;
        let body = child_stmt!(self, start, |child, span| Statement::While {
            condition,
            body: child,
            span,
        });
        Ok(Statement::While {
            condition,
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    fn parse_do_while(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        let body = self.parse_statement()?;
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expr(0)?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(Statement::DoWhile {
            body: Box::new(body),
            condition,
            span: self.span_from(start),
        })
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        self.expect(&TokenKind::LParen)?;
        let mut init = Vec::new();
        if !matches!(self.peek_kind(), TokenKind::Semicolon) {
            let first = self.parse_var_decl_or_expr()?;
            let is_decl = matches!(first, Statement::VarDecl(_));
            init.push(first);
            if !is_decl {
                while self.eat(&TokenKind::Comma) {
                    let e_start = self.pos;
                    let expr = self.parse_expr(0)?;
                    init.push(Statement::Expr {
                        expr,
                        span: self.span_from(e_start),
                    });
                }
            }
        }
        self.expect(&TokenKind::Semicolon)?;
        let condition = if matches!(self.peek_kind(), TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let mut iter = Vec::new();
        if !matches!(self.peek_kind(), TokenKind::RParen) {
            loop {
                iter.push(self.parse_expr(0)?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        let body = child_stmt!(self, start, |child, span| Statement::For {
            init,
            condition,
            iter,
            body: child,
            span,
        });
        Ok(Statement::For {
            init,
            condition,
            iter,
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    fn parse_foreach(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        self.expect(&TokenKind::LParen)?;
        // Shorthand: a bare identifier before `in`.
        let (ty, var) = if matches!(self.peek_kind(), TokenKind::Ident(_))
            && matches!(self.peek_n_kind(1), TokenKind::In)
        {
            (None, self.expect_ident()?)
        } else {
            let t = self.parse_type_ref(TypeRefFlags::FULL)?;
            (Some(t), self.expect_ident()?)
        };
        self.expect(&TokenKind::In)?;
        let source = self.parse_expr(0)?;
        self.expect(&TokenKind::RParen)?;
        let body = child_stmt!(self, start, |child, span| Statement::Foreach {
            ty,
            var,
            source,
            body: child,
            span,
        });
        Ok(Statement::Foreach {
            ty,
            var,
            source,
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    fn parse_using_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        self.expect(&TokenKind::LParen)?;
        let resource = self.parse_var_decl_or_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = child_stmt!(self, start, |child, span| Statement::Using {
            resource: Box::new(resource),
            body: child,
            span,
        });
        Ok(Statement::Using {
            resource: Box::new(resource),
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    fn parse_fixed(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        self.expect(&TokenKind::LParen)?;
        let decl_start = self.pos;
        let decl = match self.parse_var_decl_or_expr()? {
            Statement::VarDecl(d) if d.is_pointer() => d,
            _ => {
                return Err(ParseError::new(
                    "fixed statement requires a pointer variable declaration",
                    decl_start,
                ))
            }
        };
        self.expect(&TokenKind::RParen)?;
        let body = child_stmt!(self, start, |child, span| Statement::Fixed {
            decl,
            body: child,
            span,
        });
        Ok(Statement::Fixed {
            decl,
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    fn parse_lock(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        self.expect(&TokenKind::LParen)?;
        let expr = self.parse_expr(0)?;
        self.expect(&TokenKind::RParen)?;
        let body = child_stmt!(self, start, |child, span| Statement::Lock {
            expr,
            body: child,
            span,
        });
        Ok(Statement::Lock {
            expr,
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    fn parse_try(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while matches!(self.peek_kind(), TokenKind::Catch) {
            let c_start = self.pos;
            self.advance();
            let (ty, name) = if self.eat(&TokenKind::LParen) {
                let t = self.parse_type_ref(TypeRefFlags::FULL)?;
                let n = if matches!(self.peek_kind(), TokenKind::Ident(_)) {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                self.expect(&TokenKind::RParen)?;
                (Some(t), n)
            } else {
                (None, None)
            };
            let c_body = self.parse_block()?;
            catches.push(CatchClause {
                ty,
                name,
                body: c_body,
                span: self.span_from(c_start),
            });
        }
        let finally = if matches!(self.peek_kind(), TokenKind::Finally) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            return Err(self.err_expected("'catch' or 'finally'"));
        }
        Ok(Statement::Try {
            body,
            catches,
            finally,
            span: self.span_from(start),
        })
    }

    fn parse_goto(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        self.advance();
        match self.peek_kind() {
            TokenKind::Case => {
                self.advance();
                let expr = self.parse_expr(0)?;
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::GotoCase {
                    expr,
                    span: self.span_from(start),
                })
            }
            TokenKind::Default => {
                self.advance();
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::GotoDefault {
                    span: self.span_from(start),
                })
            }
            TokenKind::Ident(_) => {
                let label = self.expect_ident()?;
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::GotoLabel {
                    label,
                    span: self.span_from(start),
                })
            }
            _ => Err(self.err_expected("label, 'case' or 'default'")),
        }
    }

    fn parse_labelled(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        let mut labels = Vec::new();
        while matches!(self.peek_kind(), TokenKind::Ident(_))
            && matches!(self.peek_n_kind(1), TokenKind::Colon)
        {
            labels.push(self.expect_ident()?);
            self.advance();
        }
        let inner = child_stmt!(self, start, |child, span| Statement::Labelled {
            labels,
            inner: child,
            span,
        });
        Ok(Statement::Labelled {
            labels,
            inner: Box::new(inner),
            span: self.span_from(start),
        })
    }

    /// The shared declaration-or-expression helper of `for`, `using`,
    /// `fixed` and plain statements. Never consumes the trailing `;` —
    /// callers terminate on `;` or `)` as their grammar requires.
    fn parse_var_decl_or_expr(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        if matches!(self.peek_kind(), TokenKind::Const) {
            self.advance();
            let ty = self.parse_type_ref(TypeRefFlags::FULL)?;
            let declarators = self.parse_declarators()?;
            return Ok(Statement::VarDecl(VarDeclStatement {
                is_const: true,
                ty,
                declarators,
                span: self.span_from(start),
            }));
        }
        // Greedy type-reference attempt: committed only when an identifier
        // follows; otherwise the prefix is an expression.
        let save = self.pos;
        let splits = self.buf.split_count();
        if let Ok(ty) = self.parse_type_ref(TypeRefFlags::FULL_LENIENT) {
            if matches!(self.peek_kind(), TokenKind::Ident(_)) {
                let declarators = self.parse_declarators()?;
                return Ok(Statement::VarDecl(VarDeclStatement {
                    is_const: false,
                    ty,
                    declarators,
                    span: self.span_from(start),
                }));
            }
            self.pos = save;
            self.buf.undo_splits(splits);
        } else {
            self.pos = save;
            self.buf.undo_splits(splits);
        }
        match self.parse_expr(0) {
            Ok(expr) => Ok(Statement::Expr {
                expr,
                span: self.span_from(start),
            }),
            Err(mut e) => {
                if let Some(partial) = e.take_expr() {
                    let stmt = Statement::Expr {
                        expr: partial,
                        span: Span::new(start, self.pos),
                    };
                    Err(e.with_partial(Partial::Statement(Box::new(stmt))))
                } else {
                    Err(e)
                }
            }
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// The operator-precedence loop. Each binary form carries a
    /// (left, right) binding-power pair; an operator is consumed while its
    /// left power is at least `min_bp`, and its right operand is parsed at
    /// its right power. Left < right is left-associative, left > right is
    /// right-associative.
    pub fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let start = self.pos;
        let mut lhs = self.parse_unary()?;
        loop {
            use TokenKind::*;
            let assign_op = match self.peek_kind() {
                Assign => Some(AssignOp::Assign),
                PlusAssign => Some(AssignOp::Add),
                MinusAssign => Some(AssignOp::Subtract),
                StarAssign => Some(AssignOp::Multiply),
                SlashAssign => Some(AssignOp::Divide),
                PercentAssign => Some(AssignOp::Modulo),
                ShlAssign => Some(AssignOp::ShiftLeft),
                ShrAssign => Some(AssignOp::ShiftRight),
                AmpAssign => Some(AssignOp::BitwiseAnd),
                CaretAssign => Some(AssignOp::BitwiseXor),
                PipeAssign => Some(AssignOp::BitwiseOr),
                _ => None,
            };
            if let Some(op) = assign_op {
                if BP_ASSIGN.0 < min_bp {
                    break;
                }
                self.advance();
                let value = match self.parse_expr(BP_ASSIGN.1) {
                    Ok(v) => v,
                    Err(mut e) => {
                        let payload = match e.take_expr() {
                            Some(partial) => Expr::Assign {
                                op,
                                target: Box::new(lhs),
                                value: Box::new(partial),
                                span: Span::new(start, self.pos),
                            },
                            // Nothing of the value exists; the target is
                            // the best effort.
                            None => lhs,
                        };
                        return Err(e.with_partial(Partial::Expr(Box::new(payload))));
                    }
                };
                lhs = Expr::Assign {
                    op,
                    target: Box::new(lhs),
                    value: Box::new(value),
                    span: self.span_from(start),
                };
                continue;
            }
            match self.peek_kind() {
                Question => {
                    if BP_CONDITIONAL < min_bp {
                        break;
                    }
                    self.advance();
                    let then_expr = self.parse_expr(0)?;
                    self.expect(&Colon)?;
                    let else_expr = self.parse_expr(BP_CONDITIONAL)?;
                    lhs = Expr::Conditional {
                        condition: Box::new(lhs),
                        then_expr: Box::new(then_expr),
                        else_expr: Box::new(else_expr),
                        span: self.span_from(start),
                    };
                    continue;
                }
                Is | As => {
                    if BP_RELATIONAL.0 < min_bp {
                        break;
                    }
                    let is_type_test = matches!(self.peek_kind(), Is);
                    self.advance();
                    let ty = self.parse_type_ref(TypeRefFlags::FULL)?;
                    let span = self.span_from(start);
                    lhs = if is_type_test {
                        Expr::Is {
                            expr: Box::new(lhs),
                            ty,
                            span,
                        }
                    } else {
                        Expr::As {
                            expr: Box::new(lhs),
                            ty,
                            span,
                        }
                    };
                    // Non-associative: another relational-level operator
                    // may not chain onto the type test.
                    if matches!(self.peek_kind(), Lt | Gt | LtEq | GtEq | Is | As) {
                        break;
                    }
                    continue;
                }
                _ => {}
            }
            let (op, l_bp, r_bp) = match self.peek_kind() {
                QuestionQuestion => (BinaryOp::Coalesce, BP_COALESCE.0, BP_COALESCE.1),
                PipePipe => (BinaryOp::Or, 10, 11),
                AmpAmp => (BinaryOp::And, 12, 13),
                Pipe => (BinaryOp::BitwiseOr, 14, 15),
                Caret => (BinaryOp::BitwiseXor, 16, 17),
                Amp => (BinaryOp::BitwiseAnd, 18, 19),
                EqEq => (BinaryOp::Eq, 20, 21),
                NotEq => (BinaryOp::NotEq, 20, 21),
                Lt => (BinaryOp::Less, BP_RELATIONAL.0, BP_RELATIONAL.1),
                LtEq => (BinaryOp::LessEq, BP_RELATIONAL.0, BP_RELATIONAL.1),
                Gt => (BinaryOp::Greater, BP_RELATIONAL.0, BP_RELATIONAL.1),
                GtEq => (BinaryOp::GreaterEq, BP_RELATIONAL.0, BP_RELATIONAL.1),
                Shl => (BinaryOp::ShiftLeft, 24, 25),
                Shr => (BinaryOp::ShiftRight, 24, 25),
                Plus => (BinaryOp::Add, 26, 27),
                Minus => (BinaryOp::Subtract, 26, 27),
                Star => (BinaryOp::Multiply, 28, 29),
                Slash => (BinaryOp::Divide, 28, 29),
                Percent => (BinaryOp::Modulo, 28, 29),
                _ => {
                    // `x is T ? a : b`: the greedy type read took the `?`
                    // as a nullable suffix. If the right spine ends in a
                    // type test on a nullable type and an expression
                    // follows, peel one nullable level and read a ternary.
                    if BP_CONDITIONAL >= min_bp
                        && can_begin_expression(self.peek_kind())
                        && peel_nullable_type_test(&mut lhs)
                    {
                        let then_expr = self.parse_expr(0)?;
                        self.expect(&Colon)?;
                        let else_expr = self.parse_expr(BP_CONDITIONAL)?;
                        lhs = Expr::Conditional {
                            condition: Box::new(lhs),
                            then_expr: Box::new(then_expr),
                            else_expr: Box::new(else_expr),
                            span: self.span_from(start),
                        };
                        continue;
                    }
                    break;
                }
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let right = match self.parse_expr(r_bp) {
                Ok(r) => r,
                Err(mut e) => {
                    let payload = match e.take_expr() {
                        Some(partial) => Expr::Binary {
                            op,
                            left: Box::new(lhs),
                            right: Box::new(partial),
                            span: Span::new(start, self.pos),
                        },
                        None => lhs,
                    };
                    return Err(e.with_partial(Partial::Expr(Box::new(payload))));
                }
            };
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(right),
                span: self.span_from(start),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let op = match self.peek_kind() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitwiseNot),
            TokenKind::PlusPlus => Some(UnaryOp::PreIncrement),
            TokenKind::MinusMinus => Some(UnaryOp::PreDecrement),
            TokenKind::Star => Some(UnaryOp::Dereference),
            TokenKind::Amp => Some(UnaryOp::AddressOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span: self.span_from(start),
            });
        }
        // `x => ...`: one-argument implicitly typed lambda.
        if matches!(self.peek_kind(), TokenKind::Ident(_))
            && matches!(self.peek_n_kind(1), TokenKind::FatArrow)
        {
            let param = self.expect_ident()?;
            self.advance();
            let body = self.parse_lambda_body()?;
            return Ok(Expr::Lambda {
                params: vec![param],
                parenthesized: false,
                body,
                span: self.span_from(start),
            });
        }
        if matches!(self.peek_kind(), TokenKind::LParen) {
            // `() =>` and `(a, b) =>` come before the cast-vs-parenthesised
            // split.
            if self.looks_like_paren_lambda() {
                return self.parse_paren_lambda();
            }
            if let Some(cast) = self.try_parse_cast()? {
                return Ok(cast);
            }
            self.advance();
            let inner = self.parse_expr(0)?;
            self.expect(&TokenKind::RParen)?;
            let paren = Expr::Paren {
                expr: Box::new(inner),
                span: self.span_from(start),
            };
            return self.parse_postfix(paren, start);
        }
        let primary = self.parse_primary()?;
        self.parse_postfix(primary, start)
    }

    fn looks_like_paren_lambda(&self) -> bool {
        let mut i = self.pos + 1;
        if matches!(self.buf.get(i).kind, TokenKind::RParen) {
            return matches!(self.buf.get(i + 1).kind, TokenKind::FatArrow);
        }
        loop {
            if !matches!(self.buf.get(i).kind, TokenKind::Ident(_)) {
                return false;
            }
            i += 1;
            match self.buf.get(i).kind {
                TokenKind::Comma => i += 1,
                TokenKind::RParen => return matches!(self.buf.get(i + 1).kind, TokenKind::FatArrow),
                _ => return false,
            }
        }
    }

    fn parse_paren_lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        self.advance();
        let mut params = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RParen) {
            params.push(self.expect_ident()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::FatArrow)?;
        let body = self.parse_lambda_body()?;
        Ok(Expr::Lambda {
            params,
            parenthesized: true,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_lambda_body(&mut self) -> Result<LambdaBody, ParseError> {
        if matches!(self.peek_kind(), TokenKind::LBrace) {
            Ok(LambdaBody::Block(self.parse_block()?))
        } else {
            Ok(LambdaBody::Expr(Box::new(self.parse_expr(0)?)))
        }
    }

    /// The cast half of the cast-vs-parenthesised split: commit iff a type
    /// reference followed by `)` parses and the next token can begin a
    /// unary expression.
    fn try_parse_cast(&mut self) -> Result<Option<Expr>, ParseError> {
        let start = self.pos;
        let save = self.pos;
        let splits = self.buf.split_count();
        self.advance();
        let ty = match self.parse_type_ref(TypeRefFlags::FULL) {
            Ok(t) => t,
            Err(_) => {
                self.pos = save;
                self.buf.undo_splits(splits);
                return Ok(None);
            }
        };
        if !matches!(self.peek_kind(), TokenKind::RParen)
            || !can_begin_expression(self.peek_n_kind(1))
        {
            self.pos = save;
            self.buf.undo_splits(splits);
            return Ok(None);
        }
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Some(Expr::Cast {
            ty,
            expr: Box::new(operand),
            span: self.span_from(start),
        }))
    }

    fn parse_postfix(&mut self, mut expr: Expr, start: usize) -> Result<Expr, ParseError> {
        loop {
            match self.peek_kind() {
                TokenKind::Dot | TokenKind::Arrow => {
                    let is_pointer = matches!(self.peek_kind(), TokenKind::Arrow);
                    self.advance();
                    let member = self.expect_ident()?;
                    let type_args = self.try_parse_type_args_in_expr()?;
                    expr = Expr::MemberAccess {
                        target: Box::new(expr),
                        is_pointer,
                        member,
                        type_args,
                        span: self.span_from(start),
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_arguments(TokenKind::RParen)?;
                    expr = Expr::Invoke {
                        target: Box::new(expr),
                        args,
                        is_indexer: false,
                        span: self.span_from(start),
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let args = self.parse_arguments(TokenKind::RBracket)?;
                    expr = Expr::Invoke {
                        target: Box::new(expr),
                        args,
                        is_indexer: true,
                        span: self.span_from(start),
                    };
                }
                TokenKind::PlusPlus => {
                    self.advance();
                    expr = Expr::Postfix {
                        op: PostfixOp::Increment,
                        operand: Box::new(expr),
                        span: self.span_from(start),
                    };
                }
                TokenKind::MinusMinus => {
                    self.advance();
                    expr = Expr::Postfix {
                        op: PostfixOp::Decrement,
                        operand: Box::new(expr),
                        span: self.span_from(start),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Speculative `<...>` after a name in expression position. Commits
    /// only when the token after the closer cannot continue a comparison
    /// chain (the usual call-site rule).
    fn try_parse_type_args_in_expr(&mut self) -> Result<Option<Vec<TypeRef>>, ParseError> {
        if !matches!(self.peek_kind(), TokenKind::Lt) {
            return Ok(None);
        }
        let save = self.pos;
        let splits = self.buf.split_count();
        match self.parse_generic_args() {
            Ok(args) => {
                if commits_generic_name(self.peek_kind()) {
                    Ok(Some(args))
                } else {
                    self.pos = save;
                    self.buf.undo_splits(splits);
                    Ok(None)
                }
            }
            Err(_) => {
                self.pos = save;
                self.buf.undo_splits(splits);
                Ok(None)
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        match self.peek_kind().clone() {
            TokenKind::Number(text) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Lit::Number(text),
                    span: self.span_from(start),
                })
            }
            TokenKind::Str(text) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Lit::Str(text),
                    span: self.span_from(start),
                })
            }
            TokenKind::Char(text) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Lit::Char(text),
                    span: self.span_from(start),
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal {
                    value: Lit::Bool(true),
                    span: self.span_from(start),
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal {
                    value: Lit::Bool(false),
                    span: self.span_from(start),
                })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal {
                    value: Lit::Null,
                    span: self.span_from(start),
                })
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This {
                    span: self.span_from(start),
                })
            }
            TokenKind::Base => {
                self.advance();
                Ok(Expr::Base {
                    span: self.span_from(start),
                })
            }
            TokenKind::Ident(name) => {
                if name == "global" && matches!(self.peek_n_kind(1), TokenKind::ColonColon) {
                    self.advance();
                    self.advance();
                    let id = self.expect_ident()?;
                    let type_args = self.try_parse_type_args_in_expr()?;
                    let span = self.span_from(start);
                    return Ok(Expr::QualifiedType {
                        ty: ConcreteType {
                            global: true,
                            parts: vec![TypePart {
                                name: id,
                                args: type_args,
                                span,
                            }],
                            span,
                        },
                        span,
                    });
                }
                if name == "from" && self.query_follows() {
                    return self.parse_query();
                }
                self.advance();
                let type_args = self.try_parse_type_args_in_expr()?;
                Ok(Expr::Ident {
                    name,
                    type_args,
                    span: self.span_from(start),
                })
            }
            kind if kind.is_type_keyword() => {
                // Predefined type in expression position: `int.Parse(...)`.
                self.advance();
                let span = self.span_from(start);
                Ok(Expr::QualifiedType {
                    ty: ConcreteType {
                        global: false,
                        parts: vec![TypePart {
                            name: kind.to_string(),
                            args: None,
                            span,
                        }],
                        span,
                    },
                    span,
                })
            }
            TokenKind::New => self.parse_new(),
            TokenKind::Typeof => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let ty = self.parse_type_ref(TypeRefFlags::TYPEOF)?;
                self.expect(&TokenKind::RParen)?;
                Ok(Expr::Typeof {
                    ty,
                    span: self.span_from(start),
                })
            }
            TokenKind::Sizeof => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let ty = self.parse_type_ref(TypeRefFlags::FULL)?;
                self.expect(&TokenKind::RParen)?;
                Ok(Expr::Sizeof {
                    ty,
                    span: self.span_from(start),
                })
            }
            TokenKind::Default => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let ty = self.parse_type_ref(TypeRefFlags::FULL)?;
                self.expect(&TokenKind::RParen)?;
                Ok(Expr::Default {
                    ty,
                    span: self.span_from(start),
                })
            }
            TokenKind::Checked => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let expr = self.parse_expr(0)?;
                self.expect(&TokenKind::RParen)?;
                Ok(Expr::CheckedExpr {
                    expr: Box::new(expr),
                    span: self.span_from(start),
                })
            }
            TokenKind::Unchecked => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let expr = self.parse_expr(0)?;
                self.expect(&TokenKind::RParen)?;
                Ok(Expr::UncheckedExpr {
                    expr: Box::new(expr),
                    span: self.span_from(start),
                })
            }
            TokenKind::Delegate => {
                self.advance();
                let params = if self.eat(&TokenKind::LParen) {
                    Some(self.parse_param_list(TokenKind::RParen)?)
                } else {
                    None
                };
                let body = self.parse_block()?;
                Ok(Expr::AnonymousMethod {
                    params,
                    body,
                    span: self.span_from(start),
                })
            }
            TokenKind::Stackalloc => {
                self.advance();
                let ty = self.parse_type_ref(TypeRefFlags::NEW_TYPE)?;
                self.expect(&TokenKind::LBracket)?;
                let size = self.parse_expr(0)?;
                self.expect(&TokenKind::RBracket)?;
                Ok(Expr::Stackalloc {
                    ty,
                    size: Box::new(size),
                    span: self.span_from(start),
                })
            }
            _ => Err(self.err_expected("expression")),
        }
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        self.advance();
        match self.peek_kind() {
            TokenKind::LBrace => {
                // Anonymous type: `new { A = 1, b.C }`.
                self.advance();
                let mut inits = Vec::new();
                while !matches!(self.peek_kind(), TokenKind::RBrace) {
                    let i_start = self.pos;
                    let name = if matches!(self.peek_kind(), TokenKind::Ident(_))
                        && matches!(self.peek_n_kind(1), TokenKind::Assign)
                    {
                        let n = self.expect_ident()?;
                        self.advance();
                        Some(n)
                    } else {
                        None
                    };
                    let value = self.parse_expr(0)?;
                    inits.push(AnonymousInit {
                        name,
                        value,
                        span: self.span_from(i_start),
                    });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace)?;
                Ok(Expr::NewAnonymous {
                    inits,
                    span: self.span_from(start),
                })
            }
            TokenKind::LBracket if matches!(self.peek_n_kind(1), TokenKind::RBracket) => {
                // `new[] { ... }`: implicitly typed array, initializer
                // required.
                self.advance();
                self.advance();
                let items = self.parse_array_literal_items()?;
                Ok(Expr::NewImplicitArray {
                    items,
                    span: self.span_from(start),
                })
            }
            _ => {
                let ty = self.parse_type_ref(TypeRefFlags::NEW_TYPE)?;
                match self.peek_kind() {
                    TokenKind::LParen => {
                        self.advance();
                        let args = self.parse_arguments(TokenKind::RParen)?;
                        let initializer = if matches!(self.peek_kind(), TokenKind::LBrace) {
                            Some(self.parse_initializer()?)
                        } else {
                            None
                        };
                        Ok(Expr::NewObject {
                            ty,
                            parens: true,
                            args,
                            initializer,
                            span: self.span_from(start),
                        })
                    }
                    TokenKind::LBracket => {
                        self.advance();
                        let mut sizes = Vec::new();
                        let mut extra_ranks = Vec::new();
                        if matches!(self.peek_kind(), TokenKind::RBracket | TokenKind::Comma) {
                            let mut rank = 1;
                            while self.eat(&TokenKind::Comma) {
                                rank += 1;
                            }
                            self.expect(&TokenKind::RBracket)?;
                            extra_ranks.push(rank);
                        } else {
                            loop {
                                sizes.push(self.parse_expr(0)?);
                                if !self.eat(&TokenKind::Comma) {
                                    break;
                                }
                            }
                            self.expect(&TokenKind::RBracket)?;
                        }
                        while matches!(self.peek_kind(), TokenKind::LBracket)
                            && matches!(
                                self.peek_n_kind(1),
                                TokenKind::Comma | TokenKind::RBracket
                            )
                        {
                            self.advance();
                            let mut rank = 1;
                            while self.eat(&TokenKind::Comma) {
                                rank += 1;
                            }
                            self.expect(&TokenKind::RBracket)?;
                            extra_ranks.push(rank);
                        }
                        let initializer = if matches!(self.peek_kind(), TokenKind::LBrace) {
                            Some(self.parse_array_literal_items()?)
                        } else {
                            None
                        };
                        Ok(Expr::NewArray {
                            element: ty,
                            sizes,
                            extra_ranks,
                            initializer,
                            span: self.span_from(start),
                        })
                    }
                    TokenKind::LBrace => {
                        let initializer = Some(self.parse_initializer()?);
                        Ok(Expr::NewObject {
                            ty,
                            parens: false,
                            args: Vec::new(),
                            initializer,
                            span: self.span_from(start),
                        })
                    }
                    _ => Err(self.err_expected("'(', '[' or '{'")),
                }
            }
        }
    }

    /// Object vs collection initializer after a constructor call: object
    /// iff the first item is `identifier = expression`.
    fn parse_initializer(&mut self) -> Result<Initializer, ParseError> {
        let start = self.pos;
        self.expect(&TokenKind::LBrace)?;
        if matches!(self.peek_kind(), TokenKind::Ident(_))
            && matches!(self.peek_n_kind(1), TokenKind::Assign)
        {
            let mut members = Vec::new();
            while !matches!(self.peek_kind(), TokenKind::RBrace) {
                let m_start = self.pos;
                let name = self.expect_ident()?;
                self.expect(&TokenKind::Assign)?;
                let value = self.parse_variable_initializer()?;
                members.push(NameAndExpr {
                    name,
                    value,
                    span: self.span_from(m_start),
                });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBrace)?;
            Ok(Initializer::Object {
                members,
                span: self.span_from(start),
            })
        } else {
            let mut items = Vec::new();
            while !matches!(self.peek_kind(), TokenKind::RBrace) {
                let item = if matches!(self.peek_kind(), TokenKind::LBrace) {
                    // Nested braces: a multi-argument `Add`.
                    self.parse_array_literal_expr()?
                } else {
                    self.parse_expr(0)?
                };
                items.push(item);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RBrace)?;
            Ok(Initializer::Collection {
                items,
                span: self.span_from(start),
            })
        }
    }

    fn parse_array_literal_items(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut items = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RBrace) {
            let item = if matches!(self.peek_kind(), TokenKind::LBrace) {
                self.parse_array_literal_expr()?
            } else {
                self.parse_expr(0)?
            };
            items.push(item);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(items)
    }

    fn parse_array_literal_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let items = self.parse_array_literal_items()?;
        Ok(Expr::ArrayLiteral {
            items,
            span: self.span_from(start),
        })
    }

    // ── Query comprehensions ───────────────────────────────────────────

    fn query_follows(&self) -> bool {
        matches!(self.peek_n_kind(1), TokenKind::Ident(_)) || self.peek_n_kind(1).is_type_keyword()
    }

    fn parse_query(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let mut clauses = vec![self.parse_from_clause()?];
        loop {
            match self.peek_ident() {
                Some("from") => clauses.push(self.parse_from_clause()?),
                Some("let") => {
                    let c_start = self.pos;
                    self.advance();
                    let var = self.expect_ident()?;
                    self.expect(&TokenKind::Assign)?;
                    let value = self.parse_expr(0)?;
                    clauses.push(QueryClause::Let {
                        var,
                        value,
                        span: self.span_from(c_start),
                    });
                }
                Some("where") => {
                    let c_start = self.pos;
                    self.advance();
                    let condition = self.parse_expr(0)?;
                    clauses.push(QueryClause::Where {
                        condition,
                        span: self.span_from(c_start),
                    });
                }
                Some("join") => {
                    let c_start = self.pos;
                    self.advance();
                    let (ty, var) = self.parse_range_variable()?;
                    self.expect(&TokenKind::In)?;
                    let source = self.parse_expr(0)?;
                    self.expect_contextual("on")?;
                    let on = self.parse_expr(0)?;
                    self.expect_contextual("equals")?;
                    let equals = self.parse_expr(0)?;
                    let into = if self.peek_ident() == Some("into") {
                        self.advance();
                        Some(self.expect_ident()?)
                    } else {
                        None
                    };
                    clauses.push(QueryClause::Join {
                        ty,
                        var,
                        source,
                        on,
                        equals,
                        into,
                        span: self.span_from(c_start),
                    });
                }
                Some("orderby") => {
                    let c_start = self.pos;
                    self.advance();
                    let mut orderings = Vec::new();
                    loop {
                        let o_start = self.pos;
                        let expr = self.parse_expr(0)?;
                        let direction = match self.peek_ident() {
                            Some("ascending") => {
                                self.advance();
                                OrderDirection::Ascending
                            }
                            Some("descending") => {
                                self.advance();
                                OrderDirection::Descending
                            }
                            _ => OrderDirection::Unspecified,
                        };
                        orderings.push(Ordering {
                            expr,
                            direction,
                            span: self.span_from(o_start),
                        });
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    clauses.push(QueryClause::OrderBy {
                        orderings,
                        span: self.span_from(c_start),
                    });
                }
                Some("select") => {
                    let c_start = self.pos;
                    self.advance();
                    let expr = self.parse_expr(0)?;
                    clauses.push(QueryClause::Select {
                        expr,
                        span: self.span_from(c_start),
                    });
                    if !self.parse_query_continuation(&mut clauses)? {
                        break;
                    }
                }
                Some("group") => {
                    let c_start = self.pos;
                    self.advance();
                    let expr = self.parse_expr(0)?;
                    self.expect_contextual("by")?;
                    let by = self.parse_expr(0)?;
                    clauses.push(QueryClause::GroupBy {
                        expr,
                        by,
                        span: self.span_from(c_start),
                    });
                    if !self.parse_query_continuation(&mut clauses)? {
                        break;
                    }
                }
                _ => return Err(self.err_expected("query clause")),
            }
        }
        Ok(Expr::Query {
            clauses,
            span: self.span_from(start),
        })
    }

    /// `into g` after `select` or `group ... by`: pushes the continuation
    /// clause and keeps the query body going.
    fn parse_query_continuation(
        &mut self,
        clauses: &mut Vec<QueryClause>,
    ) -> Result<bool, ParseError> {
        if self.peek_ident() != Some("into") {
            return Ok(false);
        }
        let start = self.pos;
        self.advance();
        let var = self.expect_ident()?;
        clauses.push(QueryClause::Into {
            var,
            span: self.span_from(start),
        });
        Ok(true)
    }

    fn parse_from_clause(&mut self) -> Result<QueryClause, ParseError> {
        let start = self.pos;
        self.expect_contextual("from")?;
        let (ty, var) = self.parse_range_variable()?;
        self.expect(&TokenKind::In)?;
        let source = self.parse_expr(0)?;
        Ok(QueryClause::From {
            ty,
            var,
            source,
            span: self.span_from(start),
        })
    }

    /// `[type] identifier` before `in` in `from` and `join` clauses.
    fn parse_range_variable(&mut self) -> Result<(Option<TypeRef>, String), ParseError> {
        if matches!(self.peek_kind(), TokenKind::Ident(_))
            && matches!(self.peek_n_kind(1), TokenKind::In)
        {
            Ok((None, self.expect_ident()?))
        } else {
            let ty = self.parse_type_ref(TypeRefFlags::FULL)?;
            Ok((Some(ty), self.expect_ident()?))
        }
    }
}

// ── Support ────────────────────────────────────────────────────────────

/// Outcome of reading a member-name region that may contain `.` or `<`.
enum MemberNameRegion {
    Simple {
        implements_from: Option<ConcreteType>,
        name: String,
        generic_params: Option<Vec<GenericParam>>,
    },
    /// `T IList.this[...]`: cursor already past `.this`.
    IndexerQualifier { implements_from: ConcreteType },
}

// Binding powers of the forms the Pratt loop special-cases. Assignment and
// coalesce are right-associative (left > right); the conditional's else
// branch re-enters at its own level.
const BP_ASSIGN: (u8, u8) = (4, 3);
const BP_CONDITIONAL: u8 = 6;
const BP_COALESCE: (u8, u8) = (8, 7);
const BP_RELATIONAL: (u8, u8) = (22, 23);

const FIELD_MODIFIERS: &[Modifier] = &[
    Modifier::New,
    Modifier::Public,
    Modifier::Protected,
    Modifier::Internal,
    Modifier::Private,
    Modifier::Static,
    Modifier::Readonly,
    Modifier::Volatile,
    Modifier::Unsafe,
    Modifier::Const,
];
const METHOD_MODIFIERS: &[Modifier] = &[
    Modifier::New,
    Modifier::Public,
    Modifier::Protected,
    Modifier::Internal,
    Modifier::Private,
    Modifier::Static,
    Modifier::Virtual,
    Modifier::Sealed,
    Modifier::Override,
    Modifier::Abstract,
    Modifier::Extern,
    Modifier::Unsafe,
    Modifier::Partial,
];
const PROPERTY_MODIFIERS: &[Modifier] = &[
    Modifier::New,
    Modifier::Public,
    Modifier::Protected,
    Modifier::Internal,
    Modifier::Private,
    Modifier::Static,
    Modifier::Virtual,
    Modifier::Sealed,
    Modifier::Override,
    Modifier::Abstract,
    Modifier::Extern,
    Modifier::Unsafe,
];
const EVENT_MODIFIERS: &[Modifier] = PROPERTY_MODIFIERS;
const CONSTRUCTOR_MODIFIERS: &[Modifier] = &[
    Modifier::Public,
    Modifier::Protected,
    Modifier::Internal,
    Modifier::Private,
    Modifier::Extern,
    Modifier::Static,
    Modifier::Unsafe,
];
const DESTRUCTOR_MODIFIERS: &[Modifier] = &[Modifier::Extern, Modifier::Unsafe];
const OPERATOR_MODIFIERS: &[Modifier] = &[
    Modifier::Public,
    Modifier::Static,
    Modifier::Extern,
    Modifier::Unsafe,
];
const TYPE_MODIFIERS: &[Modifier] = &[
    Modifier::New,
    Modifier::Public,
    Modifier::Protected,
    Modifier::Internal,
    Modifier::Private,
    Modifier::Abstract,
    Modifier::Sealed,
    Modifier::Static,
    Modifier::Unsafe,
    Modifier::Partial,
];
const ACCESSOR_MODIFIERS: &[Modifier] = &[
    Modifier::Public,
    Modifier::Protected,
    Modifier::Internal,
    Modifier::Private,
];

/// A generic argument that is a plain single identifier, as required when
/// re-reading `M<T, U>` as a generic method head.
fn simple_ident_of(ty: &TypeRef) -> Option<(String, Span)> {
    match ty {
        TypeRef::Concrete(c)
            if !c.global && c.parts.len() == 1 && c.parts[0].args.is_none() =>
        {
            Some((c.parts[0].name.clone(), c.span))
        }
        _ => None,
    }
}

fn unary_overload_op(kind: &TokenKind) -> Option<OverloadableUnaryOp> {
    Some(match kind {
        TokenKind::Plus => OverloadableUnaryOp::Plus,
        TokenKind::Minus => OverloadableUnaryOp::Minus,
        TokenKind::Bang => OverloadableUnaryOp::Not,
        TokenKind::Tilde => OverloadableUnaryOp::BitwiseNot,
        TokenKind::PlusPlus => OverloadableUnaryOp::Increment,
        TokenKind::MinusMinus => OverloadableUnaryOp::Decrement,
        TokenKind::True => OverloadableUnaryOp::True,
        TokenKind::False => OverloadableUnaryOp::False,
        _ => return None,
    })
}

fn binary_overload_op(kind: &TokenKind) -> Option<OverloadableBinaryOp> {
    Some(match kind {
        TokenKind::Plus => OverloadableBinaryOp::Add,
        TokenKind::Minus => OverloadableBinaryOp::Subtract,
        TokenKind::Star => OverloadableBinaryOp::Multiply,
        TokenKind::Slash => OverloadableBinaryOp::Divide,
        TokenKind::Percent => OverloadableBinaryOp::Modulo,
        TokenKind::Amp => OverloadableBinaryOp::BitwiseAnd,
        TokenKind::Pipe => OverloadableBinaryOp::BitwiseOr,
        TokenKind::Caret => OverloadableBinaryOp::BitwiseXor,
        TokenKind::Shl => OverloadableBinaryOp::ShiftLeft,
        TokenKind::Shr => OverloadableBinaryOp::ShiftRight,
        TokenKind::EqEq => OverloadableBinaryOp::Eq,
        TokenKind::NotEq => OverloadableBinaryOp::NotEq,
        TokenKind::Lt => OverloadableBinaryOp::Less,
        TokenKind::Gt => OverloadableBinaryOp::Greater,
        TokenKind::LtEq => OverloadableBinaryOp::LessEq,
        TokenKind::GtEq => OverloadableBinaryOp::GreaterEq,
        _ => return None,
    })
}

/// Re-spans a declaration-or-expression statement so it covers its
/// terminating `;`.
fn decl_with_span(stmt: Statement, span: Span) -> Statement {
    match stmt {
        Statement::VarDecl(mut d) => {
            d.span = span;
            Statement::VarDecl(d)
        }
        Statement::Expr { expr, .. } => Statement::Expr { expr, span },
        other => other,
    }
}

/// Walks the right spine of `expr` looking for an `is`/`as` whose type is
/// nullable; peels one nullable level off and shrinks the affected spans.
/// Returns true when a peel happened (the pending `?`, already consumed as
/// a type suffix, is then re-read as the ternary operator).
fn peel_nullable_type_test(expr: &mut Expr) -> bool {
    match expr {
        Expr::Is { ty, span, .. } | Expr::As { ty, span, .. } => {
            if let TypeRef::Nullable { inner, .. } = ty {
                let peeled = (**inner).clone();
                span.end = peeled.span().end;
                *ty = peeled;
                true
            } else {
                false
            }
        }
        Expr::Binary { right, span, .. } => {
            if peel_nullable_type_test(right) {
                span.end = right.span().end;
                true
            } else {
                false
            }
        }
        Expr::Assign { value, span, .. } => {
            if peel_nullable_type_test(value) {
                span.end = value.span().end;
                true
            } else {
                false
            }
        }
        Expr::Unary { operand, span, .. } => {
            if peel_nullable_type_test(operand) {
                span.end = operand.span().end;
                true
            } else {
                false
            }
        }
        Expr::Conditional {
            else_expr, span, ..
        } => {
            if peel_nullable_type_test(else_expr) {
                span.end = else_expr.span().end;
                true
            } else {
                false
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    fn parser(src: &str) -> Parser {
        Parser::new(Lexer::new(src).tokenize().unwrap())
    }

    fn expr(src: &str) -> Expr {
        let mut p = parser(src);
        let e = p.parse_expr(0).unwrap();
        assert!(p.at_end(), "expression left tokens behind: {}", src);
        e
    }

    #[test]
    fn token_split_closes_nested_generics() {
        let mut p = parser("List<List<int>> x");
        let ty = p.parse_type_ref(TypeRefFlags::FULL).unwrap();
        let TypeRef::Concrete(c) = ty else {
            panic!("expected concrete type")
        };
        let args = c.parts[0].args.as_ref().unwrap();
        assert_eq!(args.len(), 1);
        let TypeRef::Concrete(inner) = &args[0] else {
            panic!("expected concrete inner type")
        };
        assert_eq!(inner.parts[0].name, "List");
        assert_eq!(p.peek_ident(), Some("x"));
    }

    #[test]
    fn rewind_after_split_restores_merged_token() {
        // The speculative generic read splits `>=`, fails to commit (an
        // identifier follows the closer), and must restore `>=` so the
        // relational reading survives: `(F < A) >= b`.
        let e = expr("F<A>=b");
        assert!(matches!(
            e,
            Expr::Binary { op: BinaryOp::GreaterEq, .. }
        ));
    }

    #[test]
    fn rewind_after_shift_split_restores_shift() {
        // `A<B>>2` backs out of the generic reading and must see `>>`
        // again: `A < (B >> 2)`.
        let e = expr("A<B>>2");
        let Expr::Binary { op, right, .. } = e else {
            panic!("expected comparison")
        };
        assert_eq!(op, BinaryOp::Less);
        assert!(matches!(
            *right,
            Expr::Binary { op: BinaryOp::ShiftRight, .. }
        ));
    }

    #[test]
    fn lenient_type_ref_backs_out_of_relational() {
        let mut p = parser("a < b");
        let ty = p.parse_type_ref(TypeRefFlags::FULL_LENIENT).unwrap();
        let TypeRef::Concrete(c) = ty else {
            panic!("expected concrete type")
        };
        assert_eq!(c.parts.len(), 1);
        assert!(c.parts[0].args.is_none());
        assert!(matches!(p.peek_kind(), TokenKind::Lt));
    }

    #[test]
    fn cast_of_unary_minus() {
        let e = expr("(int) -1");
        let Expr::Cast { expr: operand, .. } = e else {
            panic!("expected cast")
        };
        assert!(matches!(*operand, Expr::Unary { op: UnaryOp::Minus, .. }));
    }

    #[test]
    fn cast_of_identifier_type_before_minus() {
        assert!(matches!(expr("(X) -1"), Expr::Cast { .. }));
    }

    #[test]
    fn parenthesised_when_no_operand_follows() {
        // `(a) / 2`: `/` cannot begin a unary expression, so this is a
        // parenthesised name, not a cast.
        let e = expr("(a) / 2");
        let Expr::Binary { op, left, .. } = e else {
            panic!("expected division")
        };
        assert_eq!(op, BinaryOp::Divide);
        assert!(matches!(*left, Expr::Paren { .. }));
    }

    #[test]
    fn nested_parens_are_not_casts() {
        let e = expr("f((a))");
        let Expr::Invoke { args, .. } = e else {
            panic!("expected call")
        };
        assert!(matches!(args[0].value, Expr::Paren { .. }));
    }

    #[test]
    fn ternary_on_type_test() {
        // The `?` was consumed as a nullable suffix and must be peeled
        // back into the ternary operator.
        let e = expr("x is int ? 5 : 1");
        let Expr::Conditional { condition, .. } = e else {
            panic!("expected conditional")
        };
        let Expr::Is { ty, .. } = *condition else {
            panic!("expected is")
        };
        assert!(matches!(ty, TypeRef::Concrete(_)));
    }

    #[test]
    fn ternary_on_nullable_type_test() {
        let e = expr("x is int? ? 5 : 1");
        let Expr::Conditional { condition, .. } = e else {
            panic!("expected conditional")
        };
        let Expr::Is { ty, .. } = *condition else {
            panic!("expected is")
        };
        assert!(matches!(ty, TypeRef::Nullable { .. }));
    }

    #[test]
    fn type_test_without_ternary_keeps_nullable() {
        let e = expr("x is int?");
        let Expr::Is { ty, .. } = e else {
            panic!("expected is")
        };
        assert!(matches!(ty, TypeRef::Nullable { .. }));
    }

    #[test]
    fn generic_name_vs_relational() {
        // Committed: `(` follows the closer.
        let e = expr("F<int>(x)");
        let Expr::Invoke { target, .. } = e else {
            panic!("expected call")
        };
        assert!(matches!(
            *target,
            Expr::Ident { type_args: Some(_), .. }
        ));
        // Not committed: a comparison chain.
        let e = expr("a < b > c");
        assert!(matches!(
            e,
            Expr::Binary { op: BinaryOp::Greater, .. }
        ));
    }

    #[test]
    fn lambda_forms() {
        assert!(matches!(expr("x => x"), Expr::Lambda { .. }));
        assert!(matches!(expr("() => 1"), Expr::Lambda { .. }));
        let e = expr("(a, b) => a");
        let Expr::Lambda { params, .. } = &e else {
            panic!("expected lambda")
        };
        assert_eq!(params.len(), 2);
        let e = expr("x => { return x; }");
        let Expr::Lambda { body, .. } = e else {
            panic!("expected lambda")
        };
        assert!(matches!(body, LambdaBody::Block(_)));
    }

    #[test]
    fn assignment_is_right_associative() {
        let e = expr("a = b = c");
        let Expr::Assign { value, .. } = e else {
            panic!("expected assignment")
        };
        assert!(matches!(*value, Expr::Assign { .. }));
    }

    #[test]
    fn coalesce_is_right_associative() {
        let e = expr("a ?? b ?? c");
        let Expr::Binary { op, right, .. } = e else {
            panic!("expected coalesce")
        };
        assert_eq!(op, BinaryOp::Coalesce);
        assert!(matches!(
            *right,
            Expr::Binary { op: BinaryOp::Coalesce, .. }
        ));
    }

    #[test]
    fn precedence_shapes() {
        let e = expr("a + b * c");
        let Expr::Binary { op, right, .. } = e else {
            panic!("expected addition")
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            *right,
            Expr::Binary { op: BinaryOp::Multiply, .. }
        ));
        let e = expr("a << b + c");
        assert!(matches!(
            e,
            Expr::Binary { op: BinaryOp::ShiftLeft, .. }
        ));
    }

    #[test]
    fn new_forms() {
        let e = expr("new int[5]");
        let Expr::NewArray { sizes, initializer, .. } = e else {
            panic!("expected array creation")
        };
        assert_eq!(sizes.len(), 1);
        assert!(initializer.is_none());

        let e = expr("new int[] { 1, 2, 3 }");
        let Expr::NewArray { sizes, initializer, .. } = e else {
            panic!("expected array creation")
        };
        assert!(sizes.is_empty());
        assert_eq!(initializer.unwrap().len(), 3);

        let e = expr("new[] { 1, 2, 3 }");
        let Expr::NewImplicitArray { items, .. } = e else {
            panic!("expected implicit array")
        };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn object_vs_collection_initializer() {
        let e = expr("new C { A = 1, B = 2 }");
        let Expr::NewObject { initializer, .. } = e else {
            panic!("expected object creation")
        };
        assert!(matches!(initializer, Some(Initializer::Object { .. })));

        let e = expr("new C { 1, 2, { 3, 4 } }");
        let Expr::NewObject { initializer, .. } = e else {
            panic!("expected object creation")
        };
        let Some(Initializer::Collection { items, .. }) = initializer else {
            panic!("expected collection initializer")
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(items[2], Expr::ArrayLiteral { .. }));
    }

    #[test]
    fn typeof_with_placeholders() {
        let e = expr("typeof(List<,>)");
        let Expr::Typeof { ty, .. } = e else {
            panic!("expected typeof")
        };
        let TypeRef::Concrete(c) = ty else {
            panic!("expected concrete type")
        };
        let args = c.parts[0].args.as_ref().unwrap();
        assert_eq!(args.len(), 2);
        assert!(args.iter().all(|a| matches!(a, TypeRef::Placeholder { .. })));
    }

    #[test]
    fn query_with_three_clauses() {
        let e = expr("from i in xs where i > 0 select i");
        let Expr::Query { clauses, .. } = e else {
            panic!("expected query")
        };
        assert_eq!(clauses.len(), 3);
        assert!(matches!(clauses[0], QueryClause::From { .. }));
        assert!(matches!(clauses[1], QueryClause::Where { .. }));
        assert!(matches!(clauses[2], QueryClause::Select { .. }));
    }

    #[test]
    fn empty_document() {
        let doc = parser("").parse_document().unwrap();
        assert!(doc.usings.is_empty());
        assert!(doc.types.is_empty());
        assert_eq!(doc.span, Span::new(0, 0));
    }

    #[test]
    fn stray_semicolon_at_member_position_is_rejected() {
        assert!(parser("class C { ; }").parse_document().is_err());
        assert!(parser("class C { } ;").parse_document().is_ok());
    }
}
