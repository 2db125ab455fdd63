//! Sub-language adapters for types and attribute values.
//!
//! The core never interprets types or attributes. It hands a [`Cursor`]
//! positioned at the start of one to a [`TypeParser`] or [`AttributeParser`]
//! and stores whatever opaque handle comes back, together with its span.
//!
//! [`StructuralSyntax`] is the default adapter: it recognizes the shapes
//! that occur in CIR text (`!cir.ptr<!s32i>`, `#cir.int<1> : !s32i`,
//! `{alignment = 4 : i64}`, ...) by bracket balancing, without giving them
//! any meaning.

use derive_more::{Display, Error, From};

use crate::location::Span;
use crate::token::{Punct, Token, TokenKind};

// ============================================================================
// Cursor
// ============================================================================

/// Read-only position in a token stream, handed to adapters.
///
/// The underlying slice always ends with an [`TokenKind::Eof`] token, and
/// reads past the end return it.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'t, 'src> {
    tokens: &'t [Token<'src>],
    source: &'src str,
    pos: usize,
}

impl<'t, 'src> Cursor<'t, 'src> {
    pub fn new(tokens: &'t [Token<'src>], source: &'src str, pos: usize) -> Self {
        Self {
            tokens,
            source,
            pos,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> &'t Token<'src> {
        self.nth(0)
    }

    pub fn nth(&self, n: usize) -> &'t Token<'src> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)]
    }

    pub fn bump(&mut self) -> &'t Token<'src> {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    pub fn at_punct(&self, p: Punct) -> bool {
        self.peek().is_punct(p)
    }

    pub fn eat_punct(&mut self, p: Punct) -> bool {
        if self.at_punct(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Span from the token at `start` to the last consumed token.
    pub fn span_since(&self, start: usize) -> Span {
        let first = self.tokens[start.min(self.tokens.len() - 1)].span;
        if self.pos == 0 || self.pos <= start {
            return Span::empty_at(first.start);
        }
        let last = self.tokens[self.pos - 1].span;
        first.to(last)
    }

    pub fn source_text(&self, span: Span) -> &'src str {
        span.slice(self.source)
    }
}

// ============================================================================
// Opaque handles and errors
// ============================================================================

/// A type, uninterpreted. `text` is the adapter's spelling of it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpaqueType {
    pub text: String,
    pub span: Span,
}

/// Which attribute sub-grammar produced an [`OpaqueAttribute`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeForm {
    Value,
    Dialect,
    Alias,
    Dictionary,
}

/// An attribute, uninterpreted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpaqueAttribute {
    pub text: String,
    pub form: AttributeForm,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
#[display("invalid type: {message}")]
pub struct TypeParseError {
    pub message: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
#[display("invalid attribute: {message}")]
pub struct AttributeParseError {
    pub message: String,
    pub span: Span,
}

/// Failure reported by one of the external sub-language parsers.
#[derive(Clone, Debug, PartialEq, Eq, Display, Error, From)]
pub enum SubLanguageError {
    Type(TypeParseError),
    Attribute(AttributeParseError),
}

impl SubLanguageError {
    pub fn span(&self) -> Span {
        match self {
            SubLanguageError::Type(e) => e.span,
            SubLanguageError::Attribute(e) => e.span,
        }
    }
}

pub type AdapterResult<'t, 'src, T, E> = Result<(T, Cursor<'t, 'src>), E>;

// ============================================================================
// Adapter traits
// ============================================================================

pub trait TypeParser: Send + Sync {
    fn parse_type<'t, 'src>(
        &self,
        cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueType, TypeParseError>;
}

pub trait AttributeParser: Send + Sync {
    /// Any attribute value, including typed literals (`1 : i64`).
    fn parse_attribute_value<'t, 'src>(
        &self,
        cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueAttribute, AttributeParseError>;

    /// `#dialect.name` or `#dialect.name<...>`. Never consumes a `: type` suffix.
    fn parse_dialect_attribute<'t, 'src>(
        &self,
        cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueAttribute, AttributeParseError>;

    /// `#name` referring to an attribute alias.
    fn parse_attribute_alias<'t, 'src>(
        &self,
        cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueAttribute, AttributeParseError>;

    /// `{key = value, ...}`
    fn parse_dictionary_attribute<'t, 'src>(
        &self,
        cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueAttribute, AttributeParseError>;
}

/// The pair of adapters a parse uses.
#[derive(Clone, Copy)]
pub struct Adapters<'a> {
    pub types: &'a dyn TypeParser,
    pub attributes: &'a dyn AttributeParser,
}

static STRUCTURAL: StructuralSyntax = StructuralSyntax;

impl Default for Adapters<'static> {
    fn default() -> Self {
        Self {
            types: &STRUCTURAL,
            attributes: &STRUCTURAL,
        }
    }
}

impl std::fmt::Debug for Adapters<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapters").finish_non_exhaustive()
    }
}

/// Whether `tok` can start an attribute alias (as opposed to a dialect
/// attribute). Used by the grammar table to pick between the two.
pub fn is_attribute_alias(tok: &Token<'_>, next: &Token<'_>) -> bool {
    tok.kind == TokenKind::AttrId && !tok.text.contains('.') && !next.is_punct(Punct::Less)
}

// ============================================================================
// Default structural adapter
// ============================================================================

const BUILTIN_SHAPED: &[&str] = &["tensor", "vector", "memref", "complex", "tuple"];

fn is_builtin_scalar(word: &str) -> bool {
    let sized = |prefix: &str| {
        word.strip_prefix(prefix)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    };
    matches!(word, "index" | "none" | "bf16" | "tf32")
        || sized("i")
        || sized("si")
        || sized("ui")
        || sized("f")
}

/// Recognizes CIR type and attribute text by shape.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralSyntax;

impl StructuralSyntax {
    /// Consume a bracketed group starting at an opening token, honoring
    /// nesting of all bracket kinds. Returns false if input ends first.
    fn skip_balanced(cursor: &mut Cursor<'_, '_>) -> bool {
        let mut depth = 0usize;
        loop {
            let tok = cursor.bump();
            match tok.kind {
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace | Punct::Less) => {
                    depth += 1;
                }
                TokenKind::Punct(
                    Punct::RParen | Punct::RBracket | Punct::RBrace | Punct::Greater,
                ) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return true;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
    }

    fn opaque_type(cursor: &Cursor<'_, '_>, start: usize) -> OpaqueType {
        let span = cursor.span_since(start);
        OpaqueType {
            text: cursor.source_text(span).to_owned(),
            span,
        }
    }

    fn opaque_attr(cursor: &Cursor<'_, '_>, start: usize, form: AttributeForm) -> OpaqueAttribute {
        let span = cursor.span_since(start);
        OpaqueAttribute {
            text: cursor.source_text(span).to_owned(),
            form,
            span,
        }
    }

    fn type_error(cursor: &Cursor<'_, '_>, message: impl Into<String>) -> TypeParseError {
        TypeParseError {
            message: message.into(),
            span: cursor.peek().span,
        }
    }

    fn attr_error(cursor: &Cursor<'_, '_>, message: impl Into<String>) -> AttributeParseError {
        AttributeParseError {
            message: message.into(),
            span: cursor.peek().span,
        }
    }

    fn type_list<'t, 'src>(
        &self,
        mut cursor: Cursor<'t, 'src>,
    ) -> Result<Cursor<'t, 'src>, TypeParseError> {
        // at `(`
        cursor.bump();
        if cursor.eat_punct(Punct::RParen) {
            return Ok(cursor);
        }
        loop {
            let (_, next) = self.parse_type(cursor)?;
            cursor = next;
            if cursor.eat_punct(Punct::Comma) {
                continue;
            }
            if cursor.eat_punct(Punct::RParen) {
                return Ok(cursor);
            }
            return Err(Self::type_error(&cursor, format!(
                "expected `,` or `)` in type list, found {}",
                cursor.peek().describe()
            )));
        }
    }

    /// Optional `: type` suffix of a typed attribute literal.
    fn typed_suffix<'t, 'src>(
        &self,
        cursor: Cursor<'t, 'src>,
    ) -> Result<Cursor<'t, 'src>, AttributeParseError> {
        if !cursor.at_punct(Punct::Colon) {
            return Ok(cursor);
        }
        let mut after = cursor;
        after.bump();
        match self.parse_type(after) {
            Ok((_, next)) => Ok(next),
            Err(e) => Err(AttributeParseError {
                message: e.message,
                span: e.span,
            }),
        }
    }
}

impl TypeParser for StructuralSyntax {
    fn parse_type<'t, 'src>(
        &self,
        mut cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueType, TypeParseError> {
        let start = cursor.position();
        let tok = *cursor.peek();
        match tok.kind {
            TokenKind::TypeId => {
                cursor.bump();
                if cursor.at_punct(Punct::Less) && !Self::skip_balanced(&mut cursor) {
                    return Err(Self::type_error(&cursor, "unterminated `<` in type"));
                }
            }
            TokenKind::Ident if is_builtin_scalar(tok.text) => {
                cursor.bump();
            }
            TokenKind::Ident if BUILTIN_SHAPED.contains(&tok.text) => {
                cursor.bump();
                if !cursor.at_punct(Punct::Less) {
                    return Err(Self::type_error(&cursor, format!(
                        "expected `<` after `{}`",
                        tok.text
                    )));
                }
                if !Self::skip_balanced(&mut cursor) {
                    return Err(Self::type_error(&cursor, "unterminated `<` in type"));
                }
            }
            TokenKind::Punct(Punct::LParen) => {
                cursor = self.type_list(cursor)?;
                if !cursor.eat_punct(Punct::Arrow) {
                    return Err(Self::type_error(&cursor, format!(
                        "expected `->` in function type, found {}",
                        cursor.peek().describe()
                    )));
                }
                if cursor.at_punct(Punct::LParen) {
                    cursor = self.type_list(cursor)?;
                } else {
                    let (_, next) = self.parse_type(cursor)?;
                    cursor = next;
                }
            }
            _ => {
                return Err(Self::type_error(
                    &cursor,
                    format!("expected a type, found {}", tok.describe()),
                ));
            }
        }
        Ok((Self::opaque_type(&cursor, start), cursor))
    }
}

impl AttributeParser for StructuralSyntax {
    fn parse_attribute_value<'t, 'src>(
        &self,
        mut cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueAttribute, AttributeParseError> {
        let start = cursor.position();
        let tok = *cursor.peek();
        match tok.kind {
            TokenKind::AttrId => {
                cursor.bump();
                if cursor.at_punct(Punct::Less) && !Self::skip_balanced(&mut cursor) {
                    return Err(Self::attr_error(&cursor, "unterminated `<` in attribute"));
                }
                cursor = self.typed_suffix(cursor)?;
            }
            TokenKind::Integer | TokenKind::Float | TokenKind::String => {
                cursor.bump();
                cursor = self.typed_suffix(cursor)?;
            }
            TokenKind::SymbolId => {
                cursor.bump();
            }
            TokenKind::Ident if matches!(tok.text, "true" | "false" | "unit") => {
                cursor.bump();
            }
            TokenKind::Ident if matches!(tok.text, "dense" | "array" | "sparse") => {
                cursor.bump();
                if !cursor.at_punct(Punct::Less) || !Self::skip_balanced(&mut cursor) {
                    return Err(Self::attr_error(&cursor, format!(
                        "expected `<...>` after `{}`",
                        tok.text
                    )));
                }
                cursor = self.typed_suffix(cursor)?;
            }
            TokenKind::Ident if tok.text == "loc" => {
                cursor.bump();
                if !cursor.at_punct(Punct::LParen) || !Self::skip_balanced(&mut cursor) {
                    return Err(Self::attr_error(&cursor, "expected `(...)` after `loc`"));
                }
            }
            TokenKind::Punct(Punct::LBracket) => {
                cursor.bump();
                while !cursor.at_punct(Punct::RBracket) {
                    let (_, next) = self.parse_attribute_value(cursor)?;
                    cursor = next;
                    if !cursor.eat_punct(Punct::Comma) && !cursor.at_punct(Punct::RBracket) {
                        return Err(Self::attr_error(&cursor, format!(
                            "expected `,` or `]` in array attribute, found {}",
                            cursor.peek().describe()
                        )));
                    }
                }
                cursor.bump();
            }
            TokenKind::Punct(Punct::LBrace) => {
                let (attr, next) = self.parse_dictionary_attribute(cursor)?;
                return Ok((
                    OpaqueAttribute {
                        form: AttributeForm::Value,
                        ..attr
                    },
                    next,
                ));
            }
            _ => match self.parse_type(cursor) {
                Ok((_, next)) => cursor = next,
                Err(_) => {
                    return Err(Self::attr_error(
                        &cursor,
                        format!("expected an attribute value, found {}", tok.describe()),
                    ));
                }
            },
        }
        Ok((
            Self::opaque_attr(&cursor, start, AttributeForm::Value),
            cursor,
        ))
    }

    fn parse_dialect_attribute<'t, 'src>(
        &self,
        mut cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueAttribute, AttributeParseError> {
        let start = cursor.position();
        let tok = *cursor.peek();
        let next = cursor.nth(1);
        if tok.kind != TokenKind::AttrId || is_attribute_alias(&tok, next) {
            return Err(Self::attr_error(
                &cursor,
                format!("expected a dialect attribute, found {}", tok.describe()),
            ));
        }
        cursor.bump();
        if cursor.at_punct(Punct::Less) && !Self::skip_balanced(&mut cursor) {
            return Err(Self::attr_error(&cursor, "unterminated `<` in attribute"));
        }
        Ok((
            Self::opaque_attr(&cursor, start, AttributeForm::Dialect),
            cursor,
        ))
    }

    fn parse_attribute_alias<'t, 'src>(
        &self,
        mut cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueAttribute, AttributeParseError> {
        let start = cursor.position();
        let tok = *cursor.peek();
        if !is_attribute_alias(&tok, cursor.nth(1)) {
            return Err(Self::attr_error(
                &cursor,
                format!("expected an attribute alias, found {}", tok.describe()),
            ));
        }
        cursor.bump();
        Ok((
            Self::opaque_attr(&cursor, start, AttributeForm::Alias),
            cursor,
        ))
    }

    fn parse_dictionary_attribute<'t, 'src>(
        &self,
        mut cursor: Cursor<'t, 'src>,
    ) -> AdapterResult<'t, 'src, OpaqueAttribute, AttributeParseError> {
        let start = cursor.position();
        if !cursor.eat_punct(Punct::LBrace) {
            return Err(Self::attr_error(&cursor, format!(
                "expected `{{`, found {}",
                cursor.peek().describe()
            )));
        }
        while !cursor.at_punct(Punct::RBrace) {
            let key = cursor.peek();
            if !matches!(
                key.kind,
                TokenKind::Ident | TokenKind::OpKeyword | TokenKind::String
            ) {
                return Err(Self::attr_error(&cursor, format!(
                    "expected an attribute name, found {}",
                    key.describe()
                )));
            }
            cursor.bump();
            if cursor.eat_punct(Punct::Equal) {
                let (_, next) = self.parse_attribute_value(cursor)?;
                cursor = next;
            }
            if !cursor.eat_punct(Punct::Comma) && !cursor.at_punct(Punct::RBrace) {
                return Err(Self::attr_error(&cursor, format!(
                    "expected `,` or `}}` in attribute dictionary, found {}",
                    cursor.peek().describe()
                )));
            }
        }
        cursor.bump();
        Ok((
            Self::opaque_attr(&cursor, start, AttributeForm::Dictionary),
            cursor,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn type_text(src: &str) -> Result<(String, usize), TypeParseError> {
        let lexed = tokenize(src);
        let cursor = Cursor::new(&lexed.tokens, src, 0);
        StructuralSyntax
            .parse_type(cursor)
            .map(|(ty, c)| (ty.text, c.position()))
    }

    fn attr_text(src: &str) -> Result<(String, usize), AttributeParseError> {
        let lexed = tokenize(src);
        let cursor = Cursor::new(&lexed.tokens, src, 0);
        StructuralSyntax
            .parse_attribute_value(cursor)
            .map(|(attr, c)| (attr.text, c.position()))
    }

    #[test]
    fn test_nested_pointer_type() {
        let (text, pos) = type_text("!cir.ptr<!cir.ptr<!s32i>> , x").unwrap();
        assert_eq!(text, "!cir.ptr<!cir.ptr<!s32i>>");
        assert_eq!(pos, 7);
    }

    #[test]
    fn test_function_pointer_type_contains_arrow() {
        let (text, _) = type_text("!cir.ptr<!cir.func<(!s32i) -> !s32i>>").unwrap();
        assert_eq!(text, "!cir.ptr<!cir.func<(!s32i) -> !s32i>>");
    }

    #[test]
    fn test_builtin_scalars() {
        assert!(type_text("i64").is_ok());
        assert!(type_text("ui8").is_ok());
        assert!(type_text("index").is_ok());
        assert!(type_text("foo").is_err());
        assert!(type_text("i").is_err());
    }

    #[test]
    fn test_unterminated_angle() {
        let err = type_text("!cir.ptr<!s32i").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_typed_attribute_value() {
        let (text, _) = attr_text("#cir.int<1> : !s32i ]").unwrap();
        assert_eq!(text, "#cir.int<1> : !s32i");
        let (text, _) = attr_text("4 : i64").unwrap();
        assert_eq!(text, "4 : i64");
    }

    #[test]
    fn test_dictionary_attribute() {
        let src = "{alignment = 4 : i64, name = \"x\", cir.nothrow} rest";
        let lexed = tokenize(src);
        let cursor = Cursor::new(&lexed.tokens, src, 0);
        let (attr, _) = StructuralSyntax
            .parse_dictionary_attribute(cursor)
            .unwrap();
        assert_eq!(attr.form, AttributeForm::Dictionary);
        assert_eq!(attr.text, "{alignment = 4 : i64, name = \"x\", cir.nothrow}");
    }

    #[test]
    fn test_dialect_attribute_does_not_take_type_suffix() {
        let src = "#cir.int<1> : !s32i";
        let lexed = tokenize(src);
        let cursor = Cursor::new(&lexed.tokens, src, 0);
        let (attr, next) = StructuralSyntax.parse_dialect_attribute(cursor).unwrap();
        assert_eq!(attr.text, "#cir.int<1>");
        assert!(next.at_punct(Punct::Colon));
    }

    #[test]
    fn test_alias_versus_dialect() {
        let src = "#true #cir.zero #cir<x>";
        let lexed = tokenize(src);
        let t = &lexed.tokens;
        assert!(is_attribute_alias(&t[0], &t[1]));
        assert!(!is_attribute_alias(&t[1], &t[2]));
        assert!(!is_attribute_alias(&t[2], &t[3]));
    }
}
