//! Recursive-descent parser for CIR text.
//!
//! Parsing runs over the complete token vector produced by
//! [`crate::lexer::tokenize`]. Each opcode has one routine; opcodes with
//! several surface forms first pick a form with the bounded lookahead in
//! [`forms`] and then commit to it, so there is never backtracking across
//! partially built nodes.
//!
//! Failures are reported into the diagnostic sink as soon as they are
//! found and surface to callers only as [`Reported`]. The enclosing block
//! then skips to the next operation boundary and carries on.

mod arith;
mod control;
mod exception;
pub(crate) mod forms;
mod func;
mod memory;
mod modifiers;
mod region;

use std::collections::HashMap;

use crate::adapter::{AttributeForm, Cursor, OpaqueAttribute, OpaqueType, SubLanguageError};
use crate::ast::{
    FunctionTypeAnnotation, Lexeme, Module, ModuleHeader, OpForm, OpId, OpKind, Operation,
    Successor, TypeGroup, TypedValue, Types, ValueTypeList, Values,
};
use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::lexer::tokenize;
use crate::location::Span;
use crate::opcode::Opcode;
use crate::options::ParseOptions;
use crate::scope::{Definition, RefKind, ScopeTracker, SymbolRef};
use crate::token::{Punct, Token, TokenKind};
use crate::ParseResult;

/// Marker for a failure whose diagnostic is already recorded.
#[derive(Debug)]
pub(crate) struct Reported;

pub(crate) type PResult<T> = Result<T, Reported>;

/// What an opcode routine produces; the driver adds id, results and span.
pub(crate) struct OpParts {
    kind: OpKind,
    form: OpForm,
    attribute: Option<OpaqueAttribute>,
}

impl OpParts {
    fn new(kind: OpKind) -> Self {
        Self {
            kind,
            form: OpForm::Canonical,
            attribute: None,
        }
    }

    fn form(mut self, form: OpForm) -> Self {
        self.form = form;
        self
    }

    fn attribute(mut self, attribute: Option<OpaqueAttribute>) -> Self {
        self.attribute = attribute;
        self
    }
}

/// Parse a source unit.
pub fn parse(source: &str, options: ParseOptions<'_>) -> ParseResult {
    let lexed = tokenize(source);
    let mut parser = Parser::new(source, &lexed.tokens, options);
    for error in lexed.errors {
        parser.report(Diagnostic::error(DiagnosticKind::Lex(error.kind), error.span));
    }
    parser.run()
}

pub(crate) struct Parser<'t, 'src, 'a> {
    source: &'src str,
    tokens: &'t [Token<'src>],
    pos: usize,
    options: ParseOptions<'a>,
    /// Adapter results keyed by start token, with the position after them.
    type_cache: HashMap<usize, (OpaqueType, usize)>,
    attr_cache: HashMap<(usize, AttributeForm), (OpaqueAttribute, usize)>,
    scopes: ScopeTracker,
    diags: Diagnostics,
    next_op: u32,
    depth: usize,
    halted: bool,
    /// Construct named in "malformed ..." messages.
    construct: &'static str,
}

impl<'t, 'src, 'a> Parser<'t, 'src, 'a> {
    fn new(source: &'src str, tokens: &'t [Token<'src>], options: ParseOptions<'a>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            options,
            type_cache: HashMap::new(),
            attr_cache: HashMap::new(),
            scopes: ScopeTracker::new(),
            diags: Diagnostics::default(),
            next_op: 0,
            depth: 0,
            halted: false,
            construct: "module",
        }
    }

    fn run(mut self) -> ParseResult {
        tracing::debug!(
            source = %self.options.source_id,
            tokens = self.tokens.len(),
            "parsing source unit"
        );
        let (header, items) = self.source_unit();
        let Parser {
            scopes,
            mut diags,
            options,
            ..
        } = self;
        let (symbols, unresolved) = scopes.finish();
        diags.extend(unresolved);
        let diagnostics = diags.into_sorted();
        tracing::debug!(
            source = %options.source_id,
            items = items.len(),
            diagnostics = diagnostics.len(),
            "parsed source unit"
        );
        ParseResult {
            module: Module {
                source_id: options.source_id,
                header,
                items,
                symbols,
            },
            diagnostics,
        }
    }

    // ========================================================================
    // Token access
    // ========================================================================

    fn cursor(&self) -> Cursor<'t, 'src> {
        Cursor::new(self.tokens, self.source, self.pos)
    }

    fn nth(&self, n: usize) -> &'t Token<'src> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)]
    }

    fn peek(&self) -> &'t Token<'src> {
        self.nth(0)
    }

    fn bump(&mut self) -> &'t Token<'src> {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, p: Punct) -> bool {
        self.peek().is_punct(p)
    }

    fn eat(&mut self, p: Punct) -> bool {
        if self.at(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, p: Punct) -> PResult<Span> {
        if self.at(p) {
            Ok(self.bump().span)
        } else {
            Err(self.expected(format!("`{p}`")))
        }
    }

    fn at_word(&self, word: &str) -> bool {
        self.peek().is_ident(word)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> PResult<Span> {
        if self.at_word(word) {
            Ok(self.bump().span)
        } else {
            Err(self.expected(format!("`{word}`")))
        }
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    /// Span from the token at `start` through the last consumed token.
    fn span_since(&self, start: usize) -> Span {
        self.cursor().span_since(start)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diags.push(diagnostic);
    }

    /// Report that `what` was expected at the current token.
    fn expected(&mut self, what: impl Into<String>) -> Reported {
        let tok = *self.peek();
        let fix = Span::empty_at(self.prev_end());
        self.report(
            Diagnostic::error(
                DiagnosticKind::MalformedOperation {
                    construct: self.construct.to_owned(),
                    expected: what.into(),
                    found: tok.describe(),
                },
                tok.span,
            )
            .with_fix(fix),
        );
        Reported
    }

    fn deprecated(&mut self, opcode: Opcode, message: &str, span: Span) {
        if self.options.deprecation_warnings {
            self.report(Diagnostic::warning(
                DiagnosticKind::DeprecatedForm {
                    opcode,
                    message: message.to_owned(),
                },
                span,
            ));
        }
    }

    fn sub_language_error(&mut self, error: SubLanguageError) -> Reported {
        let span = error.span();
        self.report(Diagnostic::error(
            DiagnosticKind::ExternalSubLanguage(error),
            span,
        ));
        Reported
    }

    /// Poll the cancellation token; once it fires the parse halts.
    fn check_cancelled(&mut self) -> bool {
        if self.halted {
            return true;
        }
        if self.options.is_cancelled() {
            let at = self.peek().span.start;
            tracing::debug!(offset = at, "parse cancelled");
            self.report(Diagnostic::error(
                DiagnosticKind::Cancelled,
                Span::empty_at(at),
            ));
            self.halted = true;
        }
        self.halted
    }

    // ========================================================================
    // Names
    // ========================================================================

    fn define(&mut self, kind: RefKind, name: &str, span: Span) -> Definition {
        let defined = match kind {
            RefKind::Value => self.scopes.define_value(name, span),
            RefKind::Label => self.scopes.define_label(name, span),
            RefKind::Symbol => self.scopes.define_symbol(name, span),
        };
        match defined {
            Ok(def) => def,
            Err(diagnostic) => {
                self.report(diagnostic);
                Definition {
                    kind,
                    name: name.to_owned(),
                    span,
                    scope: self.scopes.current(),
                }
            }
        }
    }

    fn name_use(&mut self, kind: RefKind, token: TokenKind, what: &str) -> PResult<SymbolRef> {
        let tok = *self.peek();
        if tok.kind != token {
            return Err(self.expected(what));
        }
        self.bump();
        Ok(self.scopes.use_name(kind, &tok.name(), tok.span))
    }

    fn value_use(&mut self) -> PResult<SymbolRef> {
        self.name_use(RefKind::Value, TokenKind::ValueId, "a value")
    }

    fn label_use(&mut self) -> PResult<SymbolRef> {
        self.name_use(RefKind::Label, TokenKind::CaretId, "a block label")
    }

    fn symbol_use(&mut self) -> PResult<SymbolRef> {
        self.name_use(RefKind::Symbol, TokenKind::SymbolId, "a symbol")
    }

    /// Consume a `@name` and define it in the module namespace.
    fn symbol_definition(&mut self) -> PResult<Definition> {
        let tok = *self.peek();
        if tok.kind != TokenKind::SymbolId {
            return Err(self.expected("a symbol name"));
        }
        self.bump();
        Ok(self.define(RefKind::Symbol, &tok.name(), tok.span))
    }

    fn lexeme(&mut self, kind: TokenKind, what: &str) -> PResult<Lexeme> {
        let tok = *self.peek();
        if tok.kind != kind {
            return Err(self.expected(what));
        }
        self.bump();
        Ok(Lexeme {
            text: tok.text.to_owned(),
            span: tok.span,
        })
    }

    fn ident(&mut self, what: &str) -> PResult<Lexeme> {
        self.lexeme(TokenKind::Ident, what)
    }

    fn integer(&mut self) -> PResult<Lexeme> {
        self.lexeme(TokenKind::Integer, "an integer")
    }

    fn string(&mut self) -> PResult<Lexeme> {
        self.lexeme(TokenKind::String, "a string literal")
    }

    // ========================================================================
    // Sub-languages
    // ========================================================================

    fn ty(&mut self) -> PResult<OpaqueType> {
        let start = self.pos;
        if let Some((ty, end)) = self.type_cache.get(&start) {
            self.pos = *end;
            return Ok(ty.clone());
        }
        let types = self.options.adapters.types;
        match types.parse_type(self.cursor()) {
            Ok((ty, next)) => {
                let end = next.position();
                self.type_cache.insert(start, (ty.clone(), end));
                self.pos = end;
                Ok(ty)
            }
            Err(e) => Err(self.sub_language_error(e.into())),
        }
    }

    fn attr(&mut self, form: AttributeForm) -> PResult<OpaqueAttribute> {
        let key = (self.pos, form);
        if let Some((attr, end)) = self.attr_cache.get(&key) {
            self.pos = *end;
            return Ok(attr.clone());
        }
        let attributes = self.options.adapters.attributes;
        let cursor = self.cursor();
        let parsed = match form {
            AttributeForm::Value => attributes.parse_attribute_value(cursor),
            AttributeForm::Dialect => attributes.parse_dialect_attribute(cursor),
            AttributeForm::Alias => attributes.parse_attribute_alias(cursor),
            AttributeForm::Dictionary => attributes.parse_dictionary_attribute(cursor),
        };
        match parsed {
            Ok((attr, next)) => {
                let end = next.position();
                self.attr_cache.insert(key, (attr.clone(), end));
                self.pos = end;
                Ok(attr)
            }
            Err(e) => Err(self.sub_language_error(e.into())),
        }
    }

    fn at_attribute_alias(&self) -> bool {
        crate::adapter::is_attribute_alias(self.peek(), self.nth(1))
    }

    /// `#alias` or `#dialect.attr<...>`, as accepted by `extra(...)`,
    /// `special_member<...>` and the `cir.dyn_cast` info slot.
    fn alias_or_dialect_attr(&mut self) -> PResult<OpaqueAttribute> {
        if self.at_attribute_alias() {
            self.attr(AttributeForm::Alias)
        } else if self.peek().kind == TokenKind::AttrId {
            self.attr(AttributeForm::Dialect)
        } else {
            Err(self.expected("an attribute"))
        }
    }

    /// Optional trailing attribute: an alias or a dictionary.
    fn opt_attribute(&mut self) -> PResult<Option<OpaqueAttribute>> {
        if self.at_attribute_alias() {
            self.attr(AttributeForm::Alias).map(Some)
        } else if self.at(Punct::LBrace) {
            self.attr(AttributeForm::Dictionary).map(Some)
        } else {
            Ok(None)
        }
    }

    /// `[ attr (,)? ... ]`
    fn bracketed_attribute_values(&mut self) -> PResult<Vec<OpaqueAttribute>> {
        self.expect(Punct::LBracket)?;
        let mut values = Vec::new();
        while !self.at(Punct::RBracket) {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.expected("`]`"));
            }
            values.push(self.attr(AttributeForm::Value)?);
            self.eat(Punct::Comma);
        }
        self.bump();
        Ok(values)
    }

    // ========================================================================
    // Shared sub-grammars
    // ========================================================================

    /// `type (, type)*`
    fn types(&mut self) -> PResult<Types> {
        let mut types = Types::new();
        types.push(self.ty()?);
        while self.eat(Punct::Comma) {
            types.push(self.ty()?);
        }
        Ok(types)
    }

    /// `: type (, type)*`
    fn type_annotation(&mut self) -> PResult<Types> {
        self.expect(Punct::Colon)?;
        self.types()
    }

    fn opt_type_annotation(&mut self) -> PResult<Option<Types>> {
        if self.at(Punct::Colon) {
            self.type_annotation().map(Some)
        } else {
            Ok(None)
        }
    }

    /// `( types? )` or a single type.
    fn type_group(&mut self) -> PResult<TypeGroup> {
        if !self.eat(Punct::LParen) {
            let mut types = Types::new();
            types.push(self.ty()?);
            return Ok(TypeGroup {
                types,
                parenthesized: false,
            });
        }
        let types = if self.at(Punct::RParen) {
            Types::new()
        } else {
            self.types()?
        };
        self.expect(Punct::RParen)?;
        Ok(TypeGroup {
            types,
            parenthesized: true,
        })
    }

    /// `: inputs [-> results]`
    fn function_type(&mut self) -> PResult<FunctionTypeAnnotation> {
        let start = self.pos;
        self.expect(Punct::Colon)?;
        let inputs = self.type_group()?;
        let results = if self.eat(Punct::Arrow) {
            Some(self.type_group()?)
        } else {
            None
        };
        Ok(FunctionTypeAnnotation {
            inputs,
            results,
            span: self.span_since(start),
        })
    }

    fn opt_function_type(&mut self) -> PResult<Option<FunctionTypeAnnotation>> {
        if self.at(Punct::Colon) {
            self.function_type().map(Some)
        } else {
            Ok(None)
        }
    }

    /// `-> type` or `-> ( types? )`
    fn function_return(&mut self) -> PResult<TypeGroup> {
        self.expect(Punct::Arrow)?;
        self.type_group()
    }

    /// `%v (, %v)*`
    fn values(&mut self) -> PResult<Values> {
        let mut values = Values::new();
        values.push(self.value_use()?);
        while self.eat(Punct::Comma) {
            values.push(self.value_use()?);
        }
        Ok(values)
    }

    /// `( [%v (, %v)*] )`
    fn paren_values(&mut self) -> PResult<Values> {
        self.expect(Punct::LParen)?;
        let values = if self.at(Punct::RParen) {
            Values::new()
        } else {
            self.values()?
        };
        self.expect(Punct::RParen)?;
        Ok(values)
    }

    /// `%v (, %v)* : type (, type)*`
    fn value_type_list(&mut self) -> PResult<ValueTypeList> {
        let values = self.values()?;
        let types = self.type_annotation()?;
        Ok(ValueTypeList { values, types })
    }

    fn opt_value_type_list(&mut self) -> PResult<Option<ValueTypeList>> {
        if self.peek().kind == TokenKind::ValueId {
            self.value_type_list().map(Some)
        } else {
            Ok(None)
        }
    }

    /// `%v : type`
    fn typed_value(&mut self) -> PResult<TypedValue> {
        let value = self.value_use()?;
        self.expect(Punct::Colon)?;
        let ty = self.ty()?;
        Ok(TypedValue { value, ty })
    }

    /// `^label [( value-type-list )]`
    fn successor(&mut self) -> PResult<Successor> {
        let label = self.label_use()?;
        let args = if self.eat(Punct::LParen) {
            let args = self.value_type_list()?;
            self.expect(Punct::RParen)?;
            Some(args)
        } else {
            None
        };
        Ok(Successor { label, args })
    }

    // ========================================================================
    // Source unit
    // ========================================================================

    fn source_unit(&mut self) -> (Option<ModuleHeader>, Vec<Operation>) {
        if !self.at_word("module") {
            return (None, self.items(false));
        }
        let start = self.pos;
        self.bump();
        let header = self.module_header(start);
        let braced = self.expect(Punct::LBrace);
        let items = self.items(braced.is_ok());
        if let (Ok(open), false) = (braced, self.halted) {
            if self.at(Punct::RBrace) {
                self.bump();
                if self.peek().kind != TokenKind::Eof {
                    let _ = self.expected("end of input after the module");
                }
            } else {
                self.report(
                    Diagnostic::error(
                        DiagnosticKind::UnterminatedRegion {
                            message: "module body is missing its closing `}`".to_owned(),
                        },
                        open,
                    )
                    .with_fix(Span::empty_at(self.source.len())),
                );
            }
        }
        (header, items)
    }

    fn module_header(&mut self, start: usize) -> Option<ModuleHeader> {
        let name = if self.peek().kind == TokenKind::SymbolId {
            let tok = self.bump();
            Some(Lexeme {
                text: tok.text.to_owned(),
                span: tok.span,
            })
        } else {
            None
        };
        let attributes = if self.eat_word("attributes") {
            self.attr(AttributeForm::Dictionary).ok()
        } else {
            None
        };
        Some(ModuleHeader {
            name,
            attributes,
            span: self.span_since(start),
        })
    }

    fn items(&mut self, braced: bool) -> Vec<Operation> {
        let mut items = Vec::new();
        loop {
            if self.check_cancelled() {
                break;
            }
            let tok = *self.peek();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Punct(Punct::RBrace) if braced => break,
                _ => {}
            }
            let start = self.pos;
            match self.top_level_item() {
                Ok(op) => items.push(op),
                Err(Reported) => self.recover(start),
            }
        }
        items
    }

    fn top_level_item(&mut self) -> PResult<Operation> {
        let tok = *self.peek();
        let declaration = tok.kind == TokenKind::OpKeyword
            && Opcode::from_keyword(tok.text).is_none_or(Opcode::is_declaration);
        if !declaration {
            return Err(self.expected("`cir.func` or `cir.global`"));
        }
        let op = self.operation()?;
        tracing::debug!(opcode = %op.opcode(), id = op.id.0, "parsed declaration");
        Ok(op)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// `[%a (, %b)* =] opcode ...`
    fn operation(&mut self) -> PResult<Operation> {
        let start = self.pos;
        let mut bindings = Vec::new();
        if self.peek().kind == TokenKind::ValueId {
            loop {
                let tok = *self.peek();
                if tok.kind != TokenKind::ValueId {
                    return Err(self.expected("a result name"));
                }
                self.bump();
                bindings.push((tok.name(), tok.span));
                if !self.eat(Punct::Comma) {
                    break;
                }
            }
            self.expect(Punct::Equal)?;
        }

        // Results are bound even when the rest of the operation is malformed.
        let parts = self.operation_body();
        let results = bindings
            .into_iter()
            .map(|(name, span)| self.define(RefKind::Value, &name, span))
            .collect();
        let (id, parts) = parts?;
        Ok(Operation {
            id,
            results,
            kind: parts.kind,
            form: parts.form,
            attribute: parts.attribute,
            span: self.span_since(start),
        })
    }

    /// Everything after the `=` of an operation.
    fn operation_body(&mut self) -> PResult<(OpId, OpParts)> {
        let tok = *self.peek();
        if tok.kind != TokenKind::OpKeyword {
            return Err(self.expected("an operation"));
        }
        let Some(opcode) = Opcode::from_keyword(tok.text) else {
            self.report(Diagnostic::error(
                DiagnosticKind::UnknownOpcode {
                    opcode: tok.text.to_owned(),
                },
                tok.span,
            ));
            return Err(Reported);
        };
        self.bump();
        let id = OpId(self.next_op);
        self.next_op += 1;

        let outer = std::mem::replace(&mut self.construct, opcode.keyword());
        let parts = match forms::select(opcode, &self.cursor()) {
            Ok(form) => {
                tracing::trace!(%opcode, %form, "form selected");
                self.op_body(opcode, form)
            }
            Err(expected) => {
                let found = *self.peek();
                self.report(Diagnostic::error(
                    DiagnosticKind::AmbiguousForm {
                        opcode,
                        expected: expected.to_owned(),
                        found: found.describe(),
                    },
                    found.span,
                ));
                Err(Reported)
            }
        };
        self.construct = outer;
        Ok((id, parts?))
    }

    fn op_body(&mut self, opcode: Opcode, form: OpForm) -> PResult<OpParts> {
        match opcode {
            Opcode::Func => self.func(),
            Opcode::Call => self.call(form),
            Opcode::TryCall => self.try_call(form),
            Opcode::Return | Opcode::Yield => self.return_like(opcode),
            Opcode::Global => self.global(),
            Opcode::GetGlobal => self.get_global(),

            Opcode::Alloca => self.alloca(),
            Opcode::Load => self.load(),
            Opcode::Store => self.store(),
            Opcode::Const => self.constant(form),
            Opcode::Cast => self.cast(form),
            Opcode::PtrStride => self.ptr_stride(form),
            Opcode::StructElementAddr => self.struct_element_addr(),
            Opcode::GetMember => self.get_member(),
            Opcode::Copy => self.copy(form),
            Opcode::Memcpy => self.memcpy(),
            Opcode::Memchr => self.memchr(form),
            Opcode::StackSave => self.stack_save(),
            Opcode::StackRestore => self.stack_restore(),
            Opcode::GetRuntimeMember => self.get_runtime_member(),

            Opcode::BinOp | Opcode::Cmp => self.binary(opcode),
            Opcode::Unary => self.unary(),
            Opcode::Select => self.select(),
            Opcode::Shift => self.shift(form),
            Opcode::ObjSize => self.objsize(form),
            Opcode::DynCast => self.dyn_cast(form),
            Opcode::Clrsb
            | Opcode::Ffs
            | Opcode::Parity
            | Opcode::Clz
            | Opcode::Ctz
            | Opcode::Popcount => self.bit_op(opcode),
            Opcode::Fabs => self.fabs(),

            Opcode::Br => self.br(),
            Opcode::BrCond => self.brcond(),
            Opcode::If => self.if_op(),
            Opcode::Scope => self.scope_op(),
            Opcode::Loop => self.loop_op(),
            Opcode::For => self.for_op(),
            Opcode::While | Opcode::DoWhile => self.while_like(opcode, form),
            Opcode::Condition => self.condition(),
            Opcode::Await => self.await_op(),
            Opcode::Switch => self.switch(),
            Opcode::Case => self.case(),
            Opcode::Ternary => self.ternary(),
            Opcode::Break | Opcode::Continue | Opcode::Unreachable | Opcode::Trap => {
                self.bare_terminator(opcode)
            }
            Opcode::BlockAddress => self.block_address(),
            Opcode::IndirectBr => self.indirect_br(),
            Opcode::Label => self.label(),

            Opcode::Try => self.try_op(),
            Opcode::Throw => self.throw(),
            Opcode::CatchParam => self.catch_param(),
            Opcode::Resume => self.bare_terminator(opcode),
        }
    }

    // ========================================================================
    // Recovery
    // ========================================================================

    /// Whether `%a (, %b)* =` starts at the current token.
    fn at_result_bindings(&self) -> bool {
        let mut n = 0;
        loop {
            if self.nth(n).kind != TokenKind::ValueId {
                return false;
            }
            let sep = self.nth(n + 1);
            if sep.is_punct(Punct::Equal) {
                return true;
            }
            if !sep.is_punct(Punct::Comma) {
                return false;
            }
            n += 2;
        }
    }

    /// Whether a block header (`^l:` or `^l(...):`) starts here.
    fn at_block_header(&self) -> bool {
        if self.peek().kind != TokenKind::CaretId {
            return false;
        }
        let next = self.nth(1);
        if next.is_punct(Punct::Colon) {
            return true;
        }
        if !next.is_punct(Punct::LParen) {
            return false;
        }
        let mut depth = 0usize;
        let mut n = 1;
        loop {
            let tok = self.nth(n);
            match tok.kind {
                TokenKind::Punct(Punct::LParen) => depth += 1,
                TokenKind::Punct(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return self.nth(n + 1).is_punct(Punct::Colon);
                    }
                }
                TokenKind::Eof | TokenKind::Punct(Punct::LBrace | Punct::RBrace) => return false,
                _ => {}
            }
            n += 1;
        }
    }

    /// Skip to the next operation boundary: an operation keyword, result
    /// bindings, a block header or the `}` closing the current region.
    fn recover(&mut self, start: usize) {
        if self.halted {
            return;
        }
        if self.pos == start {
            self.bump();
        }
        let from = self.pos;
        let mut depth = 0usize;
        loop {
            let tok = *self.peek();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Punct(Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RBrace) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::OpKeyword if depth == 0 => break,
                TokenKind::ValueId if depth == 0 && self.at_result_bindings() => break,
                TokenKind::CaretId if depth == 0 && self.at_block_header() => break,
                _ => {}
            }
            self.bump();
        }
        tracing::debug!(
            from = self.tokens[from.min(self.tokens.len() - 1)].span.start,
            skipped = self.pos - from,
            "recovered at operation boundary"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::OpKind;
    use crate::parse_source;

    #[test]
    fn test_unknown_opcode_is_skipped() {
        let parsed = parse_source(
            "cir.func @f() {\n  cir.frobnicate %x { cir.yield }\n  cir.return\n}",
        );
        let codes: Vec<_> = parsed.diagnostics.iter().map(|d| d.code()).collect();
        assert_eq!(codes, vec!["UnknownOpcodeError"]);
        let OpKind::Func(func) = &parsed.module.items[0].kind else {
            panic!("expected a function");
        };
        let body = func.body.as_ref().unwrap();
        assert_eq!(body.ops().count(), 1);
    }

    #[test]
    fn test_non_declaration_at_top_level() {
        let parsed = parse_source("cir.trap\ncir.func @f() { cir.return }");
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].code(), "MalformedOperationError");
        assert_eq!(parsed.module.items.len(), 1);
    }

    #[test]
    fn test_module_wrapper() {
        let parsed = parse_source(
            "module @m attributes {cir.lang = #cir.lang<c>} {\n  cir.func @f() { cir.return }\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let header = parsed.module.header.as_ref().unwrap();
        assert_eq!(header.name.as_ref().unwrap().text, "@m");
        assert_eq!(parsed.module.items.len(), 1);
    }

    #[test]
    fn test_trailing_input_after_module() {
        let parsed = parse_source("module { }\ncir.func @f() { cir.return }");
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].code(), "MalformedOperationError");
    }

    #[test]
    fn test_unclosed_module_body() {
        let parsed = parse_source("module {\n  cir.func @f() { cir.return }\n");
        assert_eq!(parsed.module.items.len(), 1);
        let codes: Vec<_> = parsed.diagnostics.iter().map(|d| d.code()).collect();
        assert_eq!(codes, vec!["UnterminatedRegionError"]);
    }

    #[test]
    fn test_results_are_defined_after_the_operation() {
        let parsed = parse_source(
            "cir.func @f(%p : !cir.ptr<!s32i>) -> !s32i {\n  %0 = cir.load %p : !cir.ptr<!s32i>, !s32i\n  cir.return %0 : !s32i\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    }

    #[test]
    fn test_duplicate_result_name() {
        let parsed = parse_source(
            "cir.func @f(%p : !cir.ptr<!s32i>) {\n  %0 = cir.load %p : !cir.ptr<!s32i>, !s32i\n  %0 = cir.load %p : !cir.ptr<!s32i>, !s32i\n  cir.return\n}",
        );
        let codes: Vec<_> = parsed.diagnostics.iter().map(|d| d.code()).collect();
        assert_eq!(codes, vec!["DuplicateDefinitionError"]);
    }
}
