//! Form selection for opcodes with more than one surface syntax.
//!
//! Each rule inspects at most the three tokens after the opcode keyword
//! and never consumes anything. A rule that matches no guard yields the
//! description of what it was looking for, which the parser reports as an
//! `AmbiguousForm` diagnostic instead of guessing.

use crate::adapter::{Cursor, is_attribute_alias};
use crate::ast::OpForm;
use crate::opcode::Opcode;
use crate::token::{Punct, Token, TokenKind};

/// Pick the form of `opcode`; `cursor` sits just after the keyword.
pub(crate) fn select(opcode: Opcode, cursor: &Cursor<'_, '_>) -> Result<OpForm, &'static str> {
    let t0 = cursor.nth(0);
    let t1 = cursor.nth(1);
    match opcode {
        Opcode::Call => call(t0),
        Opcode::TryCall => try_call(t0),
        Opcode::Cast => paren_or(t0, TokenKind::Ident, "`(` or a cast kind"),
        Opcode::PtrStride => paren_or(t0, TokenKind::ValueId, "`(` or a base value"),
        Opcode::ObjSize => paren_or(t0, TokenKind::Ident, "`(` or an object size kind"),
        Opcode::Shift => paren_or(t0, TokenKind::Ident, "`(` or a shift direction"),
        Opcode::DynCast => dyn_cast(t0),
        Opcode::Memchr => match t0.kind {
            TokenKind::Punct(Punct::LParen) => Ok(OpForm::Parenthesized),
            TokenKind::ValueId => Ok(OpForm::Comma),
            _ => Err("`(` or a source value"),
        },
        Opcode::While | Opcode::DoWhile => loop_form(t0),
        Opcode::Copy => copy(t0, t1),
        Opcode::Const => constant(t0, t1),
        _ => Ok(OpForm::Canonical),
    }
}

fn call(t0: &Token<'_>) -> Result<OpForm, &'static str> {
    match t0.kind {
        TokenKind::SymbolId => Ok(OpForm::Direct),
        TokenKind::ValueId => Ok(OpForm::Indirect),
        _ => Err("`@callee` or `%callee`"),
    }
}

fn try_call(t0: &Token<'_>) -> Result<OpForm, &'static str> {
    if t0.is_ident("exception") {
        Ok(OpForm::ExceptionPointer)
    } else if t0.kind == TokenKind::SymbolId {
        Ok(OpForm::Successors)
    } else {
        Err("`exception` or `@callee`")
    }
}

fn paren_or(
    t0: &Token<'_>,
    bare_start: TokenKind,
    expected: &'static str,
) -> Result<OpForm, &'static str> {
    if t0.is_punct(Punct::LParen) {
        Ok(OpForm::Parenthesized)
    } else if t0.kind == bare_start {
        Ok(OpForm::Bare)
    } else {
        Err(expected)
    }
}

fn dyn_cast(t0: &Token<'_>) -> Result<OpForm, &'static str> {
    if t0.is_punct(Punct::LParen) {
        Ok(OpForm::Parenthesized)
    } else if t0.is_ident("ptr") || t0.is_ident("ref") {
        Ok(OpForm::Bare)
    } else {
        Err("`(`, `ptr` or `ref`")
    }
}

fn loop_form(t0: &Token<'_>) -> Result<OpForm, &'static str> {
    if t0.is_punct(Punct::Colon) {
        Ok(OpForm::Labeled)
    } else if t0.is_punct(Punct::LBrace) {
        Ok(OpForm::Fluent)
    } else {
        Err("`:` or `{`")
    }
}

fn copy(t0: &Token<'_>, t1: &Token<'_>) -> Result<OpForm, &'static str> {
    if t0.kind != TokenKind::ValueId {
        return Err("a value");
    }
    if t1.is_ident("to") {
        Ok(OpForm::To)
    } else if t1.is_punct(Punct::Comma) {
        Ok(OpForm::Comma)
    } else {
        Err("`to` or `,` after the first value")
    }
}

fn constant(t0: &Token<'_>, t1: &Token<'_>) -> Result<OpForm, &'static str> {
    if t0.is_punct(Punct::LParen) {
        Ok(OpForm::ParenthesizedValue)
    } else if is_attribute_alias(t0, t1) {
        Ok(OpForm::AttributeAlias)
    } else if t0.kind == TokenKind::AttrId {
        Ok(OpForm::DialectAttribute)
    } else {
        Err("`(`, a dialect attribute or an attribute alias")
    }
}

/// `cir.load`/`cir.store` commit to a type form only after their first
/// type: a following `,` selects the dual form.
pub(crate) fn type_pair(after_first_type: &Token<'_>) -> OpForm {
    if after_first_type.is_punct(Punct::Comma) {
        OpForm::DualType
    } else {
        OpForm::SingleType
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn form_of(opcode: Opcode, rest: &str) -> Result<OpForm, &'static str> {
        let lexed = tokenize(rest);
        select(opcode, &Cursor::new(&lexed.tokens, rest, 0))
    }

    #[test]
    fn test_cast_forms_are_distinct() {
        assert_eq!(
            form_of(Opcode::Cast, "(int_to_bool, %x : !s32i), !cir.bool"),
            Ok(OpForm::Parenthesized)
        );
        assert_eq!(
            form_of(Opcode::Cast, "int_to_bool %x : !s32i -> !cir.bool"),
            Ok(OpForm::Bare)
        );
    }

    #[test]
    fn test_call_forms() {
        assert_eq!(form_of(Opcode::Call, "@f()"), Ok(OpForm::Direct));
        assert_eq!(form_of(Opcode::Call, "%fp()"), Ok(OpForm::Indirect));
        assert!(form_of(Opcode::Call, "f()").is_err());
    }

    #[test]
    fn test_try_call_forms() {
        assert_eq!(
            form_of(Opcode::TryCall, "exception(%e) @f()"),
            Ok(OpForm::ExceptionPointer)
        );
        assert_eq!(
            form_of(Opcode::TryCall, "@f() ^a, ^b"),
            Ok(OpForm::Successors)
        );
    }

    #[test]
    fn test_while_colon_selects_labeled() {
        assert_eq!(form_of(Opcode::While, ": cond {"), Ok(OpForm::Labeled));
        assert_eq!(form_of(Opcode::While, "{ } do { }"), Ok(OpForm::Fluent));
        assert_eq!(form_of(Opcode::DoWhile, ": body {"), Ok(OpForm::Labeled));
    }

    #[test]
    fn test_copy_needs_two_tokens() {
        assert_eq!(form_of(Opcode::Copy, "%a to %b"), Ok(OpForm::To));
        assert_eq!(form_of(Opcode::Copy, "%a, %b"), Ok(OpForm::Comma));
        assert!(form_of(Opcode::Copy, "%a %b").is_err());
    }

    #[test]
    fn test_const_forms() {
        assert_eq!(
            form_of(Opcode::Const, "(#cir.int<1> : !s32i) : !s32i"),
            Ok(OpForm::ParenthesizedValue)
        );
        assert_eq!(
            form_of(Opcode::Const, "#cir.int<1> : !s32i"),
            Ok(OpForm::DialectAttribute)
        );
        assert_eq!(
            form_of(Opcode::Const, "#true : !cir.bool"),
            Ok(OpForm::AttributeAlias)
        );
    }

    #[test]
    fn test_single_form_opcodes_are_canonical() {
        assert_eq!(form_of(Opcode::Trap, ""), Ok(OpForm::Canonical));
        assert_eq!(form_of(Opcode::Load, "%p : !t"), Ok(OpForm::Canonical));
    }
}
