//! Arithmetic, comparison and bit-manipulation operations.

use crate::ast::{BitOperand, DynCastShape, Lexeme, ObjSizeShape, OpForm, OpKind, ShiftShape};
use crate::opcode::Opcode;
use crate::token::{Punct, TokenKind};

use super::{OpParts, PResult, Parser};

impl Parser<'_, '_, '_> {
    /// `cir.binop` and `cir.cmp`: `( kind , %l , %r ) [attr] : type`.
    pub(super) fn binary(&mut self, opcode: Opcode) -> PResult<OpParts> {
        self.expect(Punct::LParen)?;
        let kind = if opcode == Opcode::Cmp {
            self.ident("a comparison predicate")?
        } else {
            self.ident("a binary operation kind")?
        };
        self.expect(Punct::Comma)?;
        let lhs = self.value_use()?;
        self.expect(Punct::Comma)?;
        let rhs = self.value_use()?;
        self.expect(Punct::RParen)?;
        let attribute = self.opt_attribute()?;
        let result = self.type_annotation()?;
        let kind = if opcode == Opcode::Cmp {
            OpKind::Cmp {
                predicate: kind,
                lhs,
                rhs,
                result,
            }
        } else {
            OpKind::BinOp {
                kind,
                lhs,
                rhs,
                result,
            }
        };
        Ok(OpParts::new(kind).attribute(attribute))
    }

    pub(super) fn unary(&mut self) -> PResult<OpParts> {
        self.expect(Punct::LParen)?;
        let kind = self.ident("a unary operation kind")?;
        self.expect(Punct::Comma)?;
        let operand = self.value_use()?;
        self.expect(Punct::RParen)?;
        let attribute = self.opt_attribute()?;
        let result = self.type_annotation()?;
        Ok(OpParts::new(OpKind::Unary {
            kind,
            operand,
            result,
        })
        .attribute(attribute))
    }

    pub(super) fn select(&mut self) -> PResult<OpParts> {
        let cond = self.value_use()?;
        self.expect(Punct::Comma)?;
        let true_value = self.value_use()?;
        self.expect(Punct::Comma)?;
        let false_value = self.value_use()?;
        let attribute = self.opt_attribute()?;
        let result = self.type_annotation()?;
        Ok(OpParts::new(OpKind::Select {
            cond,
            true_value,
            false_value,
            result,
        })
        .attribute(attribute))
    }

    pub(super) fn shift(&mut self, form: OpForm) -> PResult<OpParts> {
        if form == OpForm::Parenthesized {
            self.expect(Punct::LParen)?;
            let direction = self.ident("a shift direction")?;
            self.expect(Punct::Comma)?;
            let lhs = self.typed_value()?;
            self.expect(Punct::Comma)?;
            let rhs = self.typed_value()?;
            self.expect(Punct::RParen)?;
            let attribute = self.opt_attribute()?;
            let result = self.function_return()?;
            let shape = ShiftShape::Parenthesized {
                lhs_type: lhs.ty,
                rhs_type: rhs.ty,
                result,
            };
            return Ok(OpParts::new(OpKind::Shift {
                direction,
                lhs: lhs.value,
                rhs: rhs.value,
                shape,
            })
            .form(form)
            .attribute(attribute));
        }
        let direction = self.ident("a shift direction")?;
        let lhs = self.value_use()?;
        self.expect(Punct::Comma)?;
        let rhs = self.value_use()?;
        let attribute = self.opt_attribute()?;
        let signature = self.function_type()?;
        Ok(OpParts::new(OpKind::Shift {
            direction,
            lhs,
            rhs,
            shape: ShiftShape::Bare { signature },
        })
        .form(form)
        .attribute(attribute))
    }

    pub(super) fn objsize(&mut self, form: OpForm) -> PResult<OpParts> {
        if form == OpForm::Parenthesized {
            self.expect(Punct::LParen)?;
            let kind = self.ident("an object size kind")?;
            self.expect(Punct::Comma)?;
            let value = self.typed_value()?;
            self.expect(Punct::RParen)?;
            let attribute = self.opt_attribute()?;
            let result = self.function_return()?;
            let shape = ObjSizeShape::Parenthesized {
                value_type: value.ty,
                result,
            };
            return Ok(OpParts::new(OpKind::ObjSize {
                kind,
                value: value.value,
                shape,
            })
            .form(form)
            .attribute(attribute));
        }
        let kind = self.ident("an object size kind")?;
        let value = self.value_use()?;
        let attribute = self.opt_attribute()?;
        let signature = self.function_type()?;
        Ok(OpParts::new(OpKind::ObjSize {
            kind,
            value,
            shape: ObjSizeShape::Bare { signature },
        })
        .form(form)
        .attribute(attribute))
    }

    /// `ptr` or `ref`, then an optional `relative_layout`.
    fn dyn_cast_kind(&mut self) -> PResult<(Lexeme, bool)> {
        if !(self.at_word("ptr") || self.at_word("ref")) {
            return Err(self.expected("`ptr` or `ref`"));
        }
        let kind = self.ident("`ptr` or `ref`")?;
        let relative_layout = self.eat_word("relative_layout");
        Ok((kind, relative_layout))
    }

    pub(super) fn dyn_cast(&mut self, form: OpForm) -> PResult<OpParts> {
        if form == OpForm::Parenthesized {
            self.expect(Punct::LParen)?;
            let (kind, relative_layout) = self.dyn_cast_kind()?;
            self.expect(Punct::Comma)?;
            let value = self.typed_value()?;
            let info = if self.eat(Punct::Comma) {
                Some(self.alias_or_dialect_attr()?)
            } else {
                None
            };
            self.expect(Punct::RParen)?;
            let result = self.function_return()?;
            let shape = DynCastShape::Parenthesized {
                value_type: value.ty,
                result,
            };
            return Ok(OpParts::new(OpKind::DynCast {
                kind,
                relative_layout,
                value: value.value,
                shape,
                info,
            })
            .form(form));
        }
        let (kind, relative_layout) = self.dyn_cast_kind()?;
        let value = self.value_use()?;
        let signature = self.function_type()?;
        let info = if self.peek().kind == TokenKind::AttrId {
            Some(self.alias_or_dialect_attr()?)
        } else {
            None
        };
        Ok(OpParts::new(OpKind::DynCast {
            kind,
            relative_layout,
            value,
            shape: DynCastShape::Bare { signature },
            info,
        })
        .form(form))
    }

    /// `cir.clrsb`, `cir.ffs`, `cir.parity`, `cir.clz`, `cir.ctz` and
    /// `cir.popcount`.
    pub(super) fn bit_op(&mut self, opcode: Opcode) -> PResult<OpParts> {
        let value = self.value_use()?;
        let zero_poison = matches!(opcode, Opcode::Clz | Opcode::Ctz | Opcode::Popcount)
            && self.eat_word("zero_poison");
        let attribute = self.opt_attribute()?;
        let result = self.type_annotation()?;
        let operand = BitOperand {
            value,
            zero_poison,
            result,
        };
        let kind = match opcode {
            Opcode::Clrsb => OpKind::Clrsb(operand),
            Opcode::Ffs => OpKind::Ffs(operand),
            Opcode::Parity => OpKind::Parity(operand),
            Opcode::Clz => OpKind::Clz(operand),
            Opcode::Ctz => OpKind::Ctz(operand),
            _ => OpKind::Popcount(operand),
        };
        Ok(OpParts::new(kind).attribute(attribute))
    }

    pub(super) fn fabs(&mut self) -> PResult<OpParts> {
        let value = self.value_use()?;
        let result = self.type_annotation()?;
        Ok(OpParts::new(OpKind::Fabs { value, result }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{OpForm, OpKind};
    use crate::parse_source;

    fn in_func(body: &str) -> String {
        format!("cir.func @f(%a : !s32i, %b : !s32i, %c : !cir.bool) {{\n{body}\n  cir.return\n}}")
    }

    #[test]
    fn test_binop_cmp_unary_select() {
        let parsed = parse_source(&in_func(
            "  %0 = cir.binop(add, %a, %b) : !s32i\n  %1 = cir.cmp(lt, %a, %b) : !s32i, !cir.bool\n  %2 = cir.unary(minus, %0) : !s32i, !s32i\n  %3 = cir.select %c, %0, %2 : !s32i",
        ));
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    }

    #[test]
    fn test_shift_forms() {
        let parsed = parse_source(&in_func(
            "  %0 = cir.shift(left, %a : !s32i, %b : !s32i) -> !s32i\n  %1 = cir.shift right %a, %b : (!s32i, !s32i) -> !s32i",
        ));
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let forms: Vec<_> = parsed.module.forms().into_values().collect();
        assert!(forms.contains(&OpForm::Parenthesized));
        assert!(forms.contains(&OpForm::Bare));
    }

    #[test]
    fn test_zero_poison_only_on_counting_ops() {
        assert!(parse_source(&in_func("  %0 = cir.clz %a zero_poison : !s32i")).diagnostics.is_empty());
        let parsed = parse_source(&in_func("  %0 = cir.parity %a zero_poison : !s32i"));
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].code(), "MalformedOperationError");
    }

    #[test]
    fn test_dyn_cast_info_attribute() {
        let parsed = parse_source(&in_func(
            "  %0 = cir.dyn_cast ptr relative_layout %a : !s32i -> !s32i #dyn_info",
        ));
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let OpKind::Func(func) = &parsed.module.items[0].kind else {
            panic!("expected a function");
        };
        let op = &func.body.as_ref().unwrap().blocks[0].ops[0];
        let OpKind::DynCast {
            relative_layout,
            info,
            ..
        } = &op.kind
        else {
            panic!("expected dyn_cast");
        };
        assert!(*relative_layout);
        assert_eq!(info.as_ref().unwrap().text, "#dyn_info");
    }

    #[test]
    fn test_objsize_forms() {
        let parsed = parse_source(&in_func(
            "  %0 = cir.objsize max %a : !s32i -> !u64i\n  %1 = cir.objsize(min, %a : !s32i) -> !u64i",
        ));
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    }
}
