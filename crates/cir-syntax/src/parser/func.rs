//! Declarations, calls and returns.

use crate::adapter::AttributeForm;
use crate::ast::{FuncArg, FuncOp, GlobalInit, GlobalOp, OpForm, OpKind, RegionKind, TryCallTarget};
use crate::opcode::Opcode;
use crate::scope::RefKind;
use crate::token::{Punct, TokenKind};

use super::modifiers::{CALL_SUFFIX, FUNC_PREFIX, FUNC_SUFFIX, GLOBAL, TRY_CALL_SUFFIX};
use super::{OpParts, PResult, Parser};

impl Parser<'_, '_, '_> {
    pub(super) fn func(&mut self) -> PResult<OpParts> {
        let modifiers = self.modifiers(FUNC_PREFIX)?.into_func_modifiers();
        let name = self.symbol_definition()?;
        // Arguments and body share one scope.
        let func = self.in_scope(|p| {
            let (args, variadic) = p.func_args()?;
            let result = if p.at(Punct::Arrow) {
                Some(p.function_return()?)
            } else {
                None
            };
            let traits = p.modifiers(FUNC_SUFFIX)?.into_func_traits();
            let annotations = if p.at(Punct::LBracket) {
                Some(p.bracketed_attribute_values()?)
            } else {
                None
            };
            let attributes = if p.eat_word("attributes") {
                Some(p.attr(AttributeForm::Dictionary)?)
            } else {
                None
            };
            let body = if p.at(Punct::LBrace) {
                Some(p.region_in_current_scope(RegionKind::FunctionBody, false)?)
            } else {
                None
            };
            Ok(FuncOp {
                modifiers,
                name,
                args,
                variadic,
                result,
                traits,
                annotations,
                attributes,
                body,
            })
        })?;
        Ok(OpParts::new(OpKind::Func(Box::new(func))))
    }

    /// `( [%a : type [dict] | type [dict]] (, ...)* [, ...] )`
    fn func_args(&mut self) -> PResult<(Vec<FuncArg>, bool)> {
        self.expect(Punct::LParen)?;
        let mut args = Vec::new();
        let mut variadic = false;
        if !self.at(Punct::RParen) {
            loop {
                if self.eat(Punct::Ellipsis) {
                    variadic = true;
                    break;
                }
                let named = *self.peek();
                let named = if named.kind == TokenKind::ValueId {
                    self.bump();
                    self.expect(Punct::Colon)?;
                    Some(named)
                } else {
                    None
                };
                let ty = self.ty()?;
                let attributes = if self.at(Punct::LBrace) {
                    Some(self.attr(AttributeForm::Dictionary)?)
                } else {
                    None
                };
                let name = named.map(|tok| self.define(RefKind::Value, &tok.name(), tok.span));
                args.push(FuncArg {
                    name,
                    ty,
                    attributes,
                });
                if !self.eat(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect(Punct::RParen)?;
        Ok((args, variadic))
    }

    pub(super) fn call(&mut self, form: OpForm) -> PResult<OpParts> {
        let callee = match form {
            OpForm::Indirect => self.value_use()?,
            _ => self.symbol_use()?,
        };
        let args = self.paren_values()?;
        let signature = self.function_type()?;
        let modifiers = self.modifiers(CALL_SUFFIX)?.into_call_modifiers();
        Ok(OpParts::new(OpKind::Call {
            callee,
            args,
            signature,
            modifiers,
        })
        .form(form))
    }

    pub(super) fn try_call(&mut self, form: OpForm) -> PResult<OpParts> {
        let exception = if form == OpForm::ExceptionPointer {
            self.expect_word("exception")?;
            self.expect(Punct::LParen)?;
            let value = self.value_use()?;
            self.expect(Punct::RParen)?;
            Some(value)
        } else {
            None
        };
        let callee = self.symbol_use()?;
        let args = self.paren_values()?;
        let target = match exception {
            Some(pointer) => TryCallTarget::ExceptionPointer(pointer),
            None => {
                let normal = self.label_use()?;
                self.expect(Punct::Comma)?;
                let unwind = self.label_use()?;
                TryCallTarget::Successors { normal, unwind }
            }
        };
        let signature = self.function_type()?;
        let modifiers = self.modifiers(TRY_CALL_SUFFIX)?.into_call_modifiers();
        Ok(OpParts::new(OpKind::TryCall {
            callee,
            args,
            target,
            signature,
            modifiers,
        })
        .form(form))
    }

    /// `cir.return` and `cir.yield`: `[attr] [value-type-list]`.
    pub(super) fn return_like(&mut self, opcode: Opcode) -> PResult<OpParts> {
        let attribute = self.opt_attribute()?;
        let operands = self.opt_value_type_list()?;
        let kind = if opcode == Opcode::Yield {
            OpKind::Yield { operands }
        } else {
            OpKind::Return { operands }
        };
        Ok(OpParts::new(kind).attribute(attribute))
    }

    pub(super) fn global(&mut self) -> PResult<OpParts> {
        let visibility = if self.peek().kind == TokenKind::String {
            Some(self.string()?)
        } else {
            None
        };
        let modifiers = self.modifiers(GLOBAL)?.into_global_modifiers();
        let name = self.symbol_definition()?;
        let init = if self.eat(Punct::Equal) {
            Some(self.global_init()?)
        } else {
            None
        };
        let result = self.opt_type_annotation()?;
        let annotations = if self.at(Punct::LBracket) {
            Some(self.bracketed_attribute_values()?)
        } else {
            None
        };
        let attribute = self.opt_attribute()?;
        let global = GlobalOp {
            visibility,
            modifiers,
            name,
            init,
            result,
            annotations,
        };
        Ok(OpParts::new(OpKind::Global(Box::new(global))).attribute(attribute))
    }

    fn global_init(&mut self) -> PResult<GlobalInit> {
        if self.eat_word("ctor") {
            self.expect(Punct::Colon)?;
            let ty = self.ty()?;
            let ctor = self.region(RegionKind::GlobalInit, false)?;
            let dtor = if self.eat_word("dtor") {
                Some(self.region(RegionKind::GlobalInit, false)?)
            } else {
                None
            };
            Ok(GlobalInit::Ctor { ty, ctor, dtor })
        } else if self.eat_word("dtor") {
            self.expect(Punct::Colon)?;
            let ty = self.ty()?;
            let dtor = self.region(RegionKind::GlobalInit, false)?;
            Ok(GlobalInit::Dtor { ty, dtor })
        } else {
            self.alias_or_dialect_attr().map(GlobalInit::Attribute)
        }
    }

    pub(super) fn get_global(&mut self) -> PResult<OpParts> {
        let thread_local = self.eat_word("thread_local");
        let name = self.symbol_use()?;
        let attribute = self.opt_attribute()?;
        let result = self.type_annotation()?;
        Ok(OpParts::new(OpKind::GetGlobal {
            thread_local,
            name,
            result,
        })
        .attribute(attribute))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{GlobalInit, OpForm, OpKind, TryCallTarget};
    use crate::parse_source;

    #[test]
    fn test_func_declaration_and_definition() {
        let parsed = parse_source(
            "cir.func private @printf(!cir.ptr<!s8i>, ...) -> !s32i\ncir.func dso_local @main() -> !s32i {\n  %0 = cir.const #cir.int<0> : !s32i\n  cir.return %0 : !s32i\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let OpKind::Func(decl) = &parsed.module.items[0].kind else {
            panic!("expected a function");
        };
        assert!(decl.variadic);
        assert!(decl.body.is_none());
        assert_eq!(decl.args.len(), 1);
        let OpKind::Func(main) = &parsed.module.items[1].kind else {
            panic!("expected a function");
        };
        assert!(main.modifiers.dso_local);
        assert!(main.body.is_some());
    }

    #[test]
    fn test_call_forms_and_modifiers() {
        let parsed = parse_source(
            "cir.func @g(%x : !s32i) -> !s32i {\n  cir.return %x : !s32i\n}\ncir.func @f(%fp : !cir.ptr<!cir.func<!s32i (!s32i)>>, %a : !s32i) {\n  %0 = cir.call @g(%a) : (!s32i) -> !s32i side_effect(pure)\n  %1 = cir.call %fp(%a) : (!s32i) -> !s32i cc(fastcc)\n  cir.return\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let forms: Vec<_> = parsed.module.forms().into_values().collect();
        assert!(forms.contains(&OpForm::Direct));
        assert!(forms.contains(&OpForm::Indirect));
    }

    #[test]
    fn test_call_to_undeclared_symbol() {
        let parsed = parse_source("cir.func @f() {\n  cir.call @nowhere() : () -> ()\n  cir.return\n}");
        let codes: Vec<_> = parsed.diagnostics.iter().map(|d| d.code()).collect();
        assert_eq!(codes, vec!["UnresolvedReferenceError"]);
    }

    #[test]
    fn test_try_call_successors() {
        let parsed = parse_source(
            "cir.func private @may_throw()\ncir.func @f() {\n  cir.try_call @may_throw() ^ok, ^lp : () -> ()\n^ok:\n  cir.return\n^lp:\n  cir.resume\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let OpKind::Func(f) = &parsed.module.items[1].kind else {
            panic!("expected a function");
        };
        let first = &f.body.as_ref().unwrap().blocks[0].ops[0];
        let OpKind::TryCall { target, .. } = &first.kind else {
            panic!("expected try_call");
        };
        assert!(matches!(target, TryCallTarget::Successors { .. }));
    }

    #[test]
    fn test_global_initializers() {
        let parsed = parse_source(
            "cir.global \"private\" constant internal @a = #cir.int<1> : !s32i\ncir.global external @b = ctor : !rec_S {\n  cir.yield\n} dtor {\n  cir.yield\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let OpKind::Global(a) = &parsed.module.items[0].kind else {
            panic!("expected a global");
        };
        assert_eq!(a.visibility.as_ref().unwrap().text, "\"private\"");
        assert!(matches!(a.init, Some(GlobalInit::Attribute(_))));
        let OpKind::Global(b) = &parsed.module.items[1].kind else {
            panic!("expected a global");
        };
        assert!(matches!(b.init, Some(GlobalInit::Ctor { dtor: Some(_), .. })));
    }

    #[test]
    fn test_get_global_names_a_global() {
        let parsed = parse_source(
            "cir.global external @g = #cir.int<0> : !s32i\ncir.func @f() {\n  %0 = cir.get_global thread_local @g : !cir.ptr<!s32i>\n  cir.return\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    }
}
