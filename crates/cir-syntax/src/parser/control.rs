//! Branches, structured control flow and loops.

use crate::ast::{OpForm, OpKind, Region, RegionKind};
use crate::opcode::Opcode;
use crate::token::{Punct, TokenKind};

use super::{OpParts, PResult, Parser};

impl Parser<'_, '_, '_> {
    pub(super) fn br(&mut self) -> PResult<OpParts> {
        let dest = self.successor()?;
        let attribute = self.opt_attribute()?;
        Ok(OpParts::new(OpKind::Br { dest }).attribute(attribute))
    }

    pub(super) fn brcond(&mut self) -> PResult<OpParts> {
        let cond = self.value_use()?;
        let then_dest = self.successor()?;
        self.expect(Punct::Comma)?;
        let else_dest = self.successor()?;
        let attribute = self.opt_attribute()?;
        Ok(OpParts::new(OpKind::BrCond {
            cond,
            then_dest,
            else_dest,
        })
        .attribute(attribute))
    }

    pub(super) fn if_op(&mut self) -> PResult<OpParts> {
        let cond = self.value_use()?;
        let then_region = self.region(RegionKind::Structured, true)?;
        let else_region = if self.eat_word("else") {
            Some(self.region(RegionKind::Structured, true)?)
        } else {
            None
        };
        let attribute = self.opt_attribute()?;
        let result = self.opt_type_annotation()?;
        Ok(OpParts::new(OpKind::If {
            cond,
            then_region,
            else_region,
            result,
        })
        .attribute(attribute))
    }

    pub(super) fn scope_op(&mut self) -> PResult<OpParts> {
        let body = self.region(RegionKind::Structured, true)?;
        let cleanup = if self.eat_word("cleanup") {
            Some(self.region(RegionKind::Structured, true)?)
        } else {
            None
        };
        let attribute = self.opt_attribute()?;
        let result = self.opt_type_annotation()?;
        Ok(OpParts::new(OpKind::Scope {
            body,
            cleanup,
            result,
        })
        .attribute(attribute))
    }

    /// `name : region`, as used inside `cir.loop` and `cir.await`.
    fn named_region(&mut self, name: &str, kind: RegionKind) -> PResult<Region> {
        self.expect_word(name)?;
        self.expect(Punct::Colon)?;
        self.region(kind, false)
    }

    pub(super) fn loop_op(&mut self) -> PResult<OpParts> {
        let kind = self.ident("a loop kind")?;
        self.expect(Punct::LParen)?;
        let cond = if self.at_word("cond") {
            let cond = self.named_region("cond", RegionKind::LoopCondition)?;
            self.expect(Punct::Comma)?;
            Some(cond)
        } else {
            None
        };
        let body = self.named_region("body", RegionKind::LoopBody)?;
        let step = if self.eat(Punct::Comma) {
            Some(self.named_region("step", RegionKind::LoopBody)?)
        } else {
            None
        };
        self.expect(Punct::RParen)?;
        let attribute = self.opt_attribute()?;
        let result = self.opt_type_annotation()?;
        Ok(OpParts::new(OpKind::Loop {
            kind,
            cond,
            body,
            step,
            result,
        })
        .attribute(attribute))
    }

    /// `: cond { } body { } step { }`
    pub(super) fn for_op(&mut self) -> PResult<OpParts> {
        self.expect(Punct::Colon)?;
        self.expect_word("cond")?;
        let cond = self.region(RegionKind::LoopCondition, false)?;
        self.expect_word("body")?;
        let body = self.region(RegionKind::LoopBody, false)?;
        self.expect_word("step")?;
        let step = self.region(RegionKind::LoopBody, false)?;
        let attribute = self.opt_attribute()?;
        Ok(OpParts::new(OpKind::For { cond, body, step }).attribute(attribute))
    }

    /// `cir.while` and `cir.do` in either the labeled or the fluent form.
    pub(super) fn while_like(&mut self, opcode: Opcode, form: OpForm) -> PResult<OpParts> {
        let cond_first = opcode == Opcode::While;
        let (first, second) = if form == OpForm::Labeled {
            self.expect(Punct::Colon)?;
            let (first_word, second_word) = if cond_first {
                ("cond", "body")
            } else {
                ("body", "cond")
            };
            self.expect_word(first_word)?;
            let first = self.region(loop_region(cond_first), false)?;
            self.expect_word(second_word)?;
            let second = self.region(loop_region(!cond_first), false)?;
            (first, second)
        } else {
            let first = self.region(loop_region(cond_first), false)?;
            self.expect_word(if cond_first { "do" } else { "while" })?;
            let second = self.region(loop_region(!cond_first), false)?;
            (first, second)
        };
        let attribute = self.opt_attribute()?;
        let kind = if cond_first {
            OpKind::While {
                cond: first,
                body: second,
            }
        } else {
            OpKind::DoWhile {
                body: first,
                cond: second,
            }
        };
        Ok(OpParts::new(kind).form(form).attribute(attribute))
    }

    pub(super) fn condition(&mut self) -> PResult<OpParts> {
        self.expect(Punct::LParen)?;
        let cond = self.value_use()?;
        self.expect(Punct::RParen)?;
        let attribute = self.opt_attribute()?;
        Ok(OpParts::new(OpKind::Condition { cond }).attribute(attribute))
    }

    /// `( kind , ready : { } , suspend : { } , resume : { } , )`
    pub(super) fn await_op(&mut self) -> PResult<OpParts> {
        self.expect(Punct::LParen)?;
        let kind = self.ident("an await kind")?;
        self.expect(Punct::Comma)?;
        let ready = self.named_region("ready", RegionKind::AwaitReady)?;
        self.expect(Punct::Comma)?;
        let suspend = self.named_region("suspend", RegionKind::Structured)?;
        self.expect(Punct::Comma)?;
        let resume = self.named_region("resume", RegionKind::Structured)?;
        self.expect(Punct::Comma)?;
        self.expect(Punct::RParen)?;
        let attribute = self.opt_attribute()?;
        Ok(OpParts::new(OpKind::Await {
            kind,
            ready,
            suspend,
            resume,
        })
        .attribute(attribute))
    }

    pub(super) fn switch(&mut self) -> PResult<OpParts> {
        self.expect(Punct::LParen)?;
        let cond = self.typed_value()?;
        self.expect(Punct::RParen)?;
        let body = self.region(RegionKind::Structured, false)?;
        let attribute = self.opt_attribute()?;
        Ok(OpParts::new(OpKind::Switch { cond, body }).attribute(attribute))
    }

    /// `( kind , [ values ] ) { }`
    pub(super) fn case(&mut self) -> PResult<OpParts> {
        self.expect(Punct::LParen)?;
        let kind = self.ident("a case kind")?;
        self.expect(Punct::Comma)?;
        let values = self.bracketed_attribute_values()?;
        self.expect(Punct::RParen)?;
        let body = self.region(RegionKind::Structured, false)?;
        Ok(OpParts::new(OpKind::Case { kind, values, body }))
    }

    /// `( %c , true { } , false { } ) : signature`
    pub(super) fn ternary(&mut self) -> PResult<OpParts> {
        self.expect(Punct::LParen)?;
        let cond = self.value_use()?;
        self.expect(Punct::Comma)?;
        self.expect_word("true")?;
        let true_region = self.region(RegionKind::TernaryBranch, true)?;
        self.expect(Punct::Comma)?;
        self.expect_word("false")?;
        let false_region = self.region(RegionKind::TernaryBranch, true)?;
        self.expect(Punct::RParen)?;
        let attribute = self.opt_attribute()?;
        let signature = self.function_type()?;
        Ok(OpParts::new(OpKind::Ternary {
            cond,
            true_region,
            false_region,
            signature,
        })
        .attribute(attribute))
    }

    /// Operand-less terminators: an optional attribute and nothing else.
    pub(super) fn bare_terminator(&mut self, opcode: Opcode) -> PResult<OpParts> {
        let attribute = self.opt_attribute()?;
        let kind = match opcode {
            Opcode::Break => OpKind::Break,
            Opcode::Continue => OpKind::Continue,
            Opcode::Unreachable => OpKind::Unreachable,
            Opcode::Resume => OpKind::Resume,
            _ => OpKind::Trap,
        };
        Ok(OpParts::new(kind).attribute(attribute))
    }

    /// `< @func , "label" > -> type`
    pub(super) fn block_address(&mut self) -> PResult<OpParts> {
        self.expect(Punct::Less)?;
        let func = self.symbol_use()?;
        self.expect(Punct::Comma)?;
        let label = self.string()?;
        self.expect(Punct::Greater)?;
        let result = self.function_return()?;
        Ok(OpParts::new(OpKind::BlockAddress {
            func,
            label,
            result,
        }))
    }

    /// `%addr : < type > , [ ^a, ^b ]`
    pub(super) fn indirect_br(&mut self) -> PResult<OpParts> {
        let address = self.value_use()?;
        self.expect(Punct::Colon)?;
        self.expect(Punct::Less)?;
        let address_type = self.ty()?;
        self.expect(Punct::Greater)?;
        self.expect(Punct::Comma)?;
        self.expect(Punct::LBracket)?;
        let mut targets = Vec::new();
        while self.peek().kind == TokenKind::CaretId {
            targets.push(self.label_use()?);
            self.eat(Punct::Comma);
        }
        self.expect(Punct::RBracket)?;
        let attribute = self.opt_attribute()?;
        Ok(OpParts::new(OpKind::IndirectBr {
            address,
            address_type,
            targets,
        })
        .attribute(attribute))
    }

    pub(super) fn label(&mut self) -> PResult<OpParts> {
        let name = self.string()?;
        let attribute = self.opt_attribute()?;
        Ok(OpParts::new(OpKind::Label { name }).attribute(attribute))
    }
}

fn loop_region(condition: bool) -> RegionKind {
    if condition {
        RegionKind::LoopCondition
    } else {
        RegionKind::LoopBody
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{OpForm, OpKind};
    use crate::parse_source;

    fn in_func(body: &str) -> String {
        format!("cir.func @f(%c : !cir.bool, %i : !s32i) {{\n{body}\n  cir.return\n}}")
    }

    fn assert_clean(src: &str) {
        let parsed = parse_source(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    }

    #[test]
    fn test_if_else_with_yields() {
        assert_clean(&in_func(
            "  cir.if %c {\n    cir.yield\n  } else {\n    cir.yield\n  }",
        ));
    }

    #[test]
    fn test_while_both_forms() {
        let src = in_func(
            "  cir.while : cond {\n    cir.condition(%c)\n  } body {\n    cir.yield\n  }\n  cir.while {\n    cir.condition(%c)\n  } do {\n    cir.break\n  }",
        );
        let parsed = parse_source(&src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let forms: Vec<_> = parsed.module.forms().into_values().collect();
        assert!(forms.contains(&OpForm::Labeled));
        assert!(forms.contains(&OpForm::Fluent));
    }

    #[test]
    fn test_do_while_fluent() {
        assert_clean(&in_func(
            "  cir.do {\n    cir.continue\n  } while {\n    cir.condition(%c)\n  }",
        ));
    }

    #[test]
    fn test_for_and_legacy_loop() {
        assert_clean(&in_func(
            "  cir.for : cond {\n    cir.condition(%c)\n  } body {\n    cir.yield\n  } step {\n    cir.yield\n  }\n  cir.loop while(cond : {\n    cir.condition(%c)\n  }, body : {\n    cir.yield\n  }, step : {\n    cir.yield\n  })",
        ));
    }

    #[test]
    fn test_switch_with_cases() {
        assert_clean(&in_func(
            "  cir.switch (%i : !s32i) {\n    cir.case (equal, [#cir.int<1> : !s32i, #cir.int<2> : !s32i]) {\n      cir.break\n    }\n    cir.case (default, []) {\n      cir.yield\n    }\n    cir.yield\n  }",
        ));
    }

    #[test]
    fn test_ternary_branches_may_omit_terminators() {
        assert_clean(&in_func(
            "  %0 = cir.ternary(%c, true {\n    cir.yield %i : !s32i\n  }, false {\n  }) : (!cir.bool) -> !s32i",
        ));
    }

    #[test]
    fn test_await_regions() {
        assert_clean(&in_func(
            "  cir.await(init, ready : {\n    cir.condition(%c)\n  }, suspend : {\n    cir.yield\n  }, resume : {\n    cir.yield\n  },)",
        ));
    }

    #[test]
    fn test_indirectbr_targets() {
        let parsed = parse_source(
            "cir.func @f(%a : !cir.ptr<!void>) {\n  cir.indirectbr %a : <!cir.ptr<!void>>, [^x, ^y]\n^x:\n  cir.return\n^y:\n  cir.return\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let OpKind::Func(func) = &parsed.module.items[0].kind else {
            panic!("expected a function");
        };
        let OpKind::IndirectBr { targets, .. } = &func.body.as_ref().unwrap().blocks[0].ops[0].kind
        else {
            panic!("expected indirectbr");
        };
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_indirectbr_targets_without_commas() {
        let parsed = parse_source(
            "cir.func @f(%a : !cir.ptr<!void>) {\n  cir.indirectbr %a : <!cir.ptr<!void>>, [^x ^y]\n^x:\n  cir.return\n^y:\n  cir.return\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let text = crate::printer::print_module(&parsed.module);
        assert!(text.contains("[^x, ^y]"), "{text}");
    }

    #[test]
    fn test_await_ready_rejects_loop_exits() {
        let parsed = parse_source(&in_func(
            "  cir.await(init, ready : {\n    cir.break\n  }, suspend : {\n    cir.yield\n  }, resume : {\n    cir.yield\n  },)",
        ));
        let codes: Vec<_> = parsed.diagnostics.iter().map(|d| d.code()).collect();
        assert!(codes.contains(&"UnterminatedRegionError"), "{codes:?}");
    }

    #[test]
    fn test_blockaddress_and_label() {
        assert_clean(
            "cir.func @f() {\n  cir.label \"here\"\n  %0 = cir.blockaddress <@f, \"here\"> -> !cir.ptr<!void>\n  cir.return\n}",
        );
    }
}
