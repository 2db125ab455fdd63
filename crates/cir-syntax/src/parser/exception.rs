//! Exception handling: `cir.try`, `cir.throw`, `cir.catch_param`.

use crate::ast::{CatchClause, OpKind, RegionKind};
use crate::token::{Punct, TokenKind};

use super::{OpParts, PResult, Parser};

impl Parser<'_, '_, '_> {
    pub(super) fn try_op(&mut self) -> PResult<OpParts> {
        let body = self.region(RegionKind::Structured, false)?;
        let catches = if self.eat_word("catch") {
            Some(self.catch_clauses()?)
        } else {
            None
        };
        let cleanup = if self.eat_word("cleanup") {
            Some(self.region(RegionKind::Structured, false)?)
        } else {
            None
        };
        let attribute = self.opt_attribute()?;
        Ok(OpParts::new(OpKind::Try {
            body,
            catches,
            cleanup,
        })
        .attribute(attribute))
    }

    /// `[ (type attr | attr) { } (,)? ... ]`
    fn catch_clauses(&mut self) -> PResult<Vec<CatchClause>> {
        self.expect(Punct::LBracket)?;
        let mut clauses = Vec::new();
        while !self.at(Punct::RBracket) {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.expected("`]`"));
            }
            let typed = self.eat_word("type");
            let attribute = self.alias_or_dialect_attr()?;
            let region = self.region(RegionKind::Structured, false)?;
            let trailing_comma = self.eat(Punct::Comma);
            clauses.push(CatchClause {
                typed,
                attribute,
                region,
                trailing_comma,
            });
        }
        self.bump();
        Ok(clauses)
    }

    pub(super) fn throw(&mut self) -> PResult<OpParts> {
        let exception = if self.peek().kind == TokenKind::ValueId {
            Some(self.value_use()?)
        } else {
            None
        };
        let attribute = self.opt_attribute()?;
        let result = self.opt_type_annotation()?;
        Ok(OpParts::new(OpKind::Throw { exception, result }).attribute(attribute))
    }

    pub(super) fn catch_param(&mut self) -> PResult<OpParts> {
        let exception = if self.peek().kind == TokenKind::ValueId {
            Some(self.value_use()?)
        } else {
            None
        };
        let result = self.function_return()?;
        Ok(OpParts::new(OpKind::CatchParam { exception, result }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::OpKind;
    use crate::parse_source;

    #[test]
    fn test_try_with_catch_clauses() {
        let parsed = parse_source(
            "cir.func @f() {\n  cir.try {\n    cir.yield\n  } catch [type #cir.global_view<@_ZTIi> {\n    %0 = cir.catch_param -> !cir.ptr<!s32i>\n    cir.yield\n  }, #cir.unwind {\n    cir.resume\n  }]\n  cir.return\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let OpKind::Func(func) = &parsed.module.items[0].kind else {
            panic!("expected a function");
        };
        let OpKind::Try { catches, .. } = &func.body.as_ref().unwrap().blocks[0].ops[0].kind else {
            panic!("expected try");
        };
        let catches = catches.as_ref().unwrap();
        assert_eq!(catches.len(), 2);
        assert!(catches[0].typed);
        assert!(catches[0].trailing_comma);
        assert!(!catches[1].typed);
    }

    #[test]
    fn test_throw_terminates_function() {
        let parsed = parse_source(
            "cir.func @f(%e : !cir.ptr<!s32i>) {\n  cir.throw %e : !cir.ptr<!s32i>\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    }
}
