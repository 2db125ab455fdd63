//! `{ ... }` regions and their blocks.

use crate::ast::{Block, BlockArg, Operation, Region, RegionKind};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::location::Span;
use crate::scope::{Definition, RefKind};
use crate::token::{Punct, TokenKind};

use super::{PResult, Parser, Reported};

struct OpenBlock {
    label: Option<Definition>,
    args: Vec<BlockArg>,
    ops: Vec<Operation>,
    start: usize,
    header_end: usize,
}

impl OpenBlock {
    fn unlabeled(start: usize) -> Self {
        Self {
            label: None,
            args: Vec::new(),
            ops: Vec::new(),
            start,
            header_end: start,
        }
    }

    fn is_empty(&self) -> bool {
        self.label.is_none() && self.ops.is_empty()
    }

    fn terminated(&self) -> bool {
        self.ops
            .last()
            .is_some_and(Operation::is_terminator)
    }

    fn finish(self) -> Block {
        let end = self.ops.last().map_or(self.header_end, |op| op.span.end);
        Block {
            label: self.label,
            args: self.args,
            ops: self.ops,
            span: Span::new(self.start, end),
        }
    }
}

fn terminator_list(kind: RegionKind) -> String {
    kind.allowed_terminators()
        .iter()
        .map(|op| format!("`{op}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Parser<'_, '_, '_> {
    /// Run `f` inside a fresh scope, judging the scope's pending uses on exit.
    pub(crate) fn in_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.scopes.push_scope();
        let result = f(self);
        let unresolved = self.scopes.pop_scope();
        self.diags.extend(unresolved);
        result
    }

    /// A region in its own scope. `implicit_terminator` lets a single-block
    /// region omit its terminator.
    pub(crate) fn region(&mut self, kind: RegionKind, implicit_terminator: bool) -> PResult<Region> {
        self.in_scope(|p| p.region_in_current_scope(kind, implicit_terminator))
    }

    /// A region whose scope the caller already opened (function bodies,
    /// whose arguments are defined before the `{`).
    pub(crate) fn region_in_current_scope(
        &mut self,
        kind: RegionKind,
        implicit_terminator: bool,
    ) -> PResult<Region> {
        if self.check_cancelled() {
            return Err(Reported);
        }
        if self.depth >= self.options.max_depth {
            let limit = self.options.max_depth;
            let _ = self.expected(format!("at most {limit} nested regions"));
            self.halted = true;
            return Err(Reported);
        }
        let open = self.expect(Punct::LBrace)?;
        self.depth += 1;
        let result = self.blocks(kind, implicit_terminator, open);
        self.depth -= 1;
        result
    }

    fn blocks(&mut self, kind: RegionKind, implicit_terminator: bool, open: Span) -> PResult<Region> {
        let scope = self.scopes.current();
        let mut blocks = Vec::new();
        let mut current = OpenBlock::unlabeled(self.peek().span.start);
        loop {
            if self.halted {
                return Err(Reported);
            }
            let tok = *self.peek();
            match tok.kind {
                TokenKind::Punct(Punct::RBrace) => break,
                TokenKind::Eof => {
                    self.report(
                        Diagnostic::error(
                            DiagnosticKind::UnterminatedRegion {
                                message: format!(
                                    "{} is missing its closing `}}`",
                                    kind.describe()
                                ),
                            },
                            open,
                        )
                        .with_fix(Span::empty_at(tok.span.start)),
                    );
                    self.halted = true;
                    return Err(Reported);
                }
                TokenKind::CaretId if self.at_block_header() => {
                    let start = self.pos;
                    match self.block_header() {
                        Ok(next) => {
                            let previous = std::mem::replace(&mut current, next);
                            if !previous.is_empty() {
                                blocks.push(previous.finish());
                            }
                        }
                        Err(Reported) => self.recover(start),
                    }
                }
                _ => {
                    let start = self.pos;
                    match self.operation() {
                        Ok(op) => {
                            if current.terminated() {
                                self.op_after_terminator(kind, &op);
                                let previous =
                                    std::mem::replace(&mut current, OpenBlock::unlabeled(op.span.start));
                                blocks.push(previous.finish());
                            }
                            if op.is_terminator() && !kind.accepts(&op) {
                                self.report(Diagnostic::error(
                                    DiagnosticKind::UnterminatedRegion {
                                        message: format!(
                                            "`{}` cannot terminate a {}; expected one of {}",
                                            op.opcode(),
                                            kind.describe(),
                                            terminator_list(kind)
                                        ),
                                    },
                                    op.span,
                                ));
                            }
                            current.ops.push(op);
                        }
                        Err(Reported) => self.recover(start),
                    }
                }
            }
        }
        let close = self.bump().span;
        blocks.push(current.finish());
        self.check_terminators(kind, implicit_terminator, &blocks, close);
        tracing::trace!(kind = kind.describe(), blocks = blocks.len(), "region closed");
        Ok(Region {
            kind,
            blocks,
            scope,
            span: open.to(close),
        })
    }

    /// `^label [( %a : type, ... )] :`
    fn block_header(&mut self) -> PResult<OpenBlock> {
        let tok = *self.bump();
        let label = self.define(RefKind::Label, &tok.name(), tok.span);
        let mut args = Vec::new();
        if self.eat(Punct::LParen) {
            loop {
                let arg = *self.peek();
                if arg.kind != TokenKind::ValueId {
                    return Err(self.expected("a block argument"));
                }
                self.bump();
                self.expect(Punct::Colon)?;
                let ty = self.ty()?;
                let def = self.define(RefKind::Value, &arg.name(), arg.span);
                args.push(BlockArg { def, ty });
                if !self.eat(Punct::Comma) {
                    break;
                }
            }
            self.expect(Punct::RParen)?;
        }
        self.expect(Punct::Colon)?;
        Ok(OpenBlock {
            label: Some(label),
            args,
            ops: Vec::new(),
            start: tok.span.start,
            header_end: self.prev_end(),
        })
    }

    fn op_after_terminator(&mut self, kind: RegionKind, op: &Operation) {
        self.report(Diagnostic::error(
            DiagnosticKind::MalformedOperation {
                construct: kind.describe().to_owned(),
                expected: "a block label after the terminator".to_owned(),
                found: format!("`{}`", op.opcode()),
            },
            op.span,
        ));
    }

    fn check_terminators(
        &mut self,
        kind: RegionKind,
        implicit_terminator: bool,
        blocks: &[Block],
        close: Span,
    ) {
        if implicit_terminator && blocks.len() == 1 {
            return;
        }
        for block in blocks {
            if block.terminator().is_some() {
                continue;
            }
            let span = if block.ops.is_empty() && block.label.is_none() {
                close
            } else {
                block.span
            };
            self.report(
                Diagnostic::error(
                    DiagnosticKind::UnterminatedRegion {
                        message: format!(
                            "block in {} does not end with a terminator; expected one of {}",
                            kind.describe(),
                            terminator_list(kind)
                        ),
                    },
                    span,
                )
                .with_fix(Span::empty_at(block.span.end)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::OpKind;
    use crate::parse_source;
    use crate::parse;
    use crate::options::ParseOptions;

    fn codes(src: &str) -> Vec<&'static str> {
        parse_source(src).diagnostics.iter().map(|d| d.code()).collect()
    }

    #[test]
    fn test_blocks_split_on_labels() {
        let parsed = parse_source(
            "cir.func @f(%c : !cir.bool) {\n  cir.brcond %c ^a, ^b\n^a:\n  cir.br ^b\n^b:\n  cir.return\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let OpKind::Func(func) = &parsed.module.items[0].kind else {
            panic!("expected a function");
        };
        let body = func.body.as_ref().unwrap();
        assert_eq!(body.blocks.len(), 3);
        assert!(body.blocks[0].label.is_none());
        assert_eq!(body.blocks[2].label.as_ref().unwrap().name, "b");
    }

    #[test]
    fn test_block_arguments_are_values() {
        let parsed = parse_source(
            "cir.func @f(%x : !s32i) {\n  cir.br ^next(%x : !s32i)\n^next(%y : !s32i):\n  cir.return %y : !s32i\n}",
        );
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    }

    #[test]
    fn test_missing_terminator_in_function() {
        assert_eq!(
            codes("cir.func @f() {\n  cir.label \"x\"\n}"),
            vec!["UnterminatedRegionError"]
        );
        assert_eq!(codes("cir.func @f() {}"), vec!["UnterminatedRegionError"]);
    }

    #[test]
    fn test_if_may_omit_terminator() {
        assert!(codes("cir.func @f(%c : !cir.bool) {\n  cir.if %c {\n  }\n  cir.return\n}").is_empty());
    }

    #[test]
    fn test_wrong_terminator_for_region() {
        let diags = codes(
            "cir.func @f(%c : !cir.bool) {\n  cir.while : cond {\n    cir.yield\n  } body {\n    cir.yield\n  }\n  cir.return\n}",
        );
        assert_eq!(diags, vec!["UnterminatedRegionError"]);
    }

    #[test]
    fn test_operation_after_terminator() {
        let parsed = parse_source("cir.func @f() {\n  cir.return\n  cir.trap\n}");
        let codes: Vec<_> = parsed.diagnostics.iter().map(|d| d.code()).collect();
        assert_eq!(codes, vec!["MalformedOperationError"]);
        let OpKind::Func(func) = &parsed.module.items[0].kind else {
            panic!("expected a function");
        };
        assert_eq!(func.body.as_ref().unwrap().blocks.len(), 2);
    }

    #[test]
    fn test_unterminated_region_at_eof_halts() {
        let parsed = parse_source("cir.func @f() {\n  cir.return\n");
        assert!(parsed.module.items.is_empty());
        let codes: Vec<_> = parsed.diagnostics.iter().map(|d| d.code()).collect();
        assert_eq!(codes, vec!["UnterminatedRegionError"]);
    }

    #[test]
    fn test_nesting_limit() {
        let src = "cir.func @f() {\n  cir.scope {\n    cir.scope {\n      cir.yield\n    }\n  }\n  cir.return\n}";
        let parsed = parse(src, ParseOptions::default().with_max_depth(2));
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].message().contains("at most 2 nested regions"));
        assert!(parse(src, ParseOptions::default().with_max_depth(3)).diagnostics.is_empty());
    }

    #[test]
    fn test_label_from_enclosing_region_is_unresolved() {
        let parsed = parse_source(
            "cir.func @f() {\n  cir.br ^out\n^out:\n  cir.scope {\n    cir.br ^out\n  }\n  cir.return\n}",
        );
        let messages: Vec<_> = parsed.diagnostics.iter().map(|d| d.message()).collect();
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].contains("enclosing region"));
    }
}
