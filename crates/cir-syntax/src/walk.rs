//! Recursive operation traversal.
//!
//! ```
//! use std::ops::ControlFlow;
//! use cir_syntax::walk::{OperationWalk, WalkAction};
//!
//! let parsed = cir_syntax::parse_source("cir.func @f() { cir.return }");
//! let mut count = 0;
//! let _ = parsed.module.walk(|_op| {
//!     count += 1;
//!     ControlFlow::<(), WalkAction>::Continue(WalkAction::Advance)
//! });
//! assert_eq!(count, 2);
//! ```

use std::ops::ControlFlow;

use crate::ast::{Block, Module, Operation, Region};

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into nested regions.
    Advance,
    /// Skip the nested regions of the current operation.
    Skip,
}

/// Pre-order traversal over every operation reachable from `self`.
pub trait OperationWalk {
    /// Returns `ControlFlow::Break(b)` as soon as the callback does.
    fn walk<'a, B>(
        &'a self,
        f: impl FnMut(&'a Operation) -> ControlFlow<B, WalkAction>,
    ) -> ControlFlow<B, ()>;
}

fn walk_op<'a, B>(
    op: &'a Operation,
    f: &mut dyn FnMut(&'a Operation) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(op) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for region in op.regions() {
        walk_region(region, f)?;
    }
    ControlFlow::Continue(())
}

fn walk_region<'a, B>(
    region: &'a Region,
    f: &mut dyn FnMut(&'a Operation) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for block in &region.blocks {
        walk_block(block, f)?;
    }
    ControlFlow::Continue(())
}

fn walk_block<'a, B>(
    block: &'a Block,
    f: &mut dyn FnMut(&'a Operation) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for op in &block.ops {
        walk_op(op, f)?;
    }
    ControlFlow::Continue(())
}

impl OperationWalk for Operation {
    fn walk<'a, B>(
        &'a self,
        mut f: impl FnMut(&'a Operation) -> ControlFlow<B, WalkAction>,
    ) -> ControlFlow<B, ()> {
        walk_op(self, &mut f)
    }
}

impl OperationWalk for Region {
    fn walk<'a, B>(
        &'a self,
        mut f: impl FnMut(&'a Operation) -> ControlFlow<B, WalkAction>,
    ) -> ControlFlow<B, ()> {
        walk_region(self, &mut f)
    }
}

impl OperationWalk for Module {
    fn walk<'a, B>(
        &'a self,
        mut f: impl FnMut(&'a Operation) -> ControlFlow<B, WalkAction>,
    ) -> ControlFlow<B, ()> {
        for op in &self.items {
            walk_op(op, &mut f)?;
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;
    use crate::parse_source;

    const SOURCE: &str = r#"
cir.func @f(%c : !cir.bool) {
  cir.if %c {
    cir.scope {
      cir.yield
    }
    cir.yield
  }
  cir.return
}
"#;

    #[test]
    fn test_walk_visits_nested_in_preorder() {
        let parsed = parse_source(SOURCE);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let mut seen = Vec::new();
        let _ = parsed.module.walk(|op| {
            seen.push(op.opcode());
            ControlFlow::<(), WalkAction>::Continue(WalkAction::Advance)
        });
        assert_eq!(
            seen,
            vec![
                Opcode::Func,
                Opcode::If,
                Opcode::Scope,
                Opcode::Yield,
                Opcode::Yield,
                Opcode::Return
            ]
        );
    }

    #[test]
    fn test_walk_skip_and_break() {
        let parsed = parse_source(SOURCE);
        let mut seen = 0;
        let _ = parsed.module.walk(|op| {
            seen += 1;
            if op.opcode() == Opcode::If {
                ControlFlow::<(), WalkAction>::Continue(WalkAction::Skip)
            } else {
                ControlFlow::Continue(WalkAction::Advance)
            }
        });
        assert_eq!(seen, 3);

        let found = parsed.module.walk(|op| {
            if op.opcode() == Opcode::Scope {
                ControlFlow::Break(op.id)
            } else {
                ControlFlow::Continue(WalkAction::Advance)
            }
        });
        assert!(found.is_break());
    }
}
