//! The closed set of CIR opcodes.

use std::fmt;

macro_rules! opcodes {
    ($($variant:ident => $keyword:literal),* $(,)?) => {
        /// Leading keyword of an operation.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Opcode {
            $($variant),*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant),*];

            pub fn keyword(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $keyword),*
                }
            }

            pub fn from_keyword(keyword: &str) -> Option<Self> {
                match keyword {
                    $($keyword => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    Func => "cir.func",
    Call => "cir.call",
    TryCall => "cir.try_call",
    Return => "cir.return",
    Alloca => "cir.alloca",
    Load => "cir.load",
    Store => "cir.store",
    Const => "cir.const",
    Cast => "cir.cast",
    BinOp => "cir.binop",
    Cmp => "cir.cmp",
    Unary => "cir.unary",
    Br => "cir.br",
    BrCond => "cir.brcond",
    Yield => "cir.yield",
    If => "cir.if",
    Scope => "cir.scope",
    Loop => "cir.loop",
    For => "cir.for",
    While => "cir.while",
    DoWhile => "cir.do",
    Condition => "cir.condition",
    Await => "cir.await",
    Global => "cir.global",
    GetGlobal => "cir.get_global",
    PtrStride => "cir.ptr_stride",
    Try => "cir.try",
    Throw => "cir.throw",
    CatchParam => "cir.catch_param",
    Resume => "cir.resume",
    StructElementAddr => "cir.struct_element_addr",
    GetMember => "cir.get_member",
    Switch => "cir.switch",
    Case => "cir.case",
    Ternary => "cir.ternary",
    Select => "cir.select",
    Copy => "cir.copy",
    Break => "cir.break",
    Continue => "cir.continue",
    Unreachable => "cir.unreachable",
    Trap => "cir.trap",
    ObjSize => "cir.objsize",
    Shift => "cir.shift",
    Clrsb => "cir.clrsb",
    Ffs => "cir.ffs",
    Parity => "cir.parity",
    Clz => "cir.clz",
    Ctz => "cir.ctz",
    Popcount => "cir.popcount",
    DynCast => "cir.dyn_cast",
    BlockAddress => "cir.blockaddress",
    IndirectBr => "cir.indirectbr",
    Label => "cir.label",
    Memcpy => "cir.libc.memcpy",
    Memchr => "cir.libc.memchr",
    Fabs => "cir.libc.fabs",
    StackSave => "cir.stack_save",
    StackRestore => "cir.stack_restore",
    GetRuntimeMember => "cir.get_runtime_member",
}

impl Opcode {
    /// Whether an operation with this opcode ends its block.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Yield
                | Opcode::Return
                | Opcode::Br
                | Opcode::BrCond
                | Opcode::Condition
                | Opcode::Break
                | Opcode::Continue
                | Opcode::Unreachable
                | Opcode::Trap
                | Opcode::Throw
                | Opcode::Resume
                | Opcode::IndirectBr
        )
    }

    /// Whether this opcode declares a module-level symbol.
    pub fn is_declaration(self) -> bool {
        matches!(self, Opcode::Func | Opcode::Global)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_roundtrip_for_every_opcode() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_keyword(op.keyword()), Some(*op));
        }
        assert_eq!(Opcode::ALL.len(), 59);
    }

    #[test]
    fn test_unknown_keyword() {
        assert_eq!(Opcode::from_keyword("cir.frobnicate"), None);
        assert_eq!(Opcode::from_keyword("llvm.func"), None);
    }
}
