//! Abstract syntax tree for CIR source units.
//!
//! Every opcode has its own [`OpKind`] variant carrying exactly the fields
//! its grammar defines. Where an opcode has several surface forms with
//! different field shapes, the variant holds a small shape enum, so a
//! node can never mix fields from two forms. The form that matched is
//! recorded separately in [`Operation::form`].

use std::collections::BTreeMap;
use std::fmt;
use std::ops::ControlFlow;

use smallvec::SmallVec;

use crate::adapter::{OpaqueAttribute, OpaqueType};
use crate::location::{SourceId, Span};
use crate::opcode::Opcode;
use crate::scope::{Definition, ScopeId, SymbolRef, SymbolTable};
use crate::walk::{OperationWalk, WalkAction};

pub type Types = SmallVec<[OpaqueType; 2]>;
pub type Values = SmallVec<[SymbolRef; 2]>;

// ============================================================================
// Leaves
// ============================================================================

/// A token kept as written: bare identifiers, integer and string literals.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Lexeme {
    pub text: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedValue {
    pub value: SymbolRef,
    pub ty: OpaqueType,
}

/// `%a, %b : !t1, !t2`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueTypeList {
    pub values: Values,
    pub types: Types,
}

/// Branch target with optional block arguments: `^bb1(%x : !s32i)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Successor {
    pub label: SymbolRef,
    pub args: Option<ValueTypeList>,
}

/// One side of a function-type annotation: a bare type or `( types )`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeGroup {
    pub types: Types,
    pub parenthesized: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationForm {
    /// `: type`
    Single,
    /// `: inputs -> results`
    Arrow,
}

/// `: inputs [-> results]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionTypeAnnotation {
    pub inputs: TypeGroup,
    pub results: Option<TypeGroup>,
    pub span: Span,
}

impl FunctionTypeAnnotation {
    pub fn form(&self) -> AnnotationForm {
        if self.results.is_some() {
            AnnotationForm::Arrow
        } else {
            AnnotationForm::Single
        }
    }
}

// ============================================================================
// Modifier sets
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Linkage {
    LinkonceOdr,
    Private,
    Internal,
    External,
    Weak,
}

impl Linkage {
    pub fn keyword(self) -> &'static str {
        match self {
            Linkage::LinkonceOdr => "linkonce_odr",
            Linkage::Private => "private",
            Linkage::Internal => "internal",
            Linkage::External => "external",
            Linkage::Weak => "weak",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "linkonce_odr" => Linkage::LinkonceOdr,
            "private" => Linkage::Private,
            "internal" => Linkage::Internal,
            "external" => Linkage::External,
            "weak" => Linkage::Weak,
            _ => return None,
        })
    }
}

/// Modifiers written before a function's name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FuncModifiers {
    pub no_inline: bool,
    pub optnone: bool,
    pub dso_local: bool,
    pub comdat: bool,
    pub coroutine: bool,
    pub linkage: Option<Linkage>,
}

/// Modifiers written after a function's signature.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FuncTraits {
    pub calling_conv: Option<Lexeme>,
    pub alias: Option<SymbolRef>,
    /// `global_ctor` with its optional priority.
    pub global_ctor: Option<Option<Lexeme>>,
    pub global_dtor: Option<Option<Lexeme>>,
    pub special_member: Option<OpaqueAttribute>,
}

/// Trailing `cc(..)`, `extra(..)` and `side_effect(..)` of calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallModifiers {
    pub calling_conv: Option<Lexeme>,
    pub extra: Option<OpaqueAttribute>,
    pub side_effect: Option<Lexeme>,
}

/// `volatile`, `align(n)` and `atomic(order)` on loads and stores.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryFlags {
    pub volatile: bool,
    pub alignment: Option<Lexeme>,
    pub atomic: Option<Lexeme>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TlsModel {
    Dynamic,
    LocalDynamic,
    InitialExec,
    LocalExec,
}

impl TlsModel {
    pub fn keyword(self) -> &'static str {
        match self {
            TlsModel::Dynamic => "tls_dyn",
            TlsModel::LocalDynamic => "tls_local_dyn",
            TlsModel::InitialExec => "tls_init_exec",
            TlsModel::LocalExec => "tls_local_exec",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "tls_dyn" => TlsModel::Dynamic,
            "tls_local_dyn" => TlsModel::LocalDynamic,
            "tls_init_exec" => TlsModel::InitialExec,
            "tls_local_exec" => TlsModel::LocalExec,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressSpace {
    /// `lang_address_space(id)`
    Lang(Lexeme),
    /// `target_address_space(n)`
    Target(Lexeme),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalModifiers {
    pub linkage: Option<Linkage>,
    pub constant: bool,
    pub comdat: bool,
    pub tls: Option<TlsModel>,
    pub address_space: Option<AddressSpace>,
}

// ============================================================================
// Per-opcode payloads
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncArg {
    pub name: Option<Definition>,
    pub ty: OpaqueType,
    pub attributes: Option<OpaqueAttribute>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncOp {
    pub modifiers: FuncModifiers,
    pub name: Definition,
    pub args: Vec<FuncArg>,
    pub variadic: bool,
    pub result: Option<TypeGroup>,
    pub traits: FuncTraits,
    pub annotations: Option<Vec<OpaqueAttribute>>,
    pub attributes: Option<OpaqueAttribute>,
    /// Absent for declarations.
    pub body: Option<Region>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlobalInit {
    /// `= ctor : type { ... } [dtor { ... }]`
    Ctor {
        ty: OpaqueType,
        ctor: Region,
        dtor: Option<Region>,
    },
    /// `= dtor : type { ... }`
    Dtor { ty: OpaqueType, dtor: Region },
    /// `= #cir.int<0> : !s32i` style; the type lives in `GlobalOp::result`.
    Attribute(OpaqueAttribute),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalOp {
    /// Leading visibility string, quotes included.
    pub visibility: Option<Lexeme>,
    pub modifiers: GlobalModifiers,
    pub name: Definition,
    pub init: Option<GlobalInit>,
    pub result: Option<Types>,
    pub annotations: Option<Vec<OpaqueAttribute>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TryCallTarget {
    /// `exception(%e) @f(...)`
    ExceptionPointer(SymbolRef),
    /// `@f(...) ^normal, ^unwind`
    Successors { normal: SymbolRef, unwind: SymbolRef },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypePair {
    Single(OpaqueType),
    Dual(OpaqueType, OpaqueType),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CastShape {
    /// `(kind, %v : src) , result`
    Parenthesized { source: OpaqueType, result: OpaqueType },
    /// `kind %v [: annotation]`; a missing annotation is deprecated.
    Bare {
        signature: Option<FunctionTypeAnnotation>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PtrStrideShape {
    Parenthesized {
        base_type: OpaqueType,
        stride_type: OpaqueType,
        result: OpaqueType,
    },
    Bare {
        signature: Option<FunctionTypeAnnotation>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjSizeShape {
    Bare { signature: FunctionTypeAnnotation },
    Parenthesized { value_type: OpaqueType, result: TypeGroup },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShiftShape {
    Parenthesized {
        lhs_type: OpaqueType,
        rhs_type: OpaqueType,
        result: TypeGroup,
    },
    Bare { signature: FunctionTypeAnnotation },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DynCastShape {
    Bare { signature: FunctionTypeAnnotation },
    Parenthesized { value_type: OpaqueType, result: TypeGroup },
}

/// One `cir.try` catch clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatchClause {
    /// Whether the clause starts with the `type` keyword.
    pub typed: bool,
    pub attribute: OpaqueAttribute,
    pub region: Region,
    pub trailing_comma: bool,
}

/// Operand and result of the bit-counting intrinsics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitOperand {
    pub value: SymbolRef,
    /// Only accepted on `clz`, `ctz` and `popcount`.
    pub zero_poison: bool,
    pub result: Types,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpKind {
    Func(Box<FuncOp>),
    Call {
        callee: SymbolRef,
        args: Values,
        signature: FunctionTypeAnnotation,
        modifiers: CallModifiers,
    },
    TryCall {
        callee: SymbolRef,
        args: Values,
        target: TryCallTarget,
        signature: FunctionTypeAnnotation,
        modifiers: CallModifiers,
    },
    Return {
        operands: Option<ValueTypeList>,
    },
    Alloca {
        allocated: OpaqueType,
        address: OpaqueType,
        count: Option<TypedValue>,
        /// `["name", init]` group.
        name: Option<Lexeme>,
        init: Option<Lexeme>,
        result: Option<Types>,
    },
    Load {
        flags: MemoryFlags,
        address: SymbolRef,
        types: TypePair,
    },
    Store {
        flags: MemoryFlags,
        value: SymbolRef,
        address: SymbolRef,
        types: TypePair,
    },
    Const {
        value: OpaqueAttribute,
        result: Types,
    },
    Cast {
        kind: Lexeme,
        value: SymbolRef,
        shape: CastShape,
    },
    BinOp {
        kind: Lexeme,
        lhs: SymbolRef,
        rhs: SymbolRef,
        result: Types,
    },
    Cmp {
        predicate: Lexeme,
        lhs: SymbolRef,
        rhs: SymbolRef,
        result: Types,
    },
    Unary {
        kind: Lexeme,
        operand: SymbolRef,
        result: Types,
    },
    Br {
        dest: Successor,
    },
    BrCond {
        cond: SymbolRef,
        then_dest: Successor,
        else_dest: Successor,
    },
    Yield {
        operands: Option<ValueTypeList>,
    },
    If {
        cond: SymbolRef,
        then_region: Region,
        else_region: Option<Region>,
        result: Option<Types>,
    },
    Scope {
        body: Region,
        cleanup: Option<Region>,
        result: Option<Types>,
    },
    Loop {
        kind: Lexeme,
        cond: Option<Region>,
        body: Region,
        step: Option<Region>,
        result: Option<Types>,
    },
    For {
        cond: Region,
        body: Region,
        step: Region,
    },
    While {
        cond: Region,
        body: Region,
    },
    DoWhile {
        body: Region,
        cond: Region,
    },
    Condition {
        cond: SymbolRef,
    },
    Await {
        kind: Lexeme,
        ready: Region,
        suspend: Region,
        resume: Region,
    },
    Global(Box<GlobalOp>),
    GetGlobal {
        thread_local: bool,
        name: SymbolRef,
        result: Types,
    },
    PtrStride {
        base: SymbolRef,
        stride: SymbolRef,
        shape: PtrStrideShape,
    },
    Try {
        body: Region,
        catches: Option<Vec<CatchClause>>,
        cleanup: Option<Region>,
    },
    Throw {
        exception: Option<SymbolRef>,
        result: Option<Types>,
    },
    CatchParam {
        exception: Option<SymbolRef>,
        result: TypeGroup,
    },
    Resume,
    StructElementAddr {
        base: SymbolRef,
        index: Lexeme,
        result: Types,
    },
    GetMember {
        base: SymbolRef,
        index: Lexeme,
        result: Types,
    },
    Switch {
        cond: TypedValue,
        body: Region,
    },
    Case {
        kind: Lexeme,
        values: Vec<OpaqueAttribute>,
        body: Region,
    },
    Ternary {
        cond: SymbolRef,
        true_region: Region,
        false_region: Region,
        signature: FunctionTypeAnnotation,
    },
    Select {
        cond: SymbolRef,
        true_value: SymbolRef,
        false_value: SymbolRef,
        result: Types,
    },
    Copy {
        src: SymbolRef,
        dst: SymbolRef,
        result: Option<Types>,
    },
    Break,
    Continue,
    Unreachable,
    Trap,
    ObjSize {
        kind: Lexeme,
        value: SymbolRef,
        shape: ObjSizeShape,
    },
    Shift {
        direction: Lexeme,
        lhs: SymbolRef,
        rhs: SymbolRef,
        shape: ShiftShape,
    },
    Clrsb(BitOperand),
    Ffs(BitOperand),
    Parity(BitOperand),
    Clz(BitOperand),
    Ctz(BitOperand),
    Popcount(BitOperand),
    DynCast {
        kind: Lexeme,
        relative_layout: bool,
        value: SymbolRef,
        shape: DynCastShape,
        info: Option<OpaqueAttribute>,
    },
    BlockAddress {
        func: SymbolRef,
        label: Lexeme,
        result: TypeGroup,
    },
    IndirectBr {
        address: SymbolRef,
        address_type: OpaqueType,
        targets: Vec<SymbolRef>,
    },
    Label {
        name: Lexeme,
    },
    Memcpy {
        len: SymbolRef,
        src: SymbolRef,
        dst: SymbolRef,
        signature: FunctionTypeAnnotation,
    },
    Memchr {
        src: SymbolRef,
        pattern: SymbolRef,
        len: SymbolRef,
        signature: Option<FunctionTypeAnnotation>,
    },
    Fabs {
        value: SymbolRef,
        result: Types,
    },
    StackSave {
        result: Types,
    },
    StackRestore {
        value: SymbolRef,
        result: Types,
    },
    GetRuntimeMember {
        base: SymbolRef,
        member: TypedValue,
        signature: FunctionTypeAnnotation,
    },
}

impl OpKind {
    pub fn opcode(&self) -> Opcode {
        match self {
            OpKind::Func(_) => Opcode::Func,
            OpKind::Call { .. } => Opcode::Call,
            OpKind::TryCall { .. } => Opcode::TryCall,
            OpKind::Return { .. } => Opcode::Return,
            OpKind::Alloca { .. } => Opcode::Alloca,
            OpKind::Load { .. } => Opcode::Load,
            OpKind::Store { .. } => Opcode::Store,
            OpKind::Const { .. } => Opcode::Const,
            OpKind::Cast { .. } => Opcode::Cast,
            OpKind::BinOp { .. } => Opcode::BinOp,
            OpKind::Cmp { .. } => Opcode::Cmp,
            OpKind::Unary { .. } => Opcode::Unary,
            OpKind::Br { .. } => Opcode::Br,
            OpKind::BrCond { .. } => Opcode::BrCond,
            OpKind::Yield { .. } => Opcode::Yield,
            OpKind::If { .. } => Opcode::If,
            OpKind::Scope { .. } => Opcode::Scope,
            OpKind::Loop { .. } => Opcode::Loop,
            OpKind::For { .. } => Opcode::For,
            OpKind::While { .. } => Opcode::While,
            OpKind::DoWhile { .. } => Opcode::DoWhile,
            OpKind::Condition { .. } => Opcode::Condition,
            OpKind::Await { .. } => Opcode::Await,
            OpKind::Global(_) => Opcode::Global,
            OpKind::GetGlobal { .. } => Opcode::GetGlobal,
            OpKind::PtrStride { .. } => Opcode::PtrStride,
            OpKind::Try { .. } => Opcode::Try,
            OpKind::Throw { .. } => Opcode::Throw,
            OpKind::CatchParam { .. } => Opcode::CatchParam,
            OpKind::Resume => Opcode::Resume,
            OpKind::StructElementAddr { .. } => Opcode::StructElementAddr,
            OpKind::GetMember { .. } => Opcode::GetMember,
            OpKind::Switch { .. } => Opcode::Switch,
            OpKind::Case { .. } => Opcode::Case,
            OpKind::Ternary { .. } => Opcode::Ternary,
            OpKind::Select { .. } => Opcode::Select,
            OpKind::Copy { .. } => Opcode::Copy,
            OpKind::Break => Opcode::Break,
            OpKind::Continue => Opcode::Continue,
            OpKind::Unreachable => Opcode::Unreachable,
            OpKind::Trap => Opcode::Trap,
            OpKind::ObjSize { .. } => Opcode::ObjSize,
            OpKind::Shift { .. } => Opcode::Shift,
            OpKind::Clrsb(_) => Opcode::Clrsb,
            OpKind::Ffs(_) => Opcode::Ffs,
            OpKind::Parity(_) => Opcode::Parity,
            OpKind::Clz(_) => Opcode::Clz,
            OpKind::Ctz(_) => Opcode::Ctz,
            OpKind::Popcount(_) => Opcode::Popcount,
            OpKind::DynCast { .. } => Opcode::DynCast,
            OpKind::BlockAddress { .. } => Opcode::BlockAddress,
            OpKind::IndirectBr { .. } => Opcode::IndirectBr,
            OpKind::Label { .. } => Opcode::Label,
            OpKind::Memcpy { .. } => Opcode::Memcpy,
            OpKind::Memchr { .. } => Opcode::Memchr,
            OpKind::Fabs { .. } => Opcode::Fabs,
            OpKind::StackSave { .. } => Opcode::StackSave,
            OpKind::StackRestore { .. } => Opcode::StackRestore,
            OpKind::GetRuntimeMember { .. } => Opcode::GetRuntimeMember,
        }
    }
}

// ============================================================================
// Forms
// ============================================================================

/// Which surface syntax of its opcode an operation was written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpForm {
    /// The only form of a single-form opcode.
    Canonical,
    Direct,
    Indirect,
    ExceptionPointer,
    Successors,
    Parenthesized,
    Bare,
    Labeled,
    Fluent,
    To,
    Comma,
    SingleType,
    DualType,
    ParenthesizedValue,
    DialectAttribute,
    AttributeAlias,
}

impl OpForm {
    pub fn name(self) -> &'static str {
        match self {
            OpForm::Canonical => "canonical",
            OpForm::Direct => "direct",
            OpForm::Indirect => "indirect",
            OpForm::ExceptionPointer => "exception-pointer",
            OpForm::Successors => "successors",
            OpForm::Parenthesized => "parenthesized",
            OpForm::Bare => "bare",
            OpForm::Labeled => "labeled",
            OpForm::Fluent => "fluent",
            OpForm::To => "to",
            OpForm::Comma => "comma",
            OpForm::SingleType => "single-type",
            OpForm::DualType => "dual-type",
            OpForm::ParenthesizedValue => "parenthesized-value",
            OpForm::DialectAttribute => "dialect-attribute",
            OpForm::AttributeAlias => "attribute-alias",
        }
    }
}

impl fmt::Display for OpForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Operations, regions, blocks
// ============================================================================

/// Parse-unique operation identifier, assigned in source order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub id: OpId,
    /// `%a, %b =` bindings.
    pub results: Vec<Definition>,
    pub kind: OpKind,
    pub form: OpForm,
    /// Optional trailing attribute alias or dictionary.
    pub attribute: Option<OpaqueAttribute>,
    pub span: Span,
}

/// Construct a region belongs to; decides its allowed terminators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionKind {
    FunctionBody,
    LoopCondition,
    LoopBody,
    /// `ready` region of `cir.await`.
    AwaitReady,
    Structured,
    TernaryBranch,
    GlobalInit,
}

impl RegionKind {
    pub fn allowed_terminators(self) -> &'static [Opcode] {
        use Opcode::*;
        match self {
            RegionKind::FunctionBody => &[
                Return,
                Unreachable,
                Trap,
                Throw,
                Resume,
                Br,
                BrCond,
                IndirectBr,
            ],
            RegionKind::LoopCondition => &[Condition, Unreachable, Trap],
            RegionKind::AwaitReady => &[Condition, Yield, Unreachable, Trap],
            RegionKind::LoopBody => &[
                Yield,
                Break,
                Continue,
                Return,
                Unreachable,
                Trap,
                Throw,
                Resume,
                Br,
                BrCond,
            ],
            RegionKind::Structured => &[
                Yield,
                Return,
                Break,
                Continue,
                Unreachable,
                Trap,
                Throw,
                Resume,
                Br,
                BrCond,
                IndirectBr,
            ],
            RegionKind::TernaryBranch | RegionKind::GlobalInit => &[Yield, Unreachable, Trap],
        }
    }

    pub fn allows(self, opcode: Opcode) -> bool {
        self.allowed_terminators().contains(&opcode)
    }

    /// Whether `op` may close a block of this region. A branching
    /// `cir.try_call` goes wherever `cir.br` may.
    pub fn accepts(self, op: &Operation) -> bool {
        if op.opcode() == Opcode::TryCall {
            self.allows(Opcode::Br)
        } else {
            self.allows(op.opcode())
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            RegionKind::FunctionBody => "function body",
            RegionKind::LoopCondition => "loop condition",
            RegionKind::AwaitReady => "await ready region",
            RegionKind::LoopBody => "loop body",
            RegionKind::Structured => "structured region",
            RegionKind::TernaryBranch => "ternary branch",
            RegionKind::GlobalInit => "global initializer",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockArg {
    pub def: Definition,
    pub ty: OpaqueType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// `None` for the entry block and for continuation blocks.
    pub label: Option<Definition>,
    pub args: Vec<BlockArg>,
    pub ops: Vec<Operation>,
    pub span: Span,
}

impl Block {
    /// The block's closing operation, if its last operation is a terminator.
    pub fn terminator(&self) -> Option<&Operation> {
        self.ops.last().filter(|op| op.is_terminator())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub blocks: Vec<Block>,
    pub scope: ScopeId,
    pub span: Span,
}

impl Region {
    pub fn ops(&self) -> impl Iterator<Item = &Operation> {
        self.blocks.iter().flat_map(|b| b.ops.iter())
    }
}

impl Operation {
    pub fn opcode(&self) -> Opcode {
        self.kind.opcode()
    }

    pub fn form(&self) -> OpForm {
        self.form
    }

    /// Whether the operation ends its block. `cir.try_call` does so only in
    /// its successor form.
    pub fn is_terminator(&self) -> bool {
        match self.kind {
            OpKind::TryCall {
                target: TryCallTarget::Successors { .. },
                ..
            } => true,
            _ => self.opcode().is_terminator(),
        }
    }

    /// Nested regions in source order.
    pub fn regions(&self) -> Vec<&Region> {
        let mut out: Vec<&Region> = Vec::new();
        match &self.kind {
            OpKind::Func(func) => out.extend(func.body.as_ref()),
            OpKind::If {
                then_region,
                else_region,
                ..
            } => {
                out.push(then_region);
                out.extend(else_region.as_ref());
            }
            OpKind::Scope { body, cleanup, .. } => {
                out.push(body);
                out.extend(cleanup.as_ref());
            }
            OpKind::Loop {
                cond, body, step, ..
            } => {
                out.extend(cond.as_ref());
                out.push(body);
                out.extend(step.as_ref());
            }
            OpKind::For { cond, body, step } => out.extend([cond, body, step]),
            OpKind::While { cond, body } => out.extend([cond, body]),
            OpKind::DoWhile { body, cond } => out.extend([body, cond]),
            OpKind::Await {
                ready,
                suspend,
                resume,
                ..
            } => out.extend([ready, suspend, resume]),
            OpKind::Global(global) => match &global.init {
                Some(GlobalInit::Ctor { ctor, dtor, .. }) => {
                    out.push(ctor);
                    out.extend(dtor.as_ref());
                }
                Some(GlobalInit::Dtor { dtor, .. }) => out.push(dtor),
                _ => {}
            },
            OpKind::Try {
                body,
                catches,
                cleanup,
            } => {
                out.push(body);
                for clause in catches.iter().flatten() {
                    out.push(&clause.region);
                }
                out.extend(cleanup.as_ref());
            }
            OpKind::Switch { body, .. } | OpKind::Case { body, .. } => out.push(body),
            OpKind::Ternary {
                true_region,
                false_region,
                ..
            } => out.extend([true_region, false_region]),
            _ => {}
        }
        out
    }

    /// Every `%value`, `^label` and `@symbol` use written in this
    /// operation's own syntax, excluding nested regions.
    pub fn references(&self) -> Vec<&SymbolRef> {
        fn vtl<'a>(out: &mut Vec<&'a SymbolRef>, list: &'a Option<ValueTypeList>) {
            if let Some(list) = list {
                out.extend(list.values.iter());
            }
        }
        fn succ<'a>(out: &mut Vec<&'a SymbolRef>, s: &'a Successor) {
            out.push(&s.label);
            if let Some(args) = &s.args {
                out.extend(args.values.iter());
            }
        }

        let mut out: Vec<&SymbolRef> = Vec::new();
        match &self.kind {
            OpKind::Func(func) => out.extend(func.traits.alias.as_ref()),
            OpKind::Call { callee, args, .. } => {
                out.push(callee);
                out.extend(args.iter());
            }
            OpKind::TryCall {
                callee,
                args,
                target,
                ..
            } => {
                if let TryCallTarget::ExceptionPointer(e) = target {
                    out.push(e);
                }
                out.push(callee);
                out.extend(args.iter());
                if let TryCallTarget::Successors { normal, unwind } = target {
                    out.extend([normal, unwind]);
                }
            }
            OpKind::Return { operands } | OpKind::Yield { operands } => vtl(&mut out, operands),
            OpKind::Alloca { count, .. } => out.extend(count.as_ref().map(|c| &c.value)),
            OpKind::Load { address, .. } => out.push(address),
            OpKind::Store { value, address, .. } => out.extend([value, address]),
            OpKind::Cast { value, .. } => out.push(value),
            OpKind::BinOp { lhs, rhs, .. } | OpKind::Cmp { lhs, rhs, .. } => {
                out.extend([lhs, rhs])
            }
            OpKind::Unary { operand, .. } => out.push(operand),
            OpKind::Br { dest } => succ(&mut out, dest),
            OpKind::BrCond {
                cond,
                then_dest,
                else_dest,
            } => {
                out.push(cond);
                succ(&mut out, then_dest);
                succ(&mut out, else_dest);
            }
            OpKind::If { cond, .. } | OpKind::Condition { cond } => out.push(cond),
            OpKind::GetGlobal { name, .. } => out.push(name),
            OpKind::PtrStride { base, stride, .. } => out.extend([base, stride]),
            OpKind::Throw { exception, .. } | OpKind::CatchParam { exception, .. } => {
                out.extend(exception.as_ref())
            }
            OpKind::StructElementAddr { base, .. } | OpKind::GetMember { base, .. } => {
                out.push(base)
            }
            OpKind::Switch { cond, .. } => out.push(&cond.value),
            OpKind::Ternary { cond, .. } => out.push(cond),
            OpKind::Select {
                cond,
                true_value,
                false_value,
                ..
            } => out.extend([cond, true_value, false_value]),
            OpKind::Copy { src, dst, .. } => match self.form {
                OpForm::Comma => out.extend([dst, src]),
                _ => out.extend([src, dst]),
            },
            OpKind::ObjSize { value, .. } | OpKind::DynCast { value, .. } => out.push(value),
            OpKind::Shift { lhs, rhs, .. } => out.extend([lhs, rhs]),
            OpKind::Clrsb(b)
            | OpKind::Ffs(b)
            | OpKind::Parity(b)
            | OpKind::Clz(b)
            | OpKind::Ctz(b)
            | OpKind::Popcount(b) => out.push(&b.value),
            OpKind::BlockAddress { func, .. } => out.push(func),
            OpKind::IndirectBr {
                address, targets, ..
            } => {
                out.push(address);
                out.extend(targets.iter());
            }
            OpKind::Memcpy { len, src, dst, .. } => out.extend([len, src, dst]),
            OpKind::Memchr {
                src, pattern, len, ..
            } => out.extend([src, pattern, len]),
            OpKind::Fabs { value, .. } | OpKind::StackRestore { value, .. } => out.push(value),
            OpKind::GetRuntimeMember { base, member, .. } => out.extend([base, &member.value]),
            OpKind::Const { .. }
            | OpKind::Scope { .. }
            | OpKind::Loop { .. }
            | OpKind::For { .. }
            | OpKind::While { .. }
            | OpKind::DoWhile { .. }
            | OpKind::Await { .. }
            | OpKind::Global(_)
            | OpKind::Try { .. }
            | OpKind::Resume
            | OpKind::Case { .. }
            | OpKind::Break
            | OpKind::Continue
            | OpKind::Unreachable
            | OpKind::Trap
            | OpKind::Label { .. }
            | OpKind::StackSave { .. } => {}
        }
        out
    }
}

// ============================================================================
// Module
// ============================================================================

/// `module [@name] [attributes {...}]` wrapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleHeader {
    pub name: Option<Lexeme>,
    pub attributes: Option<OpaqueAttribute>,
    pub span: Span,
}

/// A parsed source unit.
#[derive(Clone, Debug)]
pub struct Module {
    pub source_id: SourceId,
    pub header: Option<ModuleHeader>,
    /// Top-level `cir.func` and `cir.global` declarations.
    pub items: Vec<Operation>,
    pub symbols: SymbolTable,
}

impl Module {
    /// Form of every operation, nested ones included.
    pub fn forms(&self) -> BTreeMap<OpId, OpForm> {
        let mut forms = BTreeMap::new();
        let _ = self.walk(|op| {
            forms.insert(op.id, op.form);
            ControlFlow::<(), WalkAction>::Continue(WalkAction::Advance)
        });
        forms
    }

    pub fn find_op(&self, id: OpId) -> Option<&Operation> {
        self.walk(|op| {
            if op.id == id {
                ControlFlow::Break(op)
            } else {
                ControlFlow::Continue(WalkAction::Advance)
            }
        })
        .break_value()
    }
}
