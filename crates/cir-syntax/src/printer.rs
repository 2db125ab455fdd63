//! CIR text printer.
//!
//! Re-emits a parsed [`Module`] with every operation in the form it was
//! written in, so that `parse(print(parse(s)))` yields the same forms.
//! Types and attributes are printed from their opaque source text.
//! Keyword modifiers come out in a fixed order regardless of how the
//! source ordered them.
//!
//! # Example output
//!
//! ```text
//! cir.func @add(%a : !s32i, %b : !s32i) -> !s32i {
//!   %0 = cir.binop(add, %a, %b) : !s32i
//!   cir.return %0 : !s32i
//! }
//! ```

use std::fmt::{self, Write};

use crate::adapter::{OpaqueAttribute, OpaqueType};
use crate::ast::{
    AddressSpace, BitOperand, CallModifiers, CastShape, DynCastShape, FuncOp, FunctionTypeAnnotation,
    GlobalInit, GlobalOp, MemoryFlags, Module, ObjSizeShape, OpForm, OpKind, Operation,
    PtrStrideShape, Region, ShiftShape, Successor, TryCallTarget, TypeGroup, TypePair,
    ValueTypeList,
};
use crate::scope::SymbolRef;

// ============================================================================
// Printer State
// ============================================================================

/// Output buffer plus the current indentation (2-space steps).
pub struct PrintState {
    pub output: String,
    pub indent: usize,
}

impl PrintState {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    pub fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push(' ');
        }
    }

    fn push(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// ` text`
    fn word(&mut self, text: &str) {
        self.output.push(' ');
        self.output.push_str(text);
    }

    fn opt_attr(&mut self, attr: Option<&OpaqueAttribute>) {
        if let Some(attr) = attr {
            self.word(&attr.text);
        }
    }

    /// ` : t1, t2`
    fn annotation(&mut self, types: &[OpaqueType]) {
        self.push(" : ");
        self.push(&type_list(types));
    }

    fn opt_annotation(&mut self, types: Option<&[OpaqueType]>) {
        if let Some(types) = types {
            self.annotation(types);
        }
    }
}

impl Default for PrintState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Leaves
// ============================================================================

fn type_list(types: &[OpaqueType]) -> String {
    types
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn value_list(values: &[SymbolRef]) -> String {
    values
        .iter()
        .map(SymbolRef::spelled)
        .collect::<Vec<_>>()
        .join(", ")
}

fn type_group(group: &TypeGroup) -> String {
    if group.parenthesized {
        format!("({})", type_list(&group.types))
    } else {
        type_list(&group.types)
    }
}

/// `: inputs [-> results]`
fn signature(sig: &FunctionTypeAnnotation) -> String {
    match &sig.results {
        Some(results) => format!(": {} -> {}", type_group(&sig.inputs), type_group(results)),
        None => format!(": {}", type_group(&sig.inputs)),
    }
}

fn value_type_list(list: &ValueTypeList) -> String {
    format!("{} : {}", value_list(&list.values), type_list(&list.types))
}

fn successor(succ: &Successor) -> String {
    match &succ.args {
        Some(args) => format!("{}({})", succ.label.spelled(), value_type_list(args)),
        None => succ.label.spelled(),
    }
}

fn attr_list(values: &[OpaqueAttribute]) -> String {
    values
        .iter()
        .map(|a| a.text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Printing functions
// ============================================================================

fn print_top_level(state: &mut PrintState, module: &Module) -> fmt::Result {
    let Some(header) = &module.header else {
        for op in &module.items {
            print_operation(state, op)?;
            state.output.push('\n');
        }
        return Ok(());
    };
    state.push("module");
    if let Some(name) = &header.name {
        state.word(&name.text);
    }
    if let Some(attrs) = &header.attributes {
        state.word("attributes");
        state.word(&attrs.text);
    }
    state.push(" {\n");
    state.indent += 2;
    for op in &module.items {
        state.write_indent();
        print_operation(state, op)?;
        state.output.push('\n');
    }
    state.indent -= 2;
    state.push("}\n");
    Ok(())
}

/// Print a region with its blocks. Block labels sit at the operation's
/// indentation and operations one step deeper.
fn print_region(state: &mut PrintState, region: &Region) -> fmt::Result {
    state.push("{\n");
    for block in &region.blocks {
        if let Some(label) = &block.label {
            state.write_indent();
            state.push(&label.spelled());
            if !block.args.is_empty() {
                let args = block
                    .args
                    .iter()
                    .map(|arg| format!("{} : {}", arg.def.spelled(), arg.ty.text))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(state.output, "({args})")?;
            }
            state.push(":\n");
        }
        state.indent += 2;
        for op in &block.ops {
            state.write_indent();
            print_operation(state, op)?;
            state.output.push('\n');
        }
        state.indent -= 2;
    }
    state.write_indent();
    state.output.push('}');
    Ok(())
}

/// ` {...}`
fn print_nested(state: &mut PrintState, region: &Region) -> fmt::Result {
    state.output.push(' ');
    print_region(state, region)
}

/// ` name : {...}`
fn print_labeled(state: &mut PrintState, name: &str, region: &Region) -> fmt::Result {
    write!(state.output, "{name} : ")?;
    print_region(state, region)
}

fn print_operation(state: &mut PrintState, op: &Operation) -> fmt::Result {
    if !op.results.is_empty() {
        let names = op
            .results
            .iter()
            .map(|d| d.spelled())
            .collect::<Vec<_>>()
            .join(", ");
        write!(state.output, "{names} = ")?;
    }
    state.push(op.opcode().keyword());
    let attr = op.attribute.as_ref();

    match &op.kind {
        OpKind::Func(func) => print_func(state, func)?,
        OpKind::Global(global) => print_global(state, global, attr)?,

        OpKind::Call {
            callee,
            args,
            signature: sig,
            modifiers,
        } => {
            write!(state.output, " {}({}) {}", callee.spelled(), value_list(args), signature(sig))?;
            print_call_modifiers(state, modifiers);
        }
        OpKind::TryCall {
            callee,
            args,
            target,
            signature: sig,
            modifiers,
        } => {
            match target {
                TryCallTarget::ExceptionPointer(ptr) => write!(
                    state.output,
                    " exception({}) {}({})",
                    ptr.spelled(),
                    callee.spelled(),
                    value_list(args)
                )?,
                TryCallTarget::Successors { normal, unwind } => write!(
                    state.output,
                    " {}({}) {}, {}",
                    callee.spelled(),
                    value_list(args),
                    normal.spelled(),
                    unwind.spelled()
                )?,
            }
            state.word(&signature(sig));
            print_call_modifiers(state, modifiers);
        }
        OpKind::Return { operands } | OpKind::Yield { operands } => {
            state.opt_attr(attr);
            if let Some(operands) = operands {
                state.word(&value_type_list(operands));
            }
        }

        OpKind::Alloca {
            allocated,
            address,
            count,
            name,
            init,
            result,
        } => {
            write!(state.output, " {}, {}", allocated.text, address.text)?;
            if let Some(count) = count {
                write!(state.output, ", {} : {}", count.value.spelled(), count.ty.text)?;
            }
            state.output.push(',');
            if let Some(name) = name {
                match init {
                    Some(init) => write!(state.output, " [{}, {}]", name.text, init.text)?,
                    None => write!(state.output, " [{}]", name.text)?,
                }
            }
            state.opt_attr(attr);
            state.opt_annotation(result.as_deref());
        }
        OpKind::Load {
            flags,
            address,
            types,
        } => {
            print_memory_flags(state, flags);
            state.word(&address.spelled());
            state.opt_attr(attr);
            print_type_pair(state, types);
        }
        OpKind::Store {
            flags,
            value,
            address,
            types,
        } => {
            print_memory_flags(state, flags);
            write!(state.output, " {}, {}", value.spelled(), address.spelled())?;
            state.opt_attr(attr);
            print_type_pair(state, types);
        }
        OpKind::Const { value, result } => {
            if op.form == OpForm::ParenthesizedValue {
                write!(state.output, " ({})", value.text)?;
            } else {
                state.word(&value.text);
            }
            state.opt_attr(attr);
            state.annotation(result);
        }
        OpKind::Cast { kind, value, shape } => match shape {
            CastShape::Parenthesized { source, result } => {
                write!(
                    state.output,
                    "({}, {} : {})",
                    kind.text,
                    value.spelled(),
                    source.text
                )?;
                state.opt_attr(attr);
                write!(state.output, ", {}", result.text)?;
            }
            CastShape::Bare { signature: sig } => {
                write!(state.output, " {} {}", kind.text, value.spelled())?;
                state.opt_attr(attr);
                if let Some(sig) = sig {
                    state.word(&signature(sig));
                }
            }
        },
        OpKind::PtrStride {
            base,
            stride,
            shape,
        } => match shape {
            PtrStrideShape::Parenthesized {
                base_type,
                stride_type,
                result,
            } => {
                write!(
                    state.output,
                    "({} : {}, {} : {})",
                    base.spelled(),
                    base_type.text,
                    stride.spelled(),
                    stride_type.text
                )?;
                state.opt_attr(attr);
                write!(state.output, ", {}", result.text)?;
            }
            PtrStrideShape::Bare { signature: sig } => {
                write!(state.output, " {}, {}", base.spelled(), stride.spelled())?;
                if let Some(sig) = sig {
                    state.word(&signature(sig));
                }
            }
        },
        OpKind::StructElementAddr {
            base,
            index,
            result,
        } => {
            write!(state.output, " {}, {}", base.spelled(), index.text)?;
            state.opt_attr(attr);
            state.annotation(result);
        }
        OpKind::GetMember {
            base,
            index,
            result,
        } => {
            write!(state.output, " {}[{}]", base.spelled(), index.text)?;
            state.opt_attr(attr);
            state.annotation(result);
        }
        OpKind::Copy { src, dst, result } => {
            if op.form == OpForm::To {
                write!(state.output, " {} to {}", src.spelled(), dst.spelled())?;
            } else {
                write!(state.output, " {}, {}", dst.spelled(), src.spelled())?;
                state.opt_attr(attr);
            }
            state.opt_annotation(result.as_deref());
        }
        OpKind::Memcpy {
            len,
            src,
            dst,
            signature: sig,
        } => write!(
            state.output,
            " {} bytes from {} to {} {}",
            len.spelled(),
            src.spelled(),
            dst.spelled(),
            signature(sig)
        )?,
        OpKind::Memchr {
            src,
            pattern,
            len,
            signature: sig,
        } => {
            let operands = format!("{}, {}, {}", src.spelled(), pattern.spelled(), len.spelled());
            match sig {
                Some(sig) => write!(state.output, " {operands} {}", signature(sig))?,
                None => write!(state.output, "({operands})")?,
            }
        }
        OpKind::StackSave { result } => state.annotation(result),
        OpKind::StackRestore { value, result } | OpKind::Fabs { value, result } => {
            state.word(&value.spelled());
            state.annotation(result);
        }
        OpKind::GetRuntimeMember {
            base,
            member,
            signature: sig,
        } => write!(
            state.output,
            " {}[{} : {}] {}",
            base.spelled(),
            member.value.spelled(),
            member.ty.text,
            signature(sig)
        )?,

        OpKind::BinOp {
            kind,
            lhs,
            rhs,
            result,
        }
        | OpKind::Cmp {
            predicate: kind,
            lhs,
            rhs,
            result,
        } => {
            write!(
                state.output,
                "({}, {}, {})",
                kind.text,
                lhs.spelled(),
                rhs.spelled()
            )?;
            state.opt_attr(attr);
            state.annotation(result);
        }
        OpKind::Unary {
            kind,
            operand,
            result,
        } => {
            write!(state.output, "({}, {})", kind.text, operand.spelled())?;
            state.opt_attr(attr);
            state.annotation(result);
        }
        OpKind::Select {
            cond,
            true_value,
            false_value,
            result,
        } => {
            write!(
                state.output,
                " {}, {}, {}",
                cond.spelled(),
                true_value.spelled(),
                false_value.spelled()
            )?;
            state.opt_attr(attr);
            state.annotation(result);
        }
        OpKind::Shift {
            direction,
            lhs,
            rhs,
            shape,
        } => match shape {
            ShiftShape::Parenthesized {
                lhs_type,
                rhs_type,
                result,
            } => {
                write!(
                    state.output,
                    "({}, {} : {}, {} : {})",
                    direction.text,
                    lhs.spelled(),
                    lhs_type.text,
                    rhs.spelled(),
                    rhs_type.text
                )?;
                state.opt_attr(attr);
                write!(state.output, " -> {}", type_group(result))?;
            }
            ShiftShape::Bare { signature: sig } => {
                write!(
                    state.output,
                    " {} {}, {}",
                    direction.text,
                    lhs.spelled(),
                    rhs.spelled()
                )?;
                state.opt_attr(attr);
                state.word(&signature(sig));
            }
        },
        OpKind::ObjSize { kind, value, shape } => match shape {
            ObjSizeShape::Bare { signature: sig } => {
                write!(state.output, " {} {}", kind.text, value.spelled())?;
                state.opt_attr(attr);
                state.word(&signature(sig));
            }
            ObjSizeShape::Parenthesized { value_type, result } => {
                write!(
                    state.output,
                    "({}, {} : {})",
                    kind.text,
                    value.spelled(),
                    value_type.text
                )?;
                state.opt_attr(attr);
                write!(state.output, " -> {}", type_group(result))?;
            }
        },
        OpKind::Clrsb(operand)
        | OpKind::Ffs(operand)
        | OpKind::Parity(operand)
        | OpKind::Clz(operand)
        | OpKind::Ctz(operand)
        | OpKind::Popcount(operand) => print_bit_operand(state, operand, attr),
        OpKind::DynCast {
            kind,
            relative_layout,
            value,
            shape,
            info,
        } => {
            let kind = if *relative_layout {
                format!("{} relative_layout", kind.text)
            } else {
                kind.text.clone()
            };
            match shape {
                DynCastShape::Bare { signature: sig } => {
                    write!(state.output, " {kind} {} {}", value.spelled(), signature(sig))?;
                    state.opt_attr(info.as_ref());
                }
                DynCastShape::Parenthesized { value_type, result } => {
                    write!(
                        state.output,
                        "({kind}, {} : {}",
                        value.spelled(),
                        value_type.text
                    )?;
                    if let Some(info) = info {
                        write!(state.output, ", {}", info.text)?;
                    }
                    write!(state.output, ") -> {}", type_group(result))?;
                }
            }
        }

        OpKind::Br { dest } => {
            state.word(&successor(dest));
            state.opt_attr(attr);
        }
        OpKind::BrCond {
            cond,
            then_dest,
            else_dest,
        } => {
            write!(
                state.output,
                " {} {}, {}",
                cond.spelled(),
                successor(then_dest),
                successor(else_dest)
            )?;
            state.opt_attr(attr);
        }
        OpKind::If {
            cond,
            then_region,
            else_region,
            result,
        } => {
            state.word(&cond.spelled());
            print_nested(state, then_region)?;
            if let Some(else_region) = else_region {
                state.push(" else");
                print_nested(state, else_region)?;
            }
            state.opt_attr(attr);
            state.opt_annotation(result.as_deref());
        }
        OpKind::Scope {
            body,
            cleanup,
            result,
        } => {
            print_nested(state, body)?;
            if let Some(cleanup) = cleanup {
                state.push(" cleanup");
                print_nested(state, cleanup)?;
            }
            state.opt_attr(attr);
            state.opt_annotation(result.as_deref());
        }
        OpKind::Loop {
            kind,
            cond,
            body,
            step,
            result,
        } => {
            write!(state.output, " {}(", kind.text)?;
            if let Some(cond) = cond {
                print_labeled(state, "cond", cond)?;
                state.push(", ");
            }
            print_labeled(state, "body", body)?;
            if let Some(step) = step {
                state.push(", ");
                print_labeled(state, "step", step)?;
            }
            state.output.push(')');
            state.opt_attr(attr);
            state.opt_annotation(result.as_deref());
        }
        OpKind::For { cond, body, step } => {
            state.push(" : cond");
            print_nested(state, cond)?;
            state.push(" body");
            print_nested(state, body)?;
            state.push(" step");
            print_nested(state, step)?;
            state.opt_attr(attr);
        }
        OpKind::While { cond, body } => {
            if op.form == OpForm::Labeled {
                state.push(" : cond");
                print_nested(state, cond)?;
                state.push(" body");
            } else {
                print_nested(state, cond)?;
                state.push(" do");
            }
            print_nested(state, body)?;
            state.opt_attr(attr);
        }
        OpKind::DoWhile { body, cond } => {
            if op.form == OpForm::Labeled {
                state.push(" : body");
                print_nested(state, body)?;
                state.push(" cond");
            } else {
                print_nested(state, body)?;
                state.push(" while");
            }
            print_nested(state, cond)?;
            state.opt_attr(attr);
        }
        OpKind::Condition { cond } => {
            write!(state.output, "({})", cond.spelled())?;
            state.opt_attr(attr);
        }
        OpKind::Await {
            kind,
            ready,
            suspend,
            resume,
        } => {
            write!(state.output, "({}, ", kind.text)?;
            print_labeled(state, "ready", ready)?;
            state.push(", ");
            print_labeled(state, "suspend", suspend)?;
            state.push(", ");
            print_labeled(state, "resume", resume)?;
            state.push(",)");
            state.opt_attr(attr);
        }
        OpKind::Switch { cond, body } => {
            write!(state.output, " ({} : {})", cond.value.spelled(), cond.ty.text)?;
            print_nested(state, body)?;
            state.opt_attr(attr);
        }
        OpKind::Case { kind, values, body } => {
            write!(state.output, " ({}, [{}])", kind.text, attr_list(values))?;
            print_nested(state, body)?;
        }
        OpKind::Ternary {
            cond,
            true_region,
            false_region,
            signature: sig,
        } => {
            write!(state.output, "({}, true ", cond.spelled())?;
            print_region(state, true_region)?;
            state.push(", false ");
            print_region(state, false_region)?;
            state.output.push(')');
            state.opt_attr(attr);
            state.word(&signature(sig));
        }
        OpKind::Break | OpKind::Continue | OpKind::Unreachable | OpKind::Trap | OpKind::Resume => {
            state.opt_attr(attr);
        }
        OpKind::BlockAddress {
            func,
            label,
            result,
        } => write!(
            state.output,
            " <{}, {}> -> {}",
            func.spelled(),
            label.text,
            type_group(result)
        )?,
        OpKind::IndirectBr {
            address,
            address_type,
            targets,
        } => {
            write!(
                state.output,
                " {} : <{}>, [{}]",
                address.spelled(),
                address_type.text,
                value_list(targets)
            )?;
            state.opt_attr(attr);
        }
        OpKind::Label { name } => {
            state.word(&name.text);
            state.opt_attr(attr);
        }

        OpKind::Try {
            body,
            catches,
            cleanup,
        } => {
            print_nested(state, body)?;
            if let Some(catches) = catches {
                state.push(" catch [");
                for (i, clause) in catches.iter().enumerate() {
                    if i > 0 {
                        state.output.push(' ');
                    }
                    if clause.typed {
                        state.push("type ");
                    }
                    state.push(&clause.attribute.text);
                    print_nested(state, &clause.region)?;
                    if clause.trailing_comma {
                        state.output.push(',');
                    }
                }
                state.output.push(']');
            }
            if let Some(cleanup) = cleanup {
                state.push(" cleanup");
                print_nested(state, cleanup)?;
            }
            state.opt_attr(attr);
        }
        OpKind::Throw { exception, result } => {
            if let Some(exception) = exception {
                state.word(&exception.spelled());
            }
            state.opt_attr(attr);
            state.opt_annotation(result.as_deref());
        }
        OpKind::CatchParam { exception, result } => {
            if let Some(exception) = exception {
                state.word(&exception.spelled());
            }
            write!(state.output, " -> {}", type_group(result))?;
        }
        OpKind::GetGlobal {
            thread_local,
            name,
            result,
        } => {
            if *thread_local {
                state.word("thread_local");
            }
            state.word(&name.spelled());
            state.opt_attr(attr);
            state.annotation(result);
        }
    }
    Ok(())
}

fn print_func(state: &mut PrintState, func: &FuncOp) -> fmt::Result {
    let mods = &func.modifiers;
    for (set, word) in [
        (mods.no_inline, "no_inline"),
        (mods.optnone, "optnone"),
        (mods.dso_local, "dso_local"),
        (mods.comdat, "comdat"),
        (mods.coroutine, "coroutine"),
    ] {
        if set {
            state.word(word);
        }
    }
    if let Some(linkage) = mods.linkage {
        state.word(linkage.keyword());
    }
    state.word(&func.name.spelled());

    let mut args: Vec<String> = func
        .args
        .iter()
        .map(|arg| {
            let mut text = match &arg.name {
                Some(name) => format!("{} : {}", name.spelled(), arg.ty.text),
                None => arg.ty.text.clone(),
            };
            if let Some(attrs) = &arg.attributes {
                text.push(' ');
                text.push_str(&attrs.text);
            }
            text
        })
        .collect();
    if func.variadic {
        args.push("...".to_owned());
    }
    write!(state.output, "({})", args.join(", "))?;
    if let Some(result) = &func.result {
        write!(state.output, " -> {}", type_group(result))?;
    }

    let traits = &func.traits;
    if let Some(cc) = &traits.calling_conv {
        write!(state.output, " cc({})", cc.text)?;
    }
    if let Some(alias) = &traits.alias {
        write!(state.output, " alias({})", alias.spelled())?;
    }
    for (word, priority) in [
        ("global_ctor", &traits.global_ctor),
        ("global_dtor", &traits.global_dtor),
    ] {
        match priority {
            Some(Some(priority)) => write!(state.output, " {word}({})", priority.text)?,
            Some(None) => state.word(word),
            None => {}
        }
    }
    if let Some(member) = &traits.special_member {
        write!(state.output, " special_member<{}>", member.text)?;
    }
    if let Some(annotations) = &func.annotations {
        write!(state.output, " [{}]", attr_list(annotations))?;
    }
    if let Some(attrs) = &func.attributes {
        write!(state.output, " attributes {}", attrs.text)?;
    }
    if let Some(body) = &func.body {
        print_nested(state, body)?;
    }
    Ok(())
}

fn print_global(
    state: &mut PrintState,
    global: &GlobalOp,
    attr: Option<&OpaqueAttribute>,
) -> fmt::Result {
    if let Some(visibility) = &global.visibility {
        state.word(&visibility.text);
    }
    let mods = &global.modifiers;
    if let Some(linkage) = mods.linkage {
        state.word(linkage.keyword());
    }
    if mods.constant {
        state.word("constant");
    }
    if mods.comdat {
        state.word("comdat");
    }
    if let Some(tls) = mods.tls {
        state.word(tls.keyword());
    }
    match &mods.address_space {
        Some(AddressSpace::Lang(id)) => write!(state.output, " lang_address_space({})", id.text)?,
        Some(AddressSpace::Target(n)) => {
            write!(state.output, " target_address_space({})", n.text)?
        }
        None => {}
    }
    state.word(&global.name.spelled());
    match &global.init {
        Some(GlobalInit::Ctor { ty, ctor, dtor }) => {
            write!(state.output, " = ctor : {}", ty.text)?;
            print_nested(state, ctor)?;
            if let Some(dtor) = dtor {
                state.push(" dtor");
                print_nested(state, dtor)?;
            }
        }
        Some(GlobalInit::Dtor { ty, dtor }) => {
            write!(state.output, " = dtor : {}", ty.text)?;
            print_nested(state, dtor)?;
        }
        Some(GlobalInit::Attribute(value)) => write!(state.output, " = {}", value.text)?,
        None => {}
    }
    state.opt_annotation(global.result.as_deref());
    if let Some(annotations) = &global.annotations {
        write!(state.output, " [{}]", attr_list(annotations))?;
    }
    state.opt_attr(attr);
    Ok(())
}

fn print_call_modifiers(state: &mut PrintState, mods: &CallModifiers) {
    if let Some(cc) = &mods.calling_conv {
        state.word(&format!("cc({})", cc.text));
    }
    if let Some(extra) = &mods.extra {
        state.word(&format!("extra({})", extra.text));
    }
    if let Some(effect) = &mods.side_effect {
        state.word(&format!("side_effect({})", effect.text));
    }
}

fn print_memory_flags(state: &mut PrintState, flags: &MemoryFlags) {
    if flags.volatile {
        state.word("volatile");
    }
    if let Some(align) = &flags.alignment {
        state.word(&format!("align({})", align.text));
    }
    if let Some(order) = &flags.atomic {
        state.word(&format!("atomic({})", order.text));
    }
}

fn print_type_pair(state: &mut PrintState, types: &TypePair) {
    match types {
        TypePair::Single(ty) => state.annotation(std::slice::from_ref(ty)),
        TypePair::Dual(first, second) => {
            state.push(" : ");
            state.push(&first.text);
            state.push(", ");
            state.push(&second.text);
        }
    }
}

fn print_bit_operand(state: &mut PrintState, operand: &BitOperand, attr: Option<&OpaqueAttribute>) {
    state.word(&operand.value.spelled());
    if operand.zero_poison {
        state.word("zero_poison");
    }
    state.opt_attr(attr);
    state.annotation(&operand.result);
}

// ============================================================================
// Public API
// ============================================================================

/// Print a parsed source unit back to CIR text.
pub fn print_module(module: &Module) -> String {
    let mut state = PrintState::new();
    // Writing into a `String` never fails.
    let _ = print_top_level(&mut state, module);
    state.finish()
}

/// Print a single operation, nested regions included.
pub fn print_op(op: &Operation) -> String {
    let mut state = PrintState::new();
    let _ = print_operation(&mut state, op);
    state.finish()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;

    fn reprint(src: &str) -> String {
        let parsed = parse_source(src);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        print_module(&parsed.module)
    }

    #[test]
    fn test_print_simple_function() {
        let text = reprint(
            "cir.func @add(%a : !s32i, %b : !s32i) -> !s32i {\n%0 = cir.binop(add, %a, %b) : !s32i\ncir.return %0 : !s32i }",
        );
        insta::assert_snapshot!(text, @r"
        cir.func @add(%a : !s32i, %b : !s32i) -> !s32i {
          %0 = cir.binop(add, %a, %b) : !s32i
          cir.return %0 : !s32i
        }
        ");
    }

    #[test]
    fn test_print_blocks_and_module_header() {
        let text = reprint(
            "module @m {\ncir.func @f(%c : !cir.bool) {\ncir.brcond %c ^a, ^b(%c : !cir.bool)\n^a:\ncir.return\n^b(%x : !cir.bool):\ncir.return\n}\n}",
        );
        insta::assert_snapshot!(text, @r"
        module @m {
          cir.func @f(%c : !cir.bool) {
            cir.brcond %c ^a, ^b(%c : !cir.bool)
          ^a:
            cir.return
          ^b(%x : !cir.bool):
            cir.return
          }
        }
        ");
    }

    #[test]
    fn test_print_keeps_recorded_forms() {
        let text = reprint(
            "cir.func @f(%p : !cir.ptr<!s32i>, %v : !s32i) {\n%0 = cir.cast(integral, %v : !s32i), !s64i\n%1 = cir.cast integral %v : !s32i -> !s64i\ncir.copy %p to %p : !cir.ptr<!s32i>\ncir.while {\ncir.condition(%v)\n} do {\ncir.yield\n}\ncir.return\n}",
        );
        insta::assert_snapshot!(text, @r"
        cir.func @f(%p : !cir.ptr<!s32i>, %v : !s32i) {
          %0 = cir.cast(integral, %v : !s32i), !s64i
          %1 = cir.cast integral %v : !s32i -> !s64i
          cir.copy %p to %p : !cir.ptr<!s32i>
          cir.while {
            cir.condition(%v)
          } do {
            cir.yield
          }
          cir.return
        }
        ");
    }

    #[test]
    fn test_modifiers_print_in_fixed_order() {
        let text = reprint("cir.global comdat internal constant @g = #cir.int<0> : !s32i");
        insta::assert_snapshot!(text, @"cir.global internal constant comdat @g = #cir.int<0> : !s32i");
    }
}
