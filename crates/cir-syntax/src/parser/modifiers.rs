//! Order-independent modifier keywords.
//!
//! `cir.func`, `cir.call`, `cir.load`, `cir.store` and `cir.global` all take
//! a run of keyword modifiers in any order. They share [`Parser::modifiers`],
//! driven by a static table per site. Every entry belongs to a slot; a slot
//! may be filled once, so `private weak` is rejected just like
//! `volatile volatile`.

use crate::adapter::OpaqueAttribute;
use crate::ast::{
    AddressSpace, CallModifiers, FuncModifiers, FuncTraits, GlobalModifiers, Lexeme, Linkage,
    MemoryFlags, TlsModel,
};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::location::Span;
use crate::scope::SymbolRef;
use crate::token::{Punct, TokenKind};

use super::{PResult, Parser};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Arg {
    None,
    Ident,
    Integer,
    Symbol,
    Attribute,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ModifierSpec {
    slot: &'static str,
    keyword: &'static str,
    arg: Arg,
    /// Argument in `<...>` rather than `(...)`.
    angled: bool,
    arg_optional: bool,
}

const fn flag(keyword: &'static str) -> ModifierSpec {
    ModifierSpec {
        slot: keyword,
        keyword,
        arg: Arg::None,
        angled: false,
        arg_optional: false,
    }
}

const fn one_of(slot: &'static str, keyword: &'static str) -> ModifierSpec {
    ModifierSpec {
        slot,
        ..flag(keyword)
    }
}

const fn with_arg(keyword: &'static str, arg: Arg) -> ModifierSpec {
    ModifierSpec {
        arg,
        ..flag(keyword)
    }
}

pub(crate) const FUNC_PREFIX: &[ModifierSpec] = &[
    flag("no_inline"),
    flag("optnone"),
    flag("dso_local"),
    flag("comdat"),
    flag("coroutine"),
    one_of("linkage", "linkonce_odr"),
    one_of("linkage", "private"),
    one_of("linkage", "internal"),
    one_of("linkage", "external"),
    one_of("linkage", "weak"),
];

pub(crate) const FUNC_SUFFIX: &[ModifierSpec] = &[
    with_arg("cc", Arg::Ident),
    with_arg("alias", Arg::Symbol),
    ModifierSpec {
        arg_optional: true,
        ..with_arg("global_ctor", Arg::Integer)
    },
    ModifierSpec {
        arg_optional: true,
        ..with_arg("global_dtor", Arg::Integer)
    },
    ModifierSpec {
        angled: true,
        ..with_arg("special_member", Arg::Attribute)
    },
];

pub(crate) const CALL_SUFFIX: &[ModifierSpec] = &[
    with_arg("cc", Arg::Ident),
    with_arg("extra", Arg::Attribute),
    with_arg("side_effect", Arg::Ident),
];

pub(crate) const TRY_CALL_SUFFIX: &[ModifierSpec] = &[
    with_arg("cc", Arg::Ident),
    with_arg("extra", Arg::Attribute),
];

pub(crate) const MEMORY: &[ModifierSpec] = &[
    flag("volatile"),
    with_arg("align", Arg::Integer),
    with_arg("atomic", Arg::Ident),
];

pub(crate) const GLOBAL: &[ModifierSpec] = &[
    one_of("linkage", "external"),
    one_of("linkage", "internal"),
    one_of("linkage", "private"),
    one_of("linkage", "weak"),
    flag("constant"),
    flag("comdat"),
    one_of("tls", "tls_dyn"),
    one_of("tls", "tls_local_dyn"),
    one_of("tls", "tls_init_exec"),
    one_of("tls", "tls_local_exec"),
    ModifierSpec {
        slot: "address space",
        ..with_arg("lang_address_space", Arg::Ident)
    },
    ModifierSpec {
        slot: "address space",
        ..with_arg("target_address_space", Arg::Integer)
    },
];

#[derive(Clone, Debug)]
enum ArgValue {
    Lexeme(Lexeme),
    Symbol(SymbolRef),
    Attribute(OpaqueAttribute),
}

#[derive(Clone, Debug)]
struct Modifier {
    spec: ModifierSpec,
    arg: Option<ArgValue>,
}

/// Modifiers read by one [`Parser::modifiers`] call, in source order.
#[derive(Debug, Default)]
pub(crate) struct ModifierSet {
    items: Vec<Modifier>,
}

impl ModifierSet {
    fn get(&self, keyword: &str) -> Option<&Modifier> {
        self.items.iter().find(|m| m.spec.keyword == keyword)
    }

    fn has(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    fn in_slot(&self, slot: &str) -> Option<&Modifier> {
        self.items.iter().find(|m| m.spec.slot == slot)
    }

    fn lexeme(&self, keyword: &str) -> Option<Lexeme> {
        match self.get(keyword)?.arg.as_ref()? {
            ArgValue::Lexeme(l) => Some(l.clone()),
            _ => None,
        }
    }

    /// `Some(arg)` when the keyword is present, with its optional argument.
    fn optional_lexeme(&self, keyword: &str) -> Option<Option<Lexeme>> {
        self.get(keyword).map(|_| self.lexeme(keyword))
    }

    fn symbol(&self, keyword: &str) -> Option<SymbolRef> {
        match self.get(keyword)?.arg.as_ref()? {
            ArgValue::Symbol(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn attribute(&self, keyword: &str) -> Option<OpaqueAttribute> {
        match self.get(keyword)?.arg.as_ref()? {
            ArgValue::Attribute(a) => Some(a.clone()),
            _ => None,
        }
    }

    fn slot_keyword(&self, slot: &str) -> Option<&'static str> {
        self.in_slot(slot).map(|m| m.spec.keyword)
    }

    pub(crate) fn into_func_modifiers(self) -> FuncModifiers {
        FuncModifiers {
            no_inline: self.has("no_inline"),
            optnone: self.has("optnone"),
            dso_local: self.has("dso_local"),
            comdat: self.has("comdat"),
            coroutine: self.has("coroutine"),
            linkage: self.slot_keyword("linkage").and_then(Linkage::from_keyword),
        }
    }

    pub(crate) fn into_func_traits(self) -> FuncTraits {
        FuncTraits {
            calling_conv: self.lexeme("cc"),
            alias: self.symbol("alias"),
            global_ctor: self.optional_lexeme("global_ctor"),
            global_dtor: self.optional_lexeme("global_dtor"),
            special_member: self.attribute("special_member"),
        }
    }

    pub(crate) fn into_call_modifiers(self) -> CallModifiers {
        CallModifiers {
            calling_conv: self.lexeme("cc"),
            extra: self.attribute("extra"),
            side_effect: self.lexeme("side_effect"),
        }
    }

    pub(crate) fn into_memory_flags(self) -> MemoryFlags {
        MemoryFlags {
            volatile: self.has("volatile"),
            alignment: self.lexeme("align"),
            atomic: self.lexeme("atomic"),
        }
    }

    pub(crate) fn into_global_modifiers(self) -> GlobalModifiers {
        let address_space = if let Some(id) = self.lexeme("lang_address_space") {
            Some(AddressSpace::Lang(id))
        } else {
            self.lexeme("target_address_space").map(AddressSpace::Target)
        };
        GlobalModifiers {
            linkage: self.slot_keyword("linkage").and_then(Linkage::from_keyword),
            constant: self.has("constant"),
            comdat: self.has("comdat"),
            tls: self.slot_keyword("tls").and_then(TlsModel::from_keyword),
            address_space,
        }
    }
}

impl Parser<'_, '_, '_> {
    /// Read modifiers from `specs` until a token that is not one of them.
    /// A modifier whose slot is already filled is reported and dropped.
    pub(crate) fn modifiers(&mut self, specs: &[ModifierSpec]) -> PResult<ModifierSet> {
        let mut set = ModifierSet::default();
        loop {
            let tok = *self.peek();
            if tok.kind != TokenKind::Ident {
                break;
            }
            let Some(spec) = specs.iter().find(|s| s.keyword == tok.text) else {
                break;
            };
            let start = self.pos;
            self.bump();
            let arg = self.modifier_arg(spec)?;
            let span = self.span_since(start);
            if let Some(previous) = set.in_slot(spec.slot) {
                self.duplicate_modifier(spec, previous.spec.keyword, span);
                continue;
            }
            set.items.push(Modifier { spec: *spec, arg });
        }
        Ok(set)
    }

    fn modifier_arg(&mut self, spec: &ModifierSpec) -> PResult<Option<ArgValue>> {
        if spec.arg == Arg::None {
            return Ok(None);
        }
        let (open, close) = if spec.angled {
            (Punct::Less, Punct::Greater)
        } else {
            (Punct::LParen, Punct::RParen)
        };
        if spec.arg_optional && !self.at(open) {
            return Ok(None);
        }
        self.expect(open)?;
        let value = match spec.arg {
            Arg::Ident => ArgValue::Lexeme(self.ident("an identifier")?),
            Arg::Integer => ArgValue::Lexeme(self.integer()?),
            Arg::Symbol => ArgValue::Symbol(self.symbol_use()?),
            Arg::Attribute => ArgValue::Attribute(self.alias_or_dialect_attr()?),
            Arg::None => return Ok(None),
        };
        self.expect(close)?;
        Ok(Some(value))
    }

    fn duplicate_modifier(&mut self, spec: &ModifierSpec, previous: &str, span: Span) {
        let expected = if spec.slot == spec.keyword {
            format!("`{}` at most once", spec.keyword)
        } else {
            format!("a single {} modifier (already `{previous}`)", spec.slot)
        };
        self.report(
            Diagnostic::error(
                DiagnosticKind::MalformedOperation {
                    construct: format!("{} modifiers", self.construct),
                    expected,
                    found: format!("`{}`", spec.keyword),
                },
                span,
            )
            .with_fix(span),
        );
    }
}
