//! Symbol scope tracking for `%value`, `^label` and `@symbol` names.
//!
//! Scopes nest with regions. A `%value` use resolves against its own scope
//! and then every enclosing one; a `^label` use resolves only within its
//! own region; `@symbol` uses resolve against a flat module namespace.
//! Forward references are legal everywhere, so uses are kept pending and
//! only judged once the scope that could define them has closed.

use std::collections::HashMap;

use crate::diagnostic::{Diagnostic, DiagnosticKind, UnresolvedReason};
use crate::location::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The module scope every region scope descends from.
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Namespace a name lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefKind {
    Value,
    Label,
    Symbol,
}

impl RefKind {
    pub fn sigil(self) -> char {
        match self {
            RefKind::Value => '%',
            RefKind::Label => '^',
            RefKind::Symbol => '@',
        }
    }
}

fn spell(kind: RefKind, name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '-'));
    if plain || kind != RefKind::Symbol {
        format!("{}{}", kind.sigil(), name)
    } else {
        format!("{}{:?}", kind.sigil(), name)
    }
}

/// A use of a name. Never owns its target; see [`SymbolTable::resolve`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolRef {
    pub kind: RefKind,
    pub name: String,
    pub span: Span,
    /// Scope the use appeared in.
    pub scope: ScopeId,
}

impl SymbolRef {
    /// Source spelling, sigil included.
    pub fn spelled(&self) -> String {
        spell(self.kind, &self.name)
    }
}

/// A defining occurrence of a name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Definition {
    pub kind: RefKind,
    pub name: String,
    pub span: Span,
    pub scope: ScopeId,
}

impl Definition {
    pub fn spelled(&self) -> String {
        spell(self.kind, &self.name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub values: HashMap<String, Definition>,
    pub labels: HashMap<String, Definition>,
}

/// Frozen result of scope tracking, returned with the AST.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    globals: HashMap<String, Definition>,
}

impl SymbolTable {
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn globals(&self) -> &HashMap<String, Definition> {
        &self.globals
    }

    /// Scope chain from `id` outwards, `id` first.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), |s| self.scopes[s.index()].parent)
    }

    /// The definition a reference points to, if any.
    pub fn resolve(&self, r: &SymbolRef) -> Option<&Definition> {
        match r.kind {
            RefKind::Value => self
                .ancestors(r.scope)
                .find_map(|s| self.scopes[s.index()].values.get(&r.name)),
            RefKind::Label => self.scopes[r.scope.index()].labels.get(&r.name),
            RefKind::Symbol => self.globals.get(&r.name),
        }
    }

    fn label_in_ancestors(&self, id: ScopeId, name: &str) -> Option<&Definition> {
        self.ancestors(id)
            .skip(1)
            .find_map(|s| self.scopes[s.index()].labels.get(name))
    }
}

/// Mutable tracker owned by one parse.
pub(crate) struct ScopeTracker {
    table: SymbolTable,
    stack: Vec<ScopeId>,
    /// Unjudged uses, one list per open scope.
    pending: Vec<Vec<SymbolRef>>,
    symbol_uses: Vec<SymbolRef>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self {
            table: SymbolTable {
                scopes: vec![Scope::default()],
                globals: HashMap::new(),
            },
            stack: vec![ScopeId::ROOT],
            pending: vec![Vec::new()],
            symbol_uses: Vec::new(),
        }
    }

    pub fn current(&self) -> ScopeId {
        *self.stack.last().unwrap_or(&ScopeId::ROOT)
    }

    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn push_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.table.scopes.len() as u32);
        self.table.scopes.push(Scope {
            parent: Some(self.current()),
            ..Scope::default()
        });
        self.stack.push(id);
        self.pending.push(Vec::new());
        id
    }

    /// Close the innermost scope. Label uses are judged here; value uses
    /// not satisfied locally move to the enclosing scope.
    pub fn pop_scope(&mut self) -> Vec<Diagnostic> {
        if self.stack.len() <= 1 {
            return Vec::new();
        }
        let id = self.stack.pop().unwrap_or(ScopeId::ROOT);
        let uses = self.pending.pop().unwrap_or_default();
        let mut diagnostics = Vec::new();
        let scope = &self.table.scopes[id.index()];
        let mut bubbled = Vec::new();
        for r in uses {
            match r.kind {
                RefKind::Value => {
                    if !scope.values.contains_key(&r.name) {
                        bubbled.push(r);
                    }
                }
                RefKind::Label => {
                    if scope.labels.contains_key(&r.name) {
                        continue;
                    }
                    let reason = if self.table.label_in_ancestors(id, &r.name).is_some() {
                        UnresolvedReason::CrossRegionLabel
                    } else {
                        UnresolvedReason::NotDefined
                    };
                    diagnostics.push(unresolved(&r, reason));
                }
                RefKind::Symbol => {}
            }
        }
        if let Some(parent) = self.pending.last_mut() {
            parent.extend(bubbled);
        }
        tracing::trace!(scope = id.index(), unresolved = diagnostics.len(), "scope closed");
        diagnostics
    }

    pub fn define_value(&mut self, name: &str, span: Span) -> Result<Definition, Diagnostic> {
        let scope = self.current();
        let def = Definition {
            kind: RefKind::Value,
            name: name.to_owned(),
            span,
            scope,
        };
        let values = &mut self.table.scopes[scope.index()].values;
        if let Some(previous) = values.get(name) {
            return Err(duplicate(&def, previous.span));
        }
        values.insert(name.to_owned(), def.clone());
        Ok(def)
    }

    /// Labels may not repeat within a region, nor share a name with a label
    /// of an enclosing or nested region, whichever comes first.
    pub fn define_label(&mut self, name: &str, span: Span) -> Result<Definition, Diagnostic> {
        let scope = self.current();
        let def = Definition {
            kind: RefKind::Label,
            name: name.to_owned(),
            span,
            scope,
        };
        // Every scope created after the innermost open one is nested in it.
        let previous = self.table.scopes[scope.index()]
            .labels
            .get(name)
            .or_else(|| self.table.label_in_ancestors(scope, name))
            .or_else(|| {
                self.table.scopes[scope.index() + 1..]
                    .iter()
                    .find_map(|s| s.labels.get(name))
            })
            .map(|d| d.span);
        if let Some(previous) = previous {
            return Err(duplicate(&def, previous));
        }
        self.table.scopes[scope.index()]
            .labels
            .insert(name.to_owned(), def.clone());
        Ok(def)
    }

    pub fn define_symbol(&mut self, name: &str, span: Span) -> Result<Definition, Diagnostic> {
        let def = Definition {
            kind: RefKind::Symbol,
            name: name.to_owned(),
            span,
            scope: ScopeId::ROOT,
        };
        if let Some(previous) = self.table.globals.get(name) {
            return Err(duplicate(&def, previous.span));
        }
        self.table.globals.insert(name.to_owned(), def.clone());
        Ok(def)
    }

    pub fn use_name(&mut self, kind: RefKind, name: &str, span: Span) -> SymbolRef {
        let r = SymbolRef {
            kind,
            name: name.to_owned(),
            span,
            scope: self.current(),
        };
        match kind {
            RefKind::Symbol => self.symbol_uses.push(r.clone()),
            _ => {
                if let Some(pending) = self.pending.last_mut() {
                    pending.push(r.clone());
                }
            }
        }
        r
    }

    /// Close every open scope, judge the remaining uses and freeze the table.
    pub fn finish(mut self) -> (SymbolTable, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        while self.stack.len() > 1 {
            diagnostics.extend(self.pop_scope());
        }
        for r in self.pending.pop().unwrap_or_default() {
            let root = &self.table.scopes[ScopeId::ROOT.index()];
            let defined = match r.kind {
                RefKind::Value => root.values.contains_key(&r.name),
                RefKind::Label => root.labels.contains_key(&r.name),
                RefKind::Symbol => true,
            };
            if !defined {
                diagnostics.push(unresolved(&r, UnresolvedReason::NotDefined));
            }
        }
        for r in std::mem::take(&mut self.symbol_uses) {
            if !self.table.globals.contains_key(&r.name) {
                diagnostics.push(unresolved(&r, UnresolvedReason::UndeclaredSymbol));
            }
        }
        (self.table, diagnostics)
    }
}

fn unresolved(r: &SymbolRef, reason: UnresolvedReason) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::UnresolvedReference {
            name: r.spelled(),
            reason,
        },
        r.span,
    )
}

fn duplicate(def: &Definition, previous: Span) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::DuplicateDefinition {
            name: def.spelled(),
            previous,
        },
        def.span,
    )
    .with_fix(def.span)
}
