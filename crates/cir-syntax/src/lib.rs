//! Parser for the textual form of the ClangIR (CIR) dialect.
//!
//! [`parse`] turns one source unit into a [`Module`] plus every
//! [`Diagnostic`] found along the way. Parsing never stops at the first
//! error: a malformed operation is reported and skipped, and the rest of its
//! block is still parsed. [`printer::print_module`] writes a module back out
//! in the surface forms it was read in.

// === Front end ===
pub mod lexer;
pub mod location;
pub mod token;

// === Grammar ===
pub mod adapter;
pub mod opcode;
pub mod parser;
pub mod scope;

// === Output ===
pub mod ast;
pub mod diagnostic;
pub mod options;
pub mod printer;
pub mod walk;

pub use adapter::{
    Adapters, AttributeForm, AttributeParser, OpaqueAttribute, OpaqueType, StructuralSyntax,
    TypeParser,
};
pub use ast::{Block, Module, OpForm, OpId, OpKind, Operation, Region, RegionKind};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use location::{SourceId, Span};
pub use opcode::Opcode;
pub use options::{CancellationToken, ParseOptions};
pub use parser::parse;
pub use printer::print_module;
pub use walk::{OperationWalk, WalkAction};

/// Outcome of parsing one source unit.
#[derive(Debug)]
pub struct ParseResult {
    pub module: Module,
    /// Sorted by source position.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }
}

/// Parse with the default options and structural type/attribute syntax.
pub fn parse_source(source: &str) -> ParseResult {
    parse(source, ParseOptions::default())
}
