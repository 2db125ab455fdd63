//! Diagnostics collected during a parse.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::adapter::SubLanguageError;
use crate::lexer::LexErrorKind;
use crate::location::Span;
use crate::opcode::Opcode;

/// Severity level of a diagnostic.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[display("error")]
    Error,
    #[display("warning")]
    Warning,
}

/// Why a reference could not be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum UnresolvedReason {
    #[display("no definition in any enclosing scope")]
    NotDefined,
    #[display("label belongs to an enclosing region; branches cannot cross regions")]
    CrossRegionLabel,
    #[display("no module-level declaration with this name")]
    UndeclaredSymbol,
}

#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum DiagnosticKind {
    #[display("{_0}")]
    Lex(LexErrorKind),

    #[display("unknown opcode `{opcode}`")]
    UnknownOpcode { opcode: String },

    #[display("cannot select a form of `{opcode}`: expected {expected}, found {found}")]
    AmbiguousForm {
        opcode: Opcode,
        expected: String,
        found: String,
    },

    #[display("malformed {construct}: expected {expected}, found {found}")]
    MalformedOperation {
        construct: String,
        expected: String,
        found: String,
    },

    #[display("duplicate definition of `{name}`")]
    DuplicateDefinition { name: String, previous: Span },

    #[display("unresolved reference `{name}`: {reason}")]
    UnresolvedReference {
        name: String,
        reason: UnresolvedReason,
    },

    #[display("{message}")]
    UnterminatedRegion { message: String },

    #[display("{_0}")]
    ExternalSubLanguage(SubLanguageError),

    #[display("deprecated form of `{opcode}`: {message}")]
    DeprecatedForm { opcode: Opcode, message: String },

    #[display("parse cancelled")]
    Cancelled,
}

impl DiagnosticKind {
    /// Stable name of the error class, used by hosts to filter diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::Lex(_) => "LexError",
            DiagnosticKind::UnknownOpcode { .. } => "UnknownOpcodeError",
            DiagnosticKind::AmbiguousForm { .. } => "AmbiguousFormError",
            DiagnosticKind::MalformedOperation { .. } => "MalformedOperationError",
            DiagnosticKind::DuplicateDefinition { .. } => "DuplicateDefinitionError",
            DiagnosticKind::UnresolvedReference { .. } => "UnresolvedReferenceError",
            DiagnosticKind::UnterminatedRegion { .. } => "UnterminatedRegionError",
            DiagnosticKind::ExternalSubLanguage(_) => "ExternalSubLanguageError",
            DiagnosticKind::DeprecatedForm { .. } => "DeprecatedForm",
            DiagnosticKind::Cancelled => "Cancelled",
        }
    }
}

/// A diagnostic with the span of the offending text and, where one is
/// obvious, the span a fix would touch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub span: Span,
    pub fix: Option<Span>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            span,
            fix: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            span,
            fix: None,
        }
    }

    pub fn with_fix(mut self, fix: Span) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] at {}..{}: {}",
            self.severity, self.code(), self.span.start, self.span.end, self.kind
        )
    }
}

/// Accumulates diagnostics in discovery order.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(
            code = diagnostic.code(),
            start = diagnostic.span.start,
            "diagnostic"
        );
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for d in diagnostics {
            self.push(d);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All diagnostics ordered by source position. Ties keep discovery order.
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.items.sort_by_key(|d| (d.span.start, d.span.end));
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_position() {
        let mut diags = Diagnostics::default();
        diags.push(Diagnostic::error(DiagnosticKind::Cancelled, Span::new(10, 12)));
        diags.push(Diagnostic::error(
            DiagnosticKind::UnknownOpcode {
                opcode: "cir.nope".into(),
            },
            Span::new(2, 10),
        ));
        let sorted = diags.into_sorted();
        assert_eq!(sorted[0].code(), "UnknownOpcodeError");
        assert_eq!(sorted[1].code(), "Cancelled");
    }

    #[test]
    fn test_unresolved_message() {
        let kind = DiagnosticKind::UnresolvedReference {
            name: "^missing".into(),
            reason: UnresolvedReason::NotDefined,
        };
        assert_eq!(
            kind.to_string(),
            "unresolved reference `^missing`: no definition in any enclosing scope"
        );
    }

    #[test]
    fn test_display_includes_code_and_span() {
        let d = Diagnostic::warning(
            DiagnosticKind::DeprecatedForm {
                opcode: Opcode::Copy,
                message: "missing type annotation".into(),
            },
            Span::new(4, 9),
        );
        assert_eq!(
            d.to_string(),
            "warning [DeprecatedForm] at 4..9: deprecated form of `cir.copy`: missing type annotation"
        );
    }
}
