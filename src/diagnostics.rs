//! Diagnostic rendering for the command-line driver.

use std::io;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use cir_syntax::{Diagnostic, DiagnosticKind, Severity};
use ropey::Rope;
use serde::Serialize;

/// Get the display color for a diagnostic kind.
pub fn kind_color(kind: &DiagnosticKind) -> Color {
    match kind {
        DiagnosticKind::Lex(_) => Color::Red,
        DiagnosticKind::UnknownOpcode { .. } | DiagnosticKind::AmbiguousForm { .. } => Color::Red,
        DiagnosticKind::MalformedOperation { .. } => Color::Red,
        DiagnosticKind::DuplicateDefinition { .. } | DiagnosticKind::UnresolvedReference { .. } => {
            Color::Yellow
        }
        DiagnosticKind::UnterminatedRegion { .. } => Color::Magenta,
        DiagnosticKind::ExternalSubLanguage(_) => Color::Cyan,
        DiagnosticKind::DeprecatedForm { .. } => Color::Blue,
        DiagnosticKind::Cancelled => Color::White,
    }
}

/// Normalize a span to ensure end > start (required by ariadne).
pub fn normalize_span(start: usize, end: usize) -> (usize, usize) {
    (start, end.max(start + 1))
}

/// Write one diagnostic as an ariadne report.
pub fn write_diagnostic(
    diag: &Diagnostic,
    source: &Rope,
    file_path: &str,
    color: bool,
    out: impl io::Write,
) -> io::Result<()> {
    let (start, end) = normalize_span(diag.span.start, diag.span.end);
    let kind = match diag.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let message = diag.message();
    let mut report = Report::build(kind, (file_path, start..end))
        .with_config(
            Config::default()
                .with_index_type(IndexType::Byte)
                .with_color(color),
        )
        .with_code(diag.code())
        .with_message(&message)
        .with_label(
            Label::new((file_path, start..end))
                .with_message(&message)
                .with_color(kind_color(&diag.kind)),
        );
    if let Some(fix) = diag.fix.filter(|fix| fix.start != diag.span.start) {
        let (start, end) = normalize_span(fix.start, fix.end);
        report = report.with_label(
            Label::new((file_path, start..end))
                .with_message("fix goes here")
                .with_color(Color::Green),
        );
    }
    report
        .finish()
        .write((file_path, Source::from(source.to_string())), out)
}

/// Print a diagnostic to stderr.
pub fn print_diagnostic(diag: &Diagnostic, source: &Rope, file_path: &str) {
    let _ = write_diagnostic(diag, source, file_path, true, io::stderr());
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JsonFile<'a> {
    pub file: &'a str,
    pub diagnostics: Vec<JsonDiagnostic>,
}

#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub start: usize,
    pub end: usize,
    /// 1-based.
    pub line: usize,
    /// 1-based, in characters.
    pub column: usize,
}

impl JsonDiagnostic {
    pub fn new(diag: &Diagnostic, source: &Rope) -> Self {
        let offset = diag.span.start.min(source.len_bytes());
        let line = source.byte_to_line(offset);
        let column = source.byte_to_char(offset) - source.line_to_char(line);
        Self {
            severity: diag.severity,
            code: diag.code(),
            message: diag.message(),
            start: diag.span.start,
            end: diag.span.end,
            line: line + 1,
            column: column + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cir_syntax::parse_source;

    #[test]
    fn test_kind_color() {
        assert_eq!(kind_color(&DiagnosticKind::Cancelled), Color::White);
        assert_eq!(
            kind_color(&DiagnosticKind::UnterminatedRegion {
                message: String::new()
            }),
            Color::Magenta
        );
    }

    #[test]
    fn test_normalize_span_valid() {
        assert_eq!(normalize_span(0, 10), (0, 10));
        assert_eq!(normalize_span(5, 15), (5, 15));
    }

    #[test]
    fn test_normalize_span_zero_length() {
        assert_eq!(normalize_span(5, 5), (5, 6));
        assert_eq!(normalize_span(0, 0), (0, 1));
    }

    #[test]
    fn test_json_position_is_one_based() {
        let src = "cir.func @f() {\n  cir.br ^nowhere\n}";
        let parsed = parse_source(src);
        let rope = Rope::from_str(src);
        let json = JsonDiagnostic::new(&parsed.diagnostics[0], &rope);
        assert_eq!(json.code, "UnresolvedReferenceError");
        assert_eq!((json.line, json.column), (2, 10));
    }

    #[test]
    fn test_rendered_report_names_the_code() {
        let src = "cir.func @f() {\n  cir.frobnicate\n  cir.return\n}";
        let parsed = parse_source(src);
        let mut out = Vec::new();
        write_diagnostic(&parsed.diagnostics[0], &Rope::from_str(src), "t.cir", false, &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("UnknownOpcodeError"), "{text}");
        assert!(text.contains("unknown opcode `cir.frobnicate`"), "{text}");
        assert!(text.contains("t.cir"), "{text}");
    }
}
