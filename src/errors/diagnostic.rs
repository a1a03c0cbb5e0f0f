//! Pretty error reporting using ariadne
//!
//! Optional rendering of collected diagnostics with source context. The
//! core itself only fills the [`Diagnostics`] sink; drivers that have the
//! source text at hand can use these helpers for terminal output.

use crate::errors::{Diagnostic, Diagnostics};
use ariadne::{Color, Label, Report, ReportKind, Source};

/// Print a diagnostic with source context
pub fn print_diagnostic(source: &str, filename: &str, diagnostic: &Diagnostic) {
    let span_range = diagnostic.span.map(|s| s.start..s.end).unwrap_or(0..0);

    let header = if filename.is_empty() {
        "Semantic error".to_string()
    } else {
        format!("Semantic error in {}", filename)
    };

    let mut report = Report::build(ReportKind::Error, span_range.clone()).with_message(header);

    if let Some(s) = diagnostic.span {
        report = report.with_label(
            Label::new(s.start..s.end)
                .with_message(diagnostic.error.to_string())
                .with_color(Color::Red),
        );
    } else {
        report = report.with_note(diagnostic.error.to_string());
    }

    report
        .finish()
        .print(Source::from(source))
        .expect("failed to print error report");
}

/// Print every diagnostic in the sink
pub fn print_diagnostics(source: &str, filename: &str, diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        print_diagnostic(source, filename, diagnostic);
    }
}

/// Format a diagnostic as a string (for testing)
pub fn format_diagnostic(source: &str, filename: &str, diagnostic: &Diagnostic) -> String {
    let span_range = diagnostic.span.map(|s| s.start..s.end).unwrap_or(0..0);

    let header = if filename.is_empty() {
        "Semantic error".to_string()
    } else {
        format!("Semantic error in {}", filename)
    };

    let mut report = Report::build(ReportKind::Error, span_range.clone()).with_message(header);

    if let Some(s) = diagnostic.span {
        report = report.with_label(
            Label::new(s.start..s.end)
                .with_message(diagnostic.error.to_string())
                .with_color(Color::Red),
        );
    } else {
        report = report.with_note(diagnostic.error.to_string());
    }

    let mut output = Vec::new();
    report
        .finish()
        .write(Source::from(source), &mut output)
        .expect("failed to write error report");

    String::from_utf8(output).expect("error report should be valid UTF-8")
}
