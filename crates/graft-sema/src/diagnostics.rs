//! Ariadne-based rendering for structured diagnostics.
//!
//! The core hands structured [`Diagnostic`] values to the external
//! tooling proxy; this module renders them into labeled, formatted
//! reports for terminal output. Output is colorless so snapshots stay
//! stable across environments.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use graft_common::{Category, Diagnostic, Severity};

/// Assign a stable code to each diagnostic category.
fn error_code(category: Category) -> &'static str {
    match category {
        Category::InferenceFailure => "E0001",
        Category::NonExhaustiveMatch => "E0002",
        Category::InvalidGuard => "E0003",
        Category::RegistryMismatch => "W0001",
        Category::TooManyErrors => "E0099",
    }
}

/// The label text shown under the primary span.
fn label_text(category: Category) -> &'static str {
    match category {
        Category::InferenceFailure => "cannot determine this value's type",
        Category::NonExhaustiveMatch => "this match does not cover every variant",
        Category::InvalidGuard => "this guard is not a valid boolean expression",
        Category::RegistryMismatch => "mangled type names collide here",
        Category::TooManyErrors => "diagnostic limit reached",
    }
}

/// Render one diagnostic into a formatted report string.
pub fn render_diagnostic(diag: &Diagnostic, source: &str, _filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Clamp to source bounds; ariadne needs a non-empty span.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };
    let span = clamp(diag.span.start as usize..diag.span.end as usize);

    let (kind, color) = match diag.severity {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
    };

    let mut builder = Report::build(kind, span.clone())
        .with_code(error_code(diag.category))
        .with_message(&diag.message)
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(label_text(diag.category))
                .with_color(color),
        );

    if let Some(fix) = &diag.suggestion {
        builder.set_help(fix);
    }

    let report = builder.finish();
    let mut buf = Vec::new();
    report
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_common::Span;

    #[test]
    fn renders_error_with_code_and_help() {
        let src = "x := None\n";
        let diag = Diagnostic::error(
            Span::new(5, 9),
            Category::InferenceFailure,
            "cannot infer the Option type for this `None` constructor",
        )
        .with_suggestion("add an explicit type annotation");

        let out = render_diagnostic(&diag, src, "sample.gr");
        assert!(out.contains("E0001"), "missing code in:\n{out}");
        assert!(
            out.contains("cannot infer the Option type"),
            "missing message in:\n{out}"
        );
        assert!(
            out.contains("add an explicit type annotation"),
            "missing help in:\n{out}"
        );
    }

    #[test]
    fn warning_uses_warning_kind() {
        let src = "y := Ok(1)\n";
        let diag = Diagnostic::warning(
            Span::new(5, 10),
            Category::RegistryMismatch,
            "mangled name `Result_a_b` collides",
        );
        let out = render_diagnostic(&diag, src, "sample.gr");
        assert!(out.contains("W0001"), "missing code in:\n{out}");
        assert!(out.contains("Warning"), "missing kind in:\n{out}");
    }

    #[test]
    fn out_of_bounds_span_is_clamped() {
        let src = "ab";
        let diag = Diagnostic::error(
            Span::new(50, 60),
            Category::NonExhaustiveMatch,
            "non-exhaustive match",
        );
        // Must not panic on spans past the end of the source.
        let out = render_diagnostic(&diag, src, "sample.gr");
        assert!(out.contains("E0002"));
    }
}
