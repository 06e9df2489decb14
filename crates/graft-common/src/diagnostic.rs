//! Structured diagnostics and the bounded per-file sink.
//!
//! Diagnostics are collected during the file pass rather than aborting at
//! the first problem, so one run surfaces as many independent issues as
//! practical. Accumulation is bounded: once the configured ceiling is
//! reached, a single synthetic "too many errors" entry replaces further
//! collection while the transform itself continues.

use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// The category of a diagnostic, matching the core's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    /// No context classifier matched an ambiguous node, or the matching
    /// context had no resolvable type.
    InferenceFailure,
    /// A match construct leaves one or more variant tags uncovered.
    NonExhaustiveMatch,
    /// A guard expression is malformed or does not type-check as boolean.
    InvalidGuard,
    /// A mangled registry name did not round-trip against the stored
    /// originals. Warning-severity only; the originals stay authoritative.
    RegistryMismatch,
    /// Synthetic entry appended when the diagnostic ceiling is reached.
    TooManyErrors,
}

/// Whether a diagnostic blocks compilation or merely informs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A single structured diagnostic handed to the external tooling proxy.
///
/// Every user-visible entry carries a precise source span and, where a
/// plausible fix exists, one actionable suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create an error-severity diagnostic.
    pub fn error(span: Span, category: Category, message: impl Into<String>) -> Self {
        Diagnostic {
            span,
            category,
            severity: Severity::Error,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create a warning-severity diagnostic.
    pub fn warning(span: Span, category: Category, message: impl Into<String>) -> Self {
        Diagnostic {
            span,
            category,
            severity: Severity::Warning,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Attach a suggested fix.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(fix) = &self.suggestion {
            write!(f, " (help: {fix})")?;
        }
        Ok(())
    }
}

/// Bounded diagnostic accumulator for one file pass.
///
/// Errors count toward the ceiling; warnings are kept separately and do
/// not trigger truncation. After the ceiling, exactly one
/// [`Category::TooManyErrors`] sentinel is appended and further errors are
/// dropped.
#[derive(Debug)]
pub struct DiagnosticSink {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    ceiling: usize,
    truncated: bool,
}

impl DiagnosticSink {
    /// Create a sink with the given error ceiling.
    pub fn new(ceiling: usize) -> Self {
        DiagnosticSink {
            errors: Vec::new(),
            warnings: Vec::new(),
            ceiling,
            truncated: false,
        }
    }

    /// Record a diagnostic, routing by severity and honoring the ceiling.
    pub fn push(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Warning => self.warnings.push(diag),
            Severity::Error => {
                if self.truncated {
                    return;
                }
                if self.errors.len() >= self.ceiling {
                    let at = diag.span;
                    self.errors.push(
                        Diagnostic::error(
                            at,
                            Category::TooManyErrors,
                            format!("too many errors ({} shown); further errors suppressed", self.ceiling),
                        ),
                    );
                    self.truncated = true;
                    return;
                }
                self.errors.push(diag);
            }
        }
    }

    /// Whether the ceiling was reached and the sentinel appended.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Number of errors recorded so far (including the sentinel, if any).
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Consume the sink, yielding (errors, warnings).
    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        (self.errors, self.warnings)
    }

    /// Borrow the recorded errors.
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// Borrow the recorded warnings.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}
