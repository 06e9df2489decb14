//! Shared primitives for the graft transpiler core.
//!
//! The semantic core and its collaborators (preprocessor, emitter,
//! diagnostics proxy) exchange byte-offset spans and structured
//! diagnostics. This crate defines both, plus the bounded sink that
//! caps per-file diagnostic accumulation.

pub mod diagnostic;
pub mod span;

pub use diagnostic::{Category, Diagnostic, DiagnosticSink, Severity};
pub use span::{LineIndex, Span};
