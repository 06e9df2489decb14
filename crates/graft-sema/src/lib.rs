//! Semantic core of the graft transpiler.
//!
//! Takes one file's preprocessor-marked AST plus the host checker's
//! (possibly partial) type information, and produces a tree the emitter
//! can print: every sum-type constructor becomes a tagged literal backed
//! by a registered monomorphic instantiation, and every match construct
//! becomes an exhaustiveness-checked tag dispatch.
//!
//! # Architecture
//!
//! - [`ty`]: the semantic type model and host type-string parsing
//! - [`oracle`]: adapter over the external checker's span→type results
//! - [`registry`]: mangled-name registry of synthesized instantiations
//! - [`infer`]: parent-chain context inference for ambiguous nodes
//! - [`ctor`]: constructor transform (markers → tagged literals)
//! - [`exhaustiveness`]: coverage checking and dispatch lowering
//! - [`diagnostics`]: ariadne rendering of structured diagnostics
//!
//! Processing is single-threaded and single-pass per file; every lookup
//! is a synchronous in-memory read. Files compiled concurrently each own
//! their AST, parent index, and oracle; only the registry is shared,
//! behind its reader-writer lock.

pub mod ctor;
pub mod diagnostics;
pub mod exhaustiveness;
pub mod infer;
pub mod oracle;
pub mod registry;
pub mod ty;

use graft_ast::{ParentIndex, SourceFile};
use graft_common::{Diagnostic, DiagnosticSink};

use crate::oracle::TypeOracle;
use crate::registry::SharedRegistry;

/// Default policy: a guarded arm never counts toward variant coverage.
/// A guard can fail at runtime, so the tag it names stays uncovered
/// unless an unconditional arm or wildcard also handles it.
pub const GUARDED_ARM_COVERS: bool = false;

/// Default policy: the nearest matching inference context is
/// authoritative: when it cannot resolve a concrete type the failure is
/// final and farther ancestors are not consulted.
pub const CONTEXT_FAILURE_IS_FINAL: bool = true;

/// Default per-file error ceiling.
pub const DEFAULT_ERROR_CEILING: usize = 64;

/// Tunable behavior for one file pass.
#[derive(Debug, Clone)]
pub struct SemaOptions {
    /// Error ceiling; once reached, a single synthetic entry replaces
    /// further accumulation while the transform continues.
    pub max_errors: usize,
    /// Permit the erased type for the success-path payload when
    /// inference fails. Off by default: unresolved instantiations are
    /// compile errors, never silent fallbacks.
    pub relaxed_erased_success: bool,
    /// Override for [`GUARDED_ARM_COVERS`].
    pub guarded_arm_covers: bool,
    /// Override for [`CONTEXT_FAILURE_IS_FINAL`].
    pub context_failure_is_final: bool,
    /// Best-effort existence check for bare names in guards. Off by
    /// default; enclosing-scope correctness belongs to the host
    /// compiler.
    pub check_guard_names: bool,
}

impl Default for SemaOptions {
    fn default() -> Self {
        SemaOptions {
            max_errors: DEFAULT_ERROR_CEILING,
            relaxed_erased_success: false,
            guarded_arm_covers: GUARDED_ARM_COVERS,
            context_failure_is_final: CONTEXT_FAILURE_IS_FINAL,
            check_guard_names: false,
        }
    }
}

/// The outcome of transforming one file.
pub struct SemaResult {
    /// User-facing compile errors, bounded by the ceiling.
    pub errors: Vec<Diagnostic>,
    /// Non-fatal findings (registry mismatches).
    pub warnings: Vec<Diagnostic>,
    /// How many constructor markers were rewritten to tagged literals.
    pub ctors_rewritten: usize,
    /// How many match constructs were lowered to dispatches.
    pub matches_lowered: usize,
}

impl SemaResult {
    /// Whether the file transformed without compile errors.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Transform one file: constructor rewriting, then exhaustiveness
/// checking and match lowering.
///
/// The parent index is built once here and serves both passes; it is
/// discarded with the file. The registry may be shared across files.
pub fn transform(
    file: &mut SourceFile,
    oracle: &TypeOracle,
    registry: &SharedRegistry,
    options: &SemaOptions,
) -> SemaResult {
    let parents = ParentIndex::build(file);
    let mut sink = DiagnosticSink::new(options.max_errors);

    let ctors_rewritten = ctor::rewrite_ctors(file, &parents, oracle, registry, options, &mut sink);
    let matches_lowered =
        exhaustiveness::check_and_lower(file, &parents, oracle, registry, options, &mut sink);

    let (errors, warnings) = sink.into_parts();
    SemaResult {
        errors,
        warnings,
        ctors_rewritten,
        matches_lowered,
    }
}

/// Serialize the transformed tree for the emitter.
pub fn export_ast(file: &SourceFile) -> serde_json::Result<String> {
    serde_json::to_string_pretty(file)
}
