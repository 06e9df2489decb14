//! Exhaustiveness engine: discovery, scrutinee resolution, coverage,
//! guard validation, and lowering to tag dispatch.
//!
//! Coverage over the two-tag families is a set difference: a match is
//! exhaustive when every variant tag has an unconditional arm or a
//! wildcard catches the rest. Guarded arms never count toward coverage
//! by default (see [`crate::GUARDED_ARM_COVERS`]): a guard can fail at
//! runtime, so the tag it names stays uncovered unless something
//! unconditional also handles it.
//!
//! Every match lowers to a [`NodeKind::Dispatch`] on the scrutinee's
//! tag, even a non-exhaustive one, so a single bad match does not
//! cascade into downstream failures. A statically-exhaustive match with
//! no wildcard still carries a final trapping default branch.

use graft_ast::{
    ArmPattern, DispatchCase, Family, MatchMode, NodeId, NodeKind, ParentIndex, SourceFile,
};
use graft_common::{Category, Diagnostic, DiagnosticSink};

use crate::oracle::TypeOracle;
use crate::registry::SharedRegistry;
use crate::ty::Ty;
use crate::SemaOptions;

/// Check and lower every match construct in the file. Returns how many
/// were lowered.
pub fn check_and_lower(
    file: &mut SourceFile,
    parents: &ParentIndex,
    oracle: &TypeOracle,
    registry: &SharedRegistry,
    options: &SemaOptions,
    sink: &mut DiagnosticSink,
) -> usize {
    // Discovery: the preprocessor owns the surface syntax; every match
    // arrives as a marker node.
    let matches: Vec<NodeId> = file
        .ids()
        .filter(|&id| matches!(file.kind(id), NodeKind::Match { .. }))
        .collect();

    let mut lowered = 0;
    for id in matches {
        lower_one(file, parents, oracle, registry, options, sink, id);
        lowered += 1;
    }
    lowered
}

/// One arm, extracted from the marker node.
struct ArmInfo {
    pattern: ArmPattern,
    binding: Option<String>,
    guard: Option<NodeId>,
    body: NodeId,
}

fn lower_one(
    file: &mut SourceFile,
    parents: &ParentIndex,
    oracle: &TypeOracle,
    registry: &SharedRegistry,
    options: &SemaOptions,
    sink: &mut DiagnosticSink,
    id: NodeId,
) {
    let NodeKind::Match { scrutinee, arms } = file.kind(id) else {
        return;
    };
    let scrutinee = *scrutinee;
    let arm_ids = arms.clone();
    let span = file.span(id);

    let arms: Vec<ArmInfo> = arm_ids
        .iter()
        .filter_map(|&arm| match file.kind(arm) {
            NodeKind::Arm {
                pattern,
                binding,
                guard,
                body,
            } => Some(ArmInfo {
                pattern: pattern.clone(),
                binding: binding.clone(),
                guard: *guard,
                body: *body,
            }),
            _ => None,
        })
        .collect();

    // Scrutinee resolution, then coverage.
    let universe = resolve_scrutinee(file, oracle, registry, scrutinee, &arms);
    check_coverage(options, sink, span, &universe, &arms);

    // Guard validation.
    for arm in &arms {
        if let Some(guard) = arm.guard {
            validate_guard(file, oracle, options, sink, guard, arm.binding.as_deref());
        }
    }

    // Mode detection and expression-mode unification.
    let mode = match_mode(file, parents, id);
    if mode == MatchMode::Expression {
        unify_arm_types(file, oracle, registry, sink, span, &arms);
    }

    // Lowering: tag dispatch, guarded wildcards as catch-any cases, and
    // a trapping default whenever no unconditional wildcard exists.
    let mut cases = Vec::new();
    let mut wildcard = None;
    for arm in &arms {
        match &arm.pattern {
            ArmPattern::Variant(tag) => cases.push(DispatchCase {
                tag: tag.clone(),
                binding: arm.binding.clone(),
                guard: arm.guard,
                body: arm.body,
            }),
            ArmPattern::Wildcard => {
                if arm.guard.is_none() {
                    if wildcard.is_none() {
                        wildcard = Some(arm.body);
                    }
                } else {
                    // A guarded wildcard matches any tag but can still
                    // fail; it stays a case, keyed by "_".
                    cases.push(DispatchCase {
                        tag: "_".to_string(),
                        binding: arm.binding.clone(),
                        guard: arm.guard,
                        body: arm.body,
                    });
                }
            }
        }
    }
    let trap = wildcard.is_none();

    file.replace_kind(
        id,
        NodeKind::Dispatch {
            scrutinee,
            mode,
            cases,
            wildcard,
            trap,
        },
    );
}

// ── Scrutinee resolution ───────────────────────────────────────────────

/// The variant universe a match is checked against.
struct Universe {
    /// All variant tags of the scrutinee's type.
    tags: Vec<String>,
    /// Human-readable type label for diagnostics.
    label: String,
}

/// Resolve the scrutinee's variant family. The oracle wins when it knows
/// the type (directly or through a registered mangled name). Otherwise
/// the engine permanently falls back to the literal tags used across the
/// match's own arms, completed by the name-based family heuristic.
fn resolve_scrutinee(
    file: &SourceFile,
    oracle: &TypeOracle,
    registry: &SharedRegistry,
    scrutinee: NodeId,
    arms: &[ArmInfo],
) -> Universe {
    if let Some(ty) = oracle.type_of(file, scrutinee) {
        let ty = match ty {
            Ty::Host(name) => match registry.lookup(name) {
                Some(desc) => {
                    return Universe {
                        tags: desc.tags().iter().map(|t| t.to_string()).collect(),
                        label: desc.display_name(),
                    }
                }
                None => ty.clone(),
            },
            other => other.clone(),
        };
        if let Some((family, _)) = ty.as_family() {
            return Universe {
                tags: family.tags().iter().map(|t| t.to_string()).collect(),
                label: ty.to_string(),
            };
        }
    }

    // Fallback: the tags the arms themselves mention.
    let mut seen: Vec<String> = Vec::new();
    for arm in arms {
        if let ArmPattern::Variant(tag) = &arm.pattern {
            if !seen.iter().any(|t| t == tag) {
                seen.push(tag.clone());
            }
        }
    }

    // Name-based heuristic: a subset of one family's tags implies the
    // family's full universe.
    for family in [Family::Result, Family::Option] {
        let tags = family.tags();
        if !seen.is_empty() && seen.iter().all(|t| tags.contains(&t.as_str())) {
            return Universe {
                tags: tags.iter().map(|t| t.to_string()).collect(),
                label: family.type_name().to_string(),
            };
        }
    }

    Universe {
        label: "<unknown>".to_string(),
        tags: seen,
    }
}

// ── Coverage ───────────────────────────────────────────────────────────

fn check_coverage(
    options: &SemaOptions,
    sink: &mut DiagnosticSink,
    span: graft_common::Span,
    universe: &Universe,
    arms: &[ArmInfo],
) {
    let counts = |arm: &ArmInfo| arm.guard.is_none() || options.guarded_arm_covers;

    // A wildcard that counts makes the match exhaustive immediately.
    if arms
        .iter()
        .any(|arm| matches!(arm.pattern, ArmPattern::Wildcard) && counts(arm))
    {
        return;
    }

    let missing: Vec<&str> = universe
        .tags
        .iter()
        .filter(|tag| {
            !arms.iter().any(|arm| {
                matches!(&arm.pattern, ArmPattern::Variant(t) if t == *tag) && counts(arm)
            })
        })
        .map(|t| t.as_str())
        .collect();

    if !missing.is_empty() {
        sink.push(
            Diagnostic::error(
                span,
                Category::NonExhaustiveMatch,
                format!(
                    "non-exhaustive match on `{}`: missing {}",
                    universe.label,
                    missing
                        .iter()
                        .map(|t| format!("`{t}`"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )
            .with_suggestion(format!(
                "add arms for {} or a trailing wildcard `_` arm",
                missing
                    .iter()
                    .map(|t| format!("`{t}`"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        );
    }
}

// ── Guard validation ───────────────────────────────────────────────────

/// Validate a guard expression: syntactic shape first, boolean-ness when
/// the oracle knows, and the optional best-effort name existence check.
/// Scope-correctness of enclosing-scope names is the host compiler's job.
fn validate_guard(
    file: &SourceFile,
    oracle: &TypeOracle,
    options: &SemaOptions,
    sink: &mut DiagnosticSink,
    guard: NodeId,
    binding: Option<&str>,
) {
    let span = file.span(guard);

    if !guard_shape_ok(file, guard) {
        sink.push(
            Diagnostic::error(
                span,
                Category::InvalidGuard,
                "guards are limited to names, literals, comparisons, and boolean operators",
            )
            .with_suggestion("move the computation into the arm body and test a boolean"),
        );
        return;
    }

    match oracle.type_of(file, guard) {
        Some(ty) if !ty.is_bool() => {
            sink.push(
                Diagnostic::error(
                    span,
                    Category::InvalidGuard,
                    format!("guard must be a boolean expression, found `{ty}`"),
                )
                .with_suggestion("compare the value or use a boolean operator"),
            );
            return;
        }
        Some(_) => {}
        None => {
            // No checked type: reject shapes that cannot possibly be
            // boolean, accept the rest.
            if !guard_root_plausibly_bool(file, guard) {
                sink.push(
                    Diagnostic::error(
                        span,
                        Category::InvalidGuard,
                        "guard must be a boolean expression",
                    )
                    .with_suggestion("compare the value or use a boolean operator"),
                );
                return;
            }
        }
    }

    if options.check_guard_names && !oracle.is_empty() {
        check_guard_names(file, oracle, sink, guard, binding);
    }
}

/// Whether every node in the guard subtree is an allowed construct.
fn guard_shape_ok(file: &SourceFile, node: NodeId) -> bool {
    match file.kind(node) {
        NodeKind::Name(_)
        | NodeKind::Int(_)
        | NodeKind::Float(_)
        | NodeKind::Str(_)
        | NodeKind::Bool(_) => true,
        NodeKind::Binary { lhs, rhs, .. } => {
            guard_shape_ok(file, *lhs) && guard_shape_ok(file, *rhs)
        }
        NodeKind::Unary { operand, .. } => guard_shape_ok(file, *operand),
        _ => false,
    }
}

/// Shape-level boolean plausibility for guards the oracle cannot type.
fn guard_root_plausibly_bool(file: &SourceFile, node: NodeId) -> bool {
    match file.kind(node) {
        NodeKind::Bool(_) => true,
        // A bare name may be a boolean variable; give it the benefit of
        // the doubt and let the host compiler have the final word.
        NodeKind::Name(_) => true,
        NodeKind::Binary { op, .. } => op.is_boolean(),
        NodeKind::Unary { op, .. } => matches!(op, graft_ast::UnOp::Not),
        _ => false,
    }
}

/// Best-effort existence check: a bare name must be the arm's binding or
/// known to the oracle.
fn check_guard_names(
    file: &SourceFile,
    oracle: &TypeOracle,
    sink: &mut DiagnosticSink,
    node: NodeId,
    binding: Option<&str>,
) {
    match file.kind(node) {
        NodeKind::Name(name) => {
            if Some(name.as_str()) != binding && oracle.type_of(file, node).is_none() {
                sink.push(
                    Diagnostic::error(
                        file.span(node),
                        Category::InvalidGuard,
                        format!("guard references `{name}`, which is neither the arm binding nor a known variable"),
                    )
                    .with_suggestion("bind the value in the arm pattern or declare it in an enclosing scope"),
                );
            }
        }
        NodeKind::Binary { lhs, rhs, .. } => {
            check_guard_names(file, oracle, sink, *lhs, binding);
            check_guard_names(file, oracle, sink, *rhs, binding);
        }
        NodeKind::Unary { operand, .. } => {
            check_guard_names(file, oracle, sink, *operand, binding);
        }
        _ => {}
    }
}

// ── Mode detection and unification ─────────────────────────────────────

/// Expression mode iff the match's value feeds a return, assignment,
/// declaration, or call-argument position.
fn match_mode(file: &SourceFile, parents: &ParentIndex, id: NodeId) -> MatchMode {
    let Some(parent) = parents.parent(id) else {
        return MatchMode::Statement;
    };
    let feeds_value = match file.kind(parent) {
        NodeKind::Return { values } => values.contains(&id),
        NodeKind::Decl { values, .. } => values.contains(&id),
        NodeKind::Assign { values, .. } => values.contains(&id),
        NodeKind::Call { args, .. } => args.contains(&id),
        _ => false,
    };
    if feeds_value {
        MatchMode::Expression
    } else {
        MatchMode::Statement
    }
}

/// In expression mode every arm body must produce one type. Divergence
/// is reported and lowering continues, so one bad match does not
/// cascade.
fn unify_arm_types(
    file: &SourceFile,
    oracle: &TypeOracle,
    registry: &SharedRegistry,
    sink: &mut DiagnosticSink,
    span: graft_common::Span,
    arms: &[ArmInfo],
) {
    let mut known: Option<Ty> = None;
    for arm in arms {
        let Some(ty) = oracle.type_of(file, arm.body) else {
            continue;
        };
        let ty = match ty {
            Ty::Host(name) => match registry.lookup(name) {
                Some(desc) => desc.to_ty(),
                None => ty.clone(),
            },
            other => other.clone(),
        };
        match &known {
            None => known = Some(ty),
            Some(expected) if *expected != ty => {
                sink.push(
                    Diagnostic::error(
                        span,
                        Category::InferenceFailure,
                        format!(
                            "match arms produce different types: `{expected}` vs `{ty}`",
                        ),
                    )
                    .with_suggestion("make every arm produce the same type"),
                );
                return;
            }
            Some(_) => {}
        }
    }
}
