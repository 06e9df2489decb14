//! Context inference engine.
//!
//! Two constructs arrive from the preprocessor without a locally
//! determinable type: the absent-value sentinel and a failure constructor
//! missing its success-type parameter. Their type comes from surrounding
//! code: the engine walks the parent chain one hop at a time and
//! classifies the nearest ancestor that forms a typing context, in fixed
//! precedence order:
//!
//! explicit annotation > assignment target > enclosing function return
//! slot > enclosing call parameter slot > sibling match-arm type
//!
//! The first matching classifier is authoritative. By default a failure
//! to resolve a concrete type there is final; the walk does not retry
//! farther up the chain (see [`crate::CONTEXT_FAILURE_IS_FINAL`]).
//! Failures are surfaced to the caller with the node's span and a
//! suggested explicit-annotation fix, never silently defaulted to an
//! erased type.

use graft_ast::{NodeId, NodeKind, ParentIndex, SourceFile};
use graft_common::Span;

use crate::oracle::TypeOracle;
use crate::registry::SharedRegistry;
use crate::ty::{FnSig, Ty};
use crate::SemaOptions;

/// Which classifier matched an ambiguous node's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Annotation,
    AssignTarget,
    ReturnSlot,
    CallParam,
    SiblingArm,
}

impl ContextKind {
    pub fn describe(&self) -> &'static str {
        match self {
            ContextKind::Annotation => "type annotation",
            ContextKind::AssignTarget => "assignment target",
            ContextKind::ReturnSlot => "function return slot",
            ContextKind::CallParam => "call parameter",
            ContextKind::SiblingArm => "sibling match arm",
        }
    }
}

/// A failed inference: which context matched (if any) and why it could
/// not produce a concrete type.
#[derive(Debug, Clone)]
pub struct InferenceFailure {
    pub span: Span,
    pub context: Option<ContextKind>,
    pub message: String,
    pub suggestion: String,
}

impl InferenceFailure {
    fn at(span: Span, context: ContextKind, message: impl Into<String>) -> Self {
        InferenceFailure {
            span,
            context: Some(context),
            message: message.into(),
            suggestion: "add an explicit type annotation".to_string(),
        }
    }

    fn no_context(span: Span) -> Self {
        InferenceFailure {
            span,
            context: None,
            message: "no enclosing context determines this value's type".to_string(),
            suggestion: "add an explicit type annotation".to_string(),
        }
    }
}

/// Infer the type of an ambiguous node from its nearest typing context.
pub fn infer_from_context(
    file: &SourceFile,
    parents: &ParentIndex,
    oracle: &TypeOracle,
    registry: &SharedRegistry,
    options: &SemaOptions,
    node: NodeId,
) -> Result<Ty, InferenceFailure> {
    let span = file.span(node);
    let mut child = node;
    for ancestor in parents.ancestors(node) {
        if let Some(context) = classify(file, parents, ancestor, child) {
            match resolve(file, parents, oracle, registry, &context, child, span) {
                Ok(ty) => return Ok(ty),
                Err(failure) => {
                    if options.context_failure_is_final {
                        return Err(failure);
                    }
                    // Relaxed policy: keep walking past the failed context.
                }
            }
        }
        child = ancestor;
    }
    Err(InferenceFailure::no_context(span))
}

// ── Classification ─────────────────────────────────────────────────────

/// One matched typing context, carrying what resolution needs.
#[derive(Debug)]
enum Context {
    Annotation {
        text: String,
    },
    /// Declaration without an annotation: classifies as an assignment
    /// target, but fresh names have no type to offer unless the oracle
    /// recorded one for the declaration itself.
    UntypedDecl {
        decl: NodeId,
        single_name: bool,
    },
    AssignTarget {
        targets: Vec<NodeId>,
        values: Vec<NodeId>,
    },
    ReturnSlot {
        return_node: NodeId,
        values: Vec<NodeId>,
    },
    CallParam {
        callee: NodeId,
        arg_index: usize,
    },
    SiblingArm {
        arm: NodeId,
    },
}

/// Test the classifiers against one ancestor, in precedence order.
/// `child` is the node we arrived from, one hop below `ancestor`.
fn classify(
    file: &SourceFile,
    parents: &ParentIndex,
    ancestor: NodeId,
    child: NodeId,
) -> Option<Context> {
    match file.kind(ancestor) {
        NodeKind::Decl {
            annotation: Some(text),
            values,
            ..
        } if values.contains(&child) => Some(Context::Annotation { text: text.clone() }),
        NodeKind::Decl {
            annotation: None,
            values,
            names,
        } if values.contains(&child) => Some(Context::UntypedDecl {
            decl: ancestor,
            single_name: names.len() == 1,
        }),
        NodeKind::Assign { targets, values } if values.contains(&child) => {
            Some(Context::AssignTarget {
                targets: targets.clone(),
                values: values.clone(),
            })
        }
        NodeKind::Return { values } if values.contains(&child) => Some(Context::ReturnSlot {
            return_node: ancestor,
            values: values.clone(),
        }),
        NodeKind::Call { callee, args } => {
            // The callee position is not a parameter slot.
            let arg_index = args.iter().position(|&a| a == child)?;
            Some(Context::CallParam {
                callee: *callee,
                arg_index,
            })
        }
        NodeKind::Arm { body, .. } if *body == child => {
            // Only a real sibling context when the arm sits in a match.
            let parent = parents.parent(ancestor)?;
            matches!(file.kind(parent), NodeKind::Match { .. }).then(|| Context::SiblingArm {
                arm: ancestor,
            })
        }
        _ => None,
    }
}

// ── Resolution ─────────────────────────────────────────────────────────

fn resolve(
    file: &SourceFile,
    parents: &ParentIndex,
    oracle: &TypeOracle,
    registry: &SharedRegistry,
    context: &Context,
    child: NodeId,
    span: Span,
) -> Result<Ty, InferenceFailure> {
    match context {
        Context::Annotation { text } => {
            Ok(reconstruct(Ty::parse(text), registry))
        }
        Context::UntypedDecl { decl, single_name } => {
            if *single_name {
                if let Some(ty) = oracle.type_of(file, *decl) {
                    return Ok(reconstruct(ty.clone(), registry));
                }
            }
            Err(InferenceFailure::at(
                span,
                ContextKind::AssignTarget,
                "declaration has no type annotation and the checker recorded none",
            ))
        }
        Context::AssignTarget { targets, values } => {
            let slot = value_slot(file, oracle, values, child);
            let target = slot.and_then(|s| targets.get(s)).copied().ok_or_else(|| {
                InferenceFailure::at(
                    span,
                    ContextKind::AssignTarget,
                    format!(
                        "cannot map this value to one of the {} assignment targets",
                        targets.len()
                    ),
                )
            })?;
            match oracle.type_of(file, target) {
                Some(ty) => Ok(reconstruct(ty.clone(), registry)),
                None => Err(InferenceFailure::at(
                    span,
                    ContextKind::AssignTarget,
                    "the assignment target's type is unknown",
                )),
            }
        }
        Context::ReturnSlot {
            return_node,
            values,
        } => {
            let decl = enclosing_fn(file, parents, *return_node).ok_or_else(|| {
                InferenceFailure::at(
                    span,
                    ContextKind::ReturnSlot,
                    "return statement outside any function",
                )
            })?;
            let slot = value_slot(file, oracle, values, child).ok_or_else(|| {
                InferenceFailure::at(span, ContextKind::ReturnSlot, "cannot locate return slot")
            })?;
            match decl.results.get(slot) {
                Some(text) => Ok(reconstruct(Ty::parse(text), registry)),
                None => Err(InferenceFailure::at(
                    span,
                    ContextKind::ReturnSlot,
                    format!(
                        "return value {} has no declared result slot in `{}`",
                        slot + 1,
                        decl.name
                    ),
                )),
            }
        }
        Context::CallParam { callee, arg_index } => {
            let sig = callee_signature(file, oracle, *callee).ok_or_else(|| {
                InferenceFailure::at(
                    span,
                    ContextKind::CallParam,
                    "the callee's type is unknown",
                )
            })?;
            param_type(&sig, *arg_index)
                .map(|ty| reconstruct(ty, registry))
                .ok_or_else(|| {
                    InferenceFailure::at(
                        span,
                        ContextKind::CallParam,
                        format!(
                            "argument {} has no matching parameter (callee takes {})",
                            arg_index + 1,
                            sig.params.len()
                        ),
                    )
                })
        }
        Context::SiblingArm { arm } => {
            let match_node = parents.parent(*arm).expect("classified arm has a parent");
            let NodeKind::Match { arms, .. } = file.kind(match_node) else {
                unreachable!("classified arm parent is a match");
            };
            for &sibling in arms {
                if sibling == *arm {
                    continue;
                }
                if let NodeKind::Arm { body, .. } = file.kind(sibling) {
                    if let Some(ty) = oracle.type_of(file, *body) {
                        return Ok(reconstruct(ty.clone(), registry));
                    }
                }
            }
            Err(InferenceFailure::at(
                span,
                ContextKind::SiblingArm,
                "no sibling arm has a known type",
            ))
        }
    }
}

/// Map a value-side child to its target slot, counting multi-value
/// siblings by their slot width. Handles the one-call-producing-N-values
/// case: a call occupying several slots shifts everything after it.
fn value_slot(
    file: &SourceFile,
    oracle: &TypeOracle,
    values: &[NodeId],
    child: NodeId,
) -> Option<usize> {
    let mut slot = 0usize;
    for &value in values {
        if value == child {
            return Some(slot);
        }
        slot += oracle
            .type_of(file, value)
            .map(|ty| ty.slot_count())
            .unwrap_or(1);
    }
    None
}

/// The declared signature of the function enclosing `node`.
fn enclosing_fn(
    file: &SourceFile,
    parents: &ParentIndex,
    node: NodeId,
) -> Option<graft_ast::FnDecl> {
    for ancestor in parents.ancestors(node) {
        if let NodeKind::Func { decl, .. } = file.kind(ancestor) {
            return Some(decl.clone());
        }
    }
    None
}

/// The callee's signature: oracle first, then the file's own function
/// declarations when the checker left nothing behind.
fn callee_signature(file: &SourceFile, oracle: &TypeOracle, callee: NodeId) -> Option<FnSig> {
    if let Some(Ty::Fun(sig)) = oracle.type_of(file, callee) {
        return Some(sig.clone());
    }
    let NodeKind::Name(name) = file.kind(callee) else {
        return None;
    };
    for id in file.ids() {
        if let NodeKind::Func { decl, .. } = file.kind(id) {
            if decl.name == *name {
                let mut variadic = false;
                let params = decl
                    .params
                    .iter()
                    .map(|p| {
                        if p.variadic {
                            variadic = true;
                        }
                        Ty::parse(&p.ty)
                    })
                    .collect();
                let results = decl.results.iter().map(|r| Ty::parse(r)).collect();
                return Some(FnSig {
                    params,
                    variadic,
                    results,
                });
            }
        }
    }
    None
}

/// The parameter type for an argument index. Once the index reaches the
/// variadic slot the element type applies, never a collection type.
fn param_type(sig: &FnSig, arg_index: usize) -> Option<Ty> {
    if sig.variadic && !sig.params.is_empty() && arg_index >= sig.params.len() - 1 {
        return sig.params.last().cloned();
    }
    sig.params.get(arg_index).cloned()
}

/// Rebuild a family type from a registered mangled name. The registry's
/// stored originals are the source of truth; the mangled string itself is
/// never parsed apart.
fn reconstruct(ty: Ty, registry: &SharedRegistry) -> Ty {
    if let Ty::Host(name) = &ty {
        if let Some(desc) = registry.lookup(name) {
            return desc.to_ty();
        }
    }
    ty
}
