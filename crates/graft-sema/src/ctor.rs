//! Constructor transform.
//!
//! Rewrites every `Ok`/`Err`/`Some`/`None` marker into a tagged literal
//! backed by a registered instantiation. Type parameters come from, in
//! order: the explicit arguments as written, the operand's checked type
//! for the constructor's own payload slot, and context inference for
//! whatever is still missing. An unresolved instantiation is a compile
//! error unless the relaxed mode fills the success-side payload with the
//! erased type.
//!
//! Payloads are stored behind a reference so the absent variant stays
//! distinguishable from a present zero value: named operands take their
//! address directly, while literals and other temporaries are bound to a
//! fresh local inside an immediately-invoked zero-argument wrapper.

use graft_ast::{NodeId, NodeKind, ParentIndex, PayloadRef, SourceFile};
use graft_common::{Category, Diagnostic, DiagnosticSink};

use crate::infer::{infer_from_context, InferenceFailure};
use crate::oracle::TypeOracle;
use crate::registry::SharedRegistry;
use crate::SemaOptions;

/// Rewrite all constructor markers in the file. Returns how many were
/// rewritten; failed constructors are left in place so later passes and
/// diagnostics keep working.
pub fn rewrite_ctors(
    file: &mut SourceFile,
    parents: &ParentIndex,
    oracle: &TypeOracle,
    registry: &SharedRegistry,
    options: &SemaOptions,
    sink: &mut DiagnosticSink,
) -> usize {
    let ctors: Vec<NodeId> = file
        .ids()
        .filter(|&id| matches!(file.kind(id), NodeKind::Ctor { .. }))
        .collect();

    let mut rewritten = 0;
    for id in ctors {
        if rewrite_one(file, parents, oracle, registry, options, sink, id) {
            rewritten += 1;
        }
    }
    rewritten
}

fn rewrite_one(
    file: &mut SourceFile,
    parents: &ParentIndex,
    oracle: &TypeOracle,
    registry: &SharedRegistry,
    options: &SemaOptions,
    sink: &mut DiagnosticSink,
    id: NodeId,
) -> bool {
    let NodeKind::Ctor {
        kind,
        type_args,
        arg,
    } = file.kind(id)
    else {
        return false;
    };
    let kind = *kind;
    let type_args = type_args.clone();
    let arg = *arg;
    let span = file.span(id);

    let family = kind.family();
    let needed = family.param_count();

    // Fill slots from the explicit arguments, in declaration order.
    let mut slots: Vec<Option<String>> = vec![None; needed];
    for (i, text) in type_args.iter().take(needed).enumerate() {
        slots[i] = Some(text.clone());
    }

    // The constructor's own payload slot can come from the operand.
    if let (Some(payload_slot), Some(operand)) = (kind.payload_param(), arg) {
        if slots[payload_slot].is_none() {
            if let Some(ty) = oracle.type_of(file, operand) {
                slots[payload_slot] = Some(ty.to_string());
            }
        }
    }

    // Anything still missing needs the surrounding context.
    let mut failure: Option<InferenceFailure> = None;
    if slots.iter().any(Option::is_none) {
        match infer_from_context(file, parents, oracle, registry, options, id) {
            Ok(ty) => match ty.as_family() {
                Some((found, payloads)) if found == family => {
                    for (slot, payload) in slots.iter_mut().zip(payloads) {
                        if slot.is_none() {
                            *slot = Some(payload);
                        }
                    }
                }
                _ => {
                    failure = Some(InferenceFailure {
                        span,
                        context: None,
                        message: format!(
                            "context expects `{}`, which is not a {} instantiation",
                            ty,
                            family.type_name()
                        ),
                        suggestion: "add an explicit type annotation".to_string(),
                    });
                }
            },
            Err(f) => failure = Some(f),
        }
    }

    // Relaxed mode fills only the success-path payload with the erased
    // type; the failure side is never defaulted.
    if slots.iter().any(Option::is_none) && options.relaxed_erased_success {
        if let Some(slot) = slots.get_mut(0) {
            if slot.is_none() {
                *slot = Some("any".to_string());
            }
        }
    }

    if slots.iter().any(Option::is_none) {
        let diag = match failure {
            Some(f) => {
                let message = match f.context {
                    Some(ctx) => format!(
                        "cannot infer the {} type for this `{}` constructor from its {}: {}",
                        family.type_name(),
                        kind.tag(),
                        ctx.describe(),
                        f.message
                    ),
                    None => format!(
                        "cannot infer the {} type for this `{}` constructor: {}",
                        family.type_name(),
                        kind.tag(),
                        f.message
                    ),
                };
                Diagnostic::error(f.span, Category::InferenceFailure, message)
                    .with_suggestion(f.suggestion)
            }
            None => Diagnostic::error(
                span,
                Category::InferenceFailure,
                format!(
                    "cannot determine the full {} instantiation for `{}`",
                    family.type_name(),
                    kind.tag()
                ),
            )
            .with_suggestion("add an explicit type annotation"),
        };
        sink.push(diag);
        return false;
    }

    let payloads: Vec<String> = slots.into_iter().flatten().collect();
    let registration = registry.register(family, &payloads);
    if let Some(collision) = registration.collision {
        sink.push(
            Diagnostic::warning(
                span,
                Category::RegistryMismatch,
                format!(
                    "mangled name `{}` collides: registered for [{}], requested [{}]; the registered payload types stay authoritative",
                    collision.mangled_name,
                    collision.stored.join(", "),
                    collision.requested.join(", ")
                ),
            )
            .with_suggestion("rename one of the colliding types to avoid the `_` separator"),
        );
    }

    let payload = arg.map(|operand| {
        if matches!(file.kind(operand), NodeKind::Name(_)) {
            PayloadRef::Addr(operand)
        } else {
            PayloadRef::Temp(operand)
        }
    });

    file.replace_kind(
        id,
        NodeKind::Tagged {
            type_name: registration.mangled_name,
            tag: kind.tag().to_string(),
            payload,
        },
    );
    true
}
