//! Integration tests for the constructor transform.
//!
//! These tests exercise:
//! - sentinel resolution through the enclosing return slot, and the
//!   payload-less tagged literal it produces
//! - mangled-name agreement between inferred and explicit instantiations
//! - payload indirection: addresses for names, temp wrappers otherwise
//! - the compile-error default on inference failure, the relaxed erased
//!   success mode, and the error ceiling

use graft_ast::{CtorKind, NodeId, NodeKind, PayloadRef, SourceFile};
use graft_common::{Category, Severity, Span};
use graft_sema::oracle::TypeOracle;
use graft_sema::registry::SharedRegistry;
use graft_sema::ty::Ty;
use graft_sema::{export_ast, transform, SemaOptions};

// ── Helpers ────────────────────────────────────────────────────────────

struct Builder {
    file: SourceFile,
    next: u32,
}

impl Builder {
    fn new() -> Self {
        Builder {
            file: SourceFile::new(),
            next: 0,
        }
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let span = Span::new(self.next, self.next + 1);
        self.next += 2;
        self.file.add(kind, span)
    }

    fn span(&self, id: NodeId) -> Span {
        self.file.span(id)
    }
}

fn fn_returning(b: &mut Builder, results: &[&str], ret_values: Vec<NodeId>) {
    let ret = b.add(NodeKind::Return { values: ret_values });
    let body = b.add(NodeKind::Block { stmts: vec![ret] });
    b.add(NodeKind::Func {
        decl: graft_ast::FnDecl {
            name: "subject".into(),
            params: vec![],
            results: results.iter().map(|r| r.to_string()).collect(),
        },
        body,
    });
}

// ── Sentinel through return slot ───────────────────────────────────────

/// `return None` inside a function declared to return `Option<int>`:
/// the sentinel's payload resolves to `int` and the emitted literal
/// carries no payload reference.
#[test]
fn test_return_sentinel_resolves_and_has_no_payload() {
    let mut b = Builder::new();
    let none = b.add(NodeKind::Ctor {
        kind: CtorKind::None,
        type_args: vec![],
        arg: None,
    });
    fn_returning(&mut b, &["Option<int>"], vec![none]);

    let registry = SharedRegistry::new();
    let result = transform(
        &mut b.file,
        &TypeOracle::new(),
        &registry,
        &SemaOptions::default(),
    );

    assert!(result.is_clean(), "unexpected errors: {:?}", result.errors);
    assert_eq!(result.ctors_rewritten, 1);
    match b.file.kind(none) {
        NodeKind::Tagged {
            type_name,
            tag,
            payload,
        } => {
            assert_eq!(type_name, "Option_int");
            assert_eq!(tag, "None");
            assert!(payload.is_none(), "absent variant must have no payload");
        }
        other => panic!("expected Tagged, got {other:?}"),
    }

    let desc = registry.lookup("Option_int").expect("registered");
    assert_eq!(desc.payload_types, vec!["int".to_string()]);
}

// ── Mangled-name agreement ─────────────────────────────────────────────

/// A failure constructor resolved from a declaration annotation produces
/// the same mangled name as a success constructor with the explicit
/// instantiation.
#[test]
fn test_inferred_and_explicit_instantiations_agree() {
    let mut b = Builder::new();

    // res: Result<int, string> = Err(e)
    let e = b.add(NodeKind::Name("e".into()));
    let err = b.add(NodeKind::Ctor {
        kind: CtorKind::Err,
        type_args: vec![],
        arg: Some(e),
    });
    b.add(NodeKind::Decl {
        names: vec!["res".into()],
        annotation: Some("Result<int, string>".into()),
        values: vec![err],
    });

    // ok := Ok[int, string](1)
    let one = b.add(NodeKind::Int(1));
    let ok = b.add(NodeKind::Ctor {
        kind: CtorKind::Ok,
        type_args: vec!["int".into(), "string".into()],
        arg: Some(one),
    });
    b.add(NodeKind::Decl {
        names: vec!["ok".into()],
        annotation: Some("Result<int, string>".into()),
        values: vec![ok],
    });

    let registry = SharedRegistry::new();
    let result = transform(
        &mut b.file,
        &TypeOracle::new(),
        &registry,
        &SemaOptions::default(),
    );
    assert!(result.is_clean(), "unexpected errors: {:?}", result.errors);

    let err_name = match b.file.kind(err) {
        NodeKind::Tagged { type_name, .. } => type_name.clone(),
        other => panic!("expected Tagged, got {other:?}"),
    };
    let ok_name = match b.file.kind(ok) {
        NodeKind::Tagged { type_name, .. } => type_name.clone(),
        other => panic!("expected Tagged, got {other:?}"),
    };
    assert_eq!(err_name, ok_name);
    assert_eq!(registry.len(), 1, "one descriptor for one instantiation");
}

// ── Payload indirection ────────────────────────────────────────────────

/// Named operands take their address; literals are bound through the
/// temp wrapper.
#[test]
fn test_payload_indirection_by_operand_kind() {
    let mut b = Builder::new();

    let named = b.add(NodeKind::Name("value".into()));
    let some_named = b.add(NodeKind::Ctor {
        kind: CtorKind::Some,
        type_args: vec!["int".into()],
        arg: Some(named),
    });

    let lit = b.add(NodeKind::Int(42));
    let some_lit = b.add(NodeKind::Ctor {
        kind: CtorKind::Some,
        type_args: vec!["int".into()],
        arg: Some(lit),
    });

    b.add(NodeKind::Block {
        stmts: vec![some_named, some_lit],
    });

    let registry = SharedRegistry::new();
    let result = transform(
        &mut b.file,
        &TypeOracle::new(),
        &registry,
        &SemaOptions::default(),
    );
    assert!(result.is_clean(), "unexpected errors: {:?}", result.errors);

    match b.file.kind(some_named) {
        NodeKind::Tagged { payload, .. } => {
            assert_eq!(*payload, Some(PayloadRef::Addr(named)));
        }
        other => panic!("expected Tagged, got {other:?}"),
    }
    match b.file.kind(some_lit) {
        NodeKind::Tagged { payload, .. } => {
            assert_eq!(*payload, Some(PayloadRef::Temp(lit)));
        }
        other => panic!("expected Tagged, got {other:?}"),
    }
}

/// The operand's checked type completes a presence constructor without
/// any context.
#[test]
fn test_operand_type_completes_instantiation() {
    let mut b = Builder::new();
    let named = b.add(NodeKind::Name("user".into()));
    let some = b.add(NodeKind::Ctor {
        kind: CtorKind::Some,
        type_args: vec![],
        arg: Some(named),
    });
    b.add(NodeKind::Block { stmts: vec![some] });

    let mut oracle = TypeOracle::new();
    oracle.record(b.span(named), Ty::host("*user"));

    let registry = SharedRegistry::new();
    let result = transform(&mut b.file, &oracle, &registry, &SemaOptions::default());
    assert!(result.is_clean(), "unexpected errors: {:?}", result.errors);
    assert!(registry.lookup("Option__user").is_some());
}

// ── Failure policy ─────────────────────────────────────────────────────

/// Inference failure is a compile error by default: the marker survives
/// untransformed and the diagnostic carries a fix suggestion.
#[test]
fn test_unresolved_ctor_is_compile_error() {
    let mut b = Builder::new();
    let none = b.add(NodeKind::Ctor {
        kind: CtorKind::None,
        type_args: vec![],
        arg: None,
    });
    b.add(NodeKind::Block { stmts: vec![none] });

    let registry = SharedRegistry::new();
    let result = transform(
        &mut b.file,
        &TypeOracle::new(),
        &registry,
        &SemaOptions::default(),
    );

    assert_eq!(result.errors.len(), 1);
    let diag = &result.errors[0];
    assert_eq!(diag.category, Category::InferenceFailure);
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.span, b.span(none));
    assert!(diag.suggestion.as_deref().unwrap_or("").contains("annotation"));
    assert!(matches!(b.file.kind(none), NodeKind::Ctor { .. }));
    assert!(registry.is_empty());
}

/// The relaxed mode fills only the success-path payload with the erased
/// type; the failure side still comes from the operand.
#[test]
fn test_relaxed_mode_erases_success_payload_only() {
    let mut b = Builder::new();
    let e = b.add(NodeKind::Name("e".into()));
    let err = b.add(NodeKind::Ctor {
        kind: CtorKind::Err,
        type_args: vec![],
        arg: Some(e),
    });
    b.add(NodeKind::Block { stmts: vec![err] });

    let mut oracle = TypeOracle::new();
    oracle.record(b.span(e), Ty::host("error"));

    let options = SemaOptions {
        relaxed_erased_success: true,
        ..SemaOptions::default()
    };
    let registry = SharedRegistry::new();
    let result = transform(&mut b.file, &oracle, &registry, &options);

    assert!(result.is_clean(), "unexpected errors: {:?}", result.errors);
    let desc = registry.lookup("Result_any_error").expect("registered");
    assert_eq!(desc.payload_types, vec!["any".to_string(), "error".to_string()]);
}

/// Without the relaxed mode the same constructor is an error.
#[test]
fn test_strict_mode_rejects_what_relaxed_permits() {
    let mut b = Builder::new();
    let e = b.add(NodeKind::Name("e".into()));
    let err = b.add(NodeKind::Ctor {
        kind: CtorKind::Err,
        type_args: vec![],
        arg: Some(e),
    });
    b.add(NodeKind::Block { stmts: vec![err] });

    let mut oracle = TypeOracle::new();
    oracle.record(b.span(e), Ty::host("error"));

    let registry = SharedRegistry::new();
    let result = transform(&mut b.file, &oracle, &registry, &SemaOptions::default());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].category, Category::InferenceFailure);
}

// ── Error ceiling ──────────────────────────────────────────────────────

/// Once the ceiling is reached a single synthetic entry replaces further
/// accumulation, and the transform keeps going.
#[test]
fn test_error_ceiling_truncates_with_sentinel() {
    let mut b = Builder::new();
    let mut stmts = Vec::new();
    for _ in 0..5 {
        stmts.push(b.add(NodeKind::Ctor {
            kind: CtorKind::None,
            type_args: vec![],
            arg: None,
        }));
    }
    // One resolvable constructor after the failures.
    let one = b.add(NodeKind::Int(1));
    let some = b.add(NodeKind::Ctor {
        kind: CtorKind::Some,
        type_args: vec!["int".into()],
        arg: Some(one),
    });
    stmts.push(some);
    b.add(NodeKind::Block { stmts });

    let options = SemaOptions {
        max_errors: 2,
        ..SemaOptions::default()
    };
    let registry = SharedRegistry::new();
    let result = transform(&mut b.file, &TypeOracle::new(), &registry, &options);

    assert_eq!(result.errors.len(), 3, "two real errors plus the sentinel");
    assert_eq!(result.errors[2].category, Category::TooManyErrors);
    // The transform continued past the ceiling.
    assert!(matches!(b.file.kind(some), NodeKind::Tagged { .. }));
    assert_eq!(result.ctors_rewritten, 1);
}

// ── Collision warnings ─────────────────────────────────────────────────

/// Two instantiations whose originals collide under mangling: the second
/// registration warns, compilation continues, and the stored originals
/// stay authoritative.
#[test]
fn test_collision_surfaces_as_warning() {
    let mut b = Builder::new();

    let x = b.add(NodeKind::Name("x".into()));
    let first = b.add(NodeKind::Ctor {
        kind: CtorKind::Some,
        type_args: vec!["pair<a,b>".into()],
        arg: Some(x),
    });
    let y = b.add(NodeKind::Name("y".into()));
    let second = b.add(NodeKind::Ctor {
        kind: CtorKind::Some,
        type_args: vec!["pair_a_b_".into()],
        arg: Some(y),
    });
    b.add(NodeKind::Block {
        stmts: vec![first, second],
    });

    let registry = SharedRegistry::new();
    let result = transform(
        &mut b.file,
        &TypeOracle::new(),
        &registry,
        &SemaOptions::default(),
    );

    assert!(result.is_clean(), "collisions are not errors: {:?}", result.errors);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].category, Category::RegistryMismatch);
    assert_eq!(registry.len(), 1);
    let desc = registry
        .lookup("Option_pair_a_b_")
        .expect("first registration kept");
    assert_eq!(desc.payload_types, vec!["pair<a,b>".to_string()]);
}

// ── Emitter handoff ────────────────────────────────────────────────────

/// The transformed tree serializes for the emitter with the tagged
/// literal and its position metadata intact.
#[test]
fn test_export_carries_tagged_literals() {
    let mut b = Builder::new();
    let none = b.add(NodeKind::Ctor {
        kind: CtorKind::None,
        type_args: vec!["int".into()],
        arg: None,
    });
    b.add(NodeKind::Block { stmts: vec![none] });

    let registry = SharedRegistry::new();
    let result = transform(
        &mut b.file,
        &TypeOracle::new(),
        &registry,
        &SemaOptions::default(),
    );
    assert!(result.is_clean());

    let json = export_ast(&b.file).expect("serializable");
    assert!(json.contains("Tagged"), "missing Tagged in:\n{json}");
    assert!(json.contains("Option_int"), "missing type name in:\n{json}");
}
