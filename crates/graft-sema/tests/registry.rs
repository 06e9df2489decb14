//! Integration tests for the sum-type registry.
//!
//! These tests exercise:
//! - register/lookup round-trips of the original payload strings
//! - idempotent registration (cache hit, no growth)
//! - separator collisions reported as non-fatal mismatches
//! - the shared registry under concurrent registration and lookup

use std::sync::Arc;
use std::thread;

use graft_ast::Family;
use graft_sema::registry::{mangle, SharedRegistry, TypeRegistry};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Round-trips ────────────────────────────────────────────────────────

/// Registration stores the originals; lookup returns exactly them, even
/// when the payload strings contain characters that collide under
/// mangling.
#[test]
fn test_lookup_returns_originals_for_colliding_payloads() {
    let mut reg = TypeRegistry::new();
    let payloads = strings(&["map[string]*user", "[]error"]);
    let r = reg.register(Family::Result, &payloads);

    let desc = reg.lookup(&r.mangled_name).expect("descriptor registered");
    assert_eq!(desc.payload_types, payloads);
    assert_eq!(desc.display_name(), "Result<map[string]*user, []error>");
}

/// Registering the same instantiation twice yields the identical name
/// and descriptor, and the registry does not grow.
#[test]
fn test_double_registration_is_cache_hit() {
    let mut reg = TypeRegistry::new();
    let payloads = strings(&["int", "string"]);

    let first = reg.register(Family::Result, &payloads);
    let size_after_first = reg.len();
    let second = reg.register(Family::Result, &payloads);

    assert_eq!(first.mangled_name, second.mangled_name);
    assert!(!second.newly_registered);
    assert_eq!(reg.len(), size_after_first);

    let desc = reg.lookup(&first.mangled_name).unwrap();
    assert_eq!(desc.seq, 0);
}

/// Option and Result instantiations over the same payload never share a
/// key.
#[test]
fn test_families_mangle_apart() {
    let mut reg = TypeRegistry::new();
    let opt = reg.register(Family::Option, &strings(&["int"]));
    // A Result cannot take one payload, but the prefixes alone keep the
    // namespaces disjoint.
    assert!(opt.mangled_name.starts_with("Option_"));
    assert_eq!(mangle(Family::Result, &strings(&["int", "int"])), "Result_int_int");
}

// ── Collisions ─────────────────────────────────────────────────────────

/// Distinct originals that mangle to the same key: reported, non-fatal,
/// first registration stays authoritative.
#[test]
fn test_collision_keeps_first_registration() {
    let mut reg = TypeRegistry::new();
    let a = strings(&["pair<a,b>", "error"]);
    let b = strings(&["pair_a_b_", "error"]);
    assert_eq!(
        mangle(Family::Result, &a),
        mangle(Family::Result, &b),
        "test premise: the two spellings must collide"
    );

    let first = reg.register(Family::Result, &a);
    let second = reg.register(Family::Result, &b);

    assert!(first.collision.is_none());
    let collision = second.collision.expect("collision reported");
    assert_eq!(collision.stored, a);
    assert_eq!(collision.requested, b);
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.lookup(&first.mangled_name).unwrap().payload_types, a);
}

// ── Shared registry ────────────────────────────────────────────────────

/// Many threads registering the same handful of instantiations: the
/// registry converges on one descriptor per distinct input and lookups
/// observe consistent originals throughout.
#[test]
fn test_shared_registry_concurrent_registration() {
    let shared = Arc::new(SharedRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let payloads = strings(&["int", "error"]);
                for _ in 0..100 {
                    let r = shared.register(Family::Result, &payloads);
                    assert_eq!(r.mangled_name, "Result_int_error");
                    let desc = shared.lookup(&r.mangled_name).expect("visible after register");
                    assert_eq!(desc.payload_types, payloads);
                }
                // Each thread also registers one unique instantiation.
                shared.register(Family::Option, &strings(&[&format!("t{i}")]));
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    // One Result plus eight distinct Options.
    assert_eq!(shared.len(), 9);
}
