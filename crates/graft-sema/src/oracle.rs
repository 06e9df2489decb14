//! Type oracle adapter.
//!
//! The host toolchain's check pass runs before this core and leaves
//! behind an expression→type mapping keyed by source span. That mapping
//! may be partially populated (the checker bailed early) or wholly
//! absent (the checker never ran); every consumer in the core treats a
//! miss as "unknown" and falls back to heuristics rather than failing.

use rustc_hash::FxHashMap;
use serde::Deserialize;

use graft_ast::{NodeId, SourceFile};
use graft_common::Span;

use crate::ty::Ty;

/// Span-keyed view of the external checker's results.
#[derive(Debug, Default)]
pub struct TypeOracle {
    types: FxHashMap<Span, Ty>,
}

/// One entry of the JSON sidecar emitted by the host toolchain.
#[derive(Debug, Deserialize)]
struct SidecarEntry {
    start: u32,
    end: u32,
    #[serde(rename = "type")]
    ty: String,
}

impl TypeOracle {
    /// An empty oracle: every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the sidecar format: `[{"start": 0, "end": 5, "type": "int"}]`.
    ///
    /// Type strings parse totally (unrecognized spellings stay opaque),
    /// so a sidecar from a newer or older checker still loads.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<SidecarEntry> = serde_json::from_str(json)?;
        let mut oracle = TypeOracle::new();
        for entry in entries {
            oracle.record(Span::new(entry.start, entry.end), Ty::parse(&entry.ty));
        }
        Ok(oracle)
    }

    /// Record a resolved type for the expression at `span`.
    pub fn record(&mut self, span: Span, ty: Ty) {
        self.types.insert(span, ty);
    }

    /// The resolved type of `node`, if the checker produced one.
    pub fn type_of(&self, file: &SourceFile, node: NodeId) -> Option<&Ty> {
        self.types.get(&file.span(node))
    }

    /// The resolved type at a raw span.
    pub fn type_at(&self, span: Span) -> Option<&Ty> {
        self.types.get(&span)
    }

    /// Whether the checker left no information at all.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Number of recorded expression types.
    pub fn len(&self) -> usize {
        self.types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_ast::NodeKind;

    #[test]
    fn record_and_lookup_by_node() {
        let mut file = SourceFile::new();
        let x = file.add(NodeKind::Name("x".into()), Span::new(4, 5));

        let mut oracle = TypeOracle::new();
        oracle.record(Span::new(4, 5), Ty::host("int"));

        assert_eq!(oracle.type_of(&file, x), Some(&Ty::host("int")));
        assert!(!oracle.is_empty());
    }

    #[test]
    fn miss_is_none_not_panic() {
        let mut file = SourceFile::new();
        let x = file.add(NodeKind::Name("x".into()), Span::new(0, 1));
        let oracle = TypeOracle::new();
        assert_eq!(oracle.type_of(&file, x), None);
        assert!(oracle.is_empty());
    }

    #[test]
    fn from_json_parses_family_types() {
        let oracle = TypeOracle::from_json(
            r#"[
                {"start": 0, "end": 3, "type": "Result<int, string>"},
                {"start": 5, "end": 9, "type": "Option<map[string]int>"},
                {"start": 10, "end": 11, "type": "mystery-spelling !?"}
            ]"#,
        )
        .unwrap();
        assert_eq!(oracle.len(), 3);
        assert_eq!(
            oracle.type_at(Span::new(0, 3)),
            Some(&Ty::result(Ty::host("int"), Ty::host("string")))
        );
        assert_eq!(
            oracle.type_at(Span::new(5, 9)),
            Some(&Ty::option(Ty::host("map[string]int")))
        );
        // Unrecognized spellings load as opaque host types.
        assert_eq!(
            oracle.type_at(Span::new(10, 11)),
            Some(&Ty::host("mystery-spelling !?"))
        );
    }

    #[test]
    fn from_json_rejects_malformed_document() {
        assert!(TypeOracle::from_json("{not json").is_err());
    }
}
