//! One-shot node→parent index.
//!
//! Context-sensitive inference needs to walk from a node toward the root,
//! and the arena stores edges the other way around. The index is a plain
//! key→key table built in one O(N) sweep over the file; every query is a
//! single map lookup. It is created at the start of a file's pass and
//! discarded with the file.

use rustc_hash::FxHashMap;

use crate::node::{NodeId, SourceFile};

/// Child→parent map over one file's arena.
#[derive(Debug)]
pub struct ParentIndex {
    parents: FxHashMap<NodeId, NodeId>,
}

impl ParentIndex {
    /// Build the index by walking every node's children once.
    pub fn build(file: &SourceFile) -> Self {
        let mut parents =
            FxHashMap::with_capacity_and_hasher(file.len(), Default::default());
        let mut buf = Vec::new();
        for id in file.ids() {
            buf.clear();
            file.children(id, &mut buf);
            for &child in &buf {
                parents.insert(child, id);
            }
        }
        ParentIndex { parents }
    }

    /// The parent of `id`, or `None` at the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    /// Register an edge for a node minted after the initial build, so a
    /// single index serves the whole file pass.
    pub fn record(&mut self, child: NodeId, parent: NodeId) {
        self.parents.insert(child, parent);
    }

    /// Iterate ancestors of `id`, nearest first, ending at the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            index: self,
            current: Some(id),
        }
    }

    /// Number of edges in the index.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a> {
    index: &'a ParentIndex,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.current?;
        let parent = self.index.parent(cur);
        self.current = parent;
        parent
    }
}
