//! Host-language AST for the graft transpiler core.
//!
//! The external preprocessor parses surface syntax, marks the constructs
//! the core cares about (sum-type constructor calls, match constructs),
//! and hands over a file's tree in this crate's arena representation.
//! The core rewrites nodes in place and the emitter serializes the
//! result back out.
//!
//! - [`node`]: the arena (`SourceFile`), node kinds, and in-place rewriting
//! - [`parent`]: the one-shot node→parent index used for context-sensitive
//!   inference

pub mod node;
pub mod parent;

pub use node::{
    ArmPattern, BinOp, CtorKind, DispatchCase, Family, FnDecl, MatchMode, Node, NodeId, NodeKind,
    Param, PayloadRef, SourceFile, UnOp,
};
pub use parent::ParentIndex;
