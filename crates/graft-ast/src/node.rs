//! Arena AST: nodes, kinds, and in-place rewriting.
//!
//! Nodes live in a flat `Vec` owned by [`SourceFile`] and reference each
//! other by [`NodeId`]. Rewrites performed by the semantic core replace a
//! node's kind under its existing id, so references held by the parent
//! index and by enclosing nodes stay valid across the transform.
//!
//! The kinds fall into three groups:
//! - plain host constructs the core inspects (names, literals, operators,
//!   calls, returns, declarations, assignments, functions, blocks)
//! - preprocessor markers ([`NodeKind::Ctor`], [`NodeKind::Match`],
//!   [`NodeKind::Arm`]) whose surface syntax was resolved upstream
//! - transform output ([`NodeKind::Tagged`], [`NodeKind::Dispatch`])
//!   consumed by the emitter

use serde::Serialize;

use graft_common::Span;

/// Index of a node in its file's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// The two synthesized sum-type families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Family {
    /// Success/failure pair: tags `Ok` and `Err`, two payload types.
    Result,
    /// Presence/absence pair: tags `Some` and `None`, one payload type.
    Option,
}

impl Family {
    /// The family's emitted type-name prefix.
    pub fn type_name(&self) -> &'static str {
        match self {
            Family::Result => "Result",
            Family::Option => "Option",
        }
    }

    /// The family's variant tags, in declaration order.
    pub fn tags(&self) -> [&'static str; 2] {
        match self {
            Family::Result => ["Ok", "Err"],
            Family::Option => ["Some", "None"],
        }
    }

    /// Number of type parameters the family takes.
    pub fn param_count(&self) -> usize {
        match self {
            Family::Result => 2,
            Family::Option => 1,
        }
    }
}

/// A constructor-call marker's variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CtorKind {
    Ok,
    Err,
    Some,
    None,
}

impl CtorKind {
    /// The family this constructor belongs to.
    pub fn family(&self) -> Family {
        match self {
            CtorKind::Ok | CtorKind::Err => Family::Result,
            CtorKind::Some | CtorKind::None => Family::Option,
        }
    }

    /// The variant tag this constructor produces.
    pub fn tag(&self) -> &'static str {
        match self {
            CtorKind::Ok => "Ok",
            CtorKind::Err => "Err",
            CtorKind::Some => "Some",
            CtorKind::None => "None",
        }
    }

    /// Index of the type parameter carried by this constructor's operand,
    /// or `None` for the nullary absent-value sentinel.
    pub fn payload_param(&self) -> Option<usize> {
        match self {
            CtorKind::Ok => Some(0),
            CtorKind::Err => Some(1),
            CtorKind::Some => Some(0),
            CtorKind::None => None,
        }
    }
}

/// Binary operators the core needs to see (guards, general expressions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    /// Whether the operator yields a boolean result.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::And | BinOp::Or
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnOp {
    Not,
    Neg,
}

/// One declared parameter of a host function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    /// Declared type, as written in the host source. For a variadic
    /// parameter this is the element type, not the collection type.
    pub ty: String,
    pub variadic: bool,
}

/// A host function's declared signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<Param>,
    /// Declared result types, as written. Multi-value returns list one
    /// entry per result slot.
    pub results: Vec<String>,
}

/// A match arm's pattern: a variant tag or the wildcard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ArmPattern {
    Variant(String),
    Wildcard,
}

/// Whether a match construct's value feeds an expression position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchMode {
    /// Result feeds a return/assignment/declaration/call-argument slot;
    /// arm bodies must unify to one type and the emitter wraps the
    /// dispatch so it behaves as a single expression.
    Expression,
    /// Arm bodies execute for effect; no unification.
    Statement,
}

/// How a tagged literal's payload reaches its indirect storage slot.
///
/// Payloads are stored behind a reference so that "absent" stays
/// distinguishable from "present with the zero value".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PayloadRef {
    /// Address of an operand with a stable storage location (a name).
    Addr(NodeId),
    /// Operand bound to a fresh local inside an immediately-invoked
    /// zero-argument wrapper that returns a reference to the local.
    /// Required for literals, call results, and other temporaries.
    Temp(NodeId),
}

impl PayloadRef {
    /// The wrapped operand node.
    pub fn operand(&self) -> NodeId {
        match self {
            PayloadRef::Addr(id) | PayloadRef::Temp(id) => *id,
        }
    }
}

/// One case of a lowered tag dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchCase {
    /// The variant tag this case matches. The sentinel tag `"_"` marks a
    /// guarded catch-any case (from a guarded wildcard arm): it matches
    /// every tag but can still fall through on its guard.
    pub tag: String,
    /// Name bound to the dereferenced payload inside the case body.
    pub binding: Option<String>,
    /// Retained guard; the emitter chains guarded cases for the same tag
    /// in arm order.
    pub guard: Option<NodeId>,
    pub body: NodeId,
}

/// A node's kind, carrying its child ids inline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    /// An identifier reference.
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Binary {
        op: BinOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Unary {
        op: UnOp,
        operand: NodeId,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    /// A return statement; multi-value returns carry one child per slot.
    Return {
        values: Vec<NodeId>,
    },
    /// A variable declaration. A single annotation, when present, covers
    /// every declared name.
    Decl {
        names: Vec<String>,
        annotation: Option<String>,
        values: Vec<NodeId>,
    },
    /// Assignment to existing targets.
    Assign {
        targets: Vec<NodeId>,
        values: Vec<NodeId>,
    },
    Func {
        decl: FnDecl,
        body: NodeId,
    },
    Block {
        stmts: Vec<NodeId>,
    },
    /// Preprocessor marker: a sum-type constructor call. `type_args` are
    /// the explicit type parameters as written, possibly incomplete or
    /// empty (the ambiguous cases).
    Ctor {
        kind: CtorKind,
        type_args: Vec<String>,
        arg: Option<NodeId>,
    },
    /// Preprocessor marker: a match construct.
    Match {
        scrutinee: NodeId,
        arms: Vec<NodeId>,
    },
    /// One arm of a match construct.
    Arm {
        pattern: ArmPattern,
        binding: Option<String>,
        guard: Option<NodeId>,
        body: NodeId,
    },
    /// Transform output: a tagged sum-type literal. `type_name` is the
    /// mangled registry key; `payload` is unset for the absent variant.
    Tagged {
        type_name: String,
        tag: String,
        payload: Option<PayloadRef>,
    },
    /// Transform output: a match lowered to dispatch on the scrutinee's
    /// tag. `trap` marks the final trapping default branch appended when
    /// no wildcard arm exists.
    Dispatch {
        scrutinee: NodeId,
        mode: MatchMode,
        cases: Vec<DispatchCase>,
        wildcard: Option<NodeId>,
        trap: bool,
    },
}

/// A node: its source span plus its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

/// One file's AST arena.
///
/// Built by the preprocessor, rewritten in place by the semantic core,
/// serialized to the emitter. Scoped to a single compilation unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceFile {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl SourceFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its id.
    pub fn add(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { span, kind });
        id
    }

    /// Mark the file's root node.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0 as usize].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0 as usize].span
    }

    /// Replace a node's kind in place, returning the old kind. The id and
    /// span are unchanged, so existing references stay valid.
    pub fn replace_kind(&mut self, id: NodeId, kind: NodeKind) -> NodeKind {
        std::mem::replace(&mut self.nodes[id.0 as usize].kind, kind)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate all node ids in arena (creation) order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Push a node's children into `out`, in source order.
    pub fn children(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match self.kind(id) {
            NodeKind::Name(_)
            | NodeKind::Int(_)
            | NodeKind::Float(_)
            | NodeKind::Str(_)
            | NodeKind::Bool(_) => {}
            NodeKind::Binary { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            NodeKind::Unary { operand, .. } => out.push(*operand),
            NodeKind::Call { callee, args } => {
                out.push(*callee);
                out.extend_from_slice(args);
            }
            NodeKind::Return { values } => out.extend_from_slice(values),
            NodeKind::Decl { values, .. } => out.extend_from_slice(values),
            NodeKind::Assign { targets, values } => {
                out.extend_from_slice(targets);
                out.extend_from_slice(values);
            }
            NodeKind::Func { body, .. } => out.push(*body),
            NodeKind::Block { stmts } => out.extend_from_slice(stmts),
            NodeKind::Ctor { arg, .. } => {
                if let Some(arg) = arg {
                    out.push(*arg);
                }
            }
            NodeKind::Match { scrutinee, arms } => {
                out.push(*scrutinee);
                out.extend_from_slice(arms);
            }
            NodeKind::Arm { guard, body, .. } => {
                if let Some(guard) = guard {
                    out.push(*guard);
                }
                out.push(*body);
            }
            NodeKind::Tagged { payload, .. } => {
                if let Some(payload) = payload {
                    out.push(payload.operand());
                }
            }
            NodeKind::Dispatch {
                scrutinee,
                cases,
                wildcard,
                ..
            } => {
                out.push(*scrutinee);
                for case in cases {
                    if let Some(guard) = case.guard {
                        out.push(guard);
                    }
                    out.push(case.body);
                }
                if let Some(wildcard) = wildcard {
                    out.push(*wildcard);
                }
            }
        }
    }
}
