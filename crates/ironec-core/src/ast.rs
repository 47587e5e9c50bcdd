//! The annotated AST arena.
//!
//! Nodes live in a flat [`Ast`] arena and reference their children by
//! [`NodeId`], so the instruction back-edges that make IL a DAG are plain
//! indices rather than shared pointers. Each node carries the three
//! semantic annotation fields that the analysis passes populate:
//!
//! - `candidates`: every type the node could plausibly have, filled by the
//!   candidate-collection pass that runs before narrowing (an empty list
//!   means the node was ill-typed before narrowing started).
//! - `narrowed`: the single type chosen by the narrowing pass, as a
//!   [`Narrowed`] sum -- `Unknown` (no demand from context), `Typed`, or
//!   `Invalid` (an in-band error marker read by the diagnostics pass).
//! - `prev`: for IL instructions, the instructions whose current value
//!   flows into this one (more than one entry at label join points).

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{NodeId, PouId, TypeId};
use crate::ops::{ArithOp, CmpOp, IlCallOp, IlJumpOp, IlReturnOp, IlSimpleOp, LogicOp, UnaryOp};

/// The narrowing annotation of a node.
///
/// `Typed`/`Invalid` replace the original in-band "invalid type" singleton:
/// a node that could not be consistently typed is `Invalid`, and the
/// downstream diagnostics pass reports every such node. `Unknown` means no
/// demand reached the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Narrowed {
    #[default]
    Unknown,
    Typed(TypeId),
    Invalid,
}

impl Narrowed {
    pub fn is_unknown(self) -> bool {
        matches!(self, Narrowed::Unknown)
    }

    pub fn is_invalid(self) -> bool {
        matches!(self, Narrowed::Invalid)
    }

    /// The chosen type, if one was chosen.
    pub fn type_id(self) -> Option<TypeId> {
        match self {
            Narrowed::Typed(t) => Some(t),
            _ => None,
        }
    }
}

/// Resolution annotations of a function call site.
///
/// `candidate_pous` runs parallel to the node's `candidates` list: entry `i`
/// is the declaration returning `candidates[i]`. The narrower fills
/// `resolved` and `extensible_param_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAnnotations {
    /// One declaration per candidate return type (candidate-collection pass).
    pub candidate_pous: SmallVec<[PouId; 2]>,
    /// The declaration whose return type matches the chosen datatype.
    pub resolved: Option<PouId>,
    /// For calls to extensible standard functions, how many actuals landed
    /// on extensible parameters; `-1` otherwise.
    pub extensible_param_count: i32,
}

impl Default for CallAnnotations {
    fn default() -> Self {
        CallAnnotations {
            candidate_pous: SmallVec::new(),
            resolved: None,
            extensible_param_count: -1,
        }
    }
}

/// The node vocabulary: Structured Text expressions and statements,
/// Instruction List instructions, and the declaration pieces the narrower
/// touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    // -- Leaves --
    /// A literal constant. Its candidate list is its possible types.
    Literal,
    /// A named variable (or enumerated value in a case label).
    Variable { name: String },
    /// `base[sub, sub, ...]`.
    ArrayVariable { base: NodeId, subscripts: Vec<NodeId> },
    /// `lower .. upper`, as a type specification or a CASE label.
    SubrangeSpec { lower: NodeId, upper: NodeId },

    // -- ST expressions --
    BinaryLogic { op: LogicOp, lhs: NodeId, rhs: NodeId },
    Compare { op: CmpOp, lhs: NodeId, rhs: NodeId },
    BinaryArith { op: ArithOp, lhs: NodeId, rhs: NodeId },
    Unary { op: UnaryOp, expr: NodeId },
    /// `f(a, b)` / `f(X := a)`. `formal` holds [`NodeKind::ParamAssign`] nodes.
    FunctionCall {
        name: String,
        nonformal: Vec<NodeId>,
        formal: Vec<NodeId>,
        call: CallAnnotations,
    },
    /// `name := value` inside a formal parameter list.
    ParamAssign { name: String, value: NodeId },

    // -- ST statements --
    Assign { lhs: NodeId, rhs: NodeId },
    If {
        cond: NodeId,
        then_body: Vec<NodeId>,
        elsif: Vec<NodeId>,
        else_body: Vec<NodeId>,
    },
    ElsIf { cond: NodeId, body: Vec<NodeId> },
    Case {
        selector: NodeId,
        elements: Vec<NodeId>,
        else_body: Vec<NodeId>,
    },
    CaseElement { labels: Vec<NodeId>, body: Vec<NodeId> },
    For {
        control: NodeId,
        from: NodeId,
        to: NodeId,
        by: Option<NodeId>,
        body: Vec<NodeId>,
    },
    While { cond: NodeId, body: Vec<NodeId> },
    Repeat { body: Vec<NodeId>, cond: NodeId },
    /// `fb_instance(...)` invocation statement.
    FbInvocation {
        fb_name: String,
        nonformal: Vec<NodeId>,
        formal: Vec<NodeId>,
    },

    // -- Declarations --
    /// A variable declaration with an optional initial value.
    VarDecl {
        name: String,
        ty: TypeId,
        init: Option<NodeId>,
    },

    // -- Instruction List --
    /// A whole IL instruction list (a POU body).
    InstructionList { instrs: Vec<NodeId> },
    /// `[label:] instruction`. Joins (several `prev` entries) are allowed.
    Instruction {
        label: Option<String>,
        body: Option<NodeId>,
    },
    /// The parenthesized sub-list of an IL expression.
    SimpleInstrList { instrs: Vec<NodeId> },
    /// An element of a [`NodeKind::SimpleInstrList`]; at most one `prev`.
    SimpleInstruction { body: NodeId },
    /// `LD x`, `AND y`, `CLK ton1`, ... For the implicit FB operators,
    /// `fb_type` is the operand's FB type as resolved by the
    /// candidate-collection pass.
    SimpleOperation {
        op: IlSimpleOp,
        operand: Option<NodeId>,
        fb_type: Option<TypeId>,
    },
    /// `AND ( ... )` -- the operator applied to a parenthesized sub-list.
    IlExpression { op: IlSimpleOp, sublist: NodeId },
    /// Non-formal function call; the current value is the implicit first
    /// argument.
    IlFunctionCall {
        name: String,
        operands: Vec<NodeId>,
        call: CallAnnotations,
    },
    /// Formal function call `F( X := a )`.
    IlFormalFunctionCall {
        name: String,
        params: Vec<NodeId>,
        call: CallAnnotations,
    },
    /// `CAL`/`CALC`/`CALCN fb_instance ( ... )`.
    IlFbCall {
        op: IlCallOp,
        fb_name: String,
        operands: Vec<NodeId>,
        params: Vec<NodeId>,
        fb_type: Option<TypeId>,
    },
    IlJump { op: IlJumpOp, label: String },
    IlReturn { op: IlReturnOp },
}

/// One arena slot: a node kind plus its annotation fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Candidate datatypes (candidate-collection pass).
    pub candidates: SmallVec<[TypeId; 4]>,
    /// The type chosen by the narrowing pass.
    pub narrowed: Narrowed,
    /// IL back-edges: the instructions whose current value reaches this one.
    pub prev: SmallVec<[NodeId; 1]>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            candidates: SmallVec::new(),
            narrowed: Narrowed::Unknown,
            prev: SmallVec::new(),
        }
    }
}

/// The AST arena. Nodes are appended and never removed; the narrowing pass
/// mutates only annotation fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Ast { nodes: Vec::new() }
    }

    /// Appends a node with empty annotations, returning its id.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over all `(id, node)` pairs in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }
}
