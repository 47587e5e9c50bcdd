//! Narrowing of candidate datatypes.
//!
//! The candidate-collection pass leaves every AST node with the set of
//! types it could plausibly have. This pass walks each POU top-down and
//! chooses exactly one type per node (or marks the node invalid),
//! consistent with the type demanded by the surrounding context:
//!
//! - an assignment demands its single candidate type from both sides;
//! - an overloaded call is resolved to the declaration whose return type
//!   matches the demanded type, and the declaration's parameter types are
//!   demanded from the arguments;
//! - IL instruction lists are walked in reverse, threading the demanded
//!   type of the implicit current value backwards from consumers to
//!   producers, through parenthesized sub-lists and implicit FB calls.
//!
//! Type errors in user code never abort the pass; they are recorded by
//! setting the offending node's annotation to [`Narrowed::Invalid`] and the
//! walk continues, so a later diagnostics pass can report all of them.
//! [`NarrowError`] is reserved for internal invariant violations.

pub mod call;
pub mod expr;
pub mod il;
pub mod select;
pub mod stmt;

use serde::{Deserialize, Serialize};

use ironec_core::ast::{Ast, NodeKind};
use ironec_core::decl::{FbInstanceResolver, Library, Pou};
use ironec_core::id::{NodeId, PouId};
use ironec_core::type_table::TypeTable;

/// An internal invariant violation. Any of these aborts the pass: they mean
/// the input annotations are inconsistent (usually a bug in the pass that
/// produced them), not that the user program is ill-typed.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum NarrowError {
    /// A node that already committed to a type was offered an unknown
    /// demand. Callers must never retract a demand.
    #[error("node {node} was offered an unknown demand after committing to a type")]
    DemandRetracted { node: NodeId },

    /// A binary operator's operands share no candidate type.
    #[error("no common operand type for the operator at node {node}")]
    NoCommonType { node: NodeId },

    /// More than one operand pairing of a widening table matches the
    /// demanded result type.
    #[error("ambiguous widening for the operator at node {node}")]
    AmbiguousWidening { node: NodeId },

    /// A labelled instruction (join point) occurred inside a parenthesized
    /// IL expression.
    #[error("label join inside an IL expression at node {node}")]
    LabelInIlExpression { node: NodeId },

    /// An FB call site carries no FB declaration although one is required.
    #[error("FB call at node {node} has no resolved FB declaration")]
    MissingFbDeclaration { node: NodeId },

    /// A type annotation that should name a function block names something
    /// else.
    #[error("node {node} names a type that is not a function block")]
    NotAFunctionBlock { node: NodeId },

    /// A resolved declaration id is not present in the library.
    #[error("declaration PouId({pou}) is not present in the library")]
    UnresolvedDeclaration { pou: PouId },

    /// An FB invocation names an instance the scope resolver does not know.
    #[error("unknown FB instance '{name}'")]
    UnknownFbInstance { name: String },

    /// A conditional IL flow-control operator was asked to produce a
    /// non-BOOL value.
    #[error("conditional IL operator at node {node} was asked for a non-BOOL datatype")]
    NonBoolFlowDemand { node: NodeId },

    /// A conditional IL flow-control operator has more than one candidate.
    #[error("conditional IL operator at node {node} has more than one candidate datatype")]
    AmbiguousFlowCandidates { node: NodeId },
}

/// The narrowing walk over one POU.
///
/// Holds the AST being annotated plus the read-only context: the type
/// table, the declaration library, and the FB-instance resolver for the
/// current scope. IL state (the operand of the instruction being visited
/// and the synthetic previous-instruction aggregate) is passed explicitly
/// down the recursion, never stored here.
pub struct Narrower<'a> {
    pub(crate) ast: &'a mut Ast,
    pub(crate) types: &'a TypeTable,
    pub(crate) library: &'a Library,
    pub(crate) scope: &'a dyn FbInstanceResolver,
}

/// Narrows one POU: its variable declarations (initial values), then its
/// body. The body may be Structured Text statements or an IL instruction
/// list.
pub fn narrow_pou(
    ast: &mut Ast,
    types: &TypeTable,
    library: &Library,
    scope: &dyn FbInstanceResolver,
    pou: &Pou,
) -> Result<(), NarrowError> {
    let mut narrower = Narrower::new(ast, types, library, scope);
    for &decl in &pou.var_decls {
        narrower.narrow_node(decl)?;
    }
    for &stmt in &pou.body {
        narrower.narrow_node(stmt)?;
    }
    Ok(())
}

impl<'a> Narrower<'a> {
    pub fn new(
        ast: &'a mut Ast,
        types: &'a TypeTable,
        library: &'a Library,
        scope: &'a dyn FbInstanceResolver,
    ) -> Self {
        Narrower {
            ast,
            types,
            library,
            scope,
        }
    }

    /// Narrows one node. The demand from context is whatever the caller
    /// left in the node's `narrowed` field before recursing.
    ///
    /// IL instruction internals are not dispatched from here; they are only
    /// reachable through the reverse instruction-list walk, which carries
    /// the synthetic previous-instruction context.
    pub fn narrow_node(&mut self, id: NodeId) -> Result<(), NarrowError> {
        match &self.ast.node(id).kind {
            NodeKind::BinaryLogic { lhs, rhs, .. } => {
                let (lhs, rhs) = (*lhs, *rhs);
                self.narrow_logic(id, lhs, rhs)
            }
            NodeKind::Compare { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                self.narrow_compare(id, op, lhs, rhs)
            }
            NodeKind::BinaryArith { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                self.narrow_arith(id, op, lhs, rhs)
            }
            NodeKind::Unary { expr, .. } => {
                let expr = *expr;
                self.narrow_unary(id, expr)
            }
            NodeKind::FunctionCall {
                nonformal, formal, ..
            } => {
                let (nonformal, formal) = (nonformal.clone(), formal.clone());
                self.narrow_st_function_call(id, nonformal, formal)
            }
            NodeKind::ArrayVariable { subscripts, .. } => {
                let subscripts = subscripts.clone();
                self.narrow_subscripts(&subscripts)
            }
            NodeKind::SubrangeSpec { lower, upper } => {
                let (lower, upper) = (*lower, *upper);
                self.narrow_subrange(id, lower, upper)
            }
            NodeKind::Assign { lhs, rhs } => {
                let (lhs, rhs) = (*lhs, *rhs);
                self.narrow_assign(id, lhs, rhs)
            }
            NodeKind::If {
                cond,
                then_body,
                elsif,
                else_body,
            } => {
                let cond = *cond;
                let (then_body, elsif, else_body) =
                    (then_body.clone(), elsif.clone(), else_body.clone());
                self.narrow_if(cond, &then_body, &elsif, &else_body)
            }
            NodeKind::ElsIf { cond, body } => {
                let (cond, body) = (*cond, body.clone());
                self.narrow_elsif(cond, &body)
            }
            NodeKind::Case {
                selector,
                elements,
                else_body,
            } => {
                let selector = *selector;
                let (elements, else_body) = (elements.clone(), else_body.clone());
                self.narrow_case(selector, &elements, &else_body)
            }
            NodeKind::CaseElement { labels, body } => {
                let (labels, body) = (labels.clone(), body.clone());
                self.narrow_case_element(id, &labels, &body)
            }
            NodeKind::For {
                control,
                from,
                to,
                by,
                body,
            } => {
                let (control, from, to, by) = (*control, *from, *to, *by);
                let body = body.clone();
                self.narrow_for(control, from, to, by, &body)
            }
            NodeKind::While { cond, body } => {
                let (cond, body) = (*cond, body.clone());
                self.narrow_while(cond, &body)
            }
            NodeKind::Repeat { body, cond } => {
                let (cond, body) = (*cond, body.clone());
                self.narrow_repeat(cond, &body)
            }
            NodeKind::FbInvocation {
                fb_name,
                nonformal,
                formal,
            } => {
                let fb_name = fb_name.clone();
                let (nonformal, formal) = (nonformal.clone(), formal.clone());
                self.narrow_fb_invocation(id, fb_name, &nonformal, &formal)
            }
            NodeKind::VarDecl { .. } => self.narrow_var_decl(id),
            NodeKind::InstructionList { .. } => self.narrow_instruction_list(id),
            // Literals, variables, and param assignments have no children to
            // narrow; IL instruction internals are handled by the IL walk.
            _ => Ok(()),
        }
    }
}
