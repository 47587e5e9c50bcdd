//! Test fixtures: hand-annotated ASTs.
//!
//! The candidate-collection pass runs before narrowing and is outside this
//! crate, so tests populate `candidates`, `prev` back-edges, and call
//! candidate lists by hand, the way that pass would have.

use ironec_core::ast::{Ast, CallAnnotations, NodeKind};
use ironec_core::decl::{Library, ParamDecl, Pou, PouDecl, ScopeMap};
use ironec_core::id::{NodeId, PouId, TypeId};
use ironec_core::ops::IlSimpleOp;
use ironec_core::type_table::TypeTable;
use ironec_core::types::TypeKind;

use crate::narrow::Narrower;

/// A self-contained narrowing environment.
pub(crate) struct Fixture {
    pub types: TypeTable,
    pub library: Library,
    pub scope: ScopeMap,
    pub ast: Ast,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture {
            types: TypeTable::new(),
            library: Library::new(),
            scope: ScopeMap::new(),
            ast: Ast::new(),
        }
    }

    pub fn narrower(&mut self) -> Narrower<'_> {
        Narrower::new(&mut self.ast, &self.types, &self.library, &self.scope)
    }

    /// Registers the SINT and INT overloads of the extensible `ADD`
    /// standard function, returning `(sint_add, int_add)`.
    pub fn add_overloads(&mut self) -> (PouId, PouId) {
        let sint = self.library.add(
            PouDecl::function(
                "ADD",
                TypeId::SINT,
                vec![
                    ParamDecl::input("IN1", TypeId::SINT),
                    ParamDecl::input("IN2", TypeId::SINT),
                ],
            )
            .extensible(0),
        );
        let int = self.library.add(
            PouDecl::function(
                "ADD",
                TypeId::INT,
                vec![
                    ParamDecl::input("IN1", TypeId::INT),
                    ParamDecl::input("IN2", TypeId::INT),
                ],
            )
            .extensible(0),
        );
        (sint, int)
    }

    /// Registers a `TON` function block with `IN`/`CLK` BOOL inputs and a
    /// `PT` TIME input, plus an instance named `ton1` in scope. Returns the
    /// FB's type id.
    pub fn ton_instance(&mut self) -> TypeId {
        let decl = self.library.add(PouDecl::function_block(
            "TON",
            vec![
                ParamDecl::input("IN", TypeId::BOOL),
                ParamDecl::input("CLK", TypeId::BOOL),
                ParamDecl::input("PT", TypeId::TIME),
            ],
        ));
        let fb_type = self.types.register(TypeKind::FunctionBlock(decl));
        self.scope.insert("ton1", fb_type);
        fb_type
    }

    /// A minimal POU wrapper around the given declarations and body.
    pub fn pou(&mut self, var_decls: Vec<NodeId>, body: Vec<NodeId>) -> Pou {
        let decl = self
            .library
            .add(PouDecl::function("MAIN", TypeId::BOOL, vec![]));
        Pou {
            decl,
            var_decls,
            body,
        }
    }
}

/// A literal with the given candidate types.
pub(crate) fn literal(ast: &mut Ast, candidates: &[TypeId]) -> NodeId {
    let id = ast.add_node(NodeKind::Literal);
    ast.node_mut(id).candidates.extend_from_slice(candidates);
    id
}

/// A named variable with the given candidate types.
pub(crate) fn variable(ast: &mut Ast, name: &str, candidates: &[TypeId]) -> NodeId {
    let id = ast.add_node(NodeKind::Variable { name: name.into() });
    ast.node_mut(id).candidates.extend_from_slice(candidates);
    id
}

/// A non-formal function call with candidate return types and the matching
/// candidate declarations.
pub(crate) fn function_call(
    ast: &mut Ast,
    name: &str,
    args: Vec<NodeId>,
    candidates: &[(TypeId, PouId)],
) -> NodeId {
    let call = CallAnnotations {
        candidate_pous: candidates.iter().map(|&(_, p)| p).collect(),
        ..CallAnnotations::default()
    };
    let id = ast.add_node(NodeKind::FunctionCall {
        name: name.into(),
        nonformal: args,
        formal: vec![],
        call,
    });
    ast.node_mut(id)
        .candidates
        .extend(candidates.iter().map(|&(t, _)| t));
    id
}

/// An outer IL instruction wrapping `body`, with `prev` back-edges.
pub(crate) fn instruction(ast: &mut Ast, body: Option<NodeId>, prev: &[NodeId]) -> NodeId {
    let id = ast.add_node(NodeKind::Instruction { label: None, body });
    ast.node_mut(id).prev.extend_from_slice(prev);
    id
}

/// A simple IL operation (`LD x`, `ST y`, `AND z`, ...) with candidates.
pub(crate) fn simple_op(
    ast: &mut Ast,
    op: IlSimpleOp,
    operand: Option<NodeId>,
    candidates: &[TypeId],
) -> NodeId {
    let id = ast.add_node(NodeKind::SimpleOperation {
        op,
        operand,
        fb_type: None,
    });
    ast.node_mut(id).candidates.extend_from_slice(candidates);
    id
}

/// An element of a parenthesized IL sub-list, with its single back-edge.
pub(crate) fn simple_instruction(ast: &mut Ast, body: NodeId, prev: &[NodeId]) -> NodeId {
    let id = ast.add_node(NodeKind::SimpleInstruction { body });
    ast.node_mut(id).prev.extend_from_slice(prev);
    id
}

/// The whole-POU instruction list node.
pub(crate) fn instruction_list(ast: &mut Ast, instrs: Vec<NodeId>) -> NodeId {
    ast.add_node(NodeKind::InstructionList { instrs })
}
