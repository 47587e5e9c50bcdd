//! Narrowing of function and FB invocations.
//!
//! Overloaded calls are resolved against the demanded return type: the
//! candidate-collection pass left one candidate declaration per candidate
//! return type, and the declaration whose return type equals the call
//! node's chosen datatype wins. A call with a single candidate is accepted
//! even without a demand, so parameter errors inside otherwise broken
//! contexts still get reported. An unresolvable overload is left
//! unresolved and the arguments are not descended into.
//!
//! Arguments are narrowed through [`ArgSlot`]s: either real AST nodes, or
//! stack-allocated [`Scratch`] slots. The scratch slots are how the IL
//! current value takes part in calls (the implicit first argument of a
//! non-formal IL call, the parameter value of an implicit FB call) without
//! any temporary edit of the AST's operand lists.

use smallvec::SmallVec;

use ironec_core::ast::{CallAnnotations, Narrowed, NodeKind};
use ironec_core::decl::ParamView;
use ironec_core::id::{NodeId, PouId, TypeId};

use super::select::select;
use super::{NarrowError, Narrower};

/// A stand-in for a value that is not an AST node: it has a candidate list
/// and receives a narrowing like a node, but there is nothing to recurse
/// into.
pub(crate) struct Scratch {
    pub candidates: SmallVec<[TypeId; 4]>,
    pub narrowed: Narrowed,
}

impl Scratch {
    pub fn with_candidates(candidates: SmallVec<[TypeId; 4]>) -> Self {
        Scratch {
            candidates,
            narrowed: Narrowed::Unknown,
        }
    }
}

/// One argument position of a call.
pub(crate) enum ArgSlot<'s> {
    Node(NodeId),
    Scratch(&'s mut Scratch),
}

/// A call site reduced to what resolution and parameter propagation need:
/// the optional positional argument list and the optional named argument
/// list.
pub(crate) struct GenericCall<'s> {
    pub nonformal: Option<Vec<ArgSlot<'s>>>,
    pub formal: Option<Vec<(String, ArgSlot<'s>)>>,
}

impl Narrower<'_> {
    /// Resolves and narrows a function invocation (ST or IL, either
    /// parameter style). Writes the resolved declaration and extensible
    /// count into the call node's annotations.
    pub(crate) fn narrow_function_invocation(
        &mut self,
        site: NodeId,
        mut call: GenericCall<'_>,
    ) -> Result<(), NarrowError> {
        let resolved = self.resolve_overload(site);
        if let Some(annotations) = self.call_annotations_mut(site) {
            annotations.resolved = resolved;
        }
        // Without a unique declaration the argument expressions cannot be
        // meaningfully checked; diagnostics happen downstream.
        let Some(decl) = resolved else { return Ok(()) };

        let mut ext_count = -1;
        if let Some(args) = call.nonformal.as_mut() {
            ext_count = self.narrow_nonformal_args(site, decl, args)?;
        }
        if let Some(args) = call.formal.as_mut() {
            ext_count = self.narrow_formal_args(site, decl, args)?;
        }
        if let Some(annotations) = self.call_annotations_mut(site) {
            annotations.extensible_param_count = ext_count;
        }
        Ok(())
    }

    /// The declaration whose return type equals the call's chosen datatype,
    /// or the sole candidate regardless of demand.
    fn resolve_overload(&self, site: NodeId) -> Option<PouId> {
        let node = self.ast.node(site);
        let annotations = call_annotations(&node.kind)?;
        let mut resolved = None;
        if let Narrowed::Typed(t) = node.narrowed {
            for (i, &c) in node.candidates.iter().enumerate() {
                if self.types.is_type_equal(c, t) {
                    resolved = annotations.candidate_pous.get(i).copied();
                    break;
                }
            }
        }
        if node.candidates.len() == 1 {
            resolved = annotations.candidate_pous.first().copied();
        }
        resolved
    }

    /// Positional arguments: walk the declaration's inputs (skipping EN and
    /// ENO), demand each declared type from the matching argument, and
    /// record the highest extensible parameter index used.
    pub(crate) fn narrow_nonformal_args(
        &mut self,
        site: NodeId,
        decl: PouId,
        args: &mut [ArgSlot<'_>],
    ) -> Result<i32, NarrowError> {
        let mut views: Vec<Option<ParamView>> = Vec::with_capacity(args.len());
        {
            let pou = self
                .library
                .get(decl)
                .ok_or(NarrowError::UnresolvedDeclaration { pou: decl })?;
            let mut params = pou.param_iter();
            for _ in 0..args.len() {
                let view = loop {
                    match params.next() {
                        // More actuals than declared parameters: tolerated
                        // here, diagnosed downstream.
                        None => break None,
                        Some(v) if v.name == "EN" || v.name == "ENO" => continue,
                        Some(v) => break Some(v),
                    }
                };
                views.push(view);
            }
        }

        let mut highest_ext = -1;
        for (arg, view) in args.iter_mut().zip(views) {
            let demand = match &view {
                Some(v) => Narrowed::Typed(self.types.base_type(v.ty)),
                None => Narrowed::Unknown,
            };
            self.offer_arg(site, demand, arg)?;
            if let Some(ext) = view.and_then(|v| v.extensible_index) {
                highest_ext = highest_ext.max(ext);
            }
        }
        self.extensible_count(decl, highest_ext)
    }

    /// Named arguments: resolve each name against the declaration; a name
    /// the declaration does not know yields no demand, but the argument
    /// expression is still narrowed.
    pub(crate) fn narrow_formal_args(
        &mut self,
        site: NodeId,
        decl: PouId,
        args: &mut [(String, ArgSlot<'_>)],
    ) -> Result<i32, NarrowError> {
        let mut highest_ext = -1;
        for (name, arg) in args.iter_mut() {
            let view = self
                .library
                .get(decl)
                .ok_or(NarrowError::UnresolvedDeclaration { pou: decl })?
                .search_param(name);
            let demand = match &view {
                Some(v) => Narrowed::Typed(self.types.base_type(v.ty)),
                None => Narrowed::Unknown,
            };
            self.offer_arg(site, demand, arg)?;
            if let Some(ext) = view.and_then(|v| v.extensible_index) {
                highest_ext = highest_ext.max(ext);
            }
        }
        self.extensible_count(decl, highest_ext)
    }

    /// Narrows an FB call (ST invocation statement, or IL CAL) against a
    /// known declaration. FB calls have no return type to resolve and no
    /// extensible parameters to count.
    pub(crate) fn narrow_fb_call(
        &mut self,
        site: NodeId,
        decl: PouId,
        nonformal: &[NodeId],
        formal: &[NodeId],
    ) -> Result<(), NarrowError> {
        if !nonformal.is_empty() {
            let mut args: Vec<ArgSlot<'_>> = nonformal.iter().map(|&n| ArgSlot::Node(n)).collect();
            self.narrow_nonformal_args(site, decl, &mut args)?;
        }
        if !formal.is_empty() {
            let mut args = self.formal_args_from_nodes(formal);
            self.narrow_formal_args(site, decl, &mut args)?;
        }
        Ok(())
    }

    /// An ST function invocation `f(a, b)` / `f(X := a)`.
    pub(crate) fn narrow_st_function_call(
        &mut self,
        site: NodeId,
        nonformal: Vec<NodeId>,
        formal: Vec<NodeId>,
    ) -> Result<(), NarrowError> {
        let call = GenericCall {
            nonformal: (!nonformal.is_empty())
                .then(|| nonformal.iter().map(|&n| ArgSlot::Node(n)).collect()),
            formal: (!formal.is_empty()).then(|| self.formal_args_from_nodes(&formal)),
        };
        self.narrow_function_invocation(site, call)
    }

    /// Expands `ParamAssign` nodes into named argument slots.
    pub(crate) fn formal_args_from_nodes(
        &self,
        params: &[NodeId],
    ) -> Vec<(String, ArgSlot<'static>)> {
        params
            .iter()
            .filter_map(|&p| match &self.ast.node(p).kind {
                NodeKind::ParamAssign { name, value } => {
                    Some((name.clone(), ArgSlot::Node(*value)))
                }
                _ => None,
            })
            .collect()
    }

    /// Offers a demand to one argument slot and, for real nodes, recurses.
    fn offer_arg(
        &mut self,
        site: NodeId,
        demand: Narrowed,
        arg: &mut ArgSlot<'_>,
    ) -> Result<(), NarrowError> {
        match arg {
            ArgSlot::Node(id) => {
                let id = *id;
                self.offer(demand, id)?;
                self.narrow_node(id)
            }
            ArgSlot::Scratch(scratch) => {
                scratch.narrowed =
                    select(self.types, &scratch.candidates, scratch.narrowed, demand)
                        .ok_or(NarrowError::DemandRetracted { node: site })?;
                Ok(())
            }
        }
    }

    fn extensible_count(&self, decl: PouId, highest_ext: i32) -> Result<i32, NarrowError> {
        if highest_ext < 0 {
            return Ok(-1);
        }
        let first = self
            .library
            .get(decl)
            .ok_or(NarrowError::UnresolvedDeclaration { pou: decl })?
            .first_extensible_param_index();
        Ok(match first {
            Some(f) => 1 + highest_ext - f as i32,
            None => -1,
        })
    }
}

/// The call annotations of a call-site node kind.
fn call_annotations(kind: &NodeKind) -> Option<&CallAnnotations> {
    match kind {
        NodeKind::FunctionCall { call, .. }
        | NodeKind::IlFunctionCall { call, .. }
        | NodeKind::IlFormalFunctionCall { call, .. } => Some(call),
        _ => None,
    }
}

impl Narrower<'_> {
    pub(crate) fn call_annotations_mut(&mut self, id: NodeId) -> Option<&mut CallAnnotations> {
        match &mut self.ast.node_mut(id).kind {
            NodeKind::FunctionCall { call, .. }
            | NodeKind::IlFunctionCall { call, .. }
            | NodeKind::IlFormalFunctionCall { call, .. } => Some(call),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{function_call, literal, variable, Fixture};
    use ironec_core::decl::{ParamDecl, PouDecl};

    fn resolved_of(fx: &Fixture, id: NodeId) -> Option<PouId> {
        match &fx.ast.node(id).kind {
            NodeKind::FunctionCall { call, .. } => call.resolved,
            _ => None,
        }
    }

    fn ext_count_of(fx: &Fixture, id: NodeId) -> i32 {
        match &fx.ast.node(id).kind {
            NodeKind::FunctionCall { call, .. } => call.extensible_param_count,
            _ => panic!("not a call"),
        }
    }

    #[test]
    fn overload_resolves_against_the_demanded_return_type() {
        let mut fx = Fixture::new();
        let (sint_add, int_add) = fx.add_overloads();
        let a = variable(&mut fx.ast, "a", &[TypeId::SINT, TypeId::INT]);
        let b = variable(&mut fx.ast, "b", &[TypeId::INT]);
        let call = function_call(
            &mut fx.ast,
            "ADD",
            vec![a, b],
            &[(TypeId::SINT, sint_add), (TypeId::INT, int_add)],
        );
        fx.ast.node_mut(call).narrowed = Narrowed::Typed(TypeId::INT);
        fx.narrower().narrow_node(call).unwrap();

        assert_eq!(resolved_of(&fx, call), Some(int_add));
        assert_eq!(fx.ast.node(a).narrowed, Narrowed::Typed(TypeId::INT));
        assert_eq!(fx.ast.node(b).narrowed, Narrowed::Typed(TypeId::INT));
    }

    #[test]
    fn argument_outside_its_candidates_goes_invalid() {
        let mut fx = Fixture::new();
        let (sint_add, int_add) = fx.add_overloads();
        // `a` can only be SINT, but the INT overload is demanded.
        let a = variable(&mut fx.ast, "a", &[TypeId::SINT]);
        let b = variable(&mut fx.ast, "b", &[TypeId::INT]);
        let call = function_call(
            &mut fx.ast,
            "ADD",
            vec![a, b],
            &[(TypeId::SINT, sint_add), (TypeId::INT, int_add)],
        );
        fx.ast.node_mut(call).narrowed = Narrowed::Typed(TypeId::INT);
        fx.narrower().narrow_node(call).unwrap();

        assert_eq!(fx.ast.node(a).narrowed, Narrowed::Invalid);
        assert_eq!(fx.ast.node(b).narrowed, Narrowed::Typed(TypeId::INT));
    }

    #[test]
    fn sole_candidate_is_accepted_without_a_demand() {
        let mut fx = Fixture::new();
        let (sint_add, _) = fx.add_overloads();
        let a = variable(&mut fx.ast, "a", &[TypeId::SINT]);
        let call = function_call(&mut fx.ast, "ADD", vec![a], &[(TypeId::SINT, sint_add)]);
        fx.narrower().narrow_node(call).unwrap();

        // No demand reached the call, but the single declaration is still
        // chosen so the arguments get checked.
        assert_eq!(resolved_of(&fx, call), Some(sint_add));
        assert_eq!(fx.ast.node(a).narrowed, Narrowed::Typed(TypeId::SINT));
    }

    #[test]
    fn unresolvable_overload_does_not_descend() {
        let mut fx = Fixture::new();
        let (sint_add, int_add) = fx.add_overloads();
        let a = variable(&mut fx.ast, "a", &[TypeId::SINT, TypeId::INT]);
        let call = function_call(
            &mut fx.ast,
            "ADD",
            vec![a],
            &[(TypeId::SINT, sint_add), (TypeId::INT, int_add)],
        );
        // No demand and two candidates: resolution must give up.
        fx.narrower().narrow_node(call).unwrap();

        assert_eq!(resolved_of(&fx, call), None);
        assert!(fx.ast.node(a).narrowed.is_unknown());
    }

    #[test]
    fn extensible_count_records_the_variadic_tail() {
        let mut fx = Fixture::new();
        let (_, int_add) = fx.add_overloads();
        let args: Vec<NodeId> = (0..4)
            .map(|_| literal(&mut fx.ast, &[TypeId::INT]))
            .collect();
        let call = function_call(&mut fx.ast, "ADD", args, &[(TypeId::INT, int_add)]);
        fx.ast.node_mut(call).narrowed = Narrowed::Typed(TypeId::INT);
        fx.narrower().narrow_node(call).unwrap();

        // Four actuals on an ADD extensible from its first parameter.
        assert_eq!(ext_count_of(&fx, call), 4);
    }

    #[test]
    fn non_extensible_call_reports_minus_one() {
        let mut fx = Fixture::new();
        let max = fx.library.add(PouDecl::function(
            "MAX1",
            TypeId::INT,
            vec![ParamDecl::input("IN", TypeId::INT)],
        ));
        let a = literal(&mut fx.ast, &[TypeId::INT]);
        let call = function_call(&mut fx.ast, "MAX1", vec![a], &[(TypeId::INT, max)]);
        fx.narrower().narrow_node(call).unwrap();
        assert_eq!(ext_count_of(&fx, call), -1);
    }

    #[test]
    fn formal_call_resolves_names_and_tolerates_unknown_ones() {
        let mut fx = Fixture::new();
        let (_, int_add) = fx.add_overloads();
        let a = variable(&mut fx.ast, "a", &[TypeId::INT]);
        let bogus = variable(&mut fx.ast, "b", &[TypeId::INT]);
        let p1 = fx.ast.add_node(NodeKind::ParamAssign {
            name: "IN1".into(),
            value: a,
        });
        let p2 = fx.ast.add_node(NodeKind::ParamAssign {
            name: "NO_SUCH".into(),
            value: bogus,
        });
        let call = CallAnnotations {
            candidate_pous: [int_add].into_iter().collect(),
            ..CallAnnotations::default()
        };
        let site = fx.ast.add_node(NodeKind::FunctionCall {
            name: "ADD".into(),
            nonformal: vec![],
            formal: vec![p1, p2],
            call,
        });
        fx.ast.node_mut(site).candidates.push(TypeId::INT);
        fx.narrower().narrow_node(site).unwrap();

        assert_eq!(fx.ast.node(a).narrowed, Narrowed::Typed(TypeId::INT));
        // The unknown name carried no demand; the value stays unknown but
        // was still visited.
        assert!(fx.ast.node(bogus).narrowed.is_unknown());
    }

    #[test]
    fn en_and_eno_are_skipped_in_positional_walks() {
        let mut fx = Fixture::new();
        let decl = fx.library.add(PouDecl::function(
            "F",
            TypeId::INT,
            vec![
                ParamDecl::input("EN", TypeId::BOOL),
                ParamDecl::input("ENO", TypeId::BOOL),
                ParamDecl::input("IN", TypeId::INT),
            ],
        ));
        let a = literal(&mut fx.ast, &[TypeId::INT]);
        let call = function_call(&mut fx.ast, "F", vec![a], &[(TypeId::INT, decl)]);
        fx.narrower().narrow_node(call).unwrap();
        // The first positional actual lands on IN, not EN.
        assert_eq!(fx.ast.node(a).narrowed, Narrowed::Typed(TypeId::INT));
    }
}
