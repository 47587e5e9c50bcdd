//! Narrowing of Instruction List code.
//!
//! IL instructions execute sequentially, reading and writing an implicit
//! current value. Narrowing walks each instruction list in strict reverse
//! order, so the type a consumer demands is known before its producers are
//! visited. The candidate-collection pass recorded, per instruction, the
//! `prev` back-edges of the instructions whose value can flow in (several
//! at a label join); their intersected candidate lists and the back-edge
//! list itself travel down the visit as a stack-allocated [`FakePrev`]
//! frame rather than as mutable visitor state.
//!
//! The implicit FB call operators (`CLK ton1` and friends) are narrowed by
//! synthesizing the equivalent explicit `CAL ton1(CLK := <current value>)`
//! on the stack: a [`Scratch`] argument slot stands in for the current
//! value, so the shared formal-call logic applies unchanged and the AST
//! operand lists are never edited.

use smallvec::SmallVec;

use ironec_core::ast::{Narrowed, NodeKind};
use ironec_core::id::{NodeId, TypeId};
use ironec_core::ops::{FbParamOp, IlCallOp, IlJumpOp, IlReturnOp, IlSimpleOp};
use ironec_core::types::TypeKind;

use super::call::{ArgSlot, GenericCall, Scratch};
use super::{NarrowError, Narrower};

/// The synthetic aggregate of the predecessor instructions in scope: the
/// intersection of their candidate lists, for sub-handlers that look the
/// current value up, and the back-edge list itself, for broadcasting a
/// chosen type.
pub(crate) struct FakePrev {
    pub candidates: SmallVec<[TypeId; 4]>,
    pub prevs: SmallVec<[NodeId; 1]>,
}

impl Narrower<'_> {
    /// Narrows a whole instruction list, last instruction first.
    pub(crate) fn narrow_instruction_list(&mut self, id: NodeId) -> Result<(), NarrowError> {
        let instrs = match &self.ast.node(id).kind {
            NodeKind::InstructionList { instrs } => instrs.clone(),
            _ => return Ok(()),
        };
        for &instr in instrs.iter().rev() {
            self.narrow_instruction(instr)?;
        }
        Ok(())
    }

    /// One `[label:] instruction` line. An empty line cannot produce the
    /// demanded value itself, so the demand passes to its predecessors.
    fn narrow_instruction(&mut self, id: NodeId) -> Result<(), NarrowError> {
        let (body, prevs, demand) = {
            let node = self.ast.node(id);
            let body = match &node.kind {
                NodeKind::Instruction { body, .. } => *body,
                _ => return Ok(()),
            };
            (body, node.prev.clone(), node.narrowed)
        };
        match body {
            None => self.offer_to_prev(demand, &prevs),
            Some(body) => {
                let frame = FakePrev {
                    candidates: self.intersect_prev_candidates(&prevs),
                    prevs,
                };
                // The demand was chosen by the following instruction; tell
                // the body what it must produce.
                self.ast.node_mut(body).narrowed = demand;
                self.narrow_il_node(body, &frame)
            }
        }
    }

    /// Candidate types every predecessor can produce.
    fn intersect_prev_candidates(&self, prevs: &[NodeId]) -> SmallVec<[TypeId; 4]> {
        let Some((&first, rest)) = prevs.split_first() else {
            return SmallVec::new();
        };
        let mut out = self.ast.node(first).candidates.clone();
        for &p in rest {
            let cands = &self.ast.node(p).candidates;
            out.retain(|&mut c| self.types.search_in_candidates(c, cands).is_some());
        }
        out
    }

    fn narrow_il_node(&mut self, id: NodeId, frame: &FakePrev) -> Result<(), NarrowError> {
        match &self.ast.node(id).kind {
            NodeKind::SimpleOperation {
                op,
                operand,
                fb_type,
            } => {
                let (op, operand, fb_type) = (*op, *operand, *fb_type);
                self.narrow_simple_operation(id, op, operand, fb_type, frame)
            }
            NodeKind::IlExpression { sublist, .. } => {
                let sublist = *sublist;
                self.narrow_il_expression(id, sublist, frame)
            }
            NodeKind::IlFunctionCall { operands, .. } => {
                let operands = operands.clone();
                self.narrow_il_function_call(id, operands, frame)
            }
            NodeKind::IlFormalFunctionCall { params, .. } => {
                let params = params.clone();
                let call = GenericCall {
                    nonformal: None,
                    formal: Some(self.formal_args_from_nodes(&params)),
                };
                self.narrow_function_invocation(id, call)
            }
            NodeKind::IlFbCall {
                op,
                operands,
                params,
                fb_type,
                ..
            } => {
                let (op, fb_type) = (*op, *fb_type);
                let (operands, params) = (operands.clone(), params.clone());
                self.narrow_il_fb_call(id, op, &operands, &params, fb_type, frame)
            }
            NodeKind::IlJump { op, .. } => {
                let op = *op;
                match op {
                    IlJumpOp::Jmp => {
                        let demand = self.ast.node(id).narrowed;
                        self.offer_to_prev(demand, &frame.prevs)
                    }
                    IlJumpOp::Jmpc | IlJumpOp::Jmpcn => self.narrow_conditional_flow(id, frame),
                }
            }
            NodeKind::IlReturn { op } => {
                let op = *op;
                match op {
                    IlReturnOp::Ret => {
                        let demand = self.ast.node(id).narrowed;
                        self.offer_to_prev(demand, &frame.prevs)
                    }
                    IlReturnOp::Retc | IlReturnOp::Retcn => self.narrow_conditional_flow(id, frame),
                }
            }
            _ => Ok(()),
        }
    }

    fn narrow_simple_operation(
        &mut self,
        id: NodeId,
        op: IlSimpleOp,
        operand: Option<NodeId>,
        fb_type: Option<TypeId>,
        frame: &FakePrev,
    ) -> Result<(), NarrowError> {
        match op {
            // Producers: the demand lands on the operand, nothing flows
            // further upstream.
            IlSimpleOp::Ld | IlSimpleOp::Ldn => {
                let demand = self.ast.node(id).narrowed;
                if demand.is_unknown() {
                    return Ok(());
                }
                if let Some(operand) = operand {
                    self.push_demand(demand, operand)?;
                }
                Ok(())
            }
            // Consumers: the destination variable determines the type of
            // both the operand and the incoming current value.
            IlSimpleOp::St | IlSimpleOp::Stn => {
                let chosen = {
                    let node = self.ast.node(id);
                    if node.candidates.len() != 1 {
                        return Ok(());
                    }
                    node.candidates[0]
                };
                let demand = Narrowed::Typed(chosen);
                self.ast.node_mut(id).narrowed = demand;
                if let Some(operand) = operand {
                    self.push_demand(demand, operand)?;
                }
                self.offer_to_prev(demand, &frame.prevs)
            }
            IlSimpleOp::FbParam(param) => {
                self.narrow_implicit_fb_call(id, param, operand, fb_type, frame)
            }
            // Everything else transforms the current value: the demanded
            // result type flows upstream and into the operand unchanged.
            // S and R are treated as transforms; they may actually be FB
            // call forms, which a later pass diagnoses.
            _ => self.narrow_il_transform(id, operand, frame),
        }
    }

    fn narrow_il_transform(
        &mut self,
        id: NodeId,
        operand: Option<NodeId>,
        frame: &FakePrev,
    ) -> Result<(), NarrowError> {
        let demand = self.ast.node(id).narrowed;
        if demand.is_unknown() {
            // The following instructions could not determine a type for
            // this instruction to produce.
            return Ok(());
        }
        // Broadcast before descending into the operand: the operand may be
        // a parenthesized list that rebinds the predecessor frame.
        self.offer_to_prev(demand, &frame.prevs)?;
        if let Some(operand) = operand {
            self.push_demand(demand, operand)?;
        }
        Ok(())
    }

    /// `AND ( ... )`: the parenthesized sub-list produces the operator's
    /// right operand, so it must produce the same type the operator was
    /// asked for, and the predecessors must supply it as well.
    fn narrow_il_expression(
        &mut self,
        id: NodeId,
        sublist: NodeId,
        frame: &FakePrev,
    ) -> Result<(), NarrowError> {
        let demand = self.ast.node(id).narrowed;
        if !demand.is_unknown() {
            self.offer_to_prev(demand, &frame.prevs)?;
            self.ast.node_mut(sublist).narrowed = demand;
        }
        // The sub-list is traversed with its own frames; the caller's frame
        // is untouched by construction.
        self.narrow_simple_instr_list(sublist)
    }

    fn narrow_simple_instr_list(&mut self, id: NodeId) -> Result<(), NarrowError> {
        let instrs = match &self.ast.node(id).kind {
            NodeKind::SimpleInstrList { instrs } => instrs.clone(),
            _ => return Ok(()),
        };
        if let Some(&last) = instrs.last() {
            let demand = self.ast.node(id).narrowed;
            self.ast.node_mut(last).narrowed = demand;
        }
        for &instr in instrs.iter().rev() {
            self.narrow_simple_instruction(instr)?;
        }
        Ok(())
    }

    fn narrow_simple_instruction(&mut self, id: NodeId) -> Result<(), NarrowError> {
        let (body, prevs, demand) = {
            let node = self.ast.node(id);
            let body = match &node.kind {
                NodeKind::SimpleInstruction { body } => *body,
                _ => return Ok(()),
            };
            if node.prev.len() > 1 {
                // Labelled instructions cannot occur inside an IL expression.
                return Err(NarrowError::LabelInIlExpression { node: id });
            }
            (body, node.prev.clone(), node.narrowed)
        };
        let candidates = prevs
            .first()
            .map(|&p| self.ast.node(p).candidates.clone())
            .unwrap_or_default();
        let frame = FakePrev { candidates, prevs };
        self.ast.node_mut(body).narrowed = demand;
        self.narrow_il_node(body, &frame)
    }

    /// Non-formal function call in IL: the current value is the implicit
    /// first argument. A scratch slot sharing the predecessors' candidate
    /// intersection takes that position, and whatever type the resolved
    /// declaration assigned to it is what the predecessors must produce.
    fn narrow_il_function_call(
        &mut self,
        id: NodeId,
        operands: Vec<NodeId>,
        frame: &FakePrev,
    ) -> Result<(), NarrowError> {
        let mut current = Scratch::with_candidates(frame.candidates.clone());
        {
            let mut args: Vec<ArgSlot<'_>> = Vec::with_capacity(operands.len() + 1);
            args.push(ArgSlot::Scratch(&mut current));
            args.extend(operands.iter().map(|&n| ArgSlot::Node(n)));
            self.narrow_function_invocation(
                id,
                GenericCall {
                    nonformal: Some(args),
                    formal: None,
                },
            )?;
        }
        self.offer_to_prev(current.narrowed, &frame.prevs)
    }

    fn narrow_il_fb_call(
        &mut self,
        id: NodeId,
        op: IlCallOp,
        operands: &[NodeId],
        params: &[NodeId],
        fb_type: Option<TypeId>,
        frame: &FakePrev,
    ) -> Result<(), NarrowError> {
        // A call to an undeclared FB is caught before this pass runs.
        let Some(fb_type) = fb_type else {
            return Err(NarrowError::MissingFbDeclaration { node: id });
        };
        let decl = match self.types.get(fb_type) {
            Some(TypeKind::FunctionBlock(pou)) => *pou,
            _ => return Err(NarrowError::NotAFunctionBlock { node: id }),
        };
        self.narrow_fb_call(id, decl, operands, params)?;

        // The call operator decides what flows upstream: CAL leaves the
        // current value untouched, the conditional forms consume a BOOL.
        match op {
            IlCallOp::Cal => {
                let demand = self.ast.node(id).narrowed;
                self.offer_to_prev(demand, &frame.prevs)
            }
            IlCallOp::Calc | IlCallOp::Calcn => self.narrow_conditional_flow(id, frame),
        }
    }

    /// CALC/CALCN, JMPC/JMPCN, RETC/RETCN: the instruction consumes a BOOL
    /// current value. If the following instructions demanded anything other
    /// than BOOL from it, the candidate-collection pass malfunctioned.
    fn narrow_conditional_flow(&mut self, id: NodeId, frame: &FakePrev) -> Result<(), NarrowError> {
        let (demand, candidates) = {
            let node = self.ast.node(id);
            (node.narrowed, node.candidates.clone())
        };
        match demand {
            Narrowed::Typed(t) if !self.types.is_bool(t) => {
                return Err(NarrowError::NonBoolFlowDemand { node: id });
            }
            Narrowed::Invalid => {
                return Err(NarrowError::NonBoolFlowDemand { node: id });
            }
            _ => {}
        }
        if candidates.len() > 1 {
            return Err(NarrowError::AmbiguousFlowCandidates { node: id });
        }
        // Even with no following instruction, a BOOL must be demanded from
        // the predecessors when the candidate list offers one.
        let chosen = match candidates.first() {
            Some(&t) => {
                if !self.types.is_bool(t) {
                    return Err(NarrowError::NonBoolFlowDemand { node: id });
                }
                Narrowed::Typed(t)
            }
            None => Narrowed::Unknown,
        };
        self.ast.node_mut(id).narrowed = chosen;
        self.offer_to_prev(chosen, &frame.prevs)
    }

    /// `CLK ton1` and friends: rewrite into `CAL ton1(CLK := <current>)`
    /// and reconcile the FB input's demand with the demand of the
    /// instructions that follow.
    fn narrow_implicit_fb_call(
        &mut self,
        id: NodeId,
        param: FbParamOp,
        operand: Option<NodeId>,
        fb_type: Option<TypeId>,
        frame: &FakePrev,
    ) -> Result<(), NarrowError> {
        // The operand is the FB being called; type it as such.
        if let Some(operand) = operand {
            let demand = match fb_type {
                Some(t) => Narrowed::Typed(t),
                None => Narrowed::Unknown,
            };
            self.offer(demand, operand)?;
            self.narrow_node(operand)?;
        }
        let operand_typed = operand
            .map(|o| self.ast.node(o).narrowed)
            .unwrap_or(Narrowed::Unknown);

        if frame.prevs.is_empty() {
            // No current value flows in; there is nothing to type-check.
            return Ok(());
        }
        if operand_typed.is_unknown() {
            // The operand is not an FB instance. Pass the demand upstream;
            // the diagnostics pass reports the invalid invocation from the
            // operand's missing type.
            let demand = self.ast.node(id).narrowed;
            return self.offer_to_prev(demand, &frame.prevs);
        }
        let Some(fb_type) = fb_type else {
            return Err(NarrowError::MissingFbDeclaration { node: id });
        };
        let decl = match self.types.get(fb_type) {
            Some(TypeKind::FunctionBlock(pou)) => *pou,
            _ => return Err(NarrowError::NotAFunctionBlock { node: id }),
        };

        // The value passed to the named input is the current value; a
        // scratch slot with the predecessors' candidate intersection stands
        // in for it in the synthetic formal call.
        let mut value = Scratch::with_candidates(frame.candidates.clone());
        {
            let mut args = vec![(param.input_name().to_string(), ArgSlot::Scratch(&mut value))];
            self.narrow_formal_args(id, decl, &mut args)?;
        }

        // Two consumers read the same current value: the FB input, and
        // whatever instruction follows this call (the call itself leaves
        // the value untouched). Their demands must agree.
        let outer = self.ast.node(id).narrowed;
        let agreed = match (value.narrowed, outer) {
            (_, Narrowed::Unknown) => true,
            (Narrowed::Typed(a), Narrowed::Typed(b)) => self.types.is_type_equal(a, b),
            _ => false,
        };
        if agreed {
            self.offer_to_prev(value.narrowed, &frame.prevs)
        } else {
            self.offer_to_prev(Narrowed::Invalid, &frame.prevs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{
        instruction, instruction_list, literal, simple_instruction, simple_op, variable, Fixture,
    };
    use ironec_core::ast::CallAnnotations;

    #[test]
    fn ld_st_sequence_types_backwards() {
        // LD 33; ST x  with x: INT
        let mut fx = Fixture::new();
        let lit = literal(&mut fx.ast, &[TypeId::SINT, TypeId::INT]);
        let ld = simple_op(
            &mut fx.ast,
            IlSimpleOp::Ld,
            Some(lit),
            &[TypeId::SINT, TypeId::INT],
        );
        let i1 = instruction(&mut fx.ast, Some(ld), &[]);
        fx.ast
            .node_mut(i1)
            .candidates
            .extend_from_slice(&[TypeId::SINT, TypeId::INT]);
        let x = variable(&mut fx.ast, "x", &[TypeId::INT]);
        let st = simple_op(&mut fx.ast, IlSimpleOp::St, Some(x), &[TypeId::INT]);
        let i2 = instruction(&mut fx.ast, Some(st), &[i1]);
        let list = instruction_list(&mut fx.ast, vec![i1, i2]);

        fx.narrower().narrow_node(list).unwrap();

        assert_eq!(fx.ast.node(st).narrowed, Narrowed::Typed(TypeId::INT));
        assert_eq!(fx.ast.node(x).narrowed, Narrowed::Typed(TypeId::INT));
        // ST demanded INT from its predecessor, which LD pushed into 33.
        assert_eq!(fx.ast.node(i1).narrowed, Narrowed::Typed(TypeId::INT));
        assert_eq!(fx.ast.node(lit).narrowed, Narrowed::Typed(TypeId::INT));
    }

    #[test]
    fn st_with_ambiguous_candidates_stays_unknown() {
        let mut fx = Fixture::new();
        let x = variable(&mut fx.ast, "x", &[TypeId::INT, TypeId::DINT]);
        let st = simple_op(
            &mut fx.ast,
            IlSimpleOp::St,
            Some(x),
            &[TypeId::INT, TypeId::DINT],
        );
        let i = instruction(&mut fx.ast, Some(st), &[]);
        let list = instruction_list(&mut fx.ast, vec![i]);

        fx.narrower().narrow_node(list).unwrap();
        assert!(fx.ast.node(st).narrowed.is_unknown());
        assert!(fx.ast.node(x).narrowed.is_unknown());
    }

    #[test]
    fn transform_broadcasts_to_a_join_of_predecessors() {
        // Both branches of a label join must produce what AND consumes.
        let mut fx = Fixture::new();
        let a = instruction(&mut fx.ast, None, &[]);
        let b = instruction(&mut fx.ast, None, &[]);
        fx.ast.node_mut(a).candidates.push(TypeId::BOOL);
        fx.ast.node_mut(b).candidates.push(TypeId::BOOL);
        let y = variable(&mut fx.ast, "y", &[TypeId::BOOL]);
        let and = simple_op(&mut fx.ast, IlSimpleOp::And, Some(y), &[TypeId::BOOL]);
        let join = instruction(&mut fx.ast, Some(and), &[a, b]);
        fx.ast.node_mut(join).narrowed = Narrowed::Typed(TypeId::BOOL);
        // Narrow just the joining instruction; a and b come later in the
        // reverse walk.
        fx.narrower().narrow_instruction(join).unwrap();

        assert_eq!(fx.ast.node(a).narrowed, Narrowed::Typed(TypeId::BOOL));
        assert_eq!(fx.ast.node(b).narrowed, Narrowed::Typed(TypeId::BOOL));
        assert_eq!(fx.ast.node(y).narrowed, Narrowed::Typed(TypeId::BOOL));
    }

    #[test]
    fn empty_instruction_passes_the_demand_through() {
        let mut fx = Fixture::new();
        let prev = instruction(&mut fx.ast, None, &[]);
        fx.ast.node_mut(prev).candidates.push(TypeId::INT);
        let empty = instruction(&mut fx.ast, None, &[prev]);
        fx.ast.node_mut(empty).narrowed = Narrowed::Typed(TypeId::INT);

        fx.narrower().narrow_instruction(empty).unwrap();
        assert_eq!(fx.ast.node(prev).narrowed, Narrowed::Typed(TypeId::INT));
    }

    #[test]
    fn parenthesized_expression_narrows_inner_list() {
        // LD 33; AND ( 45; OR 56; ); ST x   -- scenario: the inner OR must
        // produce what the outer AND demands, and LD 33 / LD 45 agree.
        let mut fx = Fixture::new();
        let ints: &[TypeId] = &[TypeId::DINT];

        let lit33 = literal(&mut fx.ast, ints);
        let ld33 = simple_op(&mut fx.ast, IlSimpleOp::Ld, Some(lit33), ints);
        let i_ld = instruction(&mut fx.ast, Some(ld33), &[]);
        fx.ast.node_mut(i_ld).candidates.extend_from_slice(ints);

        // inner list: LD 45; OR 56
        let lit45 = literal(&mut fx.ast, ints);
        let ld45 = simple_op(&mut fx.ast, IlSimpleOp::Ld, Some(lit45), ints);
        let s1 = simple_instruction(&mut fx.ast, ld45, &[]);
        let lit56 = literal(&mut fx.ast, ints);
        let or56 = simple_op(&mut fx.ast, IlSimpleOp::Or, Some(lit56), ints);
        let s2 = simple_instruction(&mut fx.ast, or56, &[s1]);
        fx.ast.node_mut(s1).candidates.extend_from_slice(ints);
        fx.ast.node_mut(s2).candidates.extend_from_slice(ints);
        let sublist = fx.ast.add_node(NodeKind::SimpleInstrList {
            instrs: vec![s1, s2],
        });
        fx.ast.node_mut(sublist).candidates.extend_from_slice(ints);

        let and = fx.ast.add_node(NodeKind::IlExpression {
            op: IlSimpleOp::And,
            sublist,
        });
        fx.ast.node_mut(and).candidates.extend_from_slice(ints);
        let i_and = instruction(&mut fx.ast, Some(and), &[i_ld]);
        fx.ast.node_mut(i_and).candidates.extend_from_slice(ints);

        let x = variable(&mut fx.ast, "x", ints);
        let st = simple_op(&mut fx.ast, IlSimpleOp::St, Some(x), ints);
        let i_st = instruction(&mut fx.ast, Some(st), &[i_and]);

        let list = instruction_list(&mut fx.ast, vec![i_ld, i_and, i_st]);
        fx.narrower().narrow_node(list).unwrap();

        let dint = Narrowed::Typed(TypeId::DINT);
        assert_eq!(fx.ast.node(and).narrowed, dint);
        assert_eq!(fx.ast.node(or56).narrowed, dint);
        assert_eq!(fx.ast.node(lit56).narrowed, dint);
        assert_eq!(fx.ast.node(lit45).narrowed, dint);
        assert_eq!(fx.ast.node(lit33).narrowed, dint);
    }

    #[test]
    fn label_join_inside_an_expression_is_an_internal_error() {
        let mut fx = Fixture::new();
        let a = instruction(&mut fx.ast, None, &[]);
        let b = instruction(&mut fx.ast, None, &[]);
        let ld = simple_op(&mut fx.ast, IlSimpleOp::Ld, None, &[]);
        let s = simple_instruction(&mut fx.ast, ld, &[a, b]);
        let err = fx.narrower().narrow_simple_instruction(s);
        assert!(matches!(err, Err(NarrowError::LabelInIlExpression { .. })));
    }

    #[test]
    fn il_function_call_threads_the_current_value() {
        // LD a; ADD b; ST c  written as the IL function call form
        // `ADD b` -- the current value is the implicit first argument.
        let mut fx = Fixture::new();
        let (_, int_add) = fx.add_overloads();

        let prev = instruction(&mut fx.ast, None, &[]);
        fx.ast.node_mut(prev).candidates.push(TypeId::INT);

        let b = variable(&mut fx.ast, "b", &[TypeId::INT]);
        let call = CallAnnotations {
            candidate_pous: [int_add].into_iter().collect(),
            ..CallAnnotations::default()
        };
        let add = fx.ast.add_node(NodeKind::IlFunctionCall {
            name: "ADD".into(),
            operands: vec![b],
            call,
        });
        fx.ast.node_mut(add).candidates.push(TypeId::INT);
        let i = instruction(&mut fx.ast, Some(add), &[prev]);
        fx.ast.node_mut(i).narrowed = Narrowed::Typed(TypeId::INT);

        let before = fx.ast.node_count();
        fx.narrower().narrow_instruction(i).unwrap();

        // The declared IN1 type was demanded from the predecessors and IN2
        // from the explicit operand; no AST nodes were created or removed.
        assert_eq!(fx.ast.node(prev).narrowed, Narrowed::Typed(TypeId::INT));
        assert_eq!(fx.ast.node(b).narrowed, Narrowed::Typed(TypeId::INT));
        assert_eq!(fx.ast.node_count(), before);
    }

    #[test]
    fn implicit_fb_call_types_the_current_value_as_the_input() {
        // LD t; CLK ton1  with ton1: TON -- t must be BOOL (TON.CLK).
        let mut fx = Fixture::new();
        let ton_type = fx.ton_instance();

        let t = variable(&mut fx.ast, "t", &[TypeId::BOOL]);
        let ld = simple_op(&mut fx.ast, IlSimpleOp::Ld, Some(t), &[TypeId::BOOL]);
        let i_ld = instruction(&mut fx.ast, Some(ld), &[]);
        fx.ast.node_mut(i_ld).candidates.push(TypeId::BOOL);

        let ton1 = variable(&mut fx.ast, "ton1", &[ton_type]);
        let clk = fx.ast.add_node(NodeKind::SimpleOperation {
            op: IlSimpleOp::FbParam(FbParamOp::Clk),
            operand: Some(ton1),
            fb_type: Some(ton_type),
        });
        let i_clk = instruction(&mut fx.ast, Some(clk), &[i_ld]);

        let list = instruction_list(&mut fx.ast, vec![i_ld, i_clk]);
        let before = fx.ast.node_count();
        fx.narrower().narrow_node(list).unwrap();

        assert_eq!(fx.ast.node(ton1).narrowed, Narrowed::Typed(ton_type));
        assert_eq!(fx.ast.node(i_ld).narrowed, Narrowed::Typed(TypeId::BOOL));
        assert_eq!(fx.ast.node(t).narrowed, Narrowed::Typed(TypeId::BOOL));
        assert_eq!(fx.ast.node_count(), before);
    }

    #[test]
    fn implicit_fb_call_with_conflicting_consumers_goes_invalid() {
        // The FB input wants BOOL but the following instruction demanded
        // TIME from the same current value.
        let mut fx = Fixture::new();
        let ton_type = fx.ton_instance();

        let prev = instruction(&mut fx.ast, None, &[]);
        fx.ast
            .node_mut(prev)
            .candidates
            .extend_from_slice(&[TypeId::BOOL, TypeId::TIME]);

        let ton1 = variable(&mut fx.ast, "ton1", &[ton_type]);
        let clk = fx.ast.add_node(NodeKind::SimpleOperation {
            op: IlSimpleOp::FbParam(FbParamOp::Clk),
            operand: Some(ton1),
            fb_type: Some(ton_type),
        });
        fx.ast.node_mut(clk).narrowed = Narrowed::Typed(TypeId::TIME);
        let i_clk = instruction(&mut fx.ast, Some(clk), &[prev]);
        fx.ast.node_mut(i_clk).narrowed = Narrowed::Typed(TypeId::TIME);

        fx.narrower().narrow_instruction(i_clk).unwrap();
        assert_eq!(fx.ast.node(prev).narrowed, Narrowed::Invalid);
    }

    #[test]
    fn implicit_fb_call_on_a_non_fb_operand_forwards_the_demand() {
        let mut fx = Fixture::new();
        let prev = instruction(&mut fx.ast, None, &[]);
        fx.ast.node_mut(prev).candidates.push(TypeId::INT);

        // `CLK x` where x is not an FB instance: no fb_type was resolved.
        let x = variable(&mut fx.ast, "x", &[TypeId::INT]);
        let clk = fx.ast.add_node(NodeKind::SimpleOperation {
            op: IlSimpleOp::FbParam(FbParamOp::Clk),
            operand: Some(x),
            fb_type: None,
        });
        fx.ast.node_mut(clk).narrowed = Narrowed::Typed(TypeId::INT);
        let i = instruction(&mut fx.ast, Some(clk), &[prev]);
        fx.ast.node_mut(i).narrowed = Narrowed::Typed(TypeId::INT);

        fx.narrower().narrow_instruction(i).unwrap();
        assert_eq!(fx.ast.node(prev).narrowed, Narrowed::Typed(TypeId::INT));
        assert!(fx.ast.node(x).narrowed.is_unknown());
    }

    #[test]
    fn cal_passes_the_demand_through() {
        let mut fx = Fixture::new();
        let ton_type = fx.ton_instance();
        let prev = instruction(&mut fx.ast, None, &[]);
        fx.ast.node_mut(prev).candidates.push(TypeId::INT);

        let pt = literal(&mut fx.ast, &[TypeId::TIME]);
        let assign = fx.ast.add_node(NodeKind::ParamAssign {
            name: "PT".into(),
            value: pt,
        });
        let cal = fx.ast.add_node(NodeKind::IlFbCall {
            op: IlCallOp::Cal,
            fb_name: "ton1".into(),
            operands: vec![],
            params: vec![assign],
            fb_type: Some(ton_type),
        });
        fx.ast.node_mut(cal).narrowed = Narrowed::Typed(TypeId::INT);
        let i = instruction(&mut fx.ast, Some(cal), &[prev]);
        fx.ast.node_mut(i).narrowed = Narrowed::Typed(TypeId::INT);

        fx.narrower().narrow_instruction(i).unwrap();
        // The FB call does not alter the current value.
        assert_eq!(fx.ast.node(prev).narrowed, Narrowed::Typed(TypeId::INT));
        assert_eq!(fx.ast.node(pt).narrowed, Narrowed::Typed(TypeId::TIME));
    }

    #[test]
    fn missing_fb_declaration_on_cal_is_an_internal_error() {
        let mut fx = Fixture::new();
        let cal = fx.ast.add_node(NodeKind::IlFbCall {
            op: IlCallOp::Cal,
            fb_name: "nope".into(),
            operands: vec![],
            params: vec![],
            fb_type: None,
        });
        let i = instruction(&mut fx.ast, Some(cal), &[]);
        let err = fx.narrower().narrow_instruction(i);
        assert!(matches!(err, Err(NarrowError::MissingFbDeclaration { .. })));
    }

    #[test]
    fn conditional_flow_takes_its_bool_candidate() {
        let mut fx = Fixture::new();
        let prev = instruction(&mut fx.ast, None, &[]);
        fx.ast.node_mut(prev).candidates.push(TypeId::BOOL);
        let jmpc = fx.ast.add_node(NodeKind::IlJump {
            op: IlJumpOp::Jmpc,
            label: "again".into(),
        });
        fx.ast.node_mut(jmpc).candidates.push(TypeId::BOOL);
        let i = instruction(&mut fx.ast, Some(jmpc), &[prev]);

        fx.narrower().narrow_instruction(i).unwrap();
        assert_eq!(fx.ast.node(jmpc).narrowed, Narrowed::Typed(TypeId::BOOL));
        assert_eq!(fx.ast.node(prev).narrowed, Narrowed::Typed(TypeId::BOOL));
    }

    #[test]
    fn conditional_flow_rejects_a_non_bool_demand() {
        let mut fx = Fixture::new();
        let retc = fx.ast.add_node(NodeKind::IlReturn { op: IlReturnOp::Retc });
        fx.ast.node_mut(retc).candidates.push(TypeId::BOOL);
        fx.ast.node_mut(retc).narrowed = Narrowed::Typed(TypeId::INT);
        let i = instruction(&mut fx.ast, Some(retc), &[]);
        fx.ast.node_mut(i).narrowed = Narrowed::Typed(TypeId::INT);

        let err = fx.narrower().narrow_instruction(i);
        assert!(matches!(err, Err(NarrowError::NonBoolFlowDemand { .. })));
    }

    #[test]
    fn unconditional_jump_passes_the_demand_through() {
        let mut fx = Fixture::new();
        let prev = instruction(&mut fx.ast, None, &[]);
        fx.ast.node_mut(prev).candidates.push(TypeId::INT);
        let jmp = fx.ast.add_node(NodeKind::IlJump {
            op: IlJumpOp::Jmp,
            label: "out".into(),
        });
        fx.ast.node_mut(jmp).narrowed = Narrowed::Typed(TypeId::INT);
        let i = instruction(&mut fx.ast, Some(jmp), &[prev]);
        fx.ast.node_mut(i).narrowed = Narrowed::Typed(TypeId::INT);

        fx.narrower().narrow_instruction(i).unwrap();
        assert_eq!(fx.ast.node(prev).narrowed, Narrowed::Typed(TypeId::INT));
    }
}
