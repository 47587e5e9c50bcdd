//! Narrowing of Structured Text expressions.
//!
//! Binary operators choose one operand type that both sides can take and
//! push it down; the demanded *result* type only matters for arithmetic,
//! where a non-numeric demand routes through the operator's widening table
//! (TIME/date arithmetic). Having no common operand type at all means the
//! candidate-collection pass let an impossible expression through, which is
//! an internal error, not a user diagnostic.

use ironec_core::ast::Narrowed;
use ironec_core::id::{NodeId, TypeId};
use ironec_core::ops::{ArithOp, CmpOp};
use ironec_core::widen::{
    is_widening_compatible, WidenEntry, WIDEN_ADD_TABLE, WIDEN_DIV_TABLE, WIDEN_MUL_TABLE,
    WIDEN_SUB_TABLE,
};

use super::{NarrowError, Narrower};

impl Narrower<'_> {
    /// A type both operands can take: for each left candidate, the first
    /// structurally equal right candidate. Later left candidates override
    /// earlier ones.
    fn pick_common_operand_type(
        &self,
        lhs: NodeId,
        rhs: NodeId,
        elementary_only: bool,
    ) -> Option<TypeId> {
        let lcands = &self.ast.node(lhs).candidates;
        let rcands = &self.ast.node(rhs).candidates;
        let mut selected = None;
        for &lc in lcands {
            for &rc in rcands {
                if self.types.is_type_equal(lc, rc)
                    && (!elementary_only || self.types.is_any_elementary(lc))
                {
                    selected = Some(lc);
                    break;
                }
            }
        }
        selected
    }

    /// `OR` / `XOR` / `AND`: both operands take the same common type.
    pub(crate) fn narrow_logic(
        &mut self,
        id: NodeId,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<(), NarrowError> {
        let Some(t) = self.pick_common_operand_type(lhs, rhs, false) else {
            return Err(NarrowError::NoCommonType { node: id });
        };
        self.push_demand(Narrowed::Typed(t), lhs)?;
        self.push_demand(Narrowed::Typed(t), rhs)
    }

    /// Comparisons: symmetric common type; the ordering operators are
    /// additionally restricted to ANY_ELEMENTARY operands.
    pub(crate) fn narrow_compare(
        &mut self,
        id: NodeId,
        op: CmpOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<(), NarrowError> {
        let Some(t) = self.pick_common_operand_type(lhs, rhs, op.is_ordering()) else {
            return Err(NarrowError::NoCommonType { node: id });
        };
        self.push_demand(Narrowed::Typed(t), lhs)?;
        self.push_demand(Narrowed::Typed(t), rhs)
    }

    pub(crate) fn narrow_arith(
        &mut self,
        id: NodeId,
        op: ArithOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<(), NarrowError> {
        match op {
            ArithOp::Add => self.narrow_widening_arith(id, WIDEN_ADD_TABLE, lhs, rhs),
            ArithOp::Sub => self.narrow_widening_arith(id, WIDEN_SUB_TABLE, lhs, rhs),
            ArithOp::Mul => self.narrow_widening_arith(id, WIDEN_MUL_TABLE, lhs, rhs),
            ArithOp::Div => self.narrow_widening_arith(id, WIDEN_DIV_TABLE, lhs, rhs),
            ArithOp::Mod => {
                // MOD is uniform: the demanded type passes straight through.
                let demand = self.ast.node(id).narrowed;
                self.push_demand(demand, lhs)?;
                self.push_demand(demand, rhs)
            }
            ArithOp::Power => self.narrow_power(id, lhs, rhs),
        }
    }

    /// `ADD`/`SUB`/`MUL`/`DIV`. An ANY_NUM demand propagates unchanged to
    /// both operands; otherwise the operand pair is chosen from the
    /// operator's widening table.
    fn narrow_widening_arith(
        &mut self,
        id: NodeId,
        table: &[WidenEntry],
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<(), NarrowError> {
        let demand = self.ast.node(id).narrowed;
        if let Narrowed::Typed(t) = demand {
            if self.types.is_any_num_compatible(t) {
                self.ast.node_mut(lhs).narrowed = demand;
                self.ast.node_mut(rhs).narrowed = demand;
            } else {
                let lcands = self.ast.node(lhs).candidates.clone();
                let rcands = self.ast.node(rhs).candidates.clone();
                let mut selected: Option<(TypeId, TypeId)> = None;
                for &lc in &lcands {
                    for &rc in &rcands {
                        if !is_widening_compatible(table, self.types, lc, rc, t) {
                            continue;
                        }
                        match selected {
                            Some((pl, pr))
                                if !(self.types.is_type_equal(pl, lc)
                                    && self.types.is_type_equal(pr, rc)) =>
                            {
                                return Err(NarrowError::AmbiguousWidening { node: id });
                            }
                            _ => selected = Some((lc, rc)),
                        }
                    }
                }
                if let Some((lc, rc)) = selected {
                    self.ast.node_mut(lhs).narrowed = Narrowed::Typed(lc);
                    self.ast.node_mut(rhs).narrowed = Narrowed::Typed(rc);
                }
            }
        }
        self.narrow_node(lhs)?;
        self.narrow_node(rhs)
    }

    /// `**`: the base takes the demanded type; the exponent keeps its own
    /// candidate independently of the result type.
    fn narrow_power(&mut self, id: NodeId, lhs: NodeId, rhs: NodeId) -> Result<(), NarrowError> {
        let demand = self.ast.node(id).narrowed;
        self.push_demand(demand, lhs)?;
        let exponent = self.ast.node(rhs).candidates.first().copied();
        if let Some(t) = exponent {
            self.push_demand(Narrowed::Typed(t), rhs)?;
        }
        Ok(())
    }

    /// `-e` and `NOT e`: the demanded type passes straight through.
    pub(crate) fn narrow_unary(&mut self, id: NodeId, expr: NodeId) -> Result<(), NarrowError> {
        let demand = self.ast.node(id).narrowed;
        self.push_demand(demand, expr)
    }

    /// Array subscripts: each takes its first ANY_INT candidate.
    pub(crate) fn narrow_subscripts(&mut self, subscripts: &[NodeId]) -> Result<(), NarrowError> {
        for &sub in subscripts {
            let sel = {
                let n = self.ast.node(sub);
                n.candidates
                    .iter()
                    .copied()
                    .find(|&c| self.types.is_any_int(c))
            };
            if let Some(t) = sel {
                self.ast.node_mut(sub).narrowed = Narrowed::Typed(t);
            }
            self.narrow_node(sub)?;
        }
        Ok(())
    }

    /// Subrange limits both take the subrange's own type.
    pub(crate) fn narrow_subrange(
        &mut self,
        id: NodeId,
        lower: NodeId,
        upper: NodeId,
    ) -> Result<(), NarrowError> {
        let demand = self.ast.node(id).narrowed;
        self.push_demand(demand, lower)?;
        self.push_demand(demand, upper)
    }
}
