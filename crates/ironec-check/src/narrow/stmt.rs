//! Narrowing of Structured Text statements and declarations.

use ironec_core::ast::{Narrowed, NodeKind};
use ironec_core::id::NodeId;
use ironec_core::types::TypeKind;

use super::{NarrowError, Narrower};

impl Narrower<'_> {
    /// `lhs := rhs`: the assignment's single candidate type is demanded
    /// from both sides. No candidates at all means the sides share no type;
    /// the assignment is marked invalid and left for diagnostics.
    pub(crate) fn narrow_assign(
        &mut self,
        id: NodeId,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<(), NarrowError> {
        let candidates = self.ast.node(id).candidates.clone();
        match candidates.len() {
            1 => {
                let demand = Narrowed::Typed(candidates[0]);
                self.ast.node_mut(id).narrowed = demand;
                self.push_demand(demand, lhs)?;
                self.push_demand(demand, rhs)
            }
            0 => {
                self.ast.node_mut(id).narrowed = Narrowed::Invalid;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn narrow_if(
        &mut self,
        cond: NodeId,
        then_body: &[NodeId],
        elsif: &[NodeId],
        else_body: &[NodeId],
    ) -> Result<(), NarrowError> {
        self.select_bool_candidate(cond);
        self.narrow_node(cond)?;
        self.narrow_body(then_body)?;
        self.narrow_body(elsif)?;
        self.narrow_body(else_body)
    }

    pub(crate) fn narrow_elsif(
        &mut self,
        cond: NodeId,
        body: &[NodeId],
    ) -> Result<(), NarrowError> {
        self.select_bool_candidate(cond);
        self.narrow_node(cond)?;
        self.narrow_body(body)
    }

    pub(crate) fn narrow_while(
        &mut self,
        cond: NodeId,
        body: &[NodeId],
    ) -> Result<(), NarrowError> {
        self.select_bool_candidate(cond);
        self.narrow_node(cond)?;
        self.narrow_body(body)
    }

    pub(crate) fn narrow_repeat(
        &mut self,
        cond: NodeId,
        body: &[NodeId],
    ) -> Result<(), NarrowError> {
        self.select_bool_candidate(cond);
        self.narrow_node(cond)?;
        self.narrow_body(body)
    }

    /// CASE: the selector takes an integer or enumerated candidate (the
    /// last admissible one wins) and its chosen type flows into every
    /// element's label list.
    pub(crate) fn narrow_case(
        &mut self,
        selector: NodeId,
        elements: &[NodeId],
        else_body: &[NodeId],
    ) -> Result<(), NarrowError> {
        let chosen = {
            let node = self.ast.node(selector);
            node.candidates
                .iter()
                .copied()
                .filter(|&c| self.types.is_any_int(c) || self.types.is_enumerated(c))
                .last()
        };
        if let Some(t) = chosen {
            self.ast.node_mut(selector).narrowed = Narrowed::Typed(t);
        }
        self.narrow_node(selector)?;
        self.narrow_body(else_body)?;
        let selector_type = self.ast.node(selector).narrowed;
        for &element in elements {
            self.ast.node_mut(element).narrowed = selector_type;
            self.narrow_node(element)?;
        }
        Ok(())
    }

    /// One `labels : statements` arm. Labels may be literals, enumerated
    /// values, or subranges; each takes the selector's type if it can.
    pub(crate) fn narrow_case_element(
        &mut self,
        id: NodeId,
        labels: &[NodeId],
        body: &[NodeId],
    ) -> Result<(), NarrowError> {
        let selector_type = self.ast.node(id).narrowed;
        for &label in labels {
            if let Narrowed::Typed(t) = selector_type {
                let chosen = {
                    let node = self.ast.node(label);
                    self.types
                        .search_in_candidates(t, &node.candidates)
                        .map(|i| node.candidates[i])
                };
                if let Some(c) = chosen {
                    self.ast.node_mut(label).narrowed = Narrowed::Typed(c);
                }
            }
            self.narrow_node(label)?;
        }
        self.narrow_body(body)
    }

    /// FOR: the control variable takes an ANY_INT candidate (the last
    /// admissible one wins), and the begin/end/by expressions must supply
    /// that same type.
    pub(crate) fn narrow_for(
        &mut self,
        control: NodeId,
        from: NodeId,
        to: NodeId,
        by: Option<NodeId>,
        body: &[NodeId],
    ) -> Result<(), NarrowError> {
        let chosen = {
            let node = self.ast.node(control);
            node.candidates
                .iter()
                .copied()
                .filter(|&c| self.types.is_any_int(c))
                .last()
        };
        if let Some(t) = chosen {
            self.ast.node_mut(control).narrowed = Narrowed::Typed(t);
        }
        self.narrow_node(control)?;

        let control_type = self.ast.node(control).narrowed;
        for limit in [Some(from), Some(to), by].into_iter().flatten() {
            if let Narrowed::Typed(ct) = control_type {
                let chosen = {
                    let node = self.ast.node(limit);
                    node.candidates
                        .iter()
                        .copied()
                        .filter(|&c| self.types.is_type_equal(ct, c) && self.types.is_any_int(c))
                        .last()
                };
                if let Some(t) = chosen {
                    self.ast.node_mut(limit).narrowed = Narrowed::Typed(t);
                }
            }
            self.narrow_node(limit)?;
        }
        self.narrow_body(body)
    }

    /// `fb_instance(...)`: the instance type comes from the scope resolver,
    /// and the call is narrowed even if other parts of the statement are
    /// broken, so parameter expression errors still surface.
    pub(crate) fn narrow_fb_invocation(
        &mut self,
        id: NodeId,
        fb_name: String,
        nonformal: &[NodeId],
        formal: &[NodeId],
    ) -> Result<(), NarrowError> {
        let Some(fb_type) = self.scope.fb_type(&fb_name) else {
            return Err(NarrowError::UnknownFbInstance { name: fb_name });
        };
        let decl = match self.types.get(fb_type) {
            Some(TypeKind::FunctionBlock(pou)) => *pou,
            _ => return Err(NarrowError::NotAFunctionBlock { node: id }),
        };
        self.narrow_fb_call(id, decl, nonformal, formal)
    }

    /// A declaration's initial value takes the declared type's base when
    /// the initializer admits it.
    pub(crate) fn narrow_var_decl(&mut self, id: NodeId) -> Result<(), NarrowError> {
        let (ty, init) = match &self.ast.node(id).kind {
            NodeKind::VarDecl { ty, init, .. } => (*ty, *init),
            _ => return Ok(()),
        };
        let Some(init) = init else { return Ok(()) };
        let base = self.types.base_type(ty);
        let chosen = {
            let node = self.ast.node(init);
            self.types
                .search_in_candidates(base, &node.candidates)
                .map(|i| node.candidates[i])
        };
        if let Some(c) = chosen {
            self.ast.node_mut(init).narrowed = Narrowed::Typed(c);
        }
        Ok(())
    }

    fn select_bool_candidate(&mut self, cond: NodeId) {
        let chosen = {
            let node = self.ast.node(cond);
            node.candidates
                .iter()
                .copied()
                .find(|&c| self.types.is_bool(c))
        };
        if let Some(t) = chosen {
            self.ast.node_mut(cond).narrowed = Narrowed::Typed(t);
        }
    }

    pub(crate) fn narrow_body(&mut self, body: &[NodeId]) -> Result<(), NarrowError> {
        for &stmt in body {
            self.narrow_node(stmt)?;
        }
        Ok(())
    }
}
