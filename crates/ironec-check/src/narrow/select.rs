//! The type selector: offering a demanded type to a node.
//!
//! [`Narrower::offer`] is the single checked write path for narrowing
//! annotations. It is monotone and conflict-detecting: once a node has
//! committed to a type, an equal re-offer is a no-op and any different
//! offer marks the node invalid. A type outside the node's candidate set
//! also marks it invalid. Offering *no* type is only legal while the node
//! is still unknown; retracting a commitment is an internal error.
//!
//! Demand pushes (`parent chose T, so this child slot is T`) write the
//! annotation directly without the candidate filter, exactly as the parent
//! rules require; [`Narrower::push_demand`] combines such a push with the
//! recursive visit of the child.

use ironec_core::ast::Narrowed;
use ironec_core::id::{NodeId, TypeId};
use ironec_core::type_table::TypeTable;

use super::{NarrowError, Narrower};

/// Applies one offer against a candidate list and a current annotation.
///
/// Returns `None` when the offer retracts a commitment, which the caller
/// must turn into [`NarrowError::DemandRetracted`].
pub(crate) fn select(
    types: &TypeTable,
    candidates: &[TypeId],
    current: Narrowed,
    demand: Narrowed,
) -> Option<Narrowed> {
    match demand {
        Narrowed::Unknown => {
            if current.is_unknown() {
                Some(current)
            } else {
                None
            }
        }
        Narrowed::Invalid => Some(Narrowed::Invalid),
        Narrowed::Typed(t) => Some(if types.search_in_candidates(t, candidates).is_none() {
            Narrowed::Invalid
        } else {
            match current {
                Narrowed::Unknown => Narrowed::Typed(t),
                Narrowed::Typed(u) if types.is_type_equal(u, t) => current,
                _ => Narrowed::Invalid,
            }
        }),
    }
}

impl Narrower<'_> {
    /// Offers `demand` to `id`, filtering against its candidate set.
    pub(crate) fn offer(&mut self, demand: Narrowed, id: NodeId) -> Result<(), NarrowError> {
        let node = self.ast.node(id);
        let next = select(self.types, &node.candidates, node.narrowed, demand)
            .ok_or(NarrowError::DemandRetracted { node: id })?;
        self.ast.node_mut(id).narrowed = next;
        Ok(())
    }

    /// Broadcasts `demand` to every predecessor instruction in `prevs`.
    pub(crate) fn offer_to_prev(
        &mut self,
        demand: Narrowed,
        prevs: &[NodeId],
    ) -> Result<(), NarrowError> {
        for &p in prevs {
            self.offer(demand, p)?;
        }
        Ok(())
    }

    /// Pushes `demand` into the child slot and recurses into the child.
    pub(crate) fn push_demand(&mut self, demand: Narrowed, id: NodeId) -> Result<(), NarrowError> {
        self.ast.node_mut(id).narrowed = demand;
        self.narrow_node(id)
    }
}
