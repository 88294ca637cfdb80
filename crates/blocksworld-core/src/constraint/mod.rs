//! The constraint library (C3) and the constraint set / manager (C4) that
//! composes it per rule variant.

mod library;
mod manager;
mod sets;

pub use library::*;
pub use manager::ConstraintManager;
pub use sets::{
    base_constraint_set, block_size_constraint_set, different_blocks_constraint_set,
    hanoi_towers_constraint_set, partial_observability_constraint_set, ConstraintSet,
};

use crate::action::SimulationAction;
use crate::entity::WorldState;
use crate::error::CoreError;
use crate::scenario::ScenarioRegistry;

/// Everything a constraint may read besides the action itself. The scenario
/// registry is a read-only, process-wide dependency (§5), not part of
/// `WorldState`, so it travels alongside the world rather than living on it.
pub struct ValidationContext<'a> {
    pub world: &'a WorldState,
    pub scenarios: &'a ScenarioRegistry,
}

/// A named predicate `(WorldState, Action) -> bool`, permitted to write
/// resolved references onto the action and to mark it invalid as a side
/// effect when it returns false. `Err` is reserved for a broken internal
/// invariant (a reference an earlier constraint in the chain should already
/// have resolved) — it is never business rejection, which is always `Ok(false)`
/// plus `action.set_invalid(..)`.
pub trait Constraint: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError>;
}
