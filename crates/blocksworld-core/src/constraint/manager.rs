//! The constraint manager (C4): holds the currently active rule set and
//! validates actions against it.

use std::collections::HashMap;

use crate::action::SimulationAction;
use crate::entity::WorldState;
use crate::error::CoreError;
use crate::scenario::ScenarioRegistry;

use super::sets::{
    base_constraint_set, block_size_constraint_set, different_blocks_constraint_set,
    hanoi_towers_constraint_set, partial_observability_constraint_set, ConstraintSet,
};
use super::ValidationContext;

/// Owns every named rule set and tracks which one is active. Swapping the
/// active set (on a successful Start) never drops in-flight validation —
/// see DESIGN.md's resolution of the PreStart/Start ordering question.
pub struct ConstraintManager {
    sets: HashMap<&'static str, ConstraintSet>,
    active: &'static str,
}

impl ConstraintManager {
    pub fn new() -> Self {
        let mut sets = HashMap::new();
        for set in [
            base_constraint_set(),
            block_size_constraint_set(),
            hanoi_towers_constraint_set(),
            different_blocks_constraint_set(),
            partial_observability_constraint_set(),
        ] {
            sets.insert(set.name, set);
        }
        Self {
            sets,
            active: "base",
        }
    }

    pub fn set_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sets.keys().copied()
    }

    pub fn has_set(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    pub fn active_name(&self) -> &'static str {
        self.active
    }

    /// Called once a `Start` dispatches successfully under the rule name it
    /// resolved. Every action validated before that point, including the
    /// `PreStart`/`Start` pair itself, was checked against whatever set was
    /// active at the time. Only ever called with a name `validate_against`
    /// has just accepted, so a miss here is a broken invariant, not a
    /// business rejection.
    pub fn set_active(&mut self, name: &str) -> Result<(), CoreError> {
        match self.sets.get_key_value(name) {
            Some((&key, _)) => {
                self.active = key;
                Ok(())
            }
            None => Err(CoreError::UnknownConstraintSet(name.to_string())),
        }
    }

    /// Runs the active set's chain for `action.kind`, short-circuiting on
    /// the first constraint that returns false. An action with no chain
    /// registered for its kind (e.g. `Quit`, `GetRules`) is valid
    /// unconditionally.
    pub fn validate(
        &self,
        world: &WorldState,
        scenarios: &ScenarioRegistry,
        action: &mut SimulationAction,
    ) -> Result<bool, CoreError> {
        self.validate_against(self.active, world, scenarios, action)
    }

    /// Validates against a named set without touching which one is active —
    /// used by `dispatch::dispatch_pre_start` to check an enqueued `Start`
    /// under the *target* rule variant before committing to it (DESIGN.md's
    /// resolution of the base spec's §9 constraint-set-swap-ordering
    /// question: swap only after the Start this validates has itself
    /// succeeded under the new set).
    pub fn validate_against(
        &self,
        name: &str,
        world: &WorldState,
        scenarios: &ScenarioRegistry,
        action: &mut SimulationAction,
    ) -> Result<bool, CoreError> {
        let ctx = ValidationContext { world, scenarios };
        let set = match self.sets.get(name) {
            Some(set) => set,
            None => {
                action.set_invalid(format!("constraint set {name} does not exist"));
                return Ok(false);
            }
        };
        for constraint in set.chain_for(&action.kind) {
            if !constraint.check(&ctx, action)? {
                return Ok(false);
            }
        }
        action.set_valid();
        Ok(true)
    }

    pub fn active_rules(&self) -> Result<String, CoreError> {
        self.sets
            .get(self.active)
            .map(|set| set.describe())
            .ok_or_else(|| CoreError::UnknownConstraintSet(self.active.to_string()))
    }
}

impl Default for ConstraintManager {
    fn default() -> Self {
        Self::new()
    }
}
