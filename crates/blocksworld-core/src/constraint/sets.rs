//! Named constraint sets (C4): each rule variant wires the shared library
//! into a different ordered list per action kind. §4.3/§4.4 of the
//! specification this crate implements.

use std::collections::HashMap;

use crate::action::ActionKind;

use super::library::*;
use super::Constraint;

/// The ordered constraint chain for one action kind, short-circuiting on
/// the first failure per §4.4.
pub struct ConstraintSet {
    pub name: &'static str,
    chains: HashMap<&'static str, Vec<Box<dyn Constraint>>>,
}

impl ConstraintSet {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            chains: HashMap::new(),
        }
    }

    fn with(mut self, kind: &'static str, chain: Vec<Box<dyn Constraint>>) -> Self {
        self.chains.insert(kind, chain);
        self
    }

    pub fn chain_for(&self, kind: &ActionKind) -> &[Box<dyn Constraint>] {
        self.chains
            .get(kind.name())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// A human-readable rendering for `GetRules`: each action kind and the
    /// names of the constraints guarding it, in evaluation order.
    pub fn describe(&self) -> String {
        let mut lines = vec![format!("constraint set: {}", self.name)];
        let mut kinds: Vec<_> = self.chains.keys().collect();
        kinds.sort();
        for kind in kinds {
            let names: Vec<&str> = self.chains[kind].iter().map(|c| c.name()).collect();
            lines.push(format!("  {kind}: {}", names.join(" -> ")));
        }
        lines.join("\n")
    }
}

fn motion_chain() -> HashMap<&'static str, Vec<Box<dyn Constraint>>> {
    let mut m: HashMap<&'static str, Vec<Box<dyn Constraint>>> = HashMap::new();
    m.insert(
        "pick_up",
        vec![
            Box::new(SimulationRunning),
            Box::new(RobotIdle),
            Box::new(BlockExists),
            Box::new(BlockOnTopOfStack),
            Box::new(OnlyBlockInStack),
        ],
    );
    m.insert(
        "put_down",
        vec![
            Box::new(SimulationRunning),
            Box::new(RobotHolding),
            Box::new(RobotHoldingSpecificBlock),
            Box::new(FreeStackAvailable),
        ],
    );
    m.insert(
        "unstack",
        vec![
            Box::new(SimulationRunning),
            Box::new(RobotIdle),
            Box::new(BlockExists),
            Box::new(BlockOnTopOfStack),
            Box::new(BlocksOnSameStack),
            Box::new(BlockBelowRelationship),
        ],
    );
    m
}

fn base_chains() -> HashMap<&'static str, Vec<Box<dyn Constraint>>> {
    let mut m = motion_chain();
    m.insert(
        "stack",
        vec![
            Box::new(SimulationRunning),
            Box::new(RobotHolding),
            Box::new(RobotHoldingSpecificBlock),
            Box::new(BlockExists),
            Box::new(BlockOnTopOfStack),
        ],
    );
    m.insert("get_status", vec![Box::new(SimulationRunning)]);
    m.insert("get_full_status", vec![Box::new(SimulationRunning)]);
    m.insert(
        "pre_start",
        vec![
            Box::new(SimulationNotRunning),
            Box::new(UniqueBlockNames),
            Box::new(ValidStartData),
        ],
    );
    m.insert("start", vec![Box::new(SimulationNotRunning)]);
    m.insert("stop", vec![Box::new(SimulationRunning)]);
    m.insert("plan", vec![Box::new(SimulationRunning)]);
    m
}

/// The unconstrained-width rule set: any block may be stacked on any other.
pub fn base_constraint_set() -> ConstraintSet {
    let chains = base_chains();
    let mut set = ConstraintSet::new("base");
    set.chains = chains;
    set
}

/// A target block must be at least as wide as the one being placed on it.
pub fn block_size_constraint_set() -> ConstraintSet {
    let mut chains = base_chains();
    chains
        .get_mut("stack")
        .expect("fatal: base_chains always defines a stack chain")
        .push(Box::new(BlockBelowWiderEqual));
    let mut set = ConstraintSet::new("block-size");
    set.chains = chains;
    set
}

/// Strict Towers-of-Hanoi rules: the target must be strictly wider, and the
/// initial configuration itself must already be strictly decreasing by
/// width, bottom to top, with globally unique widths.
///
/// `ValidStartConfig` is wired onto the `start` chain, not `pre_start`: the
/// constraint-set-swap-ordering resolution (DESIGN.md §9 resolution 1)
/// re-validates a synthesized `Start` action against the *target* set before
/// committing to it, and that re-validation only runs the target set's
/// `start` chain. A `pre_start`-only check would never fire there, since the
/// original `PreStart` action is validated under whatever set is still
/// active at that point, not the one it is switching to.
pub fn hanoi_towers_constraint_set() -> ConstraintSet {
    let mut chains = base_chains();
    chains
        .get_mut("stack")
        .expect("fatal: base_chains always defines a stack chain")
        .push(Box::new(BlockBelowWider));
    chains
        .get_mut("start")
        .expect("fatal: base_chains always defines a start chain")
        .push(Box::new(ValidStartConfig));
    let mut set = ConstraintSet::new("hanoi-towers");
    set.chains = chains;
    set
}

/// The inverse of block-size: only a strictly narrower block may be placed
/// on top of a wider one.
pub fn different_blocks_constraint_set() -> ConstraintSet {
    let mut chains = base_chains();
    chains
        .get_mut("stack")
        .expect("fatal: base_chains always defines a stack chain")
        .push(Box::new(UpperBlockNarrower));
    let mut set = ConstraintSet::new("different-blocks");
    set.chains = chains;
    set
}

/// Base rules, but `GetStatus` returns a redacted view hiding the name of
/// any block more than two deep in its stack (`GetFullStatus` is exempt),
/// and every motion/status/plan action kind also refreshes the persistent
/// per-block `hide_name` flag via `PartialVisualDisplay`, for a renderer
/// reading `WorldState` directly rather than a `GetStatus` reply.
pub fn partial_observability_constraint_set() -> ConstraintSet {
    let mut chains = base_chains();
    chains.insert(
        "get_status",
        vec![Box::new(PartialStatusVisibility), Box::new(PartialVisualDisplay)],
    );
    for kind in [
        "pick_up",
        "put_down",
        "stack",
        "unstack",
        "get_full_status",
        "plan",
    ] {
        chains
            .get_mut(kind)
            .expect("fatal: base_chains always defines this chain")
            .push(Box::new(PartialVisualDisplay));
    }
    let mut set = ConstraintSet::new("partial-observability");
    set.chains = chains;
    set
}
