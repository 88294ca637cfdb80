//! The complete constraint library (C3): the base table from the
//! specification, plus the variant-only constraints each rule set layers
//! on top of it.

use std::collections::HashSet;

use crate::action::{ActionKind, ResolvedStart, SimulationAction, StackConfig};
use crate::constants::DEFAULT_BLOCK_SIZE_X;
use crate::entity::{BlockId, WorldState};
use crate::error::CoreError;
use crate::worldbuilder;

use super::{Constraint, ValidationContext};

fn apply(action: &mut SimulationAction, result: Result<(), String>) -> bool {
    match result {
        Ok(()) => true,
        Err(reason) => {
            action.set_invalid(reason);
            false
        }
    }
}

/// Reads a reference an earlier constraint in the chain must already have
/// resolved. Missing here means the chain was built or ordered wrong — a
/// broken invariant, not a business rejection — so it propagates as a
/// `CoreError` instead of panicking on the spot.
fn require<T>(value: Option<T>, what: &'static str) -> Result<T, CoreError> {
    value.ok_or(CoreError::UnresolvedReference(what))
}

// --- base library -----------------------------------------------------

pub struct SimulationRunning;
impl Constraint for SimulationRunning {
    fn name(&self) -> &'static str {
        "simulation_running"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        if !ctx.world.running {
            action.set_invalid("the simulation is not running");
            return Ok(false);
        }
        if matches!(action.kind, ActionKind::GetStatus | ActionKind::GetFullStatus) {
            action.attach(ctx.world.to_status_dict());
        }
        Ok(true)
    }
}

pub struct SimulationNotRunning;
impl Constraint for SimulationNotRunning {
    fn name(&self) -> &'static str {
        "simulation_not_running"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        if ctx.world.running {
            action.set_invalid("the simulation is already running");
            return Ok(false);
        }
        Ok(true)
    }
}

pub struct RobotIdle;
impl Constraint for RobotIdle {
    fn name(&self) -> &'static str {
        "robot_idle"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        if ctx.world.robot.state != crate::entity::RobotState::Idle {
            action.set_invalid("the robot is not idle");
            return Ok(false);
        }
        Ok(true)
    }
}

pub struct RobotHolding;
impl Constraint for RobotHolding {
    fn name(&self) -> &'static str {
        "robot_holding"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        if ctx.world.robot.state != crate::entity::RobotState::Holding {
            action.set_invalid("the robot is not holding a block");
            return Ok(false);
        }
        Ok(true)
    }
}

pub struct BlockExists;
impl Constraint for BlockExists {
    fn name(&self) -> &'static str {
        "block_exists"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &mut action.kind {
            ActionKind::PickUp { block, resolved } => {
                resolve_into(ctx.world, *block, &mut resolved.block)
            }
            ActionKind::PutDown { block, resolved } => {
                resolve_into(ctx.world, *block, &mut resolved.block)
            }
            ActionKind::Unstack { block, below, resolved } => {
                resolve_into(ctx.world, *block, &mut resolved.block)
                    .and_then(|()| resolve_into(ctx.world, *below, &mut resolved.companion_block))
            }
            ActionKind::StackOn { target, resolved, .. } => {
                resolve_into(ctx.world, *target, &mut resolved.companion_block)
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

fn resolve_into(world: &WorldState, name: char, slot: &mut Option<BlockId>) -> Result<(), String> {
    match world.find_block_by_name(name) {
        Some(id) => {
            *slot = Some(id);
            Ok(())
        }
        None => Err(format!("Block {name} does not exist")),
    }
}

pub struct RobotHoldingSpecificBlock;
impl Constraint for RobotHoldingSpecificBlock {
    fn name(&self) -> &'static str {
        "robot_holding_specific_block"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &mut action.kind {
            ActionKind::PutDown { block, resolved } | ActionKind::StackOn { block, resolved, .. } => {
                match ctx.world.robot.held_block {
                    Some(id) if ctx.world.block(id).name == *block => {
                        resolved.block = Some(id);
                        Ok(())
                    }
                    Some(held) => {
                        let held_name = ctx.world.block(held).name;
                        Err(format!(
                            "the robot is holding block {held_name}, not block {block}"
                        ))
                    }
                    None => Err("the robot is not holding any block".to_string()),
                }
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

pub struct BlockOnTopOfStack;
impl Constraint for BlockOnTopOfStack {
    fn name(&self) -> &'static str {
        "block_on_top_of_stack"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &mut action.kind {
            ActionKind::PickUp { resolved, .. } | ActionKind::Unstack { resolved, .. } => {
                let block = require(resolved.block, "BlockOnTopOfStack: block")?;
                check_on_top(ctx.world, block, &mut resolved.stack)
            }
            ActionKind::StackOn { resolved, .. } => {
                let block = require(resolved.companion_block, "BlockOnTopOfStack: companion_block")?;
                check_on_top(ctx.world, block, &mut resolved.stack)
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

fn check_on_top(world: &WorldState, block: BlockId, stack_slot: &mut Option<usize>) -> Result<(), String> {
    let name = world.block(block).name;
    match world.stack_containing(block) {
        Some(idx) if world.stacks[idx].top() == Some(block) => {
            *stack_slot = Some(idx);
            Ok(())
        }
        _ => Err(format!("Block {name} is not on top of a stack")),
    }
}

pub struct OnlyBlockInStack;
impl Constraint for OnlyBlockInStack {
    fn name(&self) -> &'static str {
        "only_block_in_stack"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &action.kind {
            ActionKind::PickUp { resolved, .. } => {
                let stack_idx = require(resolved.stack, "OnlyBlockInStack: stack")?;
                if ctx.world.stacks[stack_idx].len() == 1 {
                    Ok(())
                } else {
                    let block = require(resolved.block, "OnlyBlockInStack: block")?;
                    let name = ctx.world.block(block).name;
                    Err(format!("Block {name} is not alone on its stack"))
                }
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

pub struct FreeStackAvailable;
impl Constraint for FreeStackAvailable {
    fn name(&self) -> &'static str {
        "free_stack_available"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &mut action.kind {
            ActionKind::PutDown { resolved, .. } => {
                match ctx.world.stacks.iter().position(|s| s.is_empty()) {
                    Some(idx) => {
                        resolved.stack = Some(idx);
                        Ok(())
                    }
                    None => Err("no empty stack is available".to_string()),
                }
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

pub struct BlocksOnSameStack;
impl Constraint for BlocksOnSameStack {
    fn name(&self) -> &'static str {
        "blocks_on_same_stack"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &action.kind {
            ActionKind::Unstack { resolved, .. } => {
                let stack_idx = require(resolved.stack, "BlocksOnSameStack: stack")?;
                let below = require(resolved.companion_block, "BlocksOnSameStack: companion_block")?;
                if ctx.world.stacks[stack_idx].contains(below) {
                    Ok(())
                } else {
                    let below_name = ctx.world.block(below).name;
                    let block = require(resolved.block, "BlocksOnSameStack: block")?;
                    let block_name = ctx.world.block(block).name;
                    Err(format!(
                        "Block {below_name} is not in the same stack as block {block_name}"
                    ))
                }
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

pub struct BlockBelowRelationship;
impl Constraint for BlockBelowRelationship {
    fn name(&self) -> &'static str {
        "block_below_relationship"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &action.kind {
            ActionKind::Unstack { resolved, .. } => {
                let stack_idx = require(resolved.stack, "BlockBelowRelationship: stack")?;
                let block = require(resolved.block, "BlockBelowRelationship: block")?;
                let below = require(resolved.companion_block, "BlockBelowRelationship: companion_block")?;
                if ctx.world.stacks[stack_idx].below(block) == Some(below) {
                    Ok(())
                } else {
                    let block_name = ctx.world.block(block).name;
                    let below_name = ctx.world.block(below).name;
                    Err(format!(
                        "Block {below_name} is not directly below block {block_name}"
                    ))
                }
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

pub struct UniqueBlockNames;
impl Constraint for UniqueBlockNames {
    fn name(&self) -> &'static str {
        "unique_block_names"
    }

    fn check(&self, _ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &action.kind {
            ActionKind::PreStart {
                stack_config: Some(config),
                ..
            } => check_unique_names(config),
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

fn check_unique_names(config: &StackConfig) -> Result<(), String> {
    if worldbuilder::has_unique_names(config) {
        Ok(())
    } else {
        Err("block names in the initial stack configuration must be unique".to_string())
    }
}

pub struct ValidStartData;
impl Constraint for ValidStartData {
    fn name(&self) -> &'static str {
        "valid_start_data"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &mut action.kind {
            ActionKind::PreStart {
                scenario_id,
                constraint_set,
                stack_config,
                resolved,
            } => validate_pre_start(ctx, scenario_id, constraint_set, stack_config, resolved),
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

fn validate_pre_start(
    ctx: &ValidationContext,
    scenario_id: &Option<String>,
    constraint_set: &Option<String>,
    stack_config: &Option<StackConfig>,
    resolved: &mut Option<ResolvedStart>,
) -> Result<(), String> {
    match (scenario_id, constraint_set) {
        (Some(id), None) => {
            if stack_config.is_some() {
                return Err(
                    "scenario_id cannot be combined with an explicit stack configuration"
                        .to_string(),
                );
            }
            let scenario = ctx
                .scenarios
                .get_by_id_or_name(id)
                .ok_or_else(|| format!("scenario {id} does not exist"))?;
            *resolved = Some(ResolvedStart {
                constraint_set: scenario.constraint_set.clone(),
                stack_config: Some(scenario.initial_state.stacks.clone()),
                scenario_name: Some(scenario.name.clone()),
            });
            Ok(())
        }
        (None, cs) => {
            *resolved = Some(ResolvedStart {
                constraint_set: cs.clone().unwrap_or_else(|| "base".to_string()),
                stack_config: stack_config.clone(),
                scenario_name: None,
            });
            Ok(())
        }
        (Some(_), Some(_)) => Err(
            "scenario_id cannot be combined with an explicit constraint_set".to_string(),
        ),
    }
}

// --- variant-only constraints ------------------------------------------

pub struct BlockBelowWiderEqual;
impl Constraint for BlockBelowWiderEqual {
    fn name(&self) -> &'static str {
        "block_below_wider_equal"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &action.kind {
            ActionKind::StackOn { resolved, .. } => {
                let held = require(resolved.block, "BlockBelowWiderEqual: held block")?;
                let target = require(resolved.companion_block, "BlockBelowWiderEqual: target block")?;
                width_check(ctx.world, held, target, |held, target| target >= held)
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

pub struct BlockBelowWider;
impl Constraint for BlockBelowWider {
    fn name(&self) -> &'static str {
        "block_below_wider"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &action.kind {
            ActionKind::StackOn { resolved, .. } => {
                let held = require(resolved.block, "BlockBelowWider: held block")?;
                let target = require(resolved.companion_block, "BlockBelowWider: target block")?;
                width_check(ctx.world, held, target, |held, target| target > held)
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

pub struct UpperBlockNarrower;
impl Constraint for UpperBlockNarrower {
    fn name(&self) -> &'static str {
        "upper_block_narrower"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &action.kind {
            ActionKind::StackOn { resolved, .. } => {
                let held = require(resolved.block, "UpperBlockNarrower: held block")?;
                let target = require(resolved.companion_block, "UpperBlockNarrower: target block")?;
                width_check(ctx.world, held, target, |held, target| held < target)
            }
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

fn width_check(
    world: &WorldState,
    held: BlockId,
    target: BlockId,
    predicate: impl Fn(u32, u32) -> bool,
) -> Result<(), String> {
    let held_block = world.block(held);
    let target_block = world.block(target);
    if predicate(held_block.x_size, target_block.x_size) {
        Ok(())
    } else {
        Err(format!(
            "Block {} ({}w) cannot be placed on block {} ({}w) under this rule set",
            held_block.name, held_block.x_size, target_block.name, target_block.x_size
        ))
    }
}

/// Wired onto the `start` chain (see `hanoi_towers_constraint_set`), so it
/// checks `ActionKind::Start`'s own `stack_config`, not `PreStart`'s.
pub struct ValidStartConfig;
impl Constraint for ValidStartConfig {
    fn name(&self) -> &'static str {
        "valid_start_config_hanoi"
    }

    fn check(&self, _ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        let result = match &action.kind {
            ActionKind::Start {
                stack_config: Some(config),
                ..
            } => validate_hanoi_config(config),
            _ => Ok(()),
        };
        Ok(apply(action, result))
    }
}

fn validate_hanoi_config(config: &StackConfig) -> Result<(), String> {
    let mut seen_widths: HashSet<u32> = HashSet::new();
    for stack in config {
        let mut widths = Vec::with_capacity(stack.len());
        for spec in stack {
            let width = spec.x_size.unwrap_or(DEFAULT_BLOCK_SIZE_X);
            if !seen_widths.insert(width) {
                return Err(format!(
                    "block widths must be unique under the hanoi-towers rule set, duplicate width {width}"
                ));
            }
            widths.push(width);
        }
        if !widths.windows(2).all(|w| w[0] > w[1]) {
            return Err(
                "initial stacks must be arranged wide-to-narrow bottom-to-top under the hanoi-towers rule set"
                    .to_string(),
            );
        }
    }
    Ok(())
}

pub struct PartialStatusVisibility;
impl Constraint for PartialStatusVisibility {
    fn name(&self) -> &'static str {
        "partial_status_visibility"
    }

    fn check(&self, ctx: &ValidationContext, action: &mut SimulationAction) -> Result<bool, CoreError> {
        if !ctx.world.running {
            action.set_invalid("the simulation is not running");
            return Ok(false);
        }
        if matches!(action.kind, ActionKind::GetStatus) {
            action.attach(partial_status_dict(ctx.world));
        }
        Ok(true)
    }
}

fn partial_status_dict(world: &WorldState) -> serde_json::Value {
    let stacks: Vec<_> = world
        .stacks
        .iter()
        .map(|stack| {
            let blocks = stack.blocks();
            let n = blocks.len();
            let blocks_json: Vec<_> = blocks
                .iter()
                .enumerate()
                .map(|(i, &id)| {
                    let mut json = world.block_json(id);
                    if n - 1 - i >= 2 {
                        json["name"] = serde_json::Value::String("unknown".to_string());
                    }
                    json
                })
                .collect();
            serde_json::json!({ "number": stack.number, "blocks": blocks_json })
        })
        .collect();

    serde_json::json!({
        "running": world.running,
        "stacks": stacks,
        "robot": {
            "state": world.robot.state.as_str(),
            "held_block": world.robot.held_block.map(|id| world.block_json(id)),
        },
    })
}

/// The partial-observability variant's renderer-facing counterpart to
/// `PartialStatusVisibility`: rather than redacting a single response dict,
/// it refreshes every block's persistent `hide_name` flag (§4.1) so a
/// renderer reading `WorldState` directly, not just a `GetStatus` reply,
/// also sees the redaction. Wired onto every motion/status/plan action kind
/// in `partial_observability_constraint_set`, never gates — it always
/// succeeds.
pub struct PartialVisualDisplay;
impl Constraint for PartialVisualDisplay {
    fn name(&self) -> &'static str {
        "partial_visual_display"
    }

    fn check(&self, ctx: &ValidationContext, _action: &mut SimulationAction) -> Result<bool, CoreError> {
        ctx.world.apply_partial_visibility();
        Ok(true)
    }
}
