//! Dispatch rules (§4.10): what each action kind does once the constraint
//! manager has already validated it. Shared by the tick loop and the plan
//! executor, so a plan step runs through the exact same pipeline as an
//! externally submitted request.
//!
//! Every fatal-invariant case here propagates a [`CoreError`] with `?`
//! instead of panicking in place — the tick loop is the only place that
//! turns one into a panic.

use crate::action::{ActionKind, SimulationAction};
use crate::config::SimConfig;
use crate::constants::ROBOT_HOME;
use crate::constraint::ConstraintManager;
use crate::entity::{Robot, WorldState};
use crate::error::CoreError;
use crate::robot_fsm;
use crate::scenario::ScenarioRegistry;
use crate::worldbuilder;

pub enum DispatchOutcome {
    /// Dispatch fired the action's reply synchronously.
    Completed,
    /// A motion action was handed to the robot; its reply fires on a later
    /// tick once the state machine finishes the motion.
    MotionAccepted,
    /// The simulation should terminate after this tick.
    Quit,
}

/// Runs one already-valid action to completion. Callers must have already
/// run [`ConstraintManager::validate`] and confirmed `action.is_valid()`.
pub fn dispatch(
    world: &mut WorldState,
    scenarios: &ScenarioRegistry,
    constraints: &mut ConstraintManager,
    config: &SimConfig,
    action: &mut SimulationAction,
) -> Result<DispatchOutcome, CoreError> {
    if !action.is_valid() {
        return Err(CoreError::DispatchInvariant(
            "dispatch called on an action that was never validated",
        ));
    }

    if action.kind.is_motion() {
        if !robot_fsm::accept(world, action) {
            return Err(CoreError::DispatchInvariant(
                "a validated motion action was refused by an available robot",
            ));
        }
        return Ok(DispatchOutcome::MotionAccepted);
    }

    match &action.kind {
        ActionKind::Quit => {
            action.reply_success("Application is quitting");
            Ok(DispatchOutcome::Quit)
        }
        ActionKind::PreStart { .. } => {
            dispatch_pre_start(world, scenarios, constraints, config, action)?;
            Ok(DispatchOutcome::Completed)
        }
        ActionKind::Start { .. } => {
            dispatch_start(world, config, action)?;
            Ok(DispatchOutcome::Completed)
        }
        ActionKind::Stop => {
            world.running = false;
            action.reply_success("Simulation stopped");
            Ok(DispatchOutcome::Completed)
        }
        ActionKind::GetStatus | ActionKind::GetFullStatus => {
            let data = action.take_attached().ok_or(CoreError::DispatchInvariant(
                "SimulationRunning must attach a status dict on success",
            ))?;
            action.reply_success_with_data("status", data);
            Ok(DispatchOutcome::Completed)
        }
        ActionKind::GetRules => {
            let text = constraints.active_rules()?;
            action.reply_success(text);
            Ok(DispatchOutcome::Completed)
        }
        ActionKind::GetScenario { id_or_name } => {
            match scenarios.get_by_id_or_name(id_or_name) {
                Some(scenario) => {
                    let data = serde_json::to_value(scenario)
                        .map_err(|e| CoreError::Serialization(e.to_string()))?;
                    let message = scenario.name.clone();
                    action.reply_success_with_data(message, data);
                }
                None => action.reply_failure(format!("scenario {id_or_name} does not exist")),
            }
            Ok(DispatchOutcome::Completed)
        }
        ActionKind::Plan { .. } => Err(CoreError::DispatchInvariant(
            "Plan is accepted by the plan executor, never dispatched directly",
        )),
        ActionKind::PickUp { .. }
        | ActionKind::PutDown { .. }
        | ActionKind::StackOn { .. }
        | ActionKind::Unstack { .. } => Err(CoreError::DispatchInvariant("motion kinds are handled above")),
    }
}

/// Resolves the constraint-set swap and the enqueued Start in one step, so a
/// malformed Start is rejected under the rules it would actually run under
/// and the previously active set stays in force on failure (§9, resolution
/// 1).
fn dispatch_pre_start(
    world: &mut WorldState,
    scenarios: &ScenarioRegistry,
    constraints: &mut ConstraintManager,
    config: &SimConfig,
    action: &mut SimulationAction,
) -> Result<(), CoreError> {
    let resolved = match &action.kind {
        ActionKind::PreStart { resolved, .. } => resolved.clone().ok_or(CoreError::DispatchInvariant(
            "ValidStartData must populate PreStart::resolved on success",
        ))?,
        _ => {
            return Err(CoreError::DispatchInvariant(
                "dispatch_pre_start called on a non-PreStart action",
            ))
        }
    };

    let mut start_action = SimulationAction::without_reply(ActionKind::Start {
        constraint_set: Some(resolved.constraint_set.clone()),
        stack_config: resolved.stack_config.clone(),
        description: resolved.scenario_name.clone(),
    });

    // Validate the enqueued Start under the *target* set first; only a Start
    // that actually succeeds under the new rules causes the swap. A
    // malformed Start therefore leaves the previously active set in force.
    if constraints.validate_against(&resolved.constraint_set, world, scenarios, &mut start_action)? {
        constraints.set_active(&resolved.constraint_set)?;
        dispatch_start(world, config, &mut start_action)?;
        action.reply_success(describe_start(&resolved));
    } else {
        let reason = start_action
            .invalid_reason()
            .ok_or(CoreError::DispatchInvariant("an invalidated Start must carry a reason"))?
            .to_string();
        action.set_invalid(reason.clone());
        action.reply_failure(format!("Start input denied, as {reason}."));
    }
    Ok(())
}

fn describe_start(resolved: &crate::action::ResolvedStart) -> String {
    match &resolved.scenario_name {
        Some(name) => format!("Simulation started with {name}"),
        None => format!(
            "Simulation started with {} rules and {} initial stacks",
            resolved.constraint_set,
            resolved
                .stack_config
                .as_ref()
                .map(|c| c.len())
                .map(|n| n.to_string())
                .unwrap_or_else(|| "a random number of".to_string())
        ),
    }
}

fn dispatch_start(world: &mut WorldState, config: &SimConfig, action: &mut SimulationAction) -> Result<(), CoreError> {
    let stack_config = match &action.kind {
        ActionKind::Start { stack_config, .. } => stack_config.clone(),
        _ => {
            return Err(CoreError::DispatchInvariant(
                "dispatch_start called on a non-Start action",
            ))
        }
    };

    let built = worldbuilder::build(stack_config.as_ref(), config);
    *world = WorldState::new_running(Robot::new(ROBOT_HOME), built.stacks, built.blocks);

    action.set_valid();
    action.reply_success("Simulation started");
    Ok(())
}
