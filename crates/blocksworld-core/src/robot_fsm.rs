//! The robot motion state machine (C7): multi-tick execution of validated
//! motion actions, with a verification mode that collapses every motion
//! state to a single instantaneous step so plan verification can reuse the
//! exact same transition sequence as animated execution.
//!
//! ```text
//! IDLE ──[Pick|Unstack accepted]──> MOVING_TO_PICK -> PICKING -> LIFTING -> HOLDING
//! HOLDING ──[Put|Stack accepted]──> MOVING_TO_PLACE -> LOWERING -> RELEASING -> IDLE
//! ```

use crate::action::{ActionKind, SimulationAction};
use crate::constants::SPEED;
use crate::entity::{InFlightMotion, MotionKind, RobotState, WorldState};
use crate::reply::ActionReply;

/// Hands a validated motion action to the robot, starting its first
/// transition. Returns `false` (without consuming the action) if the robot
/// cannot accept work this tick — the caller should leave the action queued
/// and retry on a later tick.
pub fn accept(world: &mut WorldState, action: &mut SimulationAction) -> bool {
    if !action.is_valid() || !world.robot.is_available() {
        return false;
    }

    let (kind, resolved, is_pick) = match &action.kind {
        ActionKind::PickUp { resolved, .. } => (MotionKind::PickUp, *resolved, true),
        ActionKind::Unstack { resolved, .. } => (MotionKind::Unstack, *resolved, true),
        ActionKind::PutDown { resolved, .. } => (MotionKind::PutDown, *resolved, false),
        ActionKind::StackOn { resolved, .. } => (MotionKind::StackOn, *resolved, false),
        _ => return false,
    };

    let block = resolved
        .block
        .expect("fatal: motion action validated without a resolved block");
    let stack = resolved
        .stack
        .expect("fatal: motion action validated without a resolved stack");
    let target = action
        .kind
        .get_target(world)
        .expect("fatal: motion action validated without a resolvable target");

    let reply = match action.take_reply() {
        Some(reply) => reply,
        None => return false,
    };

    let motion = InFlightMotion {
        kind,
        block,
        stack,
        companion_block: resolved.companion_block,
        reply,
    };

    if is_pick {
        world.robot.accept_pick(motion, target);
    } else {
        world.robot.accept_place(motion, target);
    }
    true
}

/// Advances the robot one tick. A no-op while `IDLE` or `HOLDING` — those
/// states wait for the next accepted action instead of self-advancing.
pub fn step(world: &mut WorldState) {
    match world.robot.state {
        RobotState::Idle | RobotState::Holding => {}
        RobotState::MovingToPick => {
            if advance(world) {
                world.robot.set_state(RobotState::Picking);
            }
        }
        RobotState::MovingToPlace => {
            if advance(world) {
                world.robot.set_state(RobotState::Lowering);
            }
        }
        RobotState::Picking => do_pick(world),
        RobotState::Lifting => do_lift(world),
        RobotState::Lowering => do_lower(world),
        RobotState::Releasing => do_release(world),
    }

    if let Some(block) = world.robot.held_block {
        let position = world.robot.position;
        world.block_mut(block).position = position;
    }
}

/// Moves the robot `SPEED` units toward its target, or snaps straight there
/// in verification mode. Returns whether the target was reached this step.
fn advance(world: &mut WorldState) -> bool {
    let target = world
        .robot
        .target()
        .expect("fatal: robot moving without a target");

    if world.robot.verification_mode {
        world.robot.position = target;
        world.robot.clear_target();
        return true;
    }

    let (x, y) = world.robot.position;
    let (tx, ty) = target;
    let (dx, dy) = (tx - x, ty - y);
    let distance = (dx * dx + dy * dy).sqrt();

    if distance <= SPEED {
        world.robot.position = target;
        world.robot.clear_target();
        true
    } else {
        world.robot.position = (x + dx / distance * SPEED, y + dy / distance * SPEED);
        false
    }
}

fn do_pick(world: &mut WorldState) {
    let stack_idx = world
        .robot
        .in_flight()
        .expect("fatal: picking with no in-flight motion")
        .stack;
    let block = world.stacks[stack_idx]
        .pop_top()
        .expect("fatal: source stack empty at pick");
    world.robot.held_block = Some(block);
    world.robot.set_state(RobotState::Lifting);
}

fn do_lift(world: &mut WorldState) {
    let motion = world
        .robot
        .take_motion()
        .expect("fatal: lifting with no in-flight motion");
    let message = success_message(world, &motion);
    motion.reply.fire(ActionReply::success(message));
    world.robot.set_state(RobotState::Holding);
}

fn do_lower(world: &mut WorldState) {
    let (block, stack_idx) = {
        let motion = world
            .robot
            .in_flight()
            .expect("fatal: lowering with no in-flight motion");
        (motion.block, motion.stack)
    };
    world.stacks[stack_idx].push(block);
    world.robot.held_block = None;
    world.robot.set_state(RobotState::Releasing);
}

fn do_release(world: &mut WorldState) {
    let motion = world
        .robot
        .take_motion()
        .expect("fatal: releasing with no in-flight motion");
    let message = success_message(world, &motion);
    motion.reply.fire(ActionReply::success(message));
    world.robot.set_state(RobotState::Idle);
}

fn success_message(world: &WorldState, motion: &InFlightMotion) -> String {
    let name = world.block(motion.block).name;
    let number = world.stacks[motion.stack].number;
    match motion.kind {
        MotionKind::PickUp => format!("Block {name} picked up successfully from stack {number}"),
        MotionKind::PutDown => format!("Block {name} put down successfully on stack {number}"),
        MotionKind::StackOn => {
            let target = motion
                .companion_block
                .map(|id| world.block(id).name)
                .unwrap_or('?');
            format!("Block {name} stacked successfully on block {target} in stack {number}")
        }
        MotionKind::Unstack => {
            let below = motion
                .companion_block
                .map(|id| world.block(id).name)
                .unwrap_or('?');
            format!("Block {name} unstacked successfully from block {below} in stack {number}")
        }
    }
}
