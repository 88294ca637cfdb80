use serde::{Deserialize, Serialize};

use super::block::BlockId;
use crate::reply::ReplyChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotState {
    Idle,
    MovingToPick,
    Picking,
    Lifting,
    Holding,
    MovingToPlace,
    Lowering,
    Releasing,
}

impl RobotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotState::Idle => "idle",
            RobotState::MovingToPick => "moving_to_pick",
            RobotState::Picking => "picking",
            RobotState::Lifting => "lifting",
            RobotState::Holding => "holding",
            RobotState::MovingToPlace => "moving_to_place",
            RobotState::Lowering => "lowering",
            RobotState::Releasing => "releasing",
        }
    }
}

/// Which of the four motion action kinds is currently in flight. Carried
/// alongside the resolved references dispatch already looked up, so the
/// state machine never re-resolves a block or stack by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    PickUp,
    PutDown,
    StackOn,
    Unstack,
}

/// Everything the robot needs to finish a validated motion action across
/// however many ticks it takes, plus the reply it must fire exactly once on
/// completion.
#[derive(Clone)]
pub struct InFlightMotion {
    pub kind: MotionKind,
    pub block: BlockId,
    /// Stack the block is picked from (`PickUp`/`Unstack`) or placed onto
    /// (`PutDown`/`StackOn`).
    pub stack: usize,
    /// For `StackOn`/`Unstack`, the other named block (the target or the
    /// block below), used only to word the reply message.
    pub companion_block: Option<BlockId>,
    pub reply: ReplyChannel,
}

/// The single-gripper actor. Holds at most one block.
#[derive(Clone)]
pub struct Robot {
    pub state: RobotState,
    pub position: (f64, f64),
    pub held_block: Option<BlockId>,
    /// When set, motion states complete instantly regardless of distance —
    /// used to execute an entire plan against a snapshot without the
    /// animated multi-tick delay (§4.7 "verification mode").
    pub verification_mode: bool,
    target: Option<(f64, f64)>,
    motion: Option<InFlightMotion>,
}

impl Robot {
    pub fn new(position: (f64, f64)) -> Self {
        Self {
            state: RobotState::Idle,
            position,
            held_block: None,
            verification_mode: false,
            target: None,
            motion: None,
        }
    }

    /// `state = IDLE or HOLDING` is exactly when the robot accepts a new
    /// action this tick.
    pub fn is_available(&self) -> bool {
        matches!(self.state, RobotState::Idle | RobotState::Holding)
    }

    pub fn has_in_flight(&self) -> bool {
        self.motion.is_some()
    }

    pub fn in_flight(&self) -> Option<&InFlightMotion> {
        self.motion.as_ref()
    }

    pub fn target(&self) -> Option<(f64, f64)> {
        self.target
    }

    /// Accepts a validated Pick/Unstack action: begins the
    /// `Idle -> MovingToPick` transition.
    pub fn accept_pick(&mut self, motion: InFlightMotion, target: (f64, f64)) {
        debug_assert!(self.is_available());
        self.state = RobotState::MovingToPick;
        self.target = Some(target);
        self.motion = Some(motion);
    }

    /// Accepts a validated PutDown/Stack action: begins the
    /// `Holding -> MovingToPlace` transition.
    pub fn accept_place(&mut self, motion: InFlightMotion, target: (f64, f64)) {
        debug_assert!(self.is_available());
        self.state = RobotState::MovingToPlace;
        self.target = Some(target);
        self.motion = Some(motion);
    }

    pub(crate) fn take_motion(&mut self) -> Option<InFlightMotion> {
        self.motion.take()
    }

    pub(crate) fn set_state(&mut self, state: RobotState) {
        self.state = state;
    }

    pub(crate) fn clear_target(&mut self) {
        self.target = None;
    }
}
