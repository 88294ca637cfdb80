//! The plan executor/verifier (C8): sequences motion actions, snapshotting
//! `WorldState` up front so a Verify-mode run can restore it regardless of
//! how the run ends, and Execute-mode can tell what it would need to
//! restore if asked to (it is not, per §9 resolution 3).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::action::{ActionKind, MotionResolution, PlanMode, PlanStep, SimulationAction};
use crate::config::SimConfig;
use crate::constraint::ConstraintManager;
use crate::dispatch::{self, DispatchOutcome};
use crate::entity::WorldState;
use crate::error::CoreError;
use crate::reply::{ActionReply, ReplyChannel};
use crate::scenario::ScenarioRegistry;

/// The report attached to a Plan's failure reply when a step is invalidated
/// (§4.8): every step completed before the failure, the offending step and
/// why it failed, and every step that was never attempted.
#[derive(Debug, Clone)]
pub struct PlanFailure {
    pub executed: Vec<String>,
    pub offending: String,
    pub reason: String,
    pub skipped: Vec<String>,
}

impl PlanFailure {
    pub fn message(&self) -> String {
        let mut lines = Vec::with_capacity(self.executed.len() + self.skipped.len() + 1);
        for (i, step) in self.executed.iter().enumerate() {
            lines.push(format!("step {}: {step} - executed", i + 1));
        }
        let offending_index = self.executed.len() + 1;
        lines.push(format!(
            "step {offending_index}: {} - offending, {}",
            self.offending, self.reason
        ));
        for (i, step) in self.skipped.iter().enumerate() {
            lines.push(format!("step {}: {step} - skipped", offending_index + i + 1));
        }
        lines.join("\n")
    }
}

type SharedReply = Arc<Mutex<Option<ActionReply>>>;

/// A step handed to the robot: its description (for the eventual failure
/// report) and the slot its internal reply lands in once the motion
/// finishes.
struct PendingStep {
    description: String,
    reply: SharedReply,
}

/// A running Plan: the snapshot taken at acceptance, the remaining step
/// queue, and the step currently in flight, if any.
pub struct PlanRun {
    mode: PlanMode,
    snapshot: WorldState,
    remaining: VecDeque<PlanStep>,
    executed: Vec<String>,
    current: Option<PendingStep>,
    reply: ReplyChannel,
}

pub enum PlanTickOutcome {
    InProgress,
    Succeeded,
    Failed(PlanFailure),
}

impl PlanRun {
    /// Accepts a Plan action: snapshots the world, enables verification mode
    /// iff `mode == Verify`, and queues every step.
    pub fn begin(world: &mut WorldState, steps: Vec<PlanStep>, mode: PlanMode, reply: ReplyChannel) -> Self {
        let snapshot = world.snapshot();
        world.robot.verification_mode = mode == PlanMode::Verify;
        Self {
            mode,
            snapshot,
            remaining: steps.into(),
            executed: Vec::new(),
            current: None,
            reply,
        }
    }

    /// One tick of plan progress. Polls the in-flight step (if any) for
    /// completion, then — if the plan isn't already finished — dequeues the
    /// next step as soon as the robot is free. Returns `InProgress` until
    /// the whole plan either completes or a step is invalidated.
    ///
    /// A fatal invariant violation propagates up to `Sim::tick` rather than
    /// panicking here — `PlanRun::tick` is itself always called from within
    /// that one tick loop, never standalone.
    pub fn tick(
        &mut self,
        world: &mut WorldState,
        scenarios: &ScenarioRegistry,
        constraints: &mut ConstraintManager,
        config: &SimConfig,
    ) -> Result<PlanTickOutcome, CoreError> {
        if let Some(pending) = self.current.take() {
            let fired = pending
                .reply
                .lock()
                .expect("fatal: plan step reply mutex poisoned")
                .take();
            match fired {
                None => {
                    self.current = Some(pending);
                    return Ok(PlanTickOutcome::InProgress);
                }
                Some(reply) if reply.success => self.executed.push(pending.description),
                Some(reply) => {
                    return Ok(self.finish_failure(world, pending.description, reply.message))
                }
            }
        }

        if self.remaining.is_empty() {
            return Ok(self.finish_success(world));
        }

        if !world.robot.is_available() {
            return Ok(PlanTickOutcome::InProgress);
        }

        let step = self
            .remaining
            .pop_front()
            .expect("fatal: checked non-empty immediately above");
        let description = step.describe();

        let shared: SharedReply = Arc::new(Mutex::new(None));
        let shared_for_closure = Arc::clone(&shared);
        let reply_channel = ReplyChannel::new(move |reply| {
            *shared_for_closure
                .lock()
                .expect("fatal: plan step reply mutex poisoned") = Some(reply);
        });

        let mut action = SimulationAction::new(step_to_action_kind(&step), Some(reply_channel));
        if constraints.validate(world, scenarios, &mut action)? {
            match dispatch::dispatch(world, scenarios, constraints, config, &mut action)? {
                DispatchOutcome::MotionAccepted => {
                    self.current = Some(PendingStep { description, reply: shared });
                }
                _ => unreachable!("fatal: every plan step is a motion action"),
            }
        } else {
            let reason = action
                .invalid_reason()
                .expect("fatal: an invalidated action must carry a reason")
                .to_string();
            return Ok(self.finish_failure(world, description, reason));
        }

        Ok(PlanTickOutcome::InProgress)
    }

    fn finish_success(&mut self, world: &mut WorldState) -> PlanTickOutcome {
        world.robot.verification_mode = false;
        if self.mode == PlanMode::Verify {
            world.restore(self.snapshot.clone());
        }
        let message = match self.mode {
            PlanMode::Execute => "Simulation plan is valid and was executed successfully.",
            PlanMode::Verify => "Simulation plan is valid and can be executed.",
        };
        self.reply.fire(ActionReply::success(message));
        PlanTickOutcome::Succeeded
    }

    fn finish_failure(&mut self, world: &mut WorldState, offending: String, reason: String) -> PlanTickOutcome {
        world.robot.verification_mode = false;
        let failure = PlanFailure {
            executed: std::mem::take(&mut self.executed),
            offending,
            reason,
            skipped: self.remaining.iter().map(PlanStep::describe).collect(),
        };
        // Execute mode keeps whatever prefix already ran; only Verify rolls
        // back (§9 resolution 3 — this is the documented product decision,
        // not an oversight).
        if self.mode == PlanMode::Verify {
            world.restore(self.snapshot.clone());
        }
        self.reply.fire(ActionReply::failure(failure.message()));
        PlanTickOutcome::Failed(failure)
    }
}

fn step_to_action_kind(step: &PlanStep) -> ActionKind {
    match step {
        PlanStep::PickUp { block } => ActionKind::PickUp {
            block: *block,
            resolved: MotionResolution::default(),
        },
        PlanStep::PutDown { block } => ActionKind::PutDown {
            block: *block,
            resolved: MotionResolution::default(),
        },
        PlanStep::Stack { block1, block2 } => ActionKind::StackOn {
            block: *block1,
            target: *block2,
            resolved: MotionResolution::default(),
        },
        PlanStep::Unstack { block1, block2 } => ActionKind::Unstack {
            block: *block1,
            below: *block2,
            resolved: MotionResolution::default(),
        },
    }
}
