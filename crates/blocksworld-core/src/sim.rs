//! The simulation loop (C9): single-threaded ticked orchestrator. Driven
//! externally by one call to [`Sim::tick`] per tick; `blocksworld-server`
//! owns the thread and the pacing sleep, matching the sync-core/async-
//! transport split (§5, §9).

use std::sync::mpsc::Receiver;

use tracing::{debug, info, warn};

use crate::action::{ActionKind, SimulationAction};
use crate::config::SimConfig;
use crate::constraint::ConstraintManager;
use crate::dispatch::{self, DispatchOutcome};
use crate::entity::WorldState;
use crate::error::CoreError;
use crate::plan::{PlanRun, PlanTickOutcome};
use crate::robot_fsm;
use crate::scenario::ScenarioRegistry;

pub struct Sim {
    pub world: WorldState,
    pub scenarios: ScenarioRegistry,
    pub constraints: ConstraintManager,
    pub config: SimConfig,
    plan: Option<PlanRun>,
    quit: bool,
}

impl Sim {
    pub fn new(scenarios: ScenarioRegistry, config: SimConfig) -> Self {
        Self {
            world: WorldState::empty(),
            scenarios,
            constraints: ConstraintManager::new(),
            config,
            plan: None,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn plan_active(&self) -> bool {
        self.plan.is_some()
    }

    /// Runs exactly one tick (§4.9):
    /// 1. `interactive` is this tick's interactive action, if any — already
    ///    polled by the boundary.
    /// 2. `http_inbound` is polled here, non-blockingly, but only replaces
    ///    the candidate when the plan queue is idle; while a plan runs, HTTP
    ///    actions are left queued (§5).
    /// 3. A non-empty plan queue with an available robot takes priority over
    ///    both, per plan > HTTP > interactive.
    /// 4. The resulting candidate is validated then dispatched.
    /// 5. The robot state machine advances one step.
    ///
    /// The only place a [`CoreError`] is ever turned into a panic (§7):
    /// everything beneath this call propagates it with `?` instead.
    pub fn tick(&mut self, interactive: Option<SimulationAction>, http_inbound: &Receiver<SimulationAction>) {
        let plan_idle = self.plan.is_none();

        let mut candidate = interactive;
        if plan_idle {
            if let Ok(action) = http_inbound.try_recv() {
                candidate = Some(action);
            }
        }

        if let Some(plan) = &mut self.plan {
            let outcome = plan
                .tick(&mut self.world, &self.scenarios, &mut self.constraints, &self.config)
                .unwrap_or_else(|err| panic!("blocksworld-core: fatal invariant violation: {err}"));
            match outcome {
                PlanTickOutcome::InProgress => {}
                PlanTickOutcome::Succeeded => {
                    info!("plan executed successfully");
                    self.plan = None;
                }
                PlanTickOutcome::Failed(failure) => {
                    warn!(
                        offending = %failure.offending,
                        reason = %failure.reason,
                        executed = failure.executed.len(),
                        skipped = failure.skipped.len(),
                        "plan aborted"
                    );
                    self.plan = None;
                }
            }
        } else if let Some(mut action) = candidate {
            self.handle(&mut action)
                .unwrap_or_else(|err| panic!("blocksworld-core: fatal invariant violation: {err}"));
        }

        if self.world.running {
            robot_fsm::step(&mut self.world);
        }
    }

    fn handle(&mut self, action: &mut SimulationAction) -> Result<(), CoreError> {
        if let ActionKind::Plan { .. } = &action.kind {
            return self.handle_plan(action);
        }

        if self.constraints.validate(&self.world, &self.scenarios, action)? {
            debug!(action = action.kind.name(), "dispatching action");
            match dispatch::dispatch(
                &mut self.world,
                &self.scenarios,
                &mut self.constraints,
                &self.config,
                action,
            )? {
                DispatchOutcome::Quit => {
                    info!("quit requested");
                    self.quit = true;
                }
                DispatchOutcome::Completed | DispatchOutcome::MotionAccepted => {}
            }
        } else {
            let reason = action
                .invalid_reason()
                .expect("fatal: an invalidated action must carry a reason")
                .to_string();
            debug!(action = action.kind.name(), %reason, "action denied");
            action.reply_failure(format!("{} input denied, as {reason}.", action.kind.name()));
        }
        Ok(())
    }

    fn handle_plan(&mut self, action: &mut SimulationAction) -> Result<(), CoreError> {
        if self.constraints.validate(&self.world, &self.scenarios, action)? {
            let (steps, mode) = match &action.kind {
                ActionKind::Plan { steps, mode } => (steps.clone(), *mode),
                _ => unreachable!("fatal: handle_plan called on a non-Plan action"),
            };
            let reply = action
                .take_reply()
                .expect("fatal: a Plan action must carry a reply channel");
            info!(steps = steps.len(), mode = ?mode, "plan accepted");
            self.plan = Some(PlanRun::begin(&mut self.world, steps, mode, reply));
        } else {
            let reason = action
                .invalid_reason()
                .expect("fatal: an invalidated action must carry a reason")
                .to_string();
            action.reply_failure(format!("Plan input denied, as {reason}."));
        }
        Ok(())
    }
}
