//! The action taxonomy (C2): a tagged request, a validity tri-state, and
//! resolved references filled in by constraints during validation so
//! dispatch never repeats a name lookup.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::TOP_GRIP_HEIGHT;
use crate::entity::{BlockId, WorldState};
use crate::reply::{ActionReply, ReplyChannel};

/// A single block entry inside a start/plan stack configuration: either a
/// bare letter (defaults for everything else) or a structured record with
/// explicit geometry. The two forms are mixed freely within one inner list
/// (see the scenario file grammar in SPEC_FULL §4.5), so `Deserialize` is
/// implemented by hand rather than derived.
#[derive(Debug, Clone, Serialize)]
pub struct BlockSpec {
    pub name: char,
    #[serde(default)]
    pub x_size: Option<u32>,
    #[serde(default)]
    pub y_size: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default, rename = "type")]
    pub block_type: Option<String>,
}

impl BlockSpec {
    pub fn bare(name: char) -> Self {
        Self {
            name,
            x_size: None,
            y_size: None,
            weight: None,
            block_type: None,
        }
    }
}

impl<'de> Deserialize<'de> for BlockSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(char),
            Full {
                name: char,
                #[serde(default)]
                x_size: Option<u32>,
                #[serde(default)]
                y_size: Option<u32>,
                #[serde(default)]
                weight: Option<f64>,
                #[serde(default, rename = "type")]
                block_type: Option<String>,
            },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bare(name) => Ok(BlockSpec::bare(name)),
            Repr::Full {
                name,
                x_size,
                y_size,
                weight,
                block_type,
            } => Ok(BlockSpec {
                name,
                x_size,
                y_size,
                weight,
                block_type,
            }),
        }
    }
}

/// One stack's bottom-to-top initial contents.
pub type StackConfig = Vec<Vec<BlockSpec>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    Execute,
    Verify,
}

/// One step of a submitted plan, matching the HTTP `/execute_plan` and
/// `/verify_plan` step grammar exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanStep {
    PickUp { block: char },
    PutDown { block: char },
    Stack { block1: char, block2: char },
    Unstack { block1: char, block2: char },
}

impl PlanStep {
    pub fn describe(&self) -> String {
        match self {
            PlanStep::PickUp { block } => format!("pick_up({block})"),
            PlanStep::PutDown { block } => format!("put_down({block})"),
            PlanStep::Stack { block1, block2 } => format!("stack({block1}, {block2})"),
            PlanStep::Unstack { block1, block2 } => format!("unstack({block1}, {block2})"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Validity {
    #[default]
    Unvalidated,
    Valid,
    Invalid(String),
}

/// The tagged variant every request is parsed into. Each variant owns its
/// typed payload plus whatever resolved references constraints attach while
/// validating it.
pub enum ActionKind {
    Quit,
    /// Resolves a scenario id or a `(constraint_set, stack_config)` pair
    /// into the parameters of the `Start` it will enqueue; see
    /// `ValidStartData` and DESIGN.md's resolution of the base spec's §9
    /// constraint-set-swap-ordering question.
    PreStart {
        scenario_id: Option<String>,
        constraint_set: Option<String>,
        stack_config: Option<StackConfig>,
        resolved: Option<ResolvedStart>,
    },
    Start {
        constraint_set: Option<String>,
        stack_config: Option<StackConfig>,
        description: Option<String>,
    },
    Stop,
    GetStatus,
    /// Always full visibility regardless of the active constraint set; see
    /// SPEC_FULL §3a.
    GetFullStatus,
    GetRules,
    GetScenario {
        id_or_name: String,
    },
    PickUp {
        block: char,
        resolved: MotionResolution,
    },
    PutDown {
        block: char,
        resolved: MotionResolution,
    },
    StackOn {
        block: char,
        target: char,
        resolved: MotionResolution,
    },
    Unstack {
        block: char,
        below: char,
        resolved: MotionResolution,
    },
    Plan {
        steps: Vec<PlanStep>,
        mode: PlanMode,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedStart {
    pub constraint_set: String,
    pub stack_config: Option<StackConfig>,
    pub scenario_name: Option<String>,
}

/// References a motion-action constraint resolves during validation:
/// the block acted on, the companion block named in the request (the
/// target of a Stack, or the block below in an Unstack), and the stack
/// index involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionResolution {
    pub block: Option<BlockId>,
    pub companion_block: Option<BlockId>,
    pub stack: Option<usize>,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Quit => "quit",
            ActionKind::PreStart { .. } => "pre_start",
            ActionKind::Start { .. } => "start",
            ActionKind::Stop => "stop",
            ActionKind::GetStatus => "get_status",
            ActionKind::GetFullStatus => "get_full_status",
            ActionKind::GetRules => "get_rules",
            ActionKind::GetScenario { .. } => "get_scenario",
            ActionKind::PickUp { .. } => "pick_up",
            ActionKind::PutDown { .. } => "put_down",
            ActionKind::StackOn { .. } => "stack",
            ActionKind::Unstack { .. } => "unstack",
            ActionKind::Plan { .. } => "plan",
        }
    }

    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            ActionKind::PickUp { .. }
                | ActionKind::PutDown { .. }
                | ActionKind::StackOn { .. }
                | ActionKind::Unstack { .. }
        )
    }

    /// The coordinate the robot must drive to, derivable only once a
    /// constraint has resolved the stack this motion targets.
    pub fn get_target(&self, world: &WorldState) -> Option<(f64, f64)> {
        let stack_idx = match self {
            ActionKind::PickUp { resolved, .. } | ActionKind::Unstack { resolved, .. } => {
                resolved.stack?
            }
            ActionKind::PutDown { resolved, .. } | ActionKind::StackOn { resolved, .. } => {
                resolved.stack?
            }
            _ => return None,
        };
        let stack = world.stacks.get(stack_idx)?;
        let y = stack.top_y(world.blocks_arena()) - TOP_GRIP_HEIGHT;
        Some((stack.x, y))
    }
}

pub struct SimulationAction {
    pub kind: ActionKind,
    pub validity: Validity,
    reply: Option<ReplyChannel>,
    /// Data a constraint attached on success — the status dict for
    /// `GetStatus`/`GetFullStatus`, the rules text for `GetRules`, the
    /// scenario record for `GetScenario`. Dispatch reads this back instead
    /// of recomputing it.
    attached: Option<serde_json::Value>,
}

impl SimulationAction {
    pub fn new(kind: ActionKind, reply: Option<ReplyChannel>) -> Self {
        Self {
            kind,
            validity: Validity::Unvalidated,
            reply,
            attached: None,
        }
    }

    pub fn attach(&mut self, data: serde_json::Value) {
        self.attached = Some(data);
    }

    pub fn attached(&self) -> Option<&serde_json::Value> {
        self.attached.as_ref()
    }

    pub fn take_attached(&mut self) -> Option<serde_json::Value> {
        self.attached.take()
    }

    pub fn without_reply(kind: ActionKind) -> Self {
        Self::new(kind, None)
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.validity, Validity::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.validity, Validity::Invalid(_))
    }

    pub fn invalid_reason(&self) -> Option<&str> {
        match &self.validity {
            Validity::Invalid(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn set_valid(&mut self) {
        self.validity = Validity::Valid;
    }

    pub fn set_invalid(&mut self, reason: impl Into<String>) {
        self.validity = Validity::Invalid(reason.into());
    }

    pub fn reply_success(&mut self, message: impl Into<String>) {
        self.fire(ActionReply::success(message));
    }

    pub fn reply_success_with_data(&mut self, message: impl Into<String>, data: serde_json::Value) {
        self.fire(ActionReply::success_with_data(message, data));
    }

    pub fn reply_failure(&mut self, message: impl Into<String>) {
        self.fire(ActionReply::failure(message));
    }

    /// Takes the reply channel without firing it — used when a `Plan`
    /// step's own internal reply must be intercepted by the plan executor
    /// instead of reaching the caller directly.
    pub fn take_reply(&mut self) -> Option<ReplyChannel> {
        self.reply.take()
    }

    pub fn reply_channel(&self) -> Option<&ReplyChannel> {
        self.reply.as_ref()
    }

    fn fire(&mut self, reply: ActionReply) {
        if let Some(channel) = self.reply.take() {
            channel.fire(reply);
        }
    }
}

impl fmt::Debug for SimulationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationAction")
            .field("kind", &self.kind.name())
            .field("validity", &self.validity)
            .finish()
    }
}
