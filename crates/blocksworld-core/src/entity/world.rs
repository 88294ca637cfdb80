use serde_json::json;

use super::block::{Block, BlockId};
use super::robot::Robot;
use super::stack::Stack;

/// `{ running, robot, stacks[] }`. Constructed empty; a valid Start
/// transitions it to `running = true` with a freshly built robot and
/// stacks; Stop transitions it back.
///
/// Blocks live in a flat arena (`blocks: Vec<Block>` addressed by
/// `BlockId`); stacks and the robot hold indices, never owned `Block`
/// values, so the whole state is trivially `Clone` for snapshot/restore
/// (§4.8) without walking a cyclic ownership graph.
#[derive(Clone)]
pub struct WorldState {
    pub running: bool,
    pub robot: Robot,
    pub stacks: Vec<Stack>,
    blocks: Vec<Block>,
}

impl WorldState {
    /// The state before any Start: not running, a parked robot, no stacks.
    pub fn empty() -> Self {
        Self {
            running: false,
            robot: Robot::new((0.0, 0.0)),
            stacks: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn new_running(robot: Robot, stacks: Vec<Stack>, blocks: Vec<Block>) -> Self {
        Self {
            running: true,
            robot,
            stacks,
            blocks,
        }
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub fn blocks_arena(&self) -> &[Block] {
        &self.blocks
    }

    /// Every block in the world, including one currently held by the robot:
    /// the arena holds a block for its whole lifetime regardless of which
    /// stack (if any) currently contains it.
    pub fn all_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn find_block_by_name(&self, name: char) -> Option<BlockId> {
        self.blocks.iter().find(|b| b.name == name).map(|b| b.id)
    }

    /// The stack index containing `block`, if it is not currently held.
    pub fn stack_containing(&self, block: BlockId) -> Option<usize> {
        self.stacks.iter().position(|s| s.contains(block))
    }

    /// A deep snapshot for plan verification. Reply channels inside any
    /// in-flight robot motion are `Arc`-shared, not duplicated state: firing
    /// one clone fires the other's sibling slot too, see
    /// [`crate::reply::ReplyChannel`].
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    pub fn restore(&mut self, snapshot: Self) {
        *self = snapshot;
    }

    /// A pure, structured description of every stack and the robot. Never
    /// mutates state. The partial-observability rule variant builds its own
    /// redacted view on top of this rather than changing it in place.
    pub fn to_status_dict(&self) -> serde_json::Value {
        let stacks: Vec<_> = self
            .stacks
            .iter()
            .map(|stack| {
                let blocks: Vec<_> = stack
                    .blocks()
                    .iter()
                    .map(|&id| self.block_json(id))
                    .collect();
                json!({
                    "number": stack.number,
                    "blocks": blocks,
                })
            })
            .collect();

        json!({
            "running": self.running,
            "stacks": stacks,
            "robot": {
                "state": self.robot.state.as_str(),
                "held_block": self.robot.held_block.map(|id| self.block_json(id)),
            },
        })
    }

    /// Marks every block deeper than the top two in its stack as hidden.
    /// Driven by the `PartialVisualDisplay` constraint, wired onto every
    /// motion/status/plan action kind in the partial-observability rule
    /// variant, ahead of rendering; rendering itself stays out of scope,
    /// this just maintains the flag the renderer boundary reads. Takes `&self`
    /// because a constraint only ever has a shared `&WorldState` — `hide_name`
    /// is a `Cell` for exactly this reason.
    pub fn apply_partial_visibility(&self) {
        for block in self.blocks.iter() {
            block.hide_name.set(false);
        }
        for stack in &self.stacks {
            let blocks = stack.blocks();
            let n = blocks.len();
            for (i, id) in blocks.iter().enumerate() {
                if n - 1 - i >= 2 {
                    self.blocks[id.0].hide_name.set(true);
                }
            }
        }
    }

    pub(crate) fn block_json(&self, id: BlockId) -> serde_json::Value {
        let block = self.block(id);
        json!({
            "name": block.name.to_string(),
            "x_size": block.x_size,
            "y_size": block.y_size,
            "weight": block.weight,
            "type": block.block_type,
            "color": [block.color.0, block.color.1, block.color.2],
            "position": [block.position.0, block.position.1],
            "hide_name": block.hide_name.get(),
        })
    }
}
