//! Entity model: Block, Stack, Robot, WorldState and their invariants.

mod block;
mod robot;
mod stack;
mod world;

pub use block::{Block, BlockId};
pub use robot::{InFlightMotion, MotionKind, Robot, RobotState};
pub use stack::Stack;
pub use world::WorldState;
