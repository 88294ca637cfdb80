//! The renderer boundary (C11). Visual playback itself is out of scope (see
//! SPEC_FULL §1); this is the small contract the tick loop drives so a real
//! renderer can be substituted without touching `blocksworld-core`.

use blocksworld_core::WorldState;
use tracing::debug;

pub trait Renderer: Send {
    fn render(&mut self, world: &WorldState);
}

/// Draws nothing. The default when no renderer is configured.
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _world: &WorldState) {}
}

/// Stands in for the reference implementation's pygame window: logs a
/// compact one-line summary of the world every tick instead of drawing it.
#[derive(Default)]
pub struct LoggingRenderer;

impl Renderer for LoggingRenderer {
    fn render(&mut self, world: &WorldState) {
        let held = world.robot.held_block.map(|id| world.block(id).name);
        debug!(
            robot_state = world.robot.state.as_str(),
            held = ?held,
            stacks = world.stacks.len(),
            "tick"
        );
    }
}
