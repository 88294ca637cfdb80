//! Fixed constants grounded in the reference implementation's `robot.py` and
//! `settings.py`. Rendering itself is out of scope, but the robot's motion
//! targets are derived from the same screen geometry the renderer uses, so
//! the constants are shared here rather than duplicated at the boundary.

/// Units the robot travels per tick while in a moving state.
///
/// `robot.py`'s local `SPEED` constant is authoritative over
/// `settings.py::ROBOT_SPEED` (8); only the local constant is read by the
/// function that actually drives motion.
pub const SPEED: f64 = 10.0;

/// Vertical offset above a stack's top the robot rises to before and after
/// a horizontal move, so it clears neighbouring stacks in transit.
pub const TOP_GRIP_HEIGHT: f64 = 100.0;

/// Nominal screen height used to derive ground level for empty stacks.
pub const SCREEN_HEIGHT: f64 = 600.0;

/// Height of the visual stack base a block sits directly on top of.
pub const STACK_BASE_HEIGHT: f64 = 20.0;

/// Left/right screen margin stacks are evenly spaced within.
pub const SCREEN_MARGIN: f64 = 60.0;

/// Nominal screen width used to space stacks when no explicit layout is given.
pub const SCREEN_WIDTH: f64 = 800.0;

/// Default block geometry when a block's size is not specified.
pub const DEFAULT_BLOCK_SIZE_X: u32 = 100;
pub const DEFAULT_BLOCK_SIZE_Y: u32 = 40;

/// Stack count a random world builds when no configuration is given.
/// `stack_creator.py::DEFAULT_N_STACKS` is a fixed constant, not a range —
/// only the colour assignment and block-to-stack placement are randomized.
pub const DEFAULT_N_STACKS: u32 = 3;

/// Block count a random world builds when no configuration is given.
/// `stack_creator.py::DEFAULT_N_BLOCKS` is a fixed constant, not a range.
pub const DEFAULT_N_BLOCKS: u32 = 4;

/// Default tick rate of the simulation loop.
pub const DEFAULT_TICKS_PER_SECOND: u32 = 60;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:5001";

/// Where the robot parks on a fresh Start, before any action has moved it.
pub const ROBOT_HOME: (f64, f64) = (SCREEN_WIDTH / 2.0, SCREEN_HEIGHT - STACK_BASE_HEIGHT);

/// The 26-entry palette `block.py::COLOR_LIST` draws from: the world
/// builder samples `n_blocks` distinct indices out of this list per Start,
/// matching `random.sample(range(26), n_blocks)` in `stack_creator.py`.
pub const COLOR_PALETTE: [(u8, u8, u8); 26] = [
    (255, 140, 140),
    (140, 255, 140),
    (140, 140, 255),
    (255, 215, 140),
    (200, 140, 255),
    (140, 255, 255),
    (255, 255, 140),
    (255, 140, 255),
    (140, 255, 200),
    (255, 200, 140),
    (255, 140, 200),
    (200, 255, 140),
    (140, 200, 255),
    (200, 140, 200),
    (140, 200, 140),
    (200, 200, 255),
    (215, 255, 140),
    (140, 255, 215),
    (255, 140, 215),
    (215, 140, 255),
    (140, 215, 255),
    (255, 255, 200),
    (200, 255, 255),
    (255, 200, 255),
    (255, 215, 215),
    (215, 255, 215),
];
