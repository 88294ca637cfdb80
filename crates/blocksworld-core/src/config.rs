//! Core-level simulation configuration (§4.1/§9): the tick rate and the
//! default random-world counts, both overridable so tests can pin a
//! specific world shape instead of building the reference defaults.

use std::time::Duration;

use crate::constants::{DEFAULT_N_BLOCKS, DEFAULT_N_STACKS, DEFAULT_TICKS_PER_SECOND};

#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub ticks_per_second: u32,
    /// Stack count a random Start with no stack config builds. Fixed, not a
    /// range — `stack_creator.py::DEFAULT_N_STACKS` never varies; only
    /// colour assignment and block placement are randomized.
    pub default_n_stacks: u32,
    /// Block count a random Start with no stack config builds. Fixed, not a
    /// range — `stack_creator.py::DEFAULT_N_BLOCKS` never varies.
    pub default_n_blocks: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            default_n_stacks: DEFAULT_N_STACKS,
            default_n_blocks: DEFAULT_N_BLOCKS,
        }
    }
}

impl SimConfig {
    /// A config that pins a specific stack/block count, for tests that need
    /// a predictable random world shape.
    pub fn deterministic(n_stacks: u32, n_blocks: u32) -> Self {
        Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            default_n_stacks: n_stacks,
            default_n_blocks: n_blocks,
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.ticks_per_second as f64)
    }
}
