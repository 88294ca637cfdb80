use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BLOCK_SIZE_X, DEFAULT_BLOCK_SIZE_Y};

/// Index into [`crate::entity::WorldState`]'s block arena.
///
/// Stacks and the robot hold `BlockId`s rather than owned [`Block`] values,
/// so the stack/block ownership graph stays a flat arena instead of a tree
/// of cyclic references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub usize);

/// A uniquely-named rectangular object with a size, colour, and optional
/// weight/type. Created by the world builder and lives for the world's
/// lifetime; only `position` and `hide_name` change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    /// Single uppercase letter, unique per world.
    pub name: char,
    pub x_size: u32,
    pub y_size: u32,
    pub weight: Option<f64>,
    #[serde(rename = "type")]
    pub block_type: Option<String>,
    pub color: (u8, u8, u8),
    pub position: (f64, f64),
    /// Set by the partial-observability rule variant's `PartialVisualDisplay`
    /// constraint for renderer consumption; never read by any other
    /// constraint. A `Cell` because that constraint only ever holds a shared
    /// `&WorldState` (it runs like every other read-only check), yet still
    /// needs to flip this one renderer-facing flag in place.
    #[serde(skip)]
    pub hide_name: Cell<bool>,
}

impl Block {
    /// `color` is sampled by the world builder from `COLOR_PALETTE` without
    /// repetition per Start (`random.sample(range(26), n_blocks)` in
    /// `stack_creator.py`); `Block` itself has no opinion on which index a
    /// name gets.
    pub fn new(id: BlockId, name: char, color: (u8, u8, u8), position: (f64, f64)) -> Self {
        Self {
            id,
            name,
            x_size: DEFAULT_BLOCK_SIZE_X,
            y_size: DEFAULT_BLOCK_SIZE_Y,
            weight: None,
            block_type: None,
            color,
            position,
            hide_name: Cell::new(false),
        }
    }

    pub fn with_geometry(mut self, x_size: u32, y_size: u32) -> Self {
        self.x_size = x_size;
        self.y_size = y_size;
        self
    }

    pub fn with_weight(mut self, weight: Option<f64>) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_type(mut self, block_type: Option<String>) -> Self {
        self.block_type = block_type;
        self
    }
}
