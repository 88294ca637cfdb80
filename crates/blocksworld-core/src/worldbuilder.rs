//! The world builder (C6): materialises stacks and blocks from an optional
//! configuration, or randomly when none is given.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::action::{BlockSpec, StackConfig};
use crate::config::SimConfig;
use crate::constants::{
    COLOR_PALETTE, DEFAULT_BLOCK_SIZE_X, DEFAULT_BLOCK_SIZE_Y, SCREEN_MARGIN, SCREEN_WIDTH,
};
use crate::entity::{Block, BlockId, Stack};

pub struct BuiltWorld {
    pub stacks: Vec<Stack>,
    pub blocks: Vec<Block>,
}

/// `build(config?) -> stacks[]` (plus the backing block arena). `None` uses
/// `config.default_n_stacks`/`default_n_blocks` (fixed counts, not a random
/// range — `stack_creator.py::DEFAULT_N_STACKS`/`DEFAULT_N_BLOCKS` are plain
/// constants) and scatters the blocks across the stacks in insertion order;
/// `Some` places each configured block bottom-to-top in its named stack.
/// Either way, every block's colour is sampled without repetition from
/// `COLOR_PALETTE`, matching `random.sample(range(26), n_blocks)` in both of
/// the reference builder's code paths.
pub fn build(stack_config: Option<&StackConfig>, config: &SimConfig) -> BuiltWorld {
    match stack_config {
        Some(stacks) => build_from_config(stacks),
        None => build_random(config),
    }
}

/// A provided configuration is well-formed only if every block name across
/// every stack is distinct — mirrors the `UniqueBlockNames` constraint so
/// PreStart/Start validation and the builder agree on the same rule.
pub fn has_unique_names(config: &StackConfig) -> bool {
    let mut seen = std::collections::HashSet::new();
    config
        .iter()
        .flatten()
        .all(|spec| seen.insert(spec.name))
}

fn build_random(config: &SimConfig) -> BuiltWorld {
    let mut rng = rand::thread_rng();
    let n_stacks = config.default_n_stacks as usize;
    let n_blocks = config.default_n_blocks as usize;
    let colors = sample_colors(&mut rng, n_blocks);

    let mut stacks = stacks_with_spacing(n_stacks);
    let mut blocks = Vec::new();

    for i in 0..n_blocks {
        let name = (b'A' + i as u8) as char;
        let id = BlockId(blocks.len());
        blocks.push(Block::new(id, name, colors[i], (0.0, 0.0)));
        let stack_idx = rng.gen_range(0..n_stacks);
        place_on_stack(&mut stacks, &mut blocks, stack_idx, id);
    }

    BuiltWorld { stacks, blocks }
}

fn build_from_config(config: &StackConfig) -> BuiltWorld {
    let mut rng = rand::thread_rng();
    let n_blocks = config.iter().map(|inner| inner.len()).sum();
    let colors = sample_colors(&mut rng, n_blocks);

    let mut stacks = stacks_with_spacing(config.len().max(1));
    let mut blocks = Vec::new();

    for (stack_idx, inner) in config.iter().enumerate() {
        for spec in inner {
            let id = BlockId(blocks.len());
            blocks.push(block_from_spec(id, spec, colors[id.0]));
            place_on_stack(&mut stacks, &mut blocks, stack_idx, id);
        }
    }

    BuiltWorld { stacks, blocks }
}

/// Draws `n` distinct colours from `COLOR_PALETTE` without replacement —
/// `random.sample(range(26), n_blocks)` in `stack_creator.py`. `n` beyond
/// the palette's 26 entries (more blocks than letters, never produced by
/// this builder) cycles the shuffled palette rather than panicking.
fn sample_colors(rng: &mut impl Rng, n: usize) -> Vec<(u8, u8, u8)> {
    let mut palette = COLOR_PALETTE;
    palette.shuffle(rng);
    palette.iter().copied().cycle().take(n).collect()
}

fn block_from_spec(id: BlockId, spec: &BlockSpec, color: (u8, u8, u8)) -> Block {
    let mut block = Block::new(id, spec.name, color, (0.0, 0.0));
    block.x_size = spec.x_size.unwrap_or(DEFAULT_BLOCK_SIZE_X);
    block.y_size = spec.y_size.unwrap_or(DEFAULT_BLOCK_SIZE_Y);
    block.weight = spec.weight;
    block.block_type = spec.block_type.clone();
    block
}

fn stacks_with_spacing(n: usize) -> Vec<Stack> {
    (0..n)
        .map(|i| {
            let x = if n <= 1 {
                SCREEN_WIDTH / 2.0
            } else {
                SCREEN_MARGIN + i as f64 * (SCREEN_WIDTH - 2.0 * SCREEN_MARGIN) / (n as f64 - 1.0)
            };
            Stack::new(i + 1, x)
        })
        .collect()
}

fn place_on_stack(stacks: &mut [Stack], blocks: &mut [Block], stack_idx: usize, id: BlockId) {
    let top_y = stacks[stack_idx].top_y(blocks);
    let x = stacks[stack_idx].x;
    let y_size = blocks[id.0].y_size as f64;
    blocks[id.0].position = (x, top_y - y_size / 2.0);
    stacks[stack_idx].push(id);
}
