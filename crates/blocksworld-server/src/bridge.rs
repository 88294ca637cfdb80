//! The sync-core/async-transport bridge (§4/§5 of SPEC_FULL): a dedicated OS
//! thread owns `Sim`/`WorldState` and runs the tick loop; `blocksworld-server`'s
//! tokio runtime only ever talks to it across the two channels built here.

use std::sync::mpsc;
use std::thread::JoinHandle;

use blocksworld_core::{ActionKind, Sim, SimulationAction, WorldState};
use tokio::sync::oneshot;
use tracing::info;

use crate::interactive::{InteractiveIngest, KeyEvent};
use crate::render::Renderer;

/// Handle to the running bridge thread: the sender every HTTP handler
/// clones to submit an action, and a one-shot fired the instant the loop
/// observes a `Quit`, so the async side can shut the HTTP listener down in
/// step.
pub struct Bridge {
    pub inbound: mpsc::Sender<SimulationAction>,
    pub quit_rx: oneshot::Receiver<()>,
    pub handle: JoinHandle<()>,
}

/// Spawns the tick loop. `sim` must already be constructed with whatever
/// `ScenarioRegistry` and `SimConfig` the server resolved at startup.
pub fn spawn(
    mut sim: Sim,
    mut interactive: Box<dyn InteractiveIngest>,
    mut renderer: Box<dyn Renderer>,
) -> Bridge {
    let (inbound_tx, inbound_rx) = mpsc::channel();
    let (quit_tx, quit_rx) = oneshot::channel();

    let handle = std::thread::Builder::new()
        .name("blocksworld-tick".to_string())
        .spawn(move || {
            let tick_duration = sim.config.tick_duration();
            let mut quit_tx = Some(quit_tx);
            loop {
                let interactive_action = interactive
                    .poll()
                    .and_then(|event| resolve_key_event(&sim.world, event))
                    .map(SimulationAction::without_reply);

                sim.tick(interactive_action, &inbound_rx);

                if !sim.world.robot.verification_mode {
                    renderer.render(&sim.world);
                }

                if sim.should_quit() {
                    info!("bridge thread stopping after quit");
                    if let Some(tx) = quit_tx.take() {
                        let _ = tx.send(());
                    }
                    break;
                }

                std::thread::sleep(tick_duration);
            }
        })
        .expect("fatal: failed to spawn the tick loop thread");

    Bridge {
        inbound: inbound_tx,
        quit_rx,
        handle,
    }
}

/// Turns a raw key event into the action it means, given the current world
/// — grounded in the reference implementation's `user_input_handler.py`:
/// space puts down while holding or starts while stopped, escape stops,
/// a letter picks up/unstacks an idle robot's target or stacks a held block
/// onto it, and anything else is a no-op.
fn resolve_key_event(world: &WorldState, event: KeyEvent) -> Option<ActionKind> {
    match event {
        KeyEvent::Quit => Some(ActionKind::Quit),
        KeyEvent::Escape => world.running.then_some(ActionKind::Stop),
        KeyEvent::Space => {
            if !world.running {
                return Some(ActionKind::Start {
                    constraint_set: None,
                    stack_config: None,
                    description: None,
                });
            }
            let held = world.robot.held_block?;
            Some(ActionKind::PutDown {
                block: world.block(held).name,
                resolved: Default::default(),
            })
        }
        KeyEvent::Letter(name) => {
            if !world.running {
                return None;
            }
            if let Some(held) = world.robot.held_block {
                return Some(ActionKind::StackOn {
                    block: world.block(held).name,
                    target: name,
                    resolved: Default::default(),
                });
            }
            if !world.robot.is_available() {
                return None;
            }
            let block = world.find_block_by_name(name)?;
            let stack_idx = world.stack_containing(block)?;
            let stack = &world.stacks[stack_idx];
            if stack.top() != Some(block) {
                return None;
            }
            if stack.len() == 1 {
                Some(ActionKind::PickUp {
                    block: name,
                    resolved: Default::default(),
                })
            } else {
                let below = stack.below(block)?;
                Some(ActionKind::Unstack {
                    block: name,
                    below: world.block(below).name,
                    resolved: Default::default(),
                })
            }
        }
    }
}
