//! The local interactive surface (C10's second ingest path). The reference
//! implementation reads raw key events from a pygame window
//! (`user_input_handler.py`); a terminal process has no equivalent event
//! loop, so this ingests line-buffered stdin instead and maps each line to
//! the same small vocabulary of key events pygame dispatched: space, escape,
//! a letter, or a quit request. Resolving a key event into a
//! [`blocksworld_core::ActionKind`] still needs `WorldState` (to know which
//! motion a letter means), so that resolution lives in [`crate::bridge`],
//! which owns the world; this module only produces the raw event.

use std::io::BufRead;
use std::sync::mpsc;

/// A key event, already collapsed to pygame's handled vocabulary
/// (`user_input_handler.py`'s `SPACE` / `ESCAPE` / alpha / window-close
/// cases).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Space,
    Escape,
    Letter(char),
    Quit,
}

/// A source of key events, polled non-blockingly once per tick. Transport
/// detail the bridge thread owns; `blocksworld-core` never sees this trait.
pub trait InteractiveIngest: Send {
    fn poll(&mut self) -> Option<KeyEvent>;
}

/// The default when no interactive surface is wired up: never produces an
/// event.
pub struct NullInteractiveIngest;

impl InteractiveIngest for NullInteractiveIngest {
    fn poll(&mut self) -> Option<KeyEvent> {
        None
    }
}

/// Reads whitespace-trimmed stdin lines on a background thread and forwards
/// the ones that parse as a key event. `quit`/`q` maps to `Quit`, `space`/` `
/// to `Space`, `esc`/`escape` to `Escape`, and any single alphabetic
/// character to `Letter`; anything else is ignored.
pub struct StdinIngest {
    rx: mpsc::Receiver<KeyEvent>,
}

impl StdinIngest {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if let Some(event) = parse_line(&line) {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
        });
        Self { rx }
    }
}

impl InteractiveIngest for StdinIngest {
    fn poll(&mut self) -> Option<KeyEvent> {
        self.rx.try_recv().ok()
    }
}

fn parse_line(line: &str) -> Option<KeyEvent> {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "q" | "quit" => Some(KeyEvent::Quit),
        "" | "space" => Some(KeyEvent::Space),
        "esc" | "escape" => Some(KeyEvent::Escape),
        _ => {
            let mut chars = trimmed.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => Some(KeyEvent::Letter(c.to_ascii_uppercase())),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_handled_vocabulary() {
        assert_eq!(parse_line("q"), Some(KeyEvent::Quit));
        assert_eq!(parse_line("QUIT"), Some(KeyEvent::Quit));
        assert_eq!(parse_line(""), Some(KeyEvent::Space));
        assert_eq!(parse_line("esc"), Some(KeyEvent::Escape));
        assert_eq!(parse_line("a"), Some(KeyEvent::Letter('A')));
        assert_eq!(parse_line("hello"), None);
    }
}
