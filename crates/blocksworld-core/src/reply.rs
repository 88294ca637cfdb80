//! The single-shot reply mechanism attached to every action.
//!
//! `blocksworld-core` is transport-agnostic: it does not know whether the
//! caller is an HTTP handler blocked on a `tokio::sync::oneshot`, an
//! interactive key handler, or an internal plan step. A [`ReplyChannel`] is
//! just a boxed closure, fired exactly once by dispatch.
//!
//! The inner slot is an `Arc<Mutex<..>>` rather than a plain `Box`/`Option`
//! so that [`crate::entity::WorldState`] snapshots (taken for plan
//! verification, §4.8) can cheaply clone an in-flight action's reply
//! channel: both the live robot and the restored snapshot's robot end up
//! holding a handle to the *same* one-shot slot, so whichever one actually
//! completes the interrupted motion is the one that fires it, and the
//! caller is none the wiser about the restore.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// The payload fired back across a [`ReplyChannel`].
#[derive(Debug, Clone)]
pub struct ActionReply {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

impl ActionReply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn success_with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

type ReplyFn = dyn FnOnce(ActionReply) + Send;

#[derive(Clone)]
pub struct ReplyChannel(Arc<Mutex<Option<Box<ReplyFn>>>>);

impl ReplyChannel {
    pub fn new(f: impl FnOnce(ActionReply) + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::new(f)))))
    }

    /// Fires the reply if it has not already fired. A no-op on a clone whose
    /// sibling already fired (the common case after a snapshot restore).
    pub fn fire(&self, reply: ActionReply) {
        if let Some(f) = self.0.lock().expect("reply channel mutex poisoned").take() {
            f(reply);
        }
    }

    pub fn has_fired(&self) -> bool {
        self.0.lock().expect("reply channel mutex poisoned").is_none()
    }
}

impl fmt::Debug for ReplyChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyChannel")
            .field("fired", &self.has_fired())
            .finish()
    }
}
