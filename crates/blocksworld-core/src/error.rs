//! Fatal-only error taxonomy.
//!
//! Every other failure category (precondition failed, malformed request,
//! unknown scenario, plan aborted) is represented as an action's own
//! [`crate::action::Validity::Invalid`] or a [`crate::plan::PlanFailure`],
//! never as a `Result::Err` — constraints and dispatch never throw past the
//! action boundary. `CoreError` exists only for internal consistency
//! violations that must never be reachable if the invariants in the entity
//! and robot modules hold. Constraints and dispatch functions only ever
//! *construct* and propagate a `CoreError` with `?`; the one place it is
//! ever turned into a panic is [`crate::sim::Sim::tick`], the tick loop
//! itself.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("robot's in-flight action was cleared unexpectedly")]
    InFlightActionLost,

    #[error("stack {0} is empty but a block was expected on top")]
    StackUnexpectedlyEmpty(usize),

    #[error("snapshot/restore mismatch: {0}")]
    SnapshotMismatch(String),

    #[error("block {0:?} referenced but not present in the world arena")]
    DanglingBlockId(crate::entity::BlockId),

    #[error("constraint chain ordering violated: {0} was read before an earlier constraint resolved it")]
    UnresolvedReference(&'static str),

    #[error("dispatch invariant violated: {0}")]
    DispatchInvariant(&'static str),

    #[error("unknown constraint set name: {0}")]
    UnknownConstraintSet(String),

    #[error("serialization invariant violated: {0}")]
    Serialization(String),
}
