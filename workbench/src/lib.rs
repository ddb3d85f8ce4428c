//! Workbench spatial state for Alchemist.
//!
//! A workbench holds transient, positioned *instances* of elements. Dropping
//! one instance onto another starts a combination through the engine's
//! [`Orchestrator`](alchemist_engine::Orchestrator); the outcome is applied on
//! the next [`Workbench::tick`].
//!
//! Instance lifecycle:
//!
//! ```text
//! Placed ──attempt_pair──▶ Paired ──result──▶ consumed ──display interval──▶ new instance
//!                            │
//!                            └──declined──▶ Placed (second instance nudged aside)
//! ```

mod command;
mod instance;
mod notice;
mod spatial;
mod workbench;

pub use command::{SurfaceCommand, SurfaceHandle};
pub use instance::{Instance, InstanceState, Resolution};
pub use notice::WorkbenchNotice;
pub use spatial::SpatialIndex;
pub use workbench::{DropOutcome, Workbench, WorkbenchSettings};

use alchemist_types::InstanceId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkbenchError {
    #[error("no instance {0} on the workbench")]
    UnknownInstance(InstanceId),
    #[error("instance {0} cannot be paired with itself")]
    SelfPair(InstanceId),
    #[error("instance {0} is already waiting on a combination")]
    AlreadyPaired(InstanceId),
    #[error("workbench command queue is full")]
    CommandQueueFull,
    #[error("workbench is no longer accepting commands")]
    SurfaceClosed,
}
