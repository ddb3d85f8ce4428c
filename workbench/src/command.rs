//! Typed messages from other surfaces (the library) to the workbench.

use alchemist_types::{ElementId, Position};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::WorkbenchError;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    /// Place an element; `None` drops it at the surface's default spot.
    Add {
        element_id: ElementId,
        position: Option<Position>,
    },
    Clear,
}

/// Sending half of a workbench's bounded command queue.
///
/// Commands are applied on the workbench's next `tick`.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    tx: mpsc::Sender<SurfaceCommand>,
}

impl SurfaceHandle {
    pub(crate) fn new(tx: mpsc::Sender<SurfaceCommand>) -> Self {
        Self { tx }
    }

    /// Queue a command without waiting. Fails when the queue is full or the
    /// workbench is gone.
    pub fn send(&self, command: SurfaceCommand) -> Result<(), WorkbenchError> {
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => WorkbenchError::CommandQueueFull,
            TrySendError::Closed(_) => WorkbenchError::SurfaceClosed,
        })
    }

    pub fn add(&self, element_id: ElementId, position: Option<Position>) -> Result<(), WorkbenchError> {
        self.send(SurfaceCommand::Add {
            element_id,
            position,
        })
    }

    pub fn clear(&self) -> Result<(), WorkbenchError> {
        self.send(SurfaceCommand::Clear)
    }
}
