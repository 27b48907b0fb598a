use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend-owned recording status. The backend advances these; the client
/// only reads them and gates what the operator may do at each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    Scheduled,
    Recording,
    Completed,
    Failed,
    Cancelled,
}

impl RecordingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecordingStatus::Completed | RecordingStatus::Failed | RecordingStatus::Cancelled
        )
    }

    /// Whether the backend may legally report a move from `self` to `next`.
    /// `scheduled -> {recording, cancelled}`,
    /// `recording -> {completed, failed, cancelled}`, terminals go nowhere.
    pub fn can_become(&self, next: RecordingStatus) -> bool {
        use RecordingStatus::*;
        matches!(
            (*self, next),
            (Scheduled, Recording)
                | (Scheduled, Cancelled)
                | (Recording, Completed)
                | (Recording, Failed)
                | (Recording, Cancelled)
        )
    }
}

/// A client-initiated operation refused by the lifecycle guard. Raised
/// before any request is built, so it can never reach the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("only scheduled recordings are editable")]
pub struct BlockedOperation {
    pub status: RecordingStatus,
}

/// Editing the title or interval is only meaningful while the recording has
/// not started; everything else gets a blocked-operation signal.
pub fn guard_edit(status: RecordingStatus) -> Result<(), BlockedOperation> {
    match status {
        RecordingStatus::Scheduled => Ok(()),
        other => Err(BlockedOperation { status: other }),
    }
}

/// How removal should be presented. The wire operation is the same DELETE
/// either way; an in-progress recording is cancelled by the backend rather
/// than erased, and the label should say so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalAction {
    Cancel,
    Delete,
}

impl RemovalAction {
    pub fn label(&self) -> &'static str {
        match self {
            RemovalAction::Cancel => "cancel",
            RemovalAction::Delete => "delete",
        }
    }
}

pub fn removal_action(status: RecordingStatus) -> RemovalAction {
    match status {
        RecordingStatus::Recording => RemovalAction::Cancel,
        _ => RemovalAction::Delete,
    }
}
