use serde::{Deserialize, Serialize};

use payseq_types::{InstallerAction, PayloadId, ResultCode};

/// Events for single payload operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationEvent {
    /// Operation handed to the install engine
    Started {
        payload: PayloadId,
        action: InstallerAction,
        index: usize,
        total: usize,
    },

    /// Engine reported a terminal result
    Completed {
        payload: PayloadId,
        code: ResultCode,
    },

    /// Engine failed to start or report on the operation
    EngineFailed {
        payload: Option<PayloadId>,
        failure: super::FailureContext,
    },
}
