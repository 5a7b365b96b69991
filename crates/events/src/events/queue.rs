use serde::{Deserialize, Serialize};

use payseq_types::{PayloadId, ResultCode};

/// Operation queue events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueueEvent {
    /// Queue built and ordered
    Opened {
        order: Vec<PayloadId>,
        reverse: bool,
        estimated_size_kb: u64,
    },

    /// Queue construction failed; the run never starts
    OpenFailed { failure: super::FailureContext },

    /// A dependent inherited a dependency's failure and will not run
    DependentSkipped {
        payload: PayloadId,
        dependency: PayloadId,
        code: ResultCode,
    },

    /// A payload was marked canceled before it started
    PayloadCanceled { payload: PayloadId },
}
