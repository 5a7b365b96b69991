use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Run lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// First operation is about to start
    Started { total_operations: usize },

    /// Queue exhausted
    Completed {
        succeeded: usize,
        failed: usize,
        duration: Duration,
    },

    /// Run stopped by the user; unstarted payloads were canceled
    Canceled { canceled: usize },

    /// Run stopped because of an error
    Aborted { failure: super::FailureContext },
}
