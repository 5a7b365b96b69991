use serde::{Deserialize, Serialize};

/// Aggregate progress events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    /// Progress recomputed after a status poll
    Updated {
        current_operation: usize,
        total_operations: usize,
        percent_payload: u8,
        total_progress: f64,
    },
}
