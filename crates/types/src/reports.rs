//! Report type definitions for runs

use crate::{Payload, PayloadId, ResultCode};
use serde::{Deserialize, Serialize};

/// Summary of a finished run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Payloads whose operation succeeded, in queue order
    pub succeeded: Vec<PayloadId>,
    /// Payloads that failed, including dependents that inherited a failure
    pub failed: Vec<PayloadFailure>,
    /// Payloads that never started because the user canceled
    pub canceled: Vec<PayloadId>,
    /// Payloads without any recorded result
    pub not_run: Vec<PayloadId>,
    /// Aggregate progress when the run stopped
    pub total_progress: f64,
    /// Whether the run ended through cancellation
    pub was_canceled: bool,
    /// Total execution time
    pub duration_ms: u64,
}

/// Failed payload entry for reports
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFailure {
    pub id: PayloadId,
    pub code: ResultCode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl RunReport {
    /// Classify payloads by their recorded results
    pub fn from_payloads<'a>(payloads: impl IntoIterator<Item = &'a Payload>) -> Self {
        let mut report = Self::default();
        for payload in payloads {
            match payload.operation_result() {
                None => report.not_run.push(payload.id.clone()),
                Some(result) if result.is_success() => report.succeeded.push(payload.id.clone()),
                Some(result) if result.code().is_user_cancel() => {
                    report.canceled.push(payload.id.clone());
                }
                Some(result) => report.failed.push(PayloadFailure {
                    id: payload.id.clone(),
                    code: result.code(),
                    args: result.message.args.clone(),
                }),
            }
        }
        report
    }

    /// Every queued payload ran and succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.was_canceled
            && self.failed.is_empty()
            && self.canceled.is_empty()
            && self.not_run.is_empty()
    }
}
