//! Run-scoped progress record

use payseq_errors::Error;
use payseq_types::{MediaInfo, OperationResult, PayloadId};

/// Removable media bookkeeping for the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaProgress {
    /// 1-based index of the disk currently in use, 0 before any payload
    pub current_relative_disk_index: u32,
    pub current_media_name: String,
    /// Payloads installed from the current disk, excluding the first
    pub media_payloads_installed: u32,
    /// Distinct media names among queued payloads
    pub media_count: u32,
    /// Media path of the previous operation
    pub last_media_path: Option<String>,
}

/// Mutable state of one run, handed to status observers after every tick.
///
/// `current_operation` is `None` until the first pop and afterwards only
/// moves forward. `total_progress` never decreases unless an exit has been
/// requested.
#[derive(Debug, Clone, Default)]
pub struct OperationStatus {
    current_operation: Option<usize>,
    total_operations: usize,
    total_progress: f64,
    current_payload: Option<PayloadId>,
    live: Option<OperationResult>,
    operations_complete: bool,
    exit_requested: bool,
    media: MediaProgress,
    error: Option<Error>,
}

impl OperationStatus {
    pub(crate) fn new(total_operations: usize, media_count: u32) -> Self {
        Self {
            total_operations,
            media: MediaProgress {
                media_count,
                ..MediaProgress::default()
            },
            ..Self::default()
        }
    }

    /// Queue position of the operation being examined, `None` before the first pop
    #[must_use]
    pub fn current_operation(&self) -> Option<usize> {
        self.current_operation
    }

    #[must_use]
    pub fn total_operations(&self) -> usize {
        self.total_operations
    }

    /// Aggregate progress in `0.0..=100.0`
    #[must_use]
    pub fn total_progress(&self) -> f64 {
        self.total_progress
    }

    #[must_use]
    pub fn current_payload(&self) -> Option<&PayloadId> {
        self.current_payload.as_ref()
    }

    /// Latest snapshot reported for the current operation
    #[must_use]
    pub fn live_status(&self) -> Option<&OperationResult> {
        self.live.as_ref()
    }

    /// Percent complete of the current payload, if anything was reported
    #[must_use]
    pub fn percent_payload(&self) -> Option<u8> {
        self.live.as_ref().map(|live| live.percent_complete)
    }

    #[must_use]
    pub fn operations_complete(&self) -> bool {
        self.operations_complete
    }

    #[must_use]
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    #[must_use]
    pub fn media(&self) -> &MediaProgress {
        &self.media
    }

    /// Error that aborted the run
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Fold the latest engine snapshot into the aggregate.
    ///
    /// An absent snapshot (nothing started yet) leaves the record untouched.
    #[allow(clippy::cast_precision_loss)]
    pub fn update_progress(&mut self, latest: Option<OperationResult>) {
        let Some(latest) = latest else {
            return;
        };
        let percent = latest.percent_complete;
        self.live = Some(latest);

        if self.total_operations == 0 {
            return;
        }
        let Some(current) = self.current_operation else {
            return;
        };

        let next = if percent == 100 && current + 1 == self.total_operations {
            100.0
        } else {
            let interval = (100.0 / self.total_operations as f64).max(1.0);
            let offset = current as f64 * interval + f64::from(percent) * interval / 100.0;
            // Only the final operation may report 100.
            if offset >= 100.0 {
                99.0
            } else {
                offset
            }
        };

        self.total_progress = if self.exit_requested {
            next
        } else {
            self.total_progress.max(next)
        };
    }

    /// The current operation reported a non-running snapshot
    #[must_use]
    pub fn is_current_operation_complete(&self) -> bool {
        self.live.as_ref().is_some_and(|live| !live.is_running)
    }

    #[must_use]
    pub fn are_all_operations_complete(&self) -> bool {
        if self.operations_complete {
            return true;
        }
        self.total_operations > 0
            && self.current_operation == Some(self.total_operations - 1)
            && self.is_current_operation_complete()
    }

    pub(crate) fn advance(&mut self) -> usize {
        let next = self.current_operation.map_or(0, |current| current + 1);
        self.current_operation = Some(next);
        next
    }

    pub(crate) fn has_remaining(&self) -> bool {
        self.current_operation.map_or(0, |current| current + 1) < self.total_operations
    }

    pub(crate) fn set_current_payload(&mut self, payload: Option<PayloadId>) {
        self.current_payload = payload;
    }

    /// Start tracking a newly popped operation
    pub(crate) fn begin_operation(&mut self) {
        self.live = None;
    }

    pub(crate) fn set_live(&mut self, result: OperationResult) {
        self.live = Some(result);
    }

    pub(crate) fn mark_operations_complete(&mut self) {
        self.operations_complete = true;
    }

    pub(crate) fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub(crate) fn set_error(&mut self, error: Error) {
        self.error = Some(error);
    }

    /// Track which disk the next operation comes from.
    ///
    /// The first media payload starts disk 1. A change of media name starts
    /// the next disk (never past `media_count`); the same media counts one
    /// more payload installed from it.
    pub(crate) fn record_media(&mut self, media: &MediaInfo, previous_path: Option<String>) {
        self.media.last_media_path = previous_path.filter(|path| !path.is_empty());

        if self.media.current_relative_disk_index == 0 {
            self.media.current_relative_disk_index = 1;
            self.media.media_payloads_installed = 0;
        } else if self.media.current_media_name != media.media_name {
            self.media.media_payloads_installed = 0;
            if self.media.current_relative_disk_index < self.media.media_count {
                self.media.current_relative_disk_index += 1;
            }
        } else {
            self.media.media_payloads_installed += 1;
        }
        self.media.current_media_name.clone_from(&media.media_name);
    }

    /// Operation without media; the first one still starts disk 1
    pub(crate) fn record_no_media(&mut self) {
        if self.media.current_relative_disk_index == 0 {
            self.media.current_relative_disk_index = 1;
        }
    }
}
