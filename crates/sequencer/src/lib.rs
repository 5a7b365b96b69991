#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Payload operation sequencing for payseq
//!
//! This crate linearizes a pre-resolved payload dependency graph and drives
//! the resulting operations one at a time through an external install
//! engine:
//!
//! - [`order`] - deterministic total order over payloads
//! - [`OperationQueue`] - built once, hands out the next runnable payload,
//!   propagates dependency failures and applies cancellation
//! - [`OperationStatus`] - aggregate progress and media bookkeeping
//! - [`MediaSwapDetector`] - halts between operations until removable media
//!   is present or the user gives up
//! - [`Scheduler`] - the poll-driven state machine tying it all together
//! - [`simulate_operations`] - dry run against a simulation engine

pub mod cancel;
pub mod engine;
pub mod media;
pub mod order;
pub mod queue;
pub mod scheduler;
pub mod simulate;
pub mod status;

pub use cancel::{CancelSignal, CancelToken};
pub use engine::{InstallEngine, InstallParams, SimulationEngine};
pub use media::{
    alternate_media_path, needs_swap_check, AlertPresenter, MediaManager, MediaSwapDetector,
    PathInformation, RemovableDrive, SwapChoice, SwapOutcome,
};
pub use order::{compare_operations, log_payload_set, operation_order, sort_for_display};
pub use queue::OperationQueue;
pub use scheduler::{DriveMode, RunState, Scheduler, SchedulerOptions, StatusObserver};
pub use simulate::simulate_operations;
pub use status::{MediaProgress, OperationStatus};
