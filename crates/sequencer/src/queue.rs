//! Operation queue
//!
//! Built once from the run's payloads, then drained one runnable payload at
//! a time. Dependencies are only checked against payloads in the same run;
//! anything outside it is assumed to have been validated upstream.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use payseq_errors::{Error, QueueError};
use payseq_events::{AppEvent, EventEmitter, EventSender, QueueEvent};
use payseq_types::{InstallerAction, OperationResult, Payload, PayloadId};

use crate::cancel::CancelSignal;
use crate::order::{log_payload_set, operation_order};
use crate::status::OperationStatus;

enum DependencyCheck {
    Ready,
    /// Dependency at this queue position has no result yet
    Pending(usize),
    /// Dependency at this queue position finished with a failure
    Failed(usize),
}

/// Ordered, run-scoped list of payload operations.
#[derive(Default)]
pub struct OperationQueue {
    /// Every payload handed to `open`, in input order
    payloads: Vec<Payload>,
    /// Queue position -> index into `payloads`
    order: Vec<usize>,
    /// Queue position -> queue positions it waits on, ascending
    dependencies: Vec<Vec<usize>>,
    reverse: bool,
    estimated_size_kb: u64,
    open_attempted: bool,
    opened: bool,
    current: Option<usize>,
    status: OperationStatus,
    cancel: Option<Arc<dyn CancelSignal>>,
    events: Option<EventSender>,
}

impl OperationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample `signal` on every pop
    #[must_use]
    pub fn with_cancel_signal(mut self, signal: Arc<dyn CancelSignal>) -> Self {
        self.cancel = Some(signal);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the queue.
    ///
    /// Payloads with no action are kept (they show up in
    /// [`payloads`](Self::payloads)) but never queued. Every payload's
    /// previous result is cleared.
    ///
    /// # Errors
    ///
    /// Fails on any call after the first, when install/repair and remove
    /// actions are mixed, when nothing is left to do, or when an id appears
    /// twice. The queue stays closed in every case; the payloads of a
    /// rejected first call remain available through
    /// [`payloads`](Self::payloads).
    pub fn open(&mut self, mut payloads: Vec<Payload>) -> Result<(), Error> {
        if self.open_attempted {
            return Err(QueueError::AlreadyOpened.into());
        }
        self.open_attempted = true;

        log_payload_set(
            "OperationQueue unordered operations",
            &payloads,
            Some(&|p: &Payload| format!("with operation {}", p.action)),
        );

        let duplicate = {
            let mut seen = HashSet::new();
            payloads
                .iter()
                .find(|p| !seen.insert(&p.id))
                .map(|p| p.id.to_string())
        };
        if let Some(id) = duplicate {
            let error = QueueError::DuplicatePayload { id };
            tracing::error!("OperationQueue: {error}");
            self.payloads = payloads;
            return Err(error.into());
        }

        let mut install_count = 0;
        let mut remove_count = 0;
        let mut estimated_size_kb = 0;
        let mut queued = Vec::new();
        for (index, payload) in payloads.iter_mut().enumerate() {
            payload.clear_operation_result();
            match payload.action {
                InstallerAction::Install | InstallerAction::Repair => {
                    install_count += 1;
                    estimated_size_kb += payload.estimated_size_kb();
                    queued.push(index);
                }
                InstallerAction::Remove => {
                    remove_count += 1;
                    queued.push(index);
                }
                InstallerAction::None => {}
            }
        }

        if install_count > 0 && remove_count > 0 {
            let error = QueueError::MixedOperations {
                install_count,
                remove_count,
            };
            tracing::error!("OperationQueue: {error}");
            self.payloads = payloads;
            return Err(error.into());
        }
        if queued.is_empty() {
            tracing::error!("OperationQueue: instruction set is empty");
            self.payloads = payloads;
            return Err(QueueError::Empty.into());
        }

        let reverse = remove_count > 0;
        let candidates: Vec<&Payload> = queued.iter().map(|&index| &payloads[index]).collect();
        let order: Vec<usize> = operation_order(&candidates, reverse)
            .into_iter()
            .map(|k| queued[k])
            .collect();

        let positions: HashMap<&PayloadId, usize> = order
            .iter()
            .enumerate()
            .map(|(position, &index)| (&payloads[index].id, position))
            .collect();
        let dependencies: Vec<Vec<usize>> = order
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                let payload = &payloads[index];
                let edges = if reverse {
                    &payload.satisfied
                } else {
                    &payload.required
                };
                let mut deps: Vec<usize> = edges
                    .iter()
                    .filter_map(|id| positions.get(id).copied())
                    .filter(|&dep| dep != position)
                    .collect();
                deps.sort_unstable();
                deps
            })
            .collect();

        let media_names: BTreeSet<&str> = order
            .iter()
            .filter_map(|&index| payloads[index].media.as_ref())
            .map(|media| media.media_name.as_str())
            .collect();
        let media_count = u32::try_from(media_names.len()).unwrap_or(u32::MAX);

        log_payload_set(
            "OperationQueue ordered operations",
            order.iter().map(|&index| &payloads[index]),
            Some(&|p: &Payload| format!("with operation {}", p.action)),
        );

        let ordered_ids: Vec<PayloadId> = order
            .iter()
            .map(|&index| payloads[index].id.clone())
            .collect();

        self.status = OperationStatus::new(order.len(), media_count);
        self.payloads = payloads;
        self.order = order;
        self.dependencies = dependencies;
        self.reverse = reverse;
        self.estimated_size_kb = estimated_size_kb;
        self.opened = true;

        tracing::info!(
            operations = self.order.len(),
            reverse,
            estimated_size_kb,
            "opened operation queue"
        );
        self.emit(AppEvent::Queue(QueueEvent::Opened {
            order: ordered_ids,
            reverse,
            estimated_size_kb,
        }));
        Ok(())
    }

    /// Next runnable payload, or `None` when nothing more can start.
    ///
    /// Walks forward from the cursor. A candidate whose dependency has no
    /// result yet is passed over. A candidate whose dependency failed
    /// inherits that failure and is passed over. On cancellation the
    /// candidate is marked canceled and `None` is returned; call
    /// [`cancel_remaining`](Self::cancel_remaining) to mark the rest.
    pub fn pop_instruction(&mut self) -> Option<&Payload> {
        let position = self.pop_position()?;
        self.payloads.get(self.order[position])
    }

    fn pop_position(&mut self) -> Option<usize> {
        if !self.opened {
            return None;
        }

        while self.status.has_remaining() {
            let position = self.status.advance();
            let index = self.order[position];
            tracing::debug!(
                "testing operation {position}: {}",
                self.payloads[index].log_id()
            );

            let cancelled = self
                .cancel
                .as_ref()
                .is_some_and(|signal| signal.is_cancelled());
            if cancelled || self.status.exit_requested() {
                self.status.request_exit();
                self.mark_canceled(index);
                self.set_current(None);
                return None;
            }

            match self.check_dependencies(position) {
                DependencyCheck::Ready => {
                    self.set_current(Some(position));
                    return Some(position);
                }
                DependencyCheck::Pending(dep) => {
                    tracing::debug!(
                        "required operation {} has no result, skipping {}",
                        self.payloads[self.order[dep]].log_id(),
                        self.payloads[index].log_id()
                    );
                    self.set_current(None);
                }
                DependencyCheck::Failed(dep) => {
                    self.propagate_failure(position, dep);
                    self.set_current(None);
                }
            }
        }

        self.set_current(None);
        None
    }

    fn check_dependencies(&self, position: usize) -> DependencyCheck {
        for &dep in &self.dependencies[position] {
            match self.payloads[self.order[dep]].operation_result() {
                None => return DependencyCheck::Pending(dep),
                Some(result) if result.is_terminal_failure() => {
                    return DependencyCheck::Failed(dep);
                }
                Some(_) => {}
            }
        }
        DependencyCheck::Ready
    }

    fn propagate_failure(&mut self, position: usize, dep: usize) {
        let dep_payload = &self.payloads[self.order[dep]];
        let Some(result) = dep_payload.operation_result().cloned() else {
            return;
        };
        let dependency = dep_payload.id.clone();
        let code = result.code();

        let payload = &mut self.payloads[self.order[position]];
        tracing::warn!(
            "skipping {} because required operation {dependency} failed with code {code}",
            payload.log_id()
        );
        payload.set_operation_result(result);
        let id = payload.id.clone();

        if position + 1 == self.order.len() {
            self.status.mark_operations_complete();
        }
        self.emit(AppEvent::Queue(QueueEvent::DependentSkipped {
            payload: id,
            dependency,
            code,
        }));
    }

    fn mark_canceled(&mut self, index: usize) {
        let canceled = OperationResult::canceled();
        self.status.set_live(canceled.clone());
        let payload = &mut self.payloads[index];
        tracing::debug!("marking payload {} as canceled", payload.log_id());
        payload.set_operation_result(canceled);
        let id = payload.id.clone();
        self.emit(AppEvent::Queue(QueueEvent::PayloadCanceled { payload: id }));
    }

    fn set_current(&mut self, position: Option<usize>) {
        self.current = position;
        let id = position.map(|position| self.payloads[self.order[position]].id.clone());
        self.status.set_current_payload(id);
    }

    /// Mark every payload not yet popped as canceled.
    ///
    /// Returns how many payloads were marked.
    pub fn cancel_remaining(&mut self) -> usize {
        if !self.opened {
            return 0;
        }
        self.status.request_exit();
        let mut marked = 0;
        while self.status.has_remaining() {
            self.pop_position();
            marked += 1;
        }
        marked
    }

    /// Record the result of the payload last returned by `pop_instruction`.
    ///
    /// Returns `false` if there is no current payload or it already has a
    /// result.
    pub fn record_result(&mut self, result: OperationResult) -> bool {
        match self.current {
            Some(position) => self.payloads[self.order[position]].set_operation_result(result),
            None => false,
        }
    }

    /// Payload last returned by `pop_instruction`
    #[must_use]
    pub fn current_payload(&self) -> Option<&Payload> {
        self.current
            .and_then(|position| self.payloads.get(self.order[position]))
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// True for removal runs
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Sum of the install/repair size estimates, in KB
    #[must_use]
    pub fn estimated_size_kb(&self) -> u64 {
        self.estimated_size_kb
    }

    /// Number of queued operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    pub(crate) fn status_mut(&mut self) -> &mut OperationStatus {
        &mut self.status
    }

    /// Queued payloads in operation order
    pub fn queued_payloads(&self) -> impl Iterator<Item = &Payload> + '_ {
        self.order.iter().map(move |&index| &self.payloads[index])
    }

    /// Every payload passed to `open`, in input order
    #[must_use]
    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    #[must_use]
    pub fn into_payloads(self) -> Vec<Payload> {
        self.payloads
    }
}

impl EventEmitter for OperationQueue {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}
