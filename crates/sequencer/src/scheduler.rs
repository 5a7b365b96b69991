//! Poll-driven run scheduler
//!
//! The scheduler owns the queue and status of one run. The host drives it by
//! calling [`Scheduler::tick`], either from a timer (interactive runs) or in
//! a tight loop (unattended runs); both share the same state machine.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use payseq_config::Config;
use payseq_errors::{Error, SchedulerError};
use payseq_events::{
    AppEvent, EventEmitter, EventMessage, EventSender, FailureContext, GeneralEvent, MediaEvent,
    OperationEvent, ProgressEvent, QueueEvent, RunEvent,
};
use payseq_types::{MediaInfo, MediaType, OperationResult, Payload, PayloadId, RunReport};

use crate::cancel::CancelSignal;
use crate::engine::{InstallEngine, InstallParams};
use crate::media::{needs_swap_check, AlertPresenter, MediaManager, MediaSwapDetector, SwapOutcome};
use crate::queue::OperationQueue;
use crate::status::OperationStatus;

/// Where the run is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// An operation is in flight and being polled
    Running,
    Complete,
    Canceled,
    Error,
}

impl RunState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Canceled | Self::Error)
    }
}

/// Who drives the ticks in [`Scheduler::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// Sleep this long between polls
    Interactive(Duration),
    /// Poll again immediately, yielding to the runtime in between
    Unattended,
}

/// Knobs for one run
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub poll_interval: Duration,
    /// Unattended runs never prompt for media
    pub interactive: bool,
    pub prompt_for_swap: bool,
    pub eject_on_complete: bool,
    /// Searched for swapped media after the OS-reported drives
    pub removable_roots: Vec<String>,
    /// Copied into every operation's parameters
    pub properties: BTreeMap<String, String>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            interactive: true,
            prompt_for_swap: true,
            eject_on_complete: true,
            removable_roots: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl SchedulerOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.scheduler.poll_interval(),
            interactive: !config.scheduler.unattended,
            prompt_for_swap: config.media.prompt_for_swap,
            eject_on_complete: config.media.eject_on_complete,
            removable_roots: config
                .media
                .removable_roots
                .iter()
                .map(|root| root.display().to_string())
                .collect(),
            properties: config.properties.clone(),
        }
    }

    /// Drive mode matching `interactive`
    #[must_use]
    pub fn drive_mode(&self) -> DriveMode {
        if self.interactive {
            DriveMode::Interactive(self.poll_interval)
        } else {
            DriveMode::Unattended
        }
    }
}

/// Receives the run status after every tick and once when the run ends.
pub trait StatusObserver {
    fn on_status(&mut self, status: &OperationStatus);
}

impl<F> StatusObserver for F
where
    F: FnMut(&OperationStatus),
{
    fn on_status(&mut self, status: &OperationStatus) {
        self(status);
    }
}

/// Drives one run of payload operations through an [`InstallEngine`].
pub struct Scheduler<E: InstallEngine> {
    queue: OperationQueue,
    pending: Option<Vec<Payload>>,
    engine: E,
    media: Option<Box<dyn MediaManager>>,
    alerts: Option<Box<dyn AlertPresenter>>,
    observer: Option<Box<dyn StatusObserver>>,
    events: Option<EventSender>,
    options: SchedulerOptions,
    state: RunState,
    /// Parameters of the operation in flight
    params: Option<InstallParams>,
    /// Removable media path most recently handed to the engine
    outstanding_media: Option<String>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl<E: InstallEngine> Scheduler<E> {
    pub fn new(payloads: Vec<Payload>, engine: E, options: SchedulerOptions) -> Self {
        Self {
            queue: OperationQueue::new(),
            pending: Some(payloads),
            engine,
            media: None,
            alerts: None,
            observer: None,
            events: None,
            options,
            state: RunState::Idle,
            params: None,
            outstanding_media: None,
            started_at: None,
            finished_at: None,
        }
    }

    #[must_use]
    pub fn with_media_manager(mut self, media: Box<dyn MediaManager>) -> Self {
        self.media = Some(media);
        self
    }

    #[must_use]
    pub fn with_alert_presenter(mut self, alerts: Box<dyn AlertPresenter>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl StatusObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    #[must_use]
    pub fn with_cancel_signal(mut self, signal: Arc<dyn CancelSignal>) -> Self {
        self.queue = self.queue.with_cancel_signal(signal);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.queue = self.queue.with_events(events.clone());
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn status(&self) -> &OperationStatus {
        self.queue.status()
    }

    #[must_use]
    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Payloads of the run: queued ones in operation order once the queue
    /// is open, otherwise everything that was handed in.
    #[must_use]
    pub fn payloads(&self) -> Vec<&Payload> {
        if self.queue.is_open() {
            self.queue.queued_payloads().collect()
        } else if let Some(pending) = &self.pending {
            pending.iter().collect()
        } else {
            self.queue.payloads().iter().collect()
        }
    }

    /// Open the queue and start the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler was already started, the queue
    /// cannot be built, or the first operation fails to start. Apart from a
    /// repeated start, the run is left in [`RunState::Error`].
    pub fn start(&mut self) -> Result<RunState, Error> {
        let Some(payloads) = self.pending.take() else {
            return Err(SchedulerError::AlreadyStarted.into());
        };
        self.started_at = Some(Instant::now());

        if let Err(error) = self.queue.open(payloads) {
            self.emit(AppEvent::Queue(QueueEvent::OpenFailed {
                failure: FailureContext::from_error(&error),
            }));
            self.fail(error.clone(), None);
            return Err(error);
        }

        tracing::debug!("opened installation queue");
        self.emit(AppEvent::Run(RunEvent::Started {
            total_operations: self.queue.len(),
        }));
        self.state = RunState::Running;
        self.advance()?;
        Ok(self.state)
    }

    /// One bounded step of the run: poll the engine, fold the snapshot into
    /// the status, notify the observer and, when the operation has finished,
    /// record its result and start the next one.
    ///
    /// Terminal states are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler has not been started.
    pub fn tick(&mut self) -> Result<RunState, Error> {
        match self.state {
            RunState::Idle => return Err(SchedulerError::NotStarted.into()),
            state if state.is_terminal() => return Ok(state),
            _ => {}
        }

        let snapshot = match self.engine.install_status() {
            Ok(snapshot) => snapshot,
            Err(error) => {
                let payload = self.queue.status().current_payload().cloned();
                self.fail(error.into(), payload);
                return Ok(self.state);
            }
        };

        self.queue.status_mut().update_progress(snapshot);
        self.emit_progress();
        self.notify();

        if !self.queue.status().is_current_operation_complete() {
            return Ok(self.state);
        }

        self.finish_current_operation();
        if let Err(e) = self.advance() {
            // Already recorded as the run error
            tracing::debug!("next operation did not start: {e}");
        }
        Ok(self.state)
    }

    /// Drive the run to a terminal state on the tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the run, if any.
    pub async fn run(&mut self, mode: DriveMode) -> Result<RunReport, Error> {
        if self.state == RunState::Idle {
            self.start()?;
        }

        match mode {
            DriveMode::Interactive(period) => {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // The first tick completes immediately
                interval.tick().await;
                while !self.state.is_terminal() {
                    interval.tick().await;
                    self.tick()?;
                }
            }
            DriveMode::Unattended => {
                while !self.state.is_terminal() {
                    self.tick()?;
                    tokio::task::yield_now().await;
                }
            }
        }

        self.outcome()
    }

    /// Drive the run to a terminal state on the current thread without
    /// sleeping between polls.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the run, if any.
    pub fn run_blocking(&mut self) -> Result<RunReport, Error> {
        if self.state == RunState::Idle {
            self.start()?;
        }
        while !self.state.is_terminal() {
            self.tick()?;
        }
        self.outcome()
    }

    /// Summary of the run so far
    #[must_use]
    pub fn report(&self) -> RunReport {
        let mut report = RunReport::from_payloads(self.payloads());
        report.total_progress = self.queue.status().total_progress();
        report.was_canceled = self.state == RunState::Canceled;
        report.duration_ms = match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => duration_ms(end.duration_since(start)),
            (Some(start), None) => duration_ms(start.elapsed()),
            _ => 0,
        };
        report
    }

    fn outcome(&self) -> Result<RunReport, Error> {
        if self.state == RunState::Error {
            return Err(self.queue.status().error().cloned().unwrap_or_else(|| {
                SchedulerError::Aborted {
                    message: "run ended in error".to_string(),
                }
                .into()
            }));
        }
        Ok(self.report())
    }

    fn finish_current_operation(&mut self) {
        let Some(result) = self.queue.status().live_status().cloned() else {
            return;
        };
        let Some(payload) = self.queue.current_payload().map(|p| p.id.clone()) else {
            tracing::debug!("no status available for payload");
            return;
        };

        tracing::debug!(payload = %payload, code = %result.code(), "operation complete");
        let code = result.code();
        self.queue.record_result(result);
        self.emit_message_for(
            &payload,
            AppEvent::Operation(OperationEvent::Completed { payload: payload.clone(), code }),
        );
    }

    /// Pop until an operation starts or the run ends.
    fn advance(&mut self) -> Result<(), Error> {
        let Some(payload) = self.queue.pop_instruction().cloned() else {
            self.finish_run();
            return Ok(());
        };

        match self.begin_operation(&payload) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.fail(error.clone(), Some(payload.id.clone()));
                Err(error)
            }
        }
    }

    fn begin_operation(&mut self, payload: &Payload) -> Result<(), Error> {
        let mut params = InstallParams::for_payload(
            payload,
            self.queue.estimated_size_kb(),
            &self.options.properties,
        );
        let previous_path = self.params.as_ref().map(|p| p.media_path.clone());

        if let Some(media) = &payload.media {
            self.queue
                .status_mut()
                .record_media(media, previous_path.clone());

            if self.options.prompt_for_swap
                && needs_swap_check(media, payload.action, self.options.interactive)
            {
                let last = self.queue.status().media().last_media_path.clone();
                match self.detect_swap(media, last.as_deref())? {
                    Some(SwapOutcome::Present | SwapOutcome::Abandoned) | None => {}
                    Some(SwapOutcome::FoundAt(path)) => {
                        self.emit(AppEvent::Media(MediaEvent::SwapResolved {
                            media_name: media.media_name.clone(),
                            path: path.clone(),
                        }));
                        params.media_path = path;
                    }
                    Some(SwapOutcome::Cancelled) => {
                        self.emit(AppEvent::Media(MediaEvent::SwapCanceled {
                            media_name: media.media_name.clone(),
                        }));
                        self.queue.status_mut().request_exit();
                        self.queue.record_result(OperationResult::canceled());
                        self.finish_run();
                        return Ok(());
                    }
                }
            }
        } else {
            self.queue.status_mut().record_no_media();
        }

        if params.media_type == MediaType::Removable && !params.media_path.is_empty() {
            self.outstanding_media = Some(params.media_path.clone());
        }

        self.queue.status_mut().begin_operation();
        let position = self.queue.status().current_operation().unwrap_or(0);
        tracing::info!(
            payload = %payload.id,
            action = %payload.action,
            "starting operation {} of {}",
            position + 1,
            self.queue.len()
        );

        self.engine
            .install_payload(&payload.id, payload.action, &params)?;
        self.emit_message_for(
            &payload.id,
            AppEvent::Operation(OperationEvent::Started {
                payload: payload.id.clone(),
                action: payload.action,
                index: position,
                total: self.queue.len(),
            }),
        );
        self.params = Some(params);
        self.state = RunState::Running;
        Ok(())
    }

    fn detect_swap(
        &mut self,
        media: &MediaInfo,
        last_media_path: Option<&str>,
    ) -> Result<Option<SwapOutcome>, Error> {
        let (Some(manager), Some(alerts)) = (self.media.as_deref_mut(), self.alerts.as_deref_mut())
        else {
            return Ok(None);
        };

        if !manager.path_information(&media.path).is_present() {
            if let Some(events) = &self.events {
                events.emit(AppEvent::Media(MediaEvent::SwapRequired {
                    media_name: media.media_name.clone(),
                    path: media.path.clone(),
                }));
            }
        }

        let outcome = MediaSwapDetector::new(manager, alerts)
            .with_extra_roots(&self.options.removable_roots)
            .with_events(self.events.clone())
            .detect(media, last_media_path)?;
        Ok(Some(outcome))
    }

    /// Queue exhausted or exit requested
    fn finish_run(&mut self) {
        self.finished_at = Some(Instant::now());

        if self.queue.status().exit_requested() {
            let canceled = self.queue.cancel_remaining();
            tracing::warn!(canceled, "run canceled");
            self.state = RunState::Canceled;
            let total_canceled = self
                .queue
                .queued_payloads()
                .filter(|p| {
                    p.operation_result()
                        .is_some_and(|r| r.code().is_user_cancel())
                })
                .count();
            self.eject_outstanding_media();
            self.emit(AppEvent::Run(RunEvent::Canceled {
                canceled: total_canceled,
            }));
            self.notify();
            return;
        }

        tracing::info!("no operation left, run complete");
        self.queue.status_mut().mark_operations_complete();
        self.state = RunState::Complete;
        self.eject_outstanding_media();

        let report = RunReport::from_payloads(self.queue.queued_payloads());
        for id in &report.not_run {
            tracing::warn!(payload = %id, "payload never ran: a requirement was queued after it");
            self.emit_message_for(
                id,
                AppEvent::General(GeneralEvent::warning_with_context(
                    format!("{id} never ran"),
                    "a requirement was queued after it",
                )),
            );
        }
        self.emit(AppEvent::Run(RunEvent::Completed {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
            duration: self
                .started_at
                .map(|start| start.elapsed())
                .unwrap_or_default(),
        }));
        self.notify();
    }

    fn eject_outstanding_media(&mut self) {
        if !self.options.eject_on_complete {
            return;
        }
        let (Some(path), Some(manager)) =
            (self.outstanding_media.take(), self.media.as_deref_mut())
        else {
            return;
        };

        match manager.eject_removable_media(&path) {
            Ok(()) => {
                tracing::info!(path = %path, "ejected media");
                self.emit(AppEvent::Media(MediaEvent::Ejected { path }));
            }
            Err(e) => {
                tracing::warn!(path = %path, "eject failed: {e}");
                self.emit(AppEvent::Media(MediaEvent::EjectFailed {
                    path,
                    error: e.to_string(),
                }));
            }
        }
    }

    fn fail(&mut self, error: Error, payload: Option<PayloadId>) {
        tracing::error!("run aborted: {error}");
        self.finished_at = Some(Instant::now());
        let failure = FailureContext::from_error(&error);
        if payload.is_some() || matches!(error, Error::Engine(_)) {
            self.emit(AppEvent::Operation(OperationEvent::EngineFailed {
                payload,
                failure: failure.clone(),
            }));
        }
        self.emit(AppEvent::Run(RunEvent::Aborted { failure }));
        self.queue.status_mut().set_error(error);
        self.state = RunState::Error;
        self.notify();
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_status(self.queue.status());
        }
    }

    fn emit_progress(&self) {
        let status = self.queue.status();
        let Some(current) = status.current_operation() else {
            return;
        };
        self.emit(AppEvent::Progress(ProgressEvent::Updated {
            current_operation: current,
            total_operations: status.total_operations(),
            percent_payload: status.percent_payload().unwrap_or(0),
            total_progress: status.total_progress(),
        }));
    }

    fn emit_message_for(&self, payload: &PayloadId, event: AppEvent) {
        self.emit_message(EventMessage::correlated(
            event,
            payload.as_str(),
        ));
    }
}

impl<E: InstallEngine> EventEmitter for Scheduler<E> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
