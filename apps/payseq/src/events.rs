//! Event handling and progress display

use console::{Style, Term};
use payseq_events::{
    AppEvent, EventMessage, GeneralEvent, MediaEvent, OperationEvent, ProgressEvent, QueueEvent,
    RunEvent,
};

use crate::logging::log_event_with_tracing;

/// Turns run events into console lines
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Last whole percent printed, to keep progress output short
    last_percent: Option<u32>,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            last_percent: None,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        if self.debug_enabled {
            log_event_with_tracing(&message);
        }

        match message.event {
            AppEvent::Queue(QueueEvent::Opened {
                order, reverse, ..
            }) => {
                let verb = if reverse { "Removing" } else { "Processing" };
                self.show_status(&format!("{verb} {} payload(s)", order.len()));
            }
            AppEvent::Queue(QueueEvent::DependentSkipped {
                payload,
                dependency,
                code,
            }) => {
                self.show_warning(&format!(
                    "Skipping {payload}: dependency {dependency} failed (code {code})"
                ));
            }
            AppEvent::Queue(QueueEvent::PayloadCanceled { payload }) => {
                self.show_warning(&format!("Canceled {payload}"));
            }
            AppEvent::Queue(QueueEvent::OpenFailed { failure }) => {
                self.show_error(&failure.message);
            }
            AppEvent::Operation(OperationEvent::Started {
                payload,
                action,
                index,
                total,
            }) => {
                self.last_percent = None;
                self.show_status(&format!("[{}/{total}] {action} {payload}", index + 1));
            }
            AppEvent::Operation(OperationEvent::Completed { payload, code }) => {
                if code.is_success() {
                    self.show_success(&format!("{payload} done"));
                } else {
                    self.show_error(&format!("{payload} failed with code {code}"));
                }
            }
            AppEvent::Operation(OperationEvent::EngineFailed { failure, .. })
            | AppEvent::Run(RunEvent::Aborted { failure }) => {
                self.show_error(&failure.message);
            }
            AppEvent::Progress(ProgressEvent::Updated { total_progress, .. }) => {
                self.show_progress(total_progress);
            }
            AppEvent::Media(MediaEvent::SwapRequired { media_name, .. }) => {
                self.show_warning(&format!("{media_name} is not available"));
            }
            AppEvent::Media(MediaEvent::SwapResolved { media_name, path }) => {
                self.show_status(&format!("Using {media_name} from {path}"));
            }
            AppEvent::Media(MediaEvent::SwapCanceled { media_name }) => {
                self.show_warning(&format!("Swap to {media_name} canceled"));
            }
            AppEvent::Media(MediaEvent::Ejected { path }) => {
                self.show_status(&format!("Ejected {path}"));
            }
            AppEvent::Media(MediaEvent::EjectFailed { path, error }) => {
                self.show_warning(&format!("Could not eject {path}: {error}"));
            }
            AppEvent::Run(RunEvent::Started { .. } | RunEvent::Completed { .. }) => {}
            AppEvent::Run(RunEvent::Canceled { canceled }) => {
                self.show_warning(&format!("Run canceled, {canceled} payload(s) not processed"));
            }
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                match context {
                    Some(context) => self.show_warning(&format!("{message} ({context})")),
                    None => self.show_warning(&message),
                }
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn show_progress(&mut self, total_progress: f64) {
        let percent = total_progress.clamp(0.0, 100.0) as u32;
        if self.last_percent.is_some_and(|last| percent < last + 10) && percent < 100 {
            return;
        }
        self.last_percent = Some(percent);
        self.write(&format!("  {percent:>3}%"), &Style::new().dim());
    }

    fn show_status(&self, message: &str) {
        self.write(message, &Style::new());
    }

    fn show_success(&self, message: &str) {
        self.write(message, &Style::new().green());
    }

    fn show_warning(&self, message: &str) {
        self.write(message, &Style::new().yellow());
    }

    fn show_error(&self, message: &str) {
        self.write(message, &Style::new().red().bold());
    }

    fn write(&self, message: &str, style: &Style) {
        let line = if self.colors_enabled {
            style.apply_to(message).to_string()
        } else {
            message.to_string()
        };
        let _ = self.term.write_line(&line);
    }
}
