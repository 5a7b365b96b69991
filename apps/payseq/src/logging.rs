//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so
//! `--debug` log files carry the whole run.

use payseq_events::{
    AppEvent, EventMessage, MediaEvent, OperationEvent, ProgressEvent, QueueEvent, RunEvent,
};
use tracing::{debug, error, info, trace, warn};

/// Log an event at its own level with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;

    match event {
        AppEvent::Queue(QueueEvent::Opened {
            order,
            reverse,
            estimated_size_kb,
        }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                operations = order.len(),
                reverse = reverse,
                estimated_size_kb = estimated_size_kb,
                "Queue opened"
            );
        }
        AppEvent::Queue(QueueEvent::DependentSkipped {
            payload,
            dependency,
            code,
        }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                payload = %payload,
                dependency = %dependency,
                code = %code,
                "Dependent payload skipped"
            );
        }
        AppEvent::Operation(OperationEvent::Started {
            payload,
            action,
            index,
            total,
        }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                payload = %payload,
                action = %action,
                position = index + 1,
                total = total,
                "Operation started"
            );
        }
        AppEvent::Operation(OperationEvent::Completed { payload, code }) => {
            if code.is_success() {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    payload = %payload,
                    code = %code,
                    "Operation completed"
                );
            } else {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    payload = %payload,
                    code = %code,
                    "Operation completed with errors"
                );
            }
        }
        AppEvent::Operation(OperationEvent::EngineFailed { payload, failure }) => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                payload = ?payload,
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Install engine failed"
            );
        }
        AppEvent::Progress(ProgressEvent::Updated {
            current_operation,
            total_operations,
            percent_payload,
            total_progress,
        }) => {
            trace!(
                source = meta.source.as_str(),
                current_operation = current_operation,
                total_operations = total_operations,
                percent_payload = percent_payload,
                total_progress = total_progress,
                "Progress"
            );
        }
        AppEvent::Media(MediaEvent::EjectFailed { path, error }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                path = %path,
                error = %error,
                "Media eject failed"
            );
        }
        AppEvent::Run(RunEvent::Completed {
            succeeded,
            failed,
            duration,
        }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                succeeded = succeeded,
                failed = failed,
                duration_ms = duration.as_millis(),
                "Run completed"
            );
        }
        _ => match meta.tracing_level() {
            tracing::Level::ERROR => {
                error!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::WARN => {
                warn!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::INFO => {
                info!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::DEBUG => {
                debug!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::TRACE => {
                trace!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
        },
    }
}
