use serde::{Deserialize, Serialize};

use crate::EventSource;
use payseq_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Optional stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod general;
pub mod media;
pub mod operation;
pub mod progress;
pub mod queue;
pub mod run;

pub use general::*;
pub use media::*;
pub use operation::*;
pub use progress::*;
pub use queue::*;
pub use run::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Warnings that do not belong to a single domain
    General(GeneralEvent),

    /// Queue construction and instruction popping
    Queue(QueueEvent),

    /// Individual payload operations handed to the install engine
    Operation(OperationEvent),

    /// Aggregate progress updates
    Progress(ProgressEvent),

    /// Removable media swaps and ejects
    Media(MediaEvent),

    /// Run lifecycle (start, completion, cancellation, abort)
    Run(RunEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Queue(_) => EventSource::QUEUE,
            Self::Operation(_) => EventSource::OPERATION,
            Self::Progress(_) => EventSource::PROGRESS,
            Self::Media(_) => EventSource::MEDIA,
            Self::Run(_) => EventSource::RUN,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::Queue(QueueEvent::OpenFailed { .. })
            | Self::Operation(OperationEvent::EngineFailed { .. })
            | Self::Run(RunEvent::Aborted { .. }) => Level::ERROR,

            Self::Operation(OperationEvent::Completed { code, .. }) if !code.is_success() => {
                Level::WARN
            }

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Queue(QueueEvent::DependentSkipped { .. })
            | Self::Media(MediaEvent::SwapCanceled { .. } | MediaEvent::EjectFailed { .. })
            | Self::Run(RunEvent::Canceled { .. }) => Level::WARN,

            // Debug-level events (progress updates, internal state)
            Self::Queue(QueueEvent::PayloadCanceled { .. })
            | Self::Progress(ProgressEvent::Updated { .. }) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "payseq::events::general",
            Self::Queue(_) => "payseq::events::queue",
            Self::Operation(_) => "payseq::events::operation",
            Self::Progress(_) => "payseq::events::progress",
            Self::Media(_) => "payseq::events::media",
            Self::Run(_) => "payseq::events::run",
        }
    }
}
