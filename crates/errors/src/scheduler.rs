//! Scheduler state machine error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchedulerError {
    #[error("scheduler has already been started")]
    AlreadyStarted,

    #[error("scheduler has not been started")]
    NotStarted,

    #[error("run aborted: {message}")]
    Aborted { message: String },
}

impl UserFacingError for SchedulerError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyStarted => Some("Create a new scheduler for each run."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::AlreadyStarted => "scheduler.already_started",
            Self::NotStarted => "scheduler.not_started",
            Self::Aborted { .. } => "scheduler.aborted",
        };
        Some(code)
    }
}
