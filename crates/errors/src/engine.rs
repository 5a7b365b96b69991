//! Install engine error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EngineError {
    #[error("failed to start operation for {payload}: {message}")]
    StartFailed { payload: String, message: String },

    #[error("install status unavailable: {message}")]
    StatusUnavailable { message: String },

    #[error("simulation failed for {payload}: {message}")]
    SimulationFailed { payload: String, message: String },

    #[error("install engine is busy with {payload}")]
    Busy { payload: String },
}

impl UserFacingError for EngineError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::StartFailed { .. } | Self::StatusUnavailable { .. } => {
                Some("Check the install engine log for the failing payload.")
            }
            Self::Busy { .. } => Some("Wait for the running operation to finish."),
            Self::SimulationFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::StartFailed { .. } => "engine.start_failed",
            Self::StatusUnavailable { .. } => "engine.status_unavailable",
            Self::SimulationFailed { .. } => "engine.simulation_failed",
            Self::Busy { .. } => "engine.busy",
        };
        Some(code)
    }
}
