//! Removable media error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MediaError {
    #[error("failed to eject media at {path}: {message}")]
    EjectFailed { path: String, message: String },

    #[error("failed to list removable drives: {message}")]
    DriveListFailed { message: String },

    #[error("disk swap prompt failed: {message}")]
    PromptFailed { message: String },
}

impl UserFacingError for MediaError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::EjectFailed { .. } => Some("Eject the media manually."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        true
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::EjectFailed { .. } => "media.eject_failed",
            Self::DriveListFailed { .. } => "media.drive_list_failed",
            Self::PromptFailed { .. } => "media.prompt_failed",
        };
        Some(code)
    }
}
