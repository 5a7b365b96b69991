//! Operation queue construction error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueueError {
    #[error(
        "installing and removing payloads in the same run is not supported \
         ({install_count} install/repair, {remove_count} remove)"
    )]
    MixedOperations {
        install_count: usize,
        remove_count: usize,
    },

    #[error("instruction set is empty")]
    Empty,

    #[error("operation queue has already been opened")]
    AlreadyOpened,

    #[error("payload {id} appears more than once in the run")]
    DuplicatePayload { id: String },
}

impl UserFacingError for QueueError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MixedOperations { .. } => {
                Some("Split the selection into an install run and a separate removal run.")
            }
            Self::Empty => Some("Select at least one payload to install, repair or remove."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MixedOperations { .. } => "queue.mixed_operations",
            Self::Empty => "queue.empty",
            Self::AlreadyOpened => "queue.already_opened",
            Self::DuplicatePayload { .. } => "queue.duplicate_payload",
        };
        Some(code)
    }
}
