use serde::{Deserialize, Serialize};

/// Removable media events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MediaEvent {
    /// Expected media is missing and the user is being asked for it
    SwapRequired { media_name: String, path: String },

    /// Media located, possibly on another removable drive
    SwapResolved { media_name: String, path: String },

    /// User declined to insert the media
    SwapCanceled { media_name: String },

    /// Media ejected
    Ejected { path: String },

    /// Eject attempt failed; the run continues
    EjectFailed { path: String, error: String },
}
