//! Operation result records reported by the install engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result code attached to an operation message.
///
/// `0` is success; every other value is a failure or cancel code whose
/// meaning belongs to the install engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const SUCCESS: Self = Self(0);
    pub const USER_CANCEL: Self = Self(1);

    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    #[must_use]
    pub fn is_user_cancel(self) -> bool {
        self == Self::USER_CANCEL
    }
}

impl Default for ResultCode {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Code plus the arguments the engine associates with it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub code: ResultCode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ResultMessage {
    #[must_use]
    pub fn new(code: ResultCode) -> Self {
        Self {
            code,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_args(code: ResultCode, args: Vec<String>) -> Self {
        Self { code, args }
    }
}

/// Snapshot of an operation, either in flight or terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub is_running: bool,
    /// Clamped to `0..=100`
    pub percent_complete: u8,
    pub message: ResultMessage,
}

impl OperationResult {
    /// Create a snapshot, clamping `percent_complete` to 100
    #[must_use]
    pub fn new(is_running: bool, percent_complete: u8, message: ResultMessage) -> Self {
        Self {
            is_running,
            percent_complete: percent_complete.min(100),
            message,
        }
    }

    /// In-flight snapshot with a success code
    #[must_use]
    pub fn running(percent_complete: u8) -> Self {
        Self::new(true, percent_complete, ResultMessage::default())
    }

    /// Finished successfully
    #[must_use]
    pub fn succeeded() -> Self {
        Self::new(false, 100, ResultMessage::default())
    }

    /// Finished with a non-success code
    #[must_use]
    pub fn failed(code: ResultCode, args: Vec<String>) -> Self {
        Self::new(false, 100, ResultMessage::with_args(code, args))
    }

    /// Result recorded for a payload the user canceled before it started
    #[must_use]
    pub fn canceled() -> Self {
        Self::new(false, 100, ResultMessage::new(ResultCode::USER_CANCEL))
    }

    #[must_use]
    pub fn code(&self) -> ResultCode {
        self.message.code
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.message.code.is_success()
    }

    /// A finished operation that did not succeed. Dependents inherit this
    /// result instead of running.
    #[must_use]
    pub fn is_terminal_failure(&self) -> bool {
        !self.message.code.is_success() && self.percent_complete >= 100
    }
}
