//! Plan files: the payload set of a run plus the scripted engine outcomes

use std::collections::BTreeMap;
use std::path::Path;

use payseq_errors::{ConfigError, Error};
use payseq_types::{OperationResult, Payload, PayloadId, ResultCode};
use serde::Deserialize;

/// A run described on disk.
///
/// ```json
/// {
///   "payloads": [
///     { "id": "core", "productName": "Core", "action": "install",
///       "satisfied": ["tools"] },
///     { "id": "tools", "productName": "Tools", "action": "install",
///       "required": ["core"],
///       "media": { "type": "removable", "volumeIndex": 2,
///                  "path": "/Volumes/Disk2/payloads", "mediaName": "Disk 2" } }
///   ],
///   "outcomes": { "tools": { "code": 1603, "args": ["disk full"] } }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub payloads: Vec<Payload>,
    /// Scripted engine behavior per payload; missing entries succeed
    #[serde(default)]
    pub outcomes: BTreeMap<PayloadId, PlannedOutcome>,
}

/// How the scripted engine answers for one payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedOutcome {
    /// Final result code, 0 for success
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub args: Vec<String>,
    /// Status polls reported as running before the final result
    #[serde(default = "default_steps")]
    pub steps: u8,
    /// Refuse to start the operation at all
    #[serde(default)]
    pub fail_start: bool,
}

fn default_steps() -> u8 {
    4
}

impl Default for PlannedOutcome {
    fn default() -> Self {
        Self {
            code: 0,
            args: Vec::new(),
            steps: default_steps(),
            fail_start: false,
        }
    }
}

impl PlannedOutcome {
    /// Result reported once the operation stops running
    #[must_use]
    pub fn final_result(&self) -> OperationResult {
        if self.code == 0 {
            OperationResult::succeeded()
        } else {
            OperationResult::failed(ResultCode(self.code), self.args.clone())
        }
    }

    /// Running snapshot for poll `step` (1-based)
    #[must_use]
    pub fn running_result(&self, step: u8) -> OperationResult {
        let steps = u32::from(self.steps.max(1)) + 1;
        let percent = u32::from(step) * 100 / steps;
        OperationResult::running(u8::try_from(percent).unwrap_or(99))
    }
}

impl Plan {
    /// Parse a plan from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid plan.
    pub fn from_json(contents: &str, origin: &Path) -> Result<Self, Error> {
        serde_json::from_str(contents).map_err(|e| {
            ConfigError::PlanUnreadable {
                path: origin.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Load a plan file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ConfigError::PlanUnreadable {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
        tracing::debug!(path = %path.display(), "loaded plan");
        Self::from_json(&contents, path)
    }
}
