//! Payload-related type definitions

use crate::OperationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable unique identifier for a payload within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadId(String);

impl PayloadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PayloadId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PayloadId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What the install engine is asked to do with a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallerAction {
    /// Not part of this run
    None,
    Install,
    Repair,
    Remove,
}

impl InstallerAction {
    /// Install and Repair share ordering and may be queued together
    #[must_use]
    pub fn is_install_like(self) -> bool {
        matches!(self, Self::Install | Self::Repair)
    }

    #[must_use]
    pub fn is_remove(self) -> bool {
        self == Self::Remove
    }
}

impl Default for InstallerAction {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for InstallerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Install => write!(f, "install"),
            Self::Repair => write!(f, "repair"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Kind of media a payload is installed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Fixed,
    Removable,
}

impl MediaType {
    /// Numeric form handed to the install engine
    #[must_use]
    pub fn as_property(self) -> &'static str {
        match self {
            Self::Fixed => "0",
            Self::Removable => "1",
        }
    }
}

impl Default for MediaType {
    fn default() -> Self {
        Self::Fixed
    }
}

/// Where a payload's bits live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    #[serde(rename = "type", default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub volume_index: u32,
    pub path: String,
    pub media_name: String,
}

impl MediaInfo {
    pub fn removable(volume_index: u32, path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            media_type: MediaType::Removable,
            volume_index,
            path: path.into(),
            media_name: name.into(),
        }
    }

    pub fn fixed(volume_index: u32, path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            media_type: MediaType::Fixed,
            volume_index,
            path: path.into(),
            media_name: name.into(),
        }
    }

    #[must_use]
    pub fn is_removable(&self) -> bool {
        self.media_type == MediaType::Removable
    }
}

/// One installable/removable unit of software.
///
/// `required` holds the ids this payload depends on and `satisfied` the ids
/// that depend on it. Both are expected to be restricted to the current run
/// by whoever resolved the graph; the queue ignores anything outside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub id: PayloadId,
    pub product_name: String,
    #[serde(default)]
    pub action: InstallerAction,
    #[serde(default)]
    pub required: BTreeSet<PayloadId>,
    #[serde(default)]
    pub satisfied: BTreeSet<PayloadId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInfo>,
    /// Operation size in bytes, used for the add/remove estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_size: Option<u64>,
    /// Entry point of the product session; only affects display order
    #[serde(default)]
    pub is_driver: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operation_result: Option<OperationResult>,
}

impl Payload {
    pub fn new(
        id: impl Into<PayloadId>,
        product_name: impl Into<String>,
        action: InstallerAction,
    ) -> Self {
        Self {
            id: id.into(),
            product_name: product_name.into(),
            action,
            required: BTreeSet::new(),
            satisfied: BTreeSet::new(),
            media: None,
            operation_size: None,
            is_driver: false,
            operation_result: None,
        }
    }

    #[must_use]
    pub fn with_required<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PayloadId>,
    {
        self.required.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_satisfied<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PayloadId>,
    {
        self.satisfied.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaInfo) -> Self {
        self.media = Some(media);
        self
    }

    #[must_use]
    pub fn with_operation_size(mut self, bytes: u64) -> Self {
        self.operation_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn as_driver(mut self) -> Self {
        self.is_driver = true;
        self
    }

    /// Volume index used to group payloads by media; missing media counts as 0
    #[must_use]
    pub fn volume_index(&self) -> u32 {
        self.media.as_ref().map_or(0, |media| media.volume_index)
    }

    /// Contribution to the add/remove size estimate, in KB.
    ///
    /// Only install-like actions with a known, non-zero size count. Each
    /// counted payload contributes at least 1 KB.
    #[must_use]
    pub fn estimated_size_kb(&self) -> u64 {
        if !self.action.is_install_like() {
            return 0;
        }
        match self.operation_size {
            Some(bytes) if bytes > 0 => bytes.div_ceil(1024).max(1),
            _ => 0,
        }
    }

    #[must_use]
    pub fn operation_result(&self) -> Option<&OperationResult> {
        self.operation_result.as_ref()
    }

    /// Record the result of this payload's operation.
    ///
    /// A result is written at most once per run; later writes are ignored and
    /// `false` is returned.
    pub fn set_operation_result(&mut self, result: OperationResult) -> bool {
        if self.operation_result.is_some() {
            return false;
        }
        self.operation_result = Some(result);
        true
    }

    /// Forget any previous result so a new run starts clean
    pub fn clear_operation_result(&mut self) {
        self.operation_result = None;
    }

    /// Short identifier used in log lines
    #[must_use]
    pub fn log_id(&self) -> String {
        format!("{} {}", self.id, self.product_name)
    }
}
