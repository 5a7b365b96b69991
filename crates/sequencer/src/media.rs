//! Removable media swap detection

use payseq_errors::MediaError;
use payseq_events::{EventEmitter, EventSender};
use payseq_types::{InstallerAction, MediaInfo};

/// Result of probing a path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathInformation {
    pub is_valid_path: bool,
    pub path_exists: bool,
}

impl PathInformation {
    #[must_use]
    pub fn present() -> Self {
        Self {
            is_valid_path: true,
            path_exists: true,
        }
    }

    #[must_use]
    pub fn is_present(self) -> bool {
        self.is_valid_path && self.path_exists
    }
}

/// A mounted removable drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovableDrive {
    pub root: String,
}

impl RemovableDrive {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

/// Filesystem and drive queries used between operations.
pub trait MediaManager {
    fn path_information(&self, path: &str) -> PathInformation;

    /// # Errors
    ///
    /// Returns an error if the media cannot be ejected.
    fn eject_removable_media(&mut self, path: &str) -> Result<(), MediaError>;

    /// # Errors
    ///
    /// Returns an error if the drive list cannot be read.
    fn list_removable_drives(&self) -> Result<Vec<RemovableDrive>, MediaError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapChoice {
    Cancel,
    Ok,
}

/// Asks the user to insert media.
pub trait AlertPresenter {
    /// False once the hosting UI is gone; swap detection stops prompting.
    fn is_available(&self) -> bool {
        true
    }

    /// # Errors
    ///
    /// Returns an error if the prompt cannot be shown or answered.
    fn prompt_disk_swap(&mut self, media_name: &str) -> Result<SwapChoice, MediaError>;
}

/// How a swap check ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Media found at its expected path
    Present,
    /// Media found under another removable root
    FoundAt(String),
    /// User declined to insert the media
    Cancelled,
    /// The prompt host went away before the media showed up
    Abandoned,
}

/// Swap checks only apply to removable media on interactive runs and never
/// to removals.
#[must_use]
pub fn needs_swap_check(media: &MediaInfo, action: InstallerAction, interactive: bool) -> bool {
    media.is_removable() && interactive && !action.is_remove()
}

/// Re-root `media_path` under another drive.
///
/// A drive-letter prefix (`D:\`) is replaced, otherwise the mount point
/// (`/Volumes/Disk1`, `/media/cdrom`) is.
#[must_use]
pub fn alternate_media_path(root: &str, media_path: &str) -> String {
    let relative = strip_media_root(media_path);
    if root.ends_with(['/', '\\']) || relative.is_empty() {
        format!("{root}{relative}")
    } else {
        let separator = if root.contains('\\') { '\\' } else { '/' };
        format!("{root}{separator}{relative}")
    }
}

fn strip_media_root(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
    {
        return &path[3..];
    }
    match path.strip_prefix('/') {
        Some(rest) => rest.splitn(3, '/').nth(2).unwrap_or(""),
        None => path,
    }
}

/// Blocks between operations until the expected media is reachable.
pub struct MediaSwapDetector<'a> {
    media: &'a mut dyn MediaManager,
    alerts: &'a mut dyn AlertPresenter,
    extra_roots: &'a [String],
    events: Option<EventSender>,
}

impl<'a> MediaSwapDetector<'a> {
    pub fn new(media: &'a mut dyn MediaManager, alerts: &'a mut dyn AlertPresenter) -> Self {
        Self {
            media,
            alerts,
            extra_roots: &[],
            events: None,
        }
    }

    /// Report eject and drive listing failures as warnings
    #[must_use]
    pub fn with_events(mut self, events: Option<EventSender>) -> Self {
        self.events = events;
        self
    }

    /// Roots searched after the drives reported by the media manager
    #[must_use]
    pub fn with_extra_roots(mut self, roots: &'a [String]) -> Self {
        self.extra_roots = roots;
        self
    }

    /// Ensure `media` is reachable, prompting until it is or the user gives up.
    ///
    /// `previous_path` is ejected before each prompt so the drive is free.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt itself fails.
    pub fn detect(
        &mut self,
        media: &MediaInfo,
        previous_path: Option<&str>,
    ) -> Result<SwapOutcome, MediaError> {
        if self.media.path_information(&media.path).is_present() {
            return Ok(SwapOutcome::Present);
        }

        loop {
            if !self.alerts.is_available() {
                tracing::warn!(media = %media.media_name, "swap prompt host unavailable");
                return Ok(SwapOutcome::Abandoned);
            }

            if let Some(previous) = previous_path {
                if let Err(e) = self.media.eject_removable_media(previous) {
                    tracing::warn!(path = previous, "eject before swap failed: {e}");
                    self.events
                        .emit_warning_with_context(format!("eject before swap failed: {e}"), previous);
                }
            }

            tracing::info!(media = %media.media_name, "prompting for disk swap");
            match self.alerts.prompt_disk_swap(&media.media_name)? {
                SwapChoice::Cancel => return Ok(SwapOutcome::Cancelled),
                SwapChoice::Ok => {
                    if self.media.path_information(&media.path).is_present() {
                        return Ok(SwapOutcome::Present);
                    }
                    if let Some(found) = self.search_alternate_roots(&media.path) {
                        return Ok(SwapOutcome::FoundAt(found));
                    }
                }
            }
        }
    }

    fn search_alternate_roots(&self, media_path: &str) -> Option<String> {
        let drives = match self.media.list_removable_drives() {
            Ok(drives) => drives,
            Err(e) => {
                tracing::warn!("listing removable drives failed: {e}");
                self.events
                    .emit_warning(format!("listing removable drives failed: {e}"));
                Vec::new()
            }
        };

        drives
            .iter()
            .map(|drive| drive.root.as_str())
            .chain(self.extra_roots.iter().map(String::as_str))
            .map(|root| alternate_media_path(root, media_path))
            .find(|candidate| self.media.path_information(candidate).is_present())
    }
}
