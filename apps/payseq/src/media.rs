//! Filesystem media manager and console swap prompts

use std::path::{Path, PathBuf};
use std::process::Command;

use console::{style, Term};
use payseq_errors::MediaError;
use payseq_sequencer::{AlertPresenter, MediaManager, PathInformation, RemovableDrive, SwapChoice};

/// Mount points scanned for removable drives
const MOUNT_ROOTS: &[&str] = &["/Volumes", "/media", "/run/media"];

/// Media manager backed by the local filesystem
#[derive(Debug, Default)]
pub struct FsMediaManager;

impl FsMediaManager {
    fn mounted_under(root: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(root) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect()
    }
}

impl MediaManager for FsMediaManager {
    fn path_information(&self, path: &str) -> PathInformation {
        if path.is_empty() {
            return PathInformation::default();
        }
        PathInformation {
            is_valid_path: true,
            path_exists: Path::new(path).exists(),
        }
    }

    fn eject_removable_media(&mut self, path: &str) -> Result<(), MediaError> {
        let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
            ("diskutil", &["eject"])
        } else {
            ("eject", &[])
        };

        let output = Command::new(program)
            .args(args)
            .arg(path)
            .output()
            .map_err(|e| MediaError::EjectFailed {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(MediaError::EjectFailed {
                path: path.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn list_removable_drives(&self) -> Result<Vec<RemovableDrive>, MediaError> {
        let mut drives = Vec::new();
        for root in MOUNT_ROOTS {
            let root = Path::new(root);
            for mount in Self::mounted_under(root) {
                // /media/<user>/<label> and /run/media/<user>/<label>
                let nested = Self::mounted_under(&mount);
                if root != Path::new("/Volumes") && !nested.is_empty() {
                    drives.extend(
                        nested
                            .into_iter()
                            .map(|p| RemovableDrive::new(p.display().to_string())),
                    );
                } else {
                    drives.push(RemovableDrive::new(mount.display().to_string()));
                }
            }
        }
        Ok(drives)
    }
}

/// Asks on the terminal for the next disk
#[derive(Debug)]
pub struct ConsoleAlerts {
    term: Term,
}

impl ConsoleAlerts {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl AlertPresenter for ConsoleAlerts {
    fn is_available(&self) -> bool {
        self.term.is_term()
    }

    fn prompt_disk_swap(&mut self, media_name: &str) -> Result<SwapChoice, MediaError> {
        let prompt_failed = |e: std::io::Error| MediaError::PromptFailed {
            message: e.to_string(),
        };

        self.term
            .write_line(&format!(
                "Insert {} and press Enter to continue, or type 'c' to cancel:",
                style(media_name).bold()
            ))
            .map_err(prompt_failed)?;
        let answer = self.term.read_line().map_err(prompt_failed)?;

        if answer.trim().eq_ignore_ascii_case("c") {
            Ok(SwapChoice::Cancel)
        } else {
            Ok(SwapChoice::Ok)
        }
    }
}
