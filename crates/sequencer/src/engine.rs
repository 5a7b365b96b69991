//! Install engine seam

use std::collections::BTreeMap;

use payseq_errors::EngineError;
use payseq_types::{InstallerAction, MediaType, OperationResult, Payload, PayloadId};

/// Everything the engine needs to run one operation.
///
/// Built fresh for each call; nothing is shared between operations except
/// the configured properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallParams {
    pub media_type: MediaType,
    pub media_volume_index: u32,
    pub media_path: String,
    pub media_name: String,
    /// Add/remove-programs estimate for the whole run, in KB
    pub estimated_size_kb: u64,
    pub properties: BTreeMap<String, String>,
}

impl InstallParams {
    /// Parameters for `payload`. Payloads without media are treated as fixed
    /// media on volume 1.
    #[must_use]
    pub fn for_payload(
        payload: &Payload,
        estimated_size_kb: u64,
        properties: &BTreeMap<String, String>,
    ) -> Self {
        let (media_type, media_volume_index, media_path, media_name) = match &payload.media {
            Some(media) => (
                media.media_type,
                media.volume_index,
                media.path.clone(),
                media.media_name.clone(),
            ),
            None => (MediaType::Fixed, 1, String::new(), String::new()),
        };

        Self {
            media_type,
            media_volume_index,
            media_path,
            media_name,
            estimated_size_kb,
            properties: properties.clone(),
        }
    }

    /// Flattened key/value form understood by property-map engines
    #[must_use]
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut map = self.properties.clone();
        map.insert("mediaType".into(), self.media_type.as_property().into());
        map.insert(
            "mediaVolumeIndex".into(),
            self.media_volume_index.to_string(),
        );
        map.insert("mediaPath".into(), self.media_path.clone());
        map.insert("mediaName".into(), self.media_name.clone());
        map.insert(
            "AddRemoveInfoEstimatedSize".into(),
            self.estimated_size_kb.to_string(),
        );
        map
    }
}

/// The component that actually installs and removes payloads.
///
/// `install_payload` only starts the operation; its progress is observed by
/// polling `install_status` until it reports a non-running snapshot.
pub trait InstallEngine {
    /// Start an operation. Must not block until it finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses to start the operation.
    fn install_payload(
        &mut self,
        id: &PayloadId,
        action: InstallerAction,
        params: &InstallParams,
    ) -> Result<(), EngineError>;

    /// Snapshot of the running operation, `None` before anything started.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot report status.
    fn install_status(&mut self) -> Result<Option<OperationResult>, EngineError>;
}

/// Synchronous dry-run counterpart of [`InstallEngine`].
pub trait SimulationEngine {
    /// # Errors
    ///
    /// Returns an error if a simulation session cannot be opened.
    fn open_simulation(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Predict the result of an operation without performing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be simulated.
    fn simulate_payload(
        &mut self,
        id: &PayloadId,
        action: InstallerAction,
        params: &InstallParams,
    ) -> Result<OperationResult, EngineError>;

    fn close_simulation(&mut self) {}
}

impl<T: InstallEngine + ?Sized> InstallEngine for Box<T> {
    fn install_payload(
        &mut self,
        id: &PayloadId,
        action: InstallerAction,
        params: &InstallParams,
    ) -> Result<(), EngineError> {
        (**self).install_payload(id, action, params)
    }

    fn install_status(&mut self) -> Result<Option<OperationResult>, EngineError> {
        (**self).install_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payseq_types::MediaInfo;

    #[test]
    fn test_params_without_media() {
        let payload = Payload::new("a", "A", InstallerAction::Install);
        let mut configured = BTreeMap::new();
        configured.insert("INSTALLDIR".to_string(), "/opt/suite".to_string());

        let params = InstallParams::for_payload(&payload, 3, &configured);
        let props = params.to_properties();
        assert_eq!(props["mediaType"], "0");
        assert_eq!(props["mediaVolumeIndex"], "1");
        assert_eq!(props["mediaPath"], "");
        assert_eq!(props["mediaName"], "");
        assert_eq!(props["AddRemoveInfoEstimatedSize"], "3");
        assert_eq!(props["INSTALLDIR"], "/opt/suite");
    }

    #[test]
    fn test_params_with_removable_media() {
        let payload = Payload::new("a", "A", InstallerAction::Install).with_media(
            MediaInfo::removable(2, "/media/cdrom/payloads", "Suite Disk 2"),
        );
        let params = InstallParams::for_payload(&payload, 0, &BTreeMap::new());
        assert_eq!(params.media_type, MediaType::Removable);
        assert_eq!(params.to_properties()["mediaType"], "1");
        assert_eq!(params.media_volume_index, 2);
        assert_eq!(params.media_name, "Suite Disk 2");
    }
}
