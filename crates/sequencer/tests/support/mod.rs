//! Test doubles shared by the sequencer integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use payseq_errors::{EngineError, MediaError};
use payseq_sequencer::{
    AlertPresenter, InstallEngine, InstallParams, MediaManager, PathInformation,
    RemovableDrive, SimulationEngine, SwapChoice,
};
use payseq_types::{InstallerAction, OperationResult, Payload, PayloadId, ResultCode};

pub fn install(id: &str) -> Payload {
    Payload::new(id, id.to_uppercase(), InstallerAction::Install)
}

pub fn remove(id: &str) -> Payload {
    Payload::new(id, id.to_uppercase(), InstallerAction::Remove)
}

/// `a <- b <- c`: c requires b, b requires a
pub fn chain(action: InstallerAction) -> Vec<Payload> {
    vec![
        Payload::new("c", "C", action).with_required(["a", "b"]),
        Payload::new("a", "A", action).with_satisfied(["b", "c"]),
        Payload::new("b", "B", action)
            .with_required(["a"])
            .with_satisfied(["c"]),
    ]
}

pub fn code_of(payload: &Payload) -> Option<ResultCode> {
    payload.operation_result().map(OperationResult::code)
}

#[derive(Debug, Clone)]
pub struct StartedOperation {
    pub id: PayloadId,
    pub action: InstallerAction,
    pub params: InstallParams,
}

/// Engine that replays a fixed sequence of snapshots per payload.
///
/// Once a script runs out the last snapshot is repeated.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    scripts: HashMap<PayloadId, Vec<OperationResult>>,
    fail_start: HashSet<PayloadId>,
    fail_status: bool,
    active: VecDeque<OperationResult>,
    last: Option<OperationResult>,
    pub started: Vec<StartedOperation>,
    pub polls: usize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, id: &str, script: Vec<OperationResult>) -> Self {
        self.scripts.insert(PayloadId::from(id), script);
        self
    }

    pub fn failing(self, id: &str, code: i32) -> Self {
        self.with_script(
            id,
            vec![
                OperationResult::running(20),
                OperationResult::failed(ResultCode(code), vec![id.to_string()]),
            ],
        )
    }

    pub fn fail_start(mut self, id: &str) -> Self {
        self.fail_start.insert(PayloadId::from(id));
        self
    }

    pub fn fail_status(mut self) -> Self {
        self.fail_status = true;
        self
    }

    pub fn started_ids(&self) -> Vec<String> {
        self.started.iter().map(|op| op.id.to_string()).collect()
    }
}

impl InstallEngine for ScriptedEngine {
    fn install_payload(
        &mut self,
        id: &PayloadId,
        action: InstallerAction,
        params: &InstallParams,
    ) -> Result<(), EngineError> {
        if self.fail_start.contains(id) {
            return Err(EngineError::StartFailed {
                payload: id.to_string(),
                message: "scripted start failure".to_string(),
            });
        }
        let script = self.scripts.get(id).cloned().unwrap_or_else(|| {
            vec![
                OperationResult::running(30),
                OperationResult::running(70),
                OperationResult::succeeded(),
            ]
        });
        self.active = script.into();
        self.last = None;
        self.started.push(StartedOperation {
            id: id.clone(),
            action,
            params: params.clone(),
        });
        Ok(())
    }

    fn install_status(&mut self) -> Result<Option<OperationResult>, EngineError> {
        self.polls += 1;
        if self.fail_status {
            return Err(EngineError::StatusUnavailable {
                message: "scripted status failure".to_string(),
            });
        }
        if let Some(next) = self.active.pop_front() {
            self.last = Some(next);
        }
        Ok(self.last.clone())
    }
}

/// Simulation engine answering from a fixed table; unknown payloads succeed.
#[derive(Debug, Default)]
pub struct ScriptedSimulation {
    results: HashMap<PayloadId, OperationResult>,
    pub opened: bool,
    pub closed: bool,
    pub simulated: Vec<PayloadId>,
}

impl ScriptedSimulation {
    pub fn with_result(mut self, id: &str, result: OperationResult) -> Self {
        self.results.insert(PayloadId::from(id), result);
        self
    }
}

impl SimulationEngine for ScriptedSimulation {
    fn open_simulation(&mut self) -> Result<(), EngineError> {
        self.opened = true;
        Ok(())
    }

    fn simulate_payload(
        &mut self,
        id: &PayloadId,
        _action: InstallerAction,
        _params: &InstallParams,
    ) -> Result<OperationResult, EngineError> {
        self.simulated.push(id.clone());
        Ok(self
            .results
            .get(id)
            .cloned()
            .unwrap_or_else(OperationResult::succeeded))
    }

    fn close_simulation(&mut self) {
        self.closed = true;
    }
}

#[derive(Debug, Default)]
struct MediaState {
    present: HashSet<String>,
    drives: Vec<RemovableDrive>,
    ejected: Vec<String>,
}

/// In-memory media manager; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryMedia {
    inner: Arc<Mutex<MediaState>>,
}

impl MemoryMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str) {
        self.inner.lock().unwrap().present.insert(path.to_string());
    }

    pub fn with_drive(self, root: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .drives
            .push(RemovableDrive::new(root));
        self
    }

    pub fn ejected(&self) -> Vec<String> {
        self.inner.lock().unwrap().ejected.clone()
    }
}

impl MediaManager for MemoryMedia {
    fn path_information(&self, path: &str) -> PathInformation {
        if self.inner.lock().unwrap().present.contains(path) {
            PathInformation::present()
        } else {
            PathInformation {
                is_valid_path: true,
                path_exists: false,
            }
        }
    }

    fn eject_removable_media(&mut self, path: &str) -> Result<(), MediaError> {
        let mut state = self.inner.lock().unwrap();
        state.present.remove(path);
        state.ejected.push(path.to_string());
        Ok(())
    }

    fn list_removable_drives(&self) -> Result<Vec<RemovableDrive>, MediaError> {
        Ok(self.inner.lock().unwrap().drives.clone())
    }
}

/// Answers swap prompts from a script; unavailable once the script is spent.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAlerts {
    choices: Arc<Mutex<VecDeque<SwapChoice>>>,
    /// Media, path and how many OKs pass before the path shows up
    insert_on_ok: Option<(MemoryMedia, String, usize)>,
    oks: usize,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedAlerts {
    pub fn new(choices: impl IntoIterator<Item = SwapChoice>) -> Self {
        Self {
            choices: Arc::new(Mutex::new(choices.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Simulate the user inserting `path` before pressing OK
    pub fn inserting(self, media: &MemoryMedia, path: &str) -> Self {
        self.inserting_after(media, path, 1)
    }

    /// Like [`inserting`](Self::inserting), but only on the `oks`-th OK
    pub fn inserting_after(mut self, media: &MemoryMedia, path: &str, oks: usize) -> Self {
        self.insert_on_ok = Some((media.clone(), path.to_string(), oks));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl AlertPresenter for ScriptedAlerts {
    fn is_available(&self) -> bool {
        !self.choices.lock().unwrap().is_empty()
    }

    fn prompt_disk_swap(&mut self, media_name: &str) -> Result<SwapChoice, MediaError> {
        self.prompts.lock().unwrap().push(media_name.to_string());
        let choice = self
            .choices
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MediaError::PromptFailed {
                message: "no scripted answer".to_string(),
            })?;
        if choice == SwapChoice::Ok {
            self.oks += 1;
            if let Some((media, path, after)) = &self.insert_on_ok {
                if self.oks >= *after {
                    media.insert(path);
                }
            }
        }
        Ok(choice)
    }
}
