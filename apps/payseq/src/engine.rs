//! Install engine driven by the plan's scripted outcomes

use std::collections::BTreeMap;

use payseq_errors::EngineError;
use payseq_sequencer::{InstallEngine, InstallParams, SimulationEngine};
use payseq_types::{InstallerAction, OperationResult, PayloadId};

use crate::plan::PlannedOutcome;

#[derive(Debug)]
struct ActiveOperation {
    outcome: PlannedOutcome,
    polls: u8,
}

/// Replays [`PlannedOutcome`]s: a few running snapshots, then the final result.
#[derive(Debug, Default)]
pub struct PlanEngine {
    outcomes: BTreeMap<PayloadId, PlannedOutcome>,
    active: Option<ActiveOperation>,
    last: Option<OperationResult>,
}

impl PlanEngine {
    pub fn new(outcomes: BTreeMap<PayloadId, PlannedOutcome>) -> Self {
        Self {
            outcomes,
            active: None,
            last: None,
        }
    }

    fn outcome_for(&self, id: &PayloadId) -> PlannedOutcome {
        self.outcomes.get(id).cloned().unwrap_or_default()
    }
}

impl InstallEngine for PlanEngine {
    fn install_payload(
        &mut self,
        id: &PayloadId,
        action: InstallerAction,
        params: &InstallParams,
    ) -> Result<(), EngineError> {
        let outcome = self.outcome_for(id);
        if outcome.fail_start {
            return Err(EngineError::StartFailed {
                payload: id.to_string(),
                message: format!("engine refused to {action}"),
            });
        }
        tracing::debug!(payload = %id, %action, properties = ?params.to_properties(), "engine started");
        self.active = Some(ActiveOperation { outcome, polls: 0 });
        self.last = None;
        Ok(())
    }

    fn install_status(&mut self) -> Result<Option<OperationResult>, EngineError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(self.last.clone());
        };

        active.polls = active.polls.saturating_add(1);
        let snapshot = if active.polls > active.outcome.steps {
            let result = active.outcome.final_result();
            self.active = None;
            result
        } else {
            active.outcome.running_result(active.polls)
        };
        self.last = Some(snapshot.clone());
        Ok(Some(snapshot))
    }
}

impl SimulationEngine for PlanEngine {
    fn simulate_payload(
        &mut self,
        id: &PayloadId,
        _action: InstallerAction,
        _params: &InstallParams,
    ) -> Result<OperationResult, EngineError> {
        let outcome = self.outcome_for(id);
        if outcome.fail_start {
            return Err(EngineError::SimulationFailed {
                payload: id.to_string(),
                message: "operation would not start".to_string(),
            });
        }
        Ok(outcome.final_result())
    }
}
