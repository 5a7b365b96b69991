//! Dry-run of a payload set

use std::collections::BTreeMap;

use payseq_errors::Error;
use payseq_types::Payload;

use crate::engine::{InstallParams, SimulationEngine};
use crate::queue::OperationQueue;

/// Walk the run against `engine` without performing anything.
///
/// The queue is built exactly as for a real run, so dependency skipping and
/// failure propagation behave the same. Returns the queued payloads in
/// operation order with their simulated results.
///
/// # Errors
///
/// Returns an error if the queue cannot be opened or the engine fails to
/// simulate a payload.
pub fn simulate_operations<S>(
    payloads: Vec<Payload>,
    engine: &mut S,
    properties: &BTreeMap<String, String>,
) -> Result<Vec<Payload>, Error>
where
    S: SimulationEngine + ?Sized,
{
    let mut queue = OperationQueue::new();
    queue.open(payloads)?;
    let estimated_size_kb = queue.estimated_size_kb();

    engine.open_simulation()?;
    let outcome = simulate_queue(&mut queue, engine, estimated_size_kb, properties);
    engine.close_simulation();
    outcome?;

    Ok(queue.queued_payloads().cloned().collect())
}

fn simulate_queue<S>(
    queue: &mut OperationQueue,
    engine: &mut S,
    estimated_size_kb: u64,
    properties: &BTreeMap<String, String>,
) -> Result<(), Error>
where
    S: SimulationEngine + ?Sized,
{
    while let Some(payload) = queue.pop_instruction() {
        let params = InstallParams::for_payload(payload, estimated_size_kb, properties);
        let id = payload.id.clone();
        let result = engine.simulate_payload(&id, payload.action, &params)?;
        tracing::debug!(payload = %id, code = %result.code(), "simulated operation");
        queue.record_result(result);
    }
    Ok(())
}
