//! Point-in-time view of the ledger handed to presentation layers.

use crate::context::AppContext;
use crate::model::WorkloadInstance;
use crate::runtime::{ContainerRuntime, ImageRuntime};
use anyhow::Result;

#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    /// Reconciled running list; `None` when the runtime could not be reached.
    pub running: Option<Vec<WorkloadInstance>>,
    pub ledger: Vec<WorkloadInstance>,
    pub healed: Vec<String>,
    pub token: Option<String>,
    pub warning: Option<String>,
}

/// Reconcile, then read the full ledger and the token. A runtime failure
/// during reconcile is reported in `warning` rather than failing the snapshot.
pub(crate) fn take_snapshot<R: ContainerRuntime + ImageRuntime>(
    ctx: &AppContext<R>,
) -> Result<Snapshot> {
    let mut snap = Snapshot::default();
    match ctx.reconciler().reconcile() {
        Ok(report) => {
            snap.running = Some(report.running);
            snap.healed = report.healed;
        }
        Err(e) => snap.warning = Some(format!("Runtime check failed: {e}")),
    }
    snap.ledger = ctx.store.list_by_status(None)?;
    snap.token = ctx.store.get_token()?;
    Ok(snap)
}
