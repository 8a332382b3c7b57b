//! Cross-check `Running` ledger rows against the runtime and heal stale ones.

use crate::error::Result;
use crate::lifecycle::LifecycleController;
use crate::model::{WorkloadInstance, WorkloadStatus};
use crate::runtime::ContainerRuntime;
use crate::storage::StateStore;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Rows the runtime confirmed running, in ledger order.
    pub running: Vec<WorkloadInstance>,
    /// Container ids whose rows were flipped to stopped.
    pub healed: Vec<String>,
}

pub struct Reconciler<'a> {
    store: &'a StateStore,
    runtime: &'a dyn ContainerRuntime,
    lifecycle: LifecycleController<'a>,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a StateStore, runtime: &'a dyn ContainerRuntime, token_env: &'a str) -> Self {
        Self {
            store,
            runtime,
            lifecycle: LifecycleController::new(store, runtime, token_env),
        }
    }

    pub fn running(&self) -> Result<Vec<WorkloadInstance>> {
        Ok(self.reconcile()?.running)
    }

    /// Every row is inspected before anything is written, so an unreachable
    /// runtime leaves the ledger untouched.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let rows = self.store.list_by_status(Some(WorkloadStatus::Running))?;

        let mut verdicts = Vec::with_capacity(rows.len());
        for row in rows {
            let alive = match self.runtime.inspect(&row.container_id) {
                Ok(state) => {
                    debug!(container = %row.container_id, ?state, "inspected");
                    state.is_running()
                }
                Err(e) if e.is_not_found() => false,
                Err(e) => return Err(e),
            };
            verdicts.push((row, alive));
        }

        let mut report = ReconcileReport::default();
        for (row, alive) in verdicts {
            if alive {
                report.running.push(row);
                continue;
            }
            // Several rows may share an id; the first stop covers them all.
            if report.healed.contains(&row.container_id) {
                continue;
            }
            self.lifecycle.stop(&row.container_id)?;
            report.healed.push(row.container_id);
        }

        if !report.healed.is_empty() {
            info!(healed = report.healed.len(), "marked stale workloads stopped");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{ContainerState, LaunchRequest};
    use crate::runtime::fake::FakeRuntime;

    fn launch(store: &StateStore, rt: &FakeRuntime, image: &str) -> WorkloadInstance {
        LifecycleController::new(store, rt, "DAWNET_TOKEN")
            .start(&LaunchRequest {
                image: image.into(),
                remote_name: image.into(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn stopped_container_is_healed_and_hidden() {
        let store = StateStore::open_in_memory().unwrap();
        let rt = FakeRuntime::with_ids(&["abc123"]);
        launch(&store, &rt, "img:v1");
        rt.set_state("abc123", ContainerState::NotRunning("exited".into()));

        let rec = Reconciler::new(&store, &rt, "DAWNET_TOKEN");
        assert!(rec.running().unwrap().is_empty());
        let rows = store.list_by_status(None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, WorkloadStatus::Stopped);
    }

    #[test]
    fn keeps_live_rows_in_ledger_order() {
        let store = StateStore::open_in_memory().unwrap();
        let rt = FakeRuntime::with_ids(&["c1", "c2", "c3", "c4"]);
        for image in ["a", "b", "c", "d"] {
            launch(&store, &rt, image);
        }
        rt.set_state("c2", ContainerState::NotRunning("exited".into()));
        rt.forget("c3");

        let report = Reconciler::new(&store, &rt, "DAWNET_TOKEN")
            .reconcile()
            .unwrap();
        let live: Vec<&str> = report
            .running
            .iter()
            .map(|w| w.container_id.as_str())
            .collect();
        assert_eq!(live, vec!["c1", "c4"]);
        assert_eq!(report.healed, vec!["c2", "c3"]);

        let running_ids: Vec<String> = store
            .list_by_status(Some(WorkloadStatus::Running))
            .unwrap()
            .into_iter()
            .map(|w| w.container_id)
            .collect();
        assert_eq!(running_ids, vec!["c1", "c4"]);
    }

    #[test]
    fn unreachable_runtime_fails_closed() {
        let store = StateStore::open_in_memory().unwrap();
        let rt = FakeRuntime::with_ids(&["c1", "c2"]);
        launch(&store, &rt, "a");
        launch(&store, &rt, "b");
        rt.set_state("c1", ContainerState::NotRunning("exited".into()));
        rt.unavailable.set(true);

        let err = Reconciler::new(&store, &rt, "DAWNET_TOKEN")
            .reconcile()
            .unwrap_err();
        assert!(matches!(err, Error::RuntimeUnavailable(_)));
        assert!(store
            .list_by_status(None)
            .unwrap()
            .iter()
            .all(|w| w.status == WorkloadStatus::Running));
        assert_eq!(rt.calls_to("stop"), 0);
    }

    #[test]
    fn duplicate_rows_are_stopped_once() {
        let store = StateStore::open_in_memory().unwrap();
        let rt = FakeRuntime::new();
        store
            .record_start(1, "dup", "x", "", None, WorkloadStatus::Running)
            .unwrap();
        store
            .record_start(1, "dup", "x", "", None, WorkloadStatus::Running)
            .unwrap();

        let report = Reconciler::new(&store, &rt, "DAWNET_TOKEN")
            .reconcile()
            .unwrap();
        assert_eq!(report.healed, vec!["dup"]);
        assert!(store
            .list_by_status(Some(WorkloadStatus::Running))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn empty_ledger_makes_no_runtime_calls() {
        let store = StateStore::open_in_memory().unwrap();
        let rt = FakeRuntime::new();
        let report = Reconciler::new(&store, &rt, "DAWNET_TOKEN")
            .reconcile()
            .unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert!(rt.calls.borrow().is_empty());
    }
}
