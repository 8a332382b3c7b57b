//! Start, stop and log-follow for ledger-tracked workloads.
//!
//! Both Start and Stop call the runtime first and write the ledger second. A
//! failed start leaves no row; a stop always lands its `Stopped` write.

use crate::error::{Error, Result};
use crate::model::{LaunchRequest, WorkloadInstance, WorkloadStatus};
use crate::runtime::{ContainerRuntime, LaunchSpec};
use crate::storage::StateStore;
use crate::validation::validate_image_name;
use std::io::Write;
use tracing::{info, warn};

pub const LABEL_MANAGED: &str = "runes.managed";
pub const LABEL_NAME: &str = "runes.name";

pub struct LifecycleController<'a> {
    store: &'a StateStore,
    runtime: &'a dyn ContainerRuntime,
    token_env: &'a str,
}

impl<'a> LifecycleController<'a> {
    pub fn new(store: &'a StateStore, runtime: &'a dyn ContainerRuntime, token_env: &'a str) -> Self {
        Self {
            store,
            runtime,
            token_env,
        }
    }

    pub fn start(&self, req: &LaunchRequest) -> Result<WorkloadInstance> {
        let image = req.image.trim();
        validate_image_name(image)?;

        if req.gpu && !self.runtime.gpu_available()? {
            return Err(Error::GpuUnavailable);
        }

        let spec = launch_spec(req, image, self.token_env);
        let launched = self.runtime.run(&spec)?;
        if launched.pid == 0 {
            warn!(container = %launched.container_id, "runtime reported pid 0 right after start");
        }

        let row = self.store.record_start(
            launched.pid,
            &launched.container_id,
            &req.remote_name,
            &req.remote_description,
            req.token.as_deref(),
            WorkloadStatus::Running,
        )?;
        info!(
            container = %row.container_id,
            image,
            gpu = req.gpu,
            row = row.id,
            "workload started"
        );
        Ok(row)
    }

    /// Stop the container and mark its ledger rows stopped. A container the
    /// runtime no longer knows is not an error; any other runtime failure is
    /// returned after the ledger write.
    pub fn stop(&self, container_id: &str) -> Result<()> {
        let outcome = match self.runtime.stop(container_id) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                info!(container = container_id, "container already gone");
                Ok(())
            }
            Err(e) => {
                warn!(container = container_id, error = %e, "runtime stop failed");
                Err(e)
            }
        };

        let changed = self
            .store
            .update_status(container_id, WorkloadStatus::Stopped)?;
        info!(container = container_id, rows = changed, "workload marked stopped");
        outcome
    }

    /// Blocking follow of the container's output.
    pub fn logs(&self, container_id: &str, out: &mut dyn Write) -> Result<()> {
        self.runtime.stream_logs(container_id, out)
    }
}

fn launch_spec(req: &LaunchRequest, image: &str, token_env: &str) -> LaunchSpec {
    let mut labels = vec![(LABEL_MANAGED.to_string(), "true".to_string())];
    if !req.remote_name.is_empty() {
        labels.push((LABEL_NAME.to_string(), req.remote_name.clone()));
    }
    let env = req
        .token
        .iter()
        .map(|t| (token_env.to_string(), t.clone()))
        .collect();
    LaunchSpec {
        image: image.to_string(),
        env,
        labels,
        gpu: req.gpu,
    }
}
