//! Container runtime seam.
//!
//! The core only talks to the engine through these traits; `DockerCli` drives the
//! `docker` binary, tests use the scripted `FakeRuntime`.

mod docker;
#[cfg(test)]
pub(crate) mod fake;

pub use docker::DockerCli;

use crate::error::Result;
use crate::model::{ContainerState, Launched};
use std::io::Write;
use std::path::Path;

/// Everything `run` needs to create and start a detached container.
#[derive(Debug, Clone, Default)]
pub struct LaunchSpec {
    pub image: String,
    pub env: Vec<(String, String)>,
    pub labels: Vec<(String, String)>,
    /// Request all GPUs (`--gpus all`).
    pub gpu: bool,
}

/// Lifecycle operations the ledger core depends on.
pub trait ContainerRuntime {
    /// Fails with `RuntimeUnavailable` when the engine cannot be reached.
    fn ping(&self) -> Result<()>;

    fn gpu_available(&self) -> Result<bool>;

    /// Create and start a detached container, returning only once the engine
    /// reports its id and main process id.
    fn run(&self, spec: &LaunchSpec) -> Result<Launched>;

    /// `ContainerNotFound` when the engine no longer knows the id.
    fn stop(&self, container_id: &str) -> Result<()>;

    /// `ContainerNotFound` when the engine no longer knows the id.
    fn inspect(&self, container_id: &str) -> Result<ContainerState>;

    /// Follow the container's output, forwarding bytes as they arrive. Blocks
    /// until the container exits or the process is interrupted.
    fn stream_logs(&self, container_id: &str, out: &mut dyn Write) -> Result<()>;
}

/// Image-side operations used by the build and publish flows.
pub trait ImageRuntime {
    /// Locally available `repository:tag` references, untagged images skipped.
    fn list_images(&self) -> Result<Vec<String>>;

    fn build(&self, context_dir: &Path, tag: &str, on_line: &mut dyn FnMut(&str)) -> Result<()>;

    fn tag(&self, source: &str, target: &str) -> Result<()>;

    fn push(&self, reference: &str, on_line: &mut dyn FnMut(&str)) -> Result<()>;

    fn login(&self, username: &str, password: &str, registry: &str) -> Result<()>;
}
