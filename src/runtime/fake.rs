//! Scripted in-memory runtime for tests.

use super::{ContainerRuntime, ImageRuntime, LaunchSpec};
use crate::error::{Error, Result};
use crate::model::{ContainerState, Launched};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

#[derive(Default)]
pub(crate) struct FakeRuntime {
    pub containers: RefCell<HashMap<String, ContainerState>>,
    pub launched: RefCell<Vec<LaunchSpec>>,
    pub calls: RefCell<Vec<String>>,
    pub images: RefCell<Vec<String>>,
    pub logs: RefCell<HashMap<String, Vec<u8>>>,
    pub unavailable: Cell<bool>,
    pub gpu: Cell<bool>,
    pub fail_run: Cell<bool>,
    /// Ids handed out by `run`, in order; falls back to `fake-N`.
    pub next_ids: RefCell<Vec<String>>,
    counter: Cell<u32>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: &[&str]) -> Self {
        let fake = Self::default();
        *fake.next_ids.borrow_mut() = ids.iter().rev().map(|s| s.to_string()).collect();
        fake
    }

    pub fn set_state(&self, id: &str, state: ContainerState) {
        self.containers.borrow_mut().insert(id.to_string(), state);
    }

    pub fn forget(&self, id: &str) {
        self.containers.borrow_mut().remove(id);
    }

    pub fn calls_to(&self, op: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    fn check_up(&self, call: String) -> Result<()> {
        self.calls.borrow_mut().push(call);
        if self.unavailable.get() {
            return Err(Error::RuntimeUnavailable("fake engine offline".into()));
        }
        Ok(())
    }
}

impl ContainerRuntime for FakeRuntime {
    fn ping(&self) -> Result<()> {
        self.check_up("ping".into())
    }

    fn gpu_available(&self) -> Result<bool> {
        self.check_up("gpu_available".into())?;
        Ok(self.gpu.get())
    }

    fn run(&self, spec: &LaunchSpec) -> Result<Launched> {
        self.check_up(format!("run {}", spec.image))?;
        if self.fail_run.get() {
            return Err(Error::Runtime {
                command: format!("docker run {}", spec.image),
                message: "pull access denied".into(),
            });
        }
        if spec.gpu && !self.gpu.get() {
            return Err(Error::GpuUnavailable);
        }
        let id = self.next_ids.borrow_mut().pop().unwrap_or_else(|| {
            let n = self.counter.get() + 1;
            self.counter.set(n);
            format!("fake-{n}")
        });
        self.set_state(&id, ContainerState::Running);
        self.launched.borrow_mut().push(spec.clone());
        Ok(Launched {
            container_id: id,
            pid: 4242,
        })
    }

    fn stop(&self, container_id: &str) -> Result<()> {
        self.check_up(format!("stop {container_id}"))?;
        let mut containers = self.containers.borrow_mut();
        match containers.get_mut(container_id) {
            Some(state) => {
                *state = ContainerState::NotRunning("exited".into());
                Ok(())
            }
            None => Err(Error::ContainerNotFound(container_id.to_string())),
        }
    }

    fn inspect(&self, container_id: &str) -> Result<ContainerState> {
        self.check_up(format!("inspect {container_id}"))?;
        self.containers
            .borrow()
            .get(container_id)
            .cloned()
            .ok_or_else(|| Error::ContainerNotFound(container_id.to_string()))
    }

    fn stream_logs(&self, container_id: &str, out: &mut dyn Write) -> Result<()> {
        self.inspect(container_id)?;
        if let Some(bytes) = self.logs.borrow().get(container_id) {
            out.write_all(bytes)?;
        }
        Ok(())
    }
}

impl ImageRuntime for FakeRuntime {
    fn list_images(&self) -> Result<Vec<String>> {
        self.check_up("list_images".into())?;
        Ok(self.images.borrow().clone())
    }

    fn build(&self, context_dir: &Path, tag: &str, on_line: &mut dyn FnMut(&str)) -> Result<()> {
        self.check_up(format!("build {tag}"))?;
        if !context_dir.join("Dockerfile").exists() {
            return Err(Error::Runtime {
                command: format!("docker build -t {tag}"),
                message: "missing Dockerfile".into(),
            });
        }
        on_line("Step 1/1 : FROM jupyter/base-notebook");
        self.images.borrow_mut().push(format!("{tag}:latest"));
        Ok(())
    }

    fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.check_up(format!("tag {source} {target}"))
    }

    fn push(&self, reference: &str, on_line: &mut dyn FnMut(&str)) -> Result<()> {
        self.check_up(format!("push {reference}"))?;
        on_line("latest: digest: sha256:0000 size: 1234");
        Ok(())
    }

    fn login(&self, username: &str, _password: &str, registry: &str) -> Result<()> {
        self.check_up(format!("login {username} {registry}"))
    }
}
