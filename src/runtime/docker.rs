use super::{ContainerRuntime, ImageRuntime, LaunchSpec};
use crate::error::{Error, Result};
use crate::model::{ContainerState, Launched};
use std::ffi::{OsStr, OsString};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// How many trailing stderr lines are kept for error reports from streamed commands.
const STDERR_TAIL: usize = 20;

/// Binaries installed by the NVIDIA container toolkit. Either one lets
/// `--gpus all` work on plain runc without a registered `nvidia` runtime.
const NVIDIA_TOOLS: [&str; 2] = ["nvidia-container-runtime-hook", "nvidia-container-cli"];
const CDI_SPEC_DIRS: [&str; 2] = ["/etc/cdi", "/var/run/cdi"];

/// `ContainerRuntime` backed by the `docker` command-line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
    /// Directories searched for the NVIDIA toolkit, in `PATH` syntax.
    tool_path: Option<OsString>,
    cdi_dirs: Vec<PathBuf>,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            tool_path: std::env::var_os("PATH"),
            cdi_dirs: CDI_SPEC_DIRS.iter().map(PathBuf::from).collect(),
        }
    }

    #[cfg(test)]
    fn with_gpu_lookup(mut self, tool_path: Option<OsString>, cdi_dirs: Vec<PathBuf>) -> Self {
        self.tool_path = tool_path;
        self.cdi_dirs = cdi_dirs;
        self
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args);
        cmd
    }

    /// Run to completion and return trimmed stdout.
    fn capture(&self, args: &[String], subject: Option<&str>) -> Result<String> {
        let rendered = render_command(&self.bin, args);
        debug!(command = %rendered, "docker");
        let output: Output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&self.bin, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            };
            return Err(classify_failure(&rendered, subject, &stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run to completion, handing every stdout/stderr line to `on_line` on the
    /// calling thread as it arrives.
    fn run_streaming(&self, args: &[String], on_line: &mut dyn FnMut(&str)) -> Result<()> {
        let rendered = render_command(&self.bin, args);
        debug!(command = %rendered, "docker (streaming)");
        let mut child = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.bin, e))?;

        let (tx, rx) = mpsc::channel::<(bool, String)>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, false, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, true, tx.clone()));
        }
        drop(tx);

        let mut stderr_tail: Vec<String> = Vec::new();
        for (is_stderr, line) in rx {
            if is_stderr {
                stderr_tail.push(line.clone());
                if stderr_tail.len() > STDERR_TAIL {
                    stderr_tail.remove(0);
                }
            }
            on_line(&line);
        }
        for r in readers {
            let _ = r.join();
        }

        let status = child.wait()?;
        if !status.success() {
            let message = if stderr_tail.is_empty() {
                format!("exit status {status}")
            } else {
                stderr_tail.join("\n")
            };
            return Err(classify_failure(&rendered, None, &message));
        }
        Ok(())
    }

    /// Remove a container whose start failed so nothing is left in `Created`.
    fn discard(&self, container_id: &str) {
        if let Err(e) = self.capture(&args(&["rm", "--force", container_id]), Some(container_id)) {
            warn!(container_id, error = %e, "could not remove container after failed start");
        }
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(
    stream: R,
    is_stderr: bool,
    tx: mpsc::Sender<(bool, String)>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(l) => {
                    if tx.send((is_stderr, l)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    })
}

fn spawn_chunk_reader<R: Read + Send + 'static>(
    mut stream: R,
    tx: mpsc::Sender<Vec<u8>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    })
}

/// True when the NVIDIA toolkit is on `tool_path` or a CDI spec names an
/// NVIDIA device.
fn nvidia_tooling_present(tool_path: Option<&OsStr>, cdi_dirs: &[PathBuf]) -> bool {
    let on_path = tool_path.is_some_and(|p| {
        std::env::split_paths(p).any(|dir| NVIDIA_TOOLS.iter().any(|t| dir.join(t).is_file()))
    });
    on_path || cdi_dirs.iter().any(|d| has_nvidia_cdi_spec(d))
}

fn has_nvidia_cdi_spec(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|e| {
        let name = e.file_name().to_string_lossy().to_lowercase();
        name.contains("nvidia")
            && (name.ends_with(".yaml") || name.ends_with(".yml") || name.ends_with(".json"))
    })
}

impl ContainerRuntime for DockerCli {
    fn ping(&self) -> Result<()> {
        self.capture(&args(&["version", "--format", "{{.Server.Version}}"]), None)
            .map(|_| ())
    }

    fn gpu_available(&self) -> Result<bool> {
        let runtimes = self.capture(&args(&["info", "--format", "{{json .Runtimes}}"]), None)?;
        if runtimes.contains("nvidia") {
            return Ok(true);
        }
        Ok(nvidia_tooling_present(self.tool_path.as_deref(), &self.cdi_dirs))
    }

    fn run(&self, spec: &LaunchSpec) -> Result<Launched> {
        // Separate create and start: a failed start must not leave a container behind.
        let created = self.capture(&create_args(spec), None)?;
        let container_id = created
            .lines()
            .last()
            .unwrap_or_default()
            .trim()
            .to_string();
        if container_id.is_empty() {
            return Err(Error::Runtime {
                command: format!("{} create", self.bin),
                message: "no container id reported".into(),
            });
        }

        if let Err(e) = self.capture(&args(&["start", &container_id]), Some(&container_id)) {
            self.discard(&container_id);
            return Err(e);
        }

        let pid_text = self.capture(
            &args(&[
                "inspect",
                "--type",
                "container",
                "--format",
                "{{.State.Pid}}",
                &container_id,
            ]),
            Some(&container_id),
        )?;
        let pid = pid_text.parse::<i64>().map_err(|_| Error::Runtime {
            command: format!("{} inspect {container_id}", self.bin),
            message: format!("unexpected pid value {pid_text:?}"),
        })?;
        if pid == 0 {
            warn!(container_id = %container_id, "container has no live process right after start");
        }
        Ok(Launched { container_id, pid })
    }

    fn stop(&self, container_id: &str) -> Result<()> {
        self.capture(&args(&["stop", container_id]), Some(container_id))
            .map(|_| ())
    }

    fn inspect(&self, container_id: &str) -> Result<ContainerState> {
        let status = self.capture(
            &args(&[
                "inspect",
                "--type",
                "container",
                "--format",
                "{{.State.Status}}",
                container_id,
            ]),
            Some(container_id),
        )?;
        Ok(parse_state(&status))
    }

    fn stream_logs(&self, container_id: &str, out: &mut dyn Write) -> Result<()> {
        // Inspect first so a missing container surfaces as `ContainerNotFound`.
        self.inspect(container_id)?;

        let mut child = self
            .command(&args(&["logs", "--follow", container_id]))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.bin, e))?;

        // Containers write to both streams; forward both, chunk by chunk.
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_chunk_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_chunk_reader(stderr, tx.clone()));
        }
        drop(tx);

        let mut forwarded: io::Result<()> = Ok(());
        for chunk in rx {
            forwarded = out.write_all(&chunk).and_then(|_| out.flush());
            if forwarded.is_err() {
                let _ = child.kill();
                break;
            }
        }
        for r in readers {
            let _ = r.join();
        }

        let status = child.wait()?;
        forwarded?;
        if !status.success() {
            return Err(Error::Runtime {
                command: format!("{} logs --follow {container_id}", self.bin),
                message: format!("exit status {status}"),
            });
        }
        Ok(())
    }
}

impl ImageRuntime for DockerCli {
    fn list_images(&self) -> Result<Vec<String>> {
        let listing = self.capture(
            &args(&["images", "--format", "{{.Repository}}:{{.Tag}}"]),
            None,
        )?;
        Ok(parse_image_listing(&listing))
    }

    fn build(&self, context_dir: &Path, tag: &str, on_line: &mut dyn FnMut(&str)) -> Result<()> {
        let context = context_dir.to_string_lossy().to_string();
        let dockerfile = context_dir.join("Dockerfile").to_string_lossy().to_string();
        self.run_streaming(
            &args(&[
                "build",
                "--rm",
                "--no-cache",
                "--progress",
                "plain",
                "-t",
                tag,
                "-f",
                dockerfile.as_str(),
                context.as_str(),
            ]),
            on_line,
        )
    }

    fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.capture(&args(&["tag", source, target]), None).map(|_| ())
    }

    fn push(&self, reference: &str, on_line: &mut dyn FnMut(&str)) -> Result<()> {
        self.run_streaming(&args(&["push", reference]), on_line)
    }

    fn login(&self, username: &str, password: &str, registry: &str) -> Result<()> {
        let login_args = args(&["login", "--username", username, "--password-stdin", registry]);
        let rendered = render_command(&self.bin, &login_args);
        let mut child = self
            .command(&login_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.bin, e))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(password.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(&rendered, None, &stderr));
        }
        Ok(())
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn create_args(spec: &LaunchSpec) -> Vec<String> {
    let mut out = vec!["create".to_string()];
    for (k, v) in &spec.labels {
        out.push("--label".into());
        out.push(format!("{k}={v}"));
    }
    for (k, v) in &spec.env {
        out.push("-e".into());
        out.push(format!("{k}={v}"));
    }
    if spec.gpu {
        out.push("--gpus".into());
        out.push("all".into());
    }
    out.push(spec.image.clone());
    out
}

/// Render a command for logs and error messages with `-e` values masked.
fn render_command(bin: &str, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(bin.to_string());
    let mut mask_next = false;
    for a in args {
        if mask_next {
            let key = a.split('=').next().unwrap_or_default();
            parts.push(format!("{key}=***"));
            mask_next = false;
            continue;
        }
        mask_next = a == "-e";
        if a.chars().any(char::is_whitespace) {
            parts.push(format!("\"{}\"", a.replace('"', "\\\"")));
        } else {
            parts.push(a.clone());
        }
    }
    parts.join(" ")
}

fn spawn_error(bin: &str, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::RuntimeUnavailable(format!(
            "`{bin}` was not found; install Docker and make sure it is on PATH"
        ))
    } else {
        Error::Io(err)
    }
}

/// Map a failed docker invocation onto the core error kinds using its stderr.
fn classify_failure(command: &str, subject: Option<&str>, stderr: &str) -> Error {
    let lower = stderr.to_lowercase();

    if lower.contains("cannot connect to the docker daemon")
        || lower.contains("is the docker daemon running")
        || lower.contains("failed to connect to the docker api")
        || lower.contains("error during connect")
        || lower.contains("permission denied while trying to connect")
        || lower.contains("connect: permission denied")
    {
        return Error::RuntimeUnavailable(stderr.to_string());
    }

    if lower.contains("no such container") || lower.contains("no such object") {
        return Error::ContainerNotFound(subject.unwrap_or(stderr).to_string());
    }

    if lower.contains("could not select device driver")
        || lower.contains("nvidia-container-cli")
        || lower.contains("unknown or invalid runtime name: nvidia")
    {
        return Error::GpuUnavailable;
    }

    Error::Runtime {
        command: command.to_string(),
        message: stderr.to_string(),
    }
}

fn parse_state(status: &str) -> ContainerState {
    match status.trim() {
        "running" => ContainerState::Running,
        other => ContainerState::NotRunning(other.to_string()),
    }
}

fn parse_image_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains("<none>"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_args_carry_env_labels_and_gpu() {
        let spec = LaunchSpec {
            image: "someone/hello:v1".into(),
            env: vec![("DAWNET_TOKEN".into(), "secret".into())],
            labels: vec![("runes.name".into(), "Hello".into())],
            gpu: true,
        };
        let a = create_args(&spec);
        assert_eq!(
            a,
            vec![
                "create",
                "--label",
                "runes.name=Hello",
                "-e",
                "DAWNET_TOKEN=secret",
                "--gpus",
                "all",
                "someone/hello:v1"
            ]
        );
    }

    #[test]
    fn rendered_command_masks_env_values() {
        let spec = LaunchSpec {
            image: "img".into(),
            env: vec![("DAWNET_TOKEN".into(), "secret".into())],
            labels: vec![("runes.description".into(), "two words".into())],
            gpu: false,
        };
        let rendered = render_command("docker", &create_args(&spec));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("DAWNET_TOKEN=***"));
        assert!(rendered.contains("\"runes.description=two words\""));
    }

    #[test]
    fn classifies_daemon_unreachable() {
        let e = classify_failure(
            "docker ps",
            None,
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?",
        );
        assert!(matches!(e, Error::RuntimeUnavailable(_)));
    }

    #[test]
    fn classifies_missing_container() {
        let e = classify_failure(
            "docker stop abc",
            Some("abc"),
            "Error response from daemon: No such container: abc",
        );
        match e {
            Error::ContainerNotFound(id) => assert_eq!(id, "abc"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn classifies_gpu_driver_failure() {
        let e = classify_failure(
            "docker run",
            None,
            "docker: Error response from daemon: could not select device driver \"\" with capabilities: [[gpu]].",
        );
        assert!(matches!(e, Error::GpuUnavailable));
    }

    #[test]
    fn other_failures_keep_the_command() {
        let e = classify_failure("docker run nope", None, "pull access denied for nope");
        match e {
            Error::Runtime { command, message } => {
                assert_eq!(command, "docker run nope");
                assert!(message.contains("pull access denied"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_binary_is_runtime_unavailable() {
        let docker = DockerCli::new("definitely-not-a-real-docker-binary");
        assert!(matches!(docker.ping(), Err(Error::RuntimeUnavailable(_))));
    }

    #[test]
    fn parses_state_and_listing() {
        assert_eq!(parse_state("running\n"), ContainerState::Running);
        assert_eq!(
            parse_state("exited"),
            ContainerState::NotRunning("exited".into())
        );
        let images = parse_image_listing("a/b:v1\n<none>:<none>\n\nc:latest\n");
        assert_eq!(images, vec!["a/b:v1", "c:latest"]);
    }

    #[test]
    fn classifies_socket_permission_denied() {
        let e = classify_failure(
            "docker inspect abc",
            Some("abc"),
            "permission denied while trying to connect to the Docker daemon socket at unix:///var/run/docker.sock: Get \"http://%2Fvar%2Frun%2Fdocker.sock/v1.24/containers/abc/json\": dial unix /var/run/docker.sock: connect: permission denied",
        );
        assert!(matches!(e, Error::RuntimeUnavailable(_)));
    }

    #[test]
    fn nvidia_tooling_found_on_path_or_in_cdi() {
        let tools = tempfile::tempdir().unwrap();
        let cdi = tempfile::tempdir().unwrap();
        let path = std::env::join_paths([tools.path()]).unwrap();
        assert!(!nvidia_tooling_present(Some(path.as_os_str()), &[cdi.path().to_path_buf()]));
        assert!(!nvidia_tooling_present(None, &[]));

        std::fs::write(cdi.path().join("nvidia.yaml"), "cdiVersion: 0.5.0\n").unwrap();
        assert!(nvidia_tooling_present(None, &[cdi.path().to_path_buf()]));

        std::fs::write(tools.path().join("nvidia-container-cli"), "").unwrap();
        assert!(nvidia_tooling_present(Some(path.as_os_str()), &[]));
    }

    /// A `docker` stand-in: a shell script that appends its arguments to
    /// `calls.log` next to itself, then runs `body`.
    #[cfg(unix)]
    fn stub_docker(body: &str) -> (tempfile::TempDir, DockerCli) {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("docker");
        let calls = dir.path().join("calls.log");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$*\" >> '{}'\n{body}\n", calls.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let docker = DockerCli::new(script.to_string_lossy().to_string())
            .with_gpu_lookup(None, Vec::new());
        (dir, docker)
    }

    #[cfg(unix)]
    fn recorded_calls(dir: &tempfile::TempDir) -> Vec<String> {
        std::fs::read_to_string(dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn run_creates_starts_and_reads_pid() {
        let (dir, docker) = stub_docker(
            r#"case "$*" in
  create*) echo "WARNING: image platform does not match host"; echo 3f2a9c0d1e4b ;;
  start*) echo "$2" ;;
  *State.Pid*) echo 4242 ;;
  *) exit 1 ;;
esac"#,
        );
        let spec = LaunchSpec {
            image: "someone/hello:v1".into(),
            ..Default::default()
        };
        let launched = docker.run(&spec).unwrap();
        assert_eq!(
            launched,
            Launched {
                container_id: "3f2a9c0d1e4b".into(),
                pid: 4242
            }
        );
        assert_eq!(
            recorded_calls(&dir),
            vec![
                "create someone/hello:v1",
                "start 3f2a9c0d1e4b",
                "inspect --type container --format {{.State.Pid}} 3f2a9c0d1e4b",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn unparsable_pid_is_a_runtime_error() {
        let (_dir, docker) = stub_docker(
            r#"case "$*" in
  create*) echo abc123 ;;
  start*) echo abc123 ;;
  *State.Pid*) echo '<no value>' ;;
esac"#,
        );
        let spec = LaunchSpec {
            image: "img".into(),
            ..Default::default()
        };
        match docker.run(&spec) {
            Err(Error::Runtime { command, message }) => {
                assert!(command.ends_with("inspect abc123"));
                assert!(message.contains("<no value>"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn failed_gpu_start_removes_the_created_container() {
        let (dir, docker) = stub_docker(
            r#"case "$1" in
  create) echo c0ffee ;;
  start) echo 'docker: Error response from daemon: could not select device driver "" with capabilities: [[gpu]].' >&2; exit 125 ;;
  rm) echo c0ffee ;;
esac"#,
        );
        let spec = LaunchSpec {
            image: "img".into(),
            gpu: true,
            ..Default::default()
        };
        assert!(matches!(docker.run(&spec), Err(Error::GpuUnavailable)));
        let calls = recorded_calls(&dir);
        assert_eq!(calls.last().map(String::as_str), Some("rm --force c0ffee"));
        assert!(!calls.iter().any(|c| c.starts_with("inspect")));
    }

    #[cfg(unix)]
    #[test]
    fn stop_of_missing_container_is_not_found() {
        let (_dir, docker) = stub_docker(
            r#"case "$1" in
  stop) echo "Error response from daemon: No such container: $2" >&2; exit 1 ;;
esac"#,
        );
        match docker.stop("gone") {
            Err(Error::ContainerNotFound(id)) => assert_eq!(id, "gone"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn inspect_only_matches_containers() {
        let (dir, docker) = stub_docker(
            r#"case "$*" in
  *"--type container"*State.Status*) echo exited ;;
  *) echo "Error: No such object: $*" >&2; exit 1 ;;
esac"#,
        );
        assert_eq!(
            docker.inspect("abc").unwrap(),
            ContainerState::NotRunning("exited".into())
        );
        assert_eq!(
            recorded_calls(&dir),
            vec!["inspect --type container --format {{.State.Status}} abc"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn logs_forward_both_output_streams() {
        let (_dir, docker) = stub_docker(
            r#"case "$1" in
  inspect) echo running ;;
  logs) echo "epoch 1 done"; echo "warning: slow disk" >&2 ;;
esac"#,
        );
        let mut out = Vec::<u8>::new();
        docker.stream_logs("abc", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("epoch 1 done\n"));
        assert!(text.contains("warning: slow disk\n"));
    }

    #[cfg(unix)]
    #[test]
    fn hook_only_gpu_host_can_start_gpu_workloads() {
        let (_dir, docker) = stub_docker(
            r#"case "$*" in
  info*) echo '{"io.containerd.runc.v2":{},"runc":{}}' ;;
  create*) echo 9a8b7c ;;
  start*) echo 9a8b7c ;;
  *State.Pid*) echo 77 ;;
esac"#,
        );
        let tools = tempfile::tempdir().unwrap();
        std::fs::write(tools.path().join("nvidia-container-runtime-hook"), "").unwrap();
        let path = std::env::join_paths([tools.path()]).unwrap();
        let docker = docker.with_gpu_lookup(Some(path), Vec::new());

        let store = crate::storage::StateStore::open_in_memory().unwrap();
        let lifecycle = crate::lifecycle::LifecycleController::new(&store, &docker, "DAWNET_TOKEN");
        let row = lifecycle
            .start(&crate::model::LaunchRequest {
                image: "someone/trainer:v1".into(),
                remote_name: "Trainer".into(),
                gpu: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(row.container_id, "9a8b7c");
        assert_eq!(row.pid, 77);
    }
}
