// src/runner/mod.rs — Bounded trial execution
//
// Runs one command with a wall-clock deadline. The child leads its own
// process group so a timeout takes down every descendant, stdout and stderr
// drain on separate tasks so neither pipe can fill up and stall the child,
// and the optional memory ceiling is applied inside the child before exec.

pub mod registry;

use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::core::types::ProbeResult;
use crate::infra::errors::{DiscoveryError, Result};
use registry::{kill_process_group, ProcessRegistry};

/// How long output readers may lag behind the exit of the direct child
/// before the rest of its group is killed.
const READER_GRACE: Duration = Duration::from_millis(500);

/// Spawn attempts when the executable is still open for writing (ETXTBSY).
const SPAWN_ATTEMPTS: u32 = 5;

/// A program and its argument vector. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TrialCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `<compiler> <flag words...> <test program>`.
    ///
    /// Flags such as `--param name=value` carry a space and become two
    /// arguments, as a shell would split them.
    pub fn compile(compiler: &str, flag: &str, test_program: &Path) -> Self {
        let mut cmd = Self::new(compiler);
        cmd.args.extend(flag.split_whitespace().map(str::to_string));
        cmd.args.push(test_program.to_string_lossy().into_owned());
        cmd
    }
}

impl fmt::Display for TrialCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Anything that can carry out a bounded trial. The process runner is the
/// production implementation; probes only see this trait.
#[async_trait]
pub trait TrialExecutor: Send + Sync {
    async fn execute(&self, cmd: &TrialCommand, deadline: Duration) -> Result<ProbeResult>;
}

/// Runs trial commands as isolated, killable process groups.
#[derive(Debug, Clone)]
pub struct BoundedProcessRunner {
    registry: ProcessRegistry,
    memory_limit: Option<u64>,
}

impl BoundedProcessRunner {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self {
            registry,
            memory_limit: None,
        }
    }

    /// Address-space ceiling in bytes for every child.
    pub fn with_memory_limit(mut self, bytes: Option<u64>) -> Self {
        self.memory_limit = bytes;
        self
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub async fn run(&self, cmd: &TrialCommand, deadline: Duration) -> Result<ProbeResult> {
        tracing::debug!("Running command: {}", cmd);

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            let memory_limit = self.memory_limit;
            command.process_group(0);
            // SAFETY: the hook only calls getrlimit/setrlimit, which are
            // async-signal-safe, and allocates nothing.
            unsafe {
                command.pre_exec(move || {
                    apply_child_limits(memory_limit);
                    Ok(())
                });
            }
        }

        let started = Instant::now();
        let mut child = spawn_with_retry(&mut command, &cmd.program).await?;
        let pid = child.id().unwrap_or(0);
        let _registration = self.registry.track(pid);
        let mut group = GroupGuard::armed(pid);

        let stdout_task = spawn_reader(child.stdout.take());
        let stderr_task = spawn_reader(child.stderr.take());

        let (status, timed_out) = match tokio::time::timeout(deadline, wait_retrying(&mut child))
            .await
        {
            Ok(status) => (status?, false),
            Err(_) => {
                tracing::debug!("Deadline of {:?} exceeded by pid {}", deadline, pid);
                group.kill();
                (wait_retrying(&mut child).await?, true)
            }
        };
        group.disarm();

        let (stdout, stderr) = drain_readers(stdout_task, stderr_task, pid).await;

        let elapsed = if timed_out {
            Duration::MAX
        } else {
            started.elapsed()
        };

        Ok(ProbeResult {
            exit_code: status.code(),
            signal: exit_signal(&status),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            elapsed,
            timed_out,
        })
    }
}

#[async_trait]
impl TrialExecutor for BoundedProcessRunner {
    async fn execute(&self, cmd: &TrialCommand, deadline: Duration) -> Result<ProbeResult> {
        self.run(cmd, deadline).await
    }
}

/// Kills the child's process group if dropped while armed, so an error
/// between spawn and reaping never leaves a runaway compiler behind.
struct GroupGuard {
    pid: u32,
    armed: bool,
}

impl GroupGuard {
    fn armed(pid: u32) -> Self {
        Self { pid, armed: true }
    }

    fn kill(&mut self) {
        kill_process_group(self.pid);
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if self.armed {
            kill_process_group(self.pid);
        }
    }
}

async fn spawn_with_retry(command: &mut Command, program: &str) -> Result<Child> {
    let mut attempt = 1;
    loop {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(e) if is_text_busy(&e) && attempt < SPAWN_ATTEMPTS => {
                tracing::debug!("'{}' busy, retrying spawn (attempt {})", program, attempt);
                tokio::time::sleep(Duration::from_millis(20 * u64::from(attempt))).await;
                attempt += 1;
            }
            Err(e) => return Err(DiscoveryError::launch(program, e)),
        }
    }
}

#[cfg(unix)]
fn is_text_busy(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(libc::ETXTBSY)
}

#[cfg(not(unix))]
fn is_text_busy(_err: &std::io::Error) -> bool {
    false
}

/// Wait for the child, retrying when the wait is interrupted by a signal.
async fn wait_retrying(child: &mut Child) -> std::io::Result<ExitStatus> {
    loop {
        match child.wait().await {
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

fn spawn_reader<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            if let Err(e) = stream.read_to_end(&mut buf).await {
                tracing::debug!("Error reading child output: {}", e);
            }
        }
        buf
    })
}

/// Collect both streams. A descendant that outlives the direct child keeps
/// the pipes open, so after a grace period the group is killed; if even that
/// does not close them (the descendant left the group) the readers are
/// abandoned.
async fn drain_readers(
    mut stdout: JoinHandle<Vec<u8>>,
    mut stderr: JoinHandle<Vec<u8>>,
    pid: u32,
) -> (Vec<u8>, Vec<u8>) {
    let mut out = None;
    let mut err = None;

    for round in 0..2 {
        let drained = tokio::time::timeout(READER_GRACE, async {
            if out.is_none() {
                out = Some((&mut stdout).await.unwrap_or_default());
            }
            if err.is_none() {
                err = Some((&mut stderr).await.unwrap_or_default());
            }
        })
        .await;
        if drained.is_ok() {
            break;
        }
        if round == 0 {
            tracing::debug!("Output of pid {} still open after exit, killing group", pid);
            kill_process_group(pid);
        }
    }

    if out.is_none() || err.is_none() {
        tracing::warn!("Abandoning output readers of pid {}", pid);
        stdout.abort();
        stderr.abort();
    }
    (out.unwrap_or_default(), err.unwrap_or_default())
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt as _;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Runs in the forked child before exec. Core dumps are disabled and the
/// address space is capped; any failure (e.g. no permission) is ignored
/// and the trial runs without that limit.
#[cfg(unix)]
fn apply_child_limits(memory_limit: Option<u64>) {
    // SAFETY: plain syscalls on stack-allocated structs.
    unsafe {
        let core = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        let _ = libc::setrlimit(libc::RLIMIT_CORE, &core);

        if let Some(bytes) = memory_limit {
            let mut current = libc::rlimit {
                rlim_cur: 0,
                rlim_max: 0,
            };
            if libc::getrlimit(libc::RLIMIT_AS, &mut current) == 0 {
                let cap = bytes as libc::rlim_t;
                let limited = libc::rlimit {
                    rlim_cur: current.rlim_cur.min(cap),
                    rlim_max: current.rlim_max.min(cap),
                };
                let _ = libc::setrlimit(libc::RLIMIT_AS, &limited);
            }
        }
    }
}
