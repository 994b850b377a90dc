//! Worker process supervision
//!
//! `ServiceSupervisor` owns the single worker child process. The child handle
//! and the running flag are only changed while holding the slot lock, so a
//! concurrent `start()`, `stop()` and unexpected worker exit always leave the
//! flag consistent with whether a child is alive. An atomic mirror of the
//! flag lets `status()` answer without waiting on that lock.
//!
//! Each started worker gets one drain task that merges stdout and stderr
//! into the shared [`LogBuffer`]. When both streams close, the drain task
//! keeps polling the child until it actually exits and records the exit
//! code, unless `stop()` got there first. A worker that closes its stdio
//! therefore stays running.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::core::LogBuffer;
use crate::error::{WardenError, WardenResult};
use shared::{Component, component_debug, component_error, component_info, component_warn};

/// How often a worker with closed output is checked for exit
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the worker is launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            env: Vec::new(),
        }
    }

    /// Add an environment variable for the worker (fluent API)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn display_program(&self) -> String {
        self.program.display().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: Option<u32> },
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { exit_code: Option<i32> },
    NotRunning,
}

#[derive(Default)]
struct WorkerSlot {
    child: Option<Child>,
    /// Incremented on every successful spawn so a drain task can tell
    /// whether the slot still belongs to its worker
    generation: u64,
    drains: Vec<JoinHandle<()>>,
}

pub struct ServiceSupervisor {
    command: WorkerCommand,
    stop_grace: Duration,
    slot: Mutex<WorkerSlot>,
    running: AtomicBool,
    logs: Arc<LogBuffer>,
}

impl ServiceSupervisor {
    pub fn new(command: WorkerCommand, stop_grace: Duration, logs: Arc<LogBuffer>) -> Self {
        Self {
            command,
            stop_grace,
            slot: Mutex::new(WorkerSlot::default()),
            running: AtomicBool::new(false),
            logs,
        }
    }

    /// Spawn the worker unless one is already running
    pub async fn start(self: &Arc<Self>) -> WardenResult<StartOutcome> {
        let mut slot = self.slot.lock().await;
        if self.running.load(Ordering::SeqCst) {
            return Ok(StartOutcome::AlreadyRunning);
        }

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .envs(self.command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| WardenError::Spawn {
            program: self.command.display_program(),
            source,
        })?;

        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        slot.generation += 1;
        let generation = slot.generation;
        slot.child = Some(child);
        self.running.store(true, Ordering::SeqCst);
        self.logs.push_event("Main app started.");

        slot.drains.retain(|handle| !handle.is_finished());
        let drain = tokio::spawn(Arc::clone(self).drain_output(generation, stdout, stderr));
        slot.drains.push(drain);

        component_info!(
            Component::Supervisor,
            "▶️  Worker started (PID: {})",
            pid.map(|p| p.to_string()).unwrap_or_else(|| "unknown".to_string())
        );
        Ok(StartOutcome::Started { pid })
    }

    /// Terminate the worker, waiting up to the grace period before killing it
    ///
    /// # Errors
    /// `ProcessTimeout` when the worker ignored the termination request and
    /// had to be killed. The worker is gone and the flag is cleared either way.
    pub async fn stop(&self) -> WardenResult<StopOutcome> {
        let mut slot = self.slot.lock().await;
        if !self.running.load(Ordering::SeqCst) {
            return Ok(StopOutcome::NotRunning);
        }
        let Some(mut child) = slot.child.take() else {
            self.running.store(false, Ordering::SeqCst);
            return Ok(StopOutcome::NotRunning);
        };

        request_termination(&mut child);

        let result = match tokio::time::timeout(self.stop_grace, child.wait()).await {
            Ok(Ok(status)) => Ok(StopOutcome::Stopped {
                exit_code: status.code(),
            }),
            Ok(Err(e)) => {
                component_warn!(Component::Supervisor, "Waiting for worker exit failed: {}", e);
                if let Err(e) = child.kill().await {
                    component_error!(Component::Supervisor, "Failed to kill worker: {}", e);
                }
                Ok(StopOutcome::Stopped { exit_code: None })
            }
            Err(_) => {
                component_warn!(
                    Component::Supervisor,
                    "Worker ignored termination for {:?}, killing it",
                    self.stop_grace
                );
                if let Err(e) = child.kill().await {
                    component_error!(Component::Supervisor, "Failed to kill worker: {}", e);
                }
                Err(WardenError::ProcessTimeout { grace: self.stop_grace })
            }
        };

        self.running.store(false, Ordering::SeqCst);
        self.logs.push_event("Main app stopped.");
        component_info!(Component::Supervisor, "⏹️  Worker stopped");
        result
    }

    /// Whether a worker is running. Never waits on the slot lock.
    pub fn status(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn logs(&self) -> &Arc<LogBuffer> {
        &self.logs
    }

    /// Stop the worker and wait for every drain task to finish
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(StopOutcome::Stopped { .. }) | Ok(StopOutcome::NotRunning) => {}
            Err(e) => component_warn!(Component::Supervisor, "Worker shutdown: {}", e),
        }

        let drains = std::mem::take(&mut self.slot.lock().await.drains);
        for mut drain in drains {
            // A grandchild holding the pipes open must not block shutdown forever
            if tokio::time::timeout(self.stop_grace, &mut drain).await.is_err() {
                component_warn!(Component::Supervisor, "Log drain did not finish, aborting it");
                drain.abort();
            }
        }
    }

    async fn drain_output<O, E>(self: Arc<Self>, generation: u64, stdout: Option<O>, stderr: Option<E>)
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let out = forward_lines(stdout, tx.clone());
        let err = forward_lines(stderr, tx);
        let logs = Arc::clone(&self.logs);
        let consume = async move {
            while let Some(line) = rx.recv().await {
                component_debug!(Component::Supervisor, "worker: {}", line);
                logs.push_output(line);
            }
        };
        tokio::join!(out, err, consume);

        self.reap(generation).await;
    }

    /// Wait for the worker to exit on its own and record it
    ///
    /// Closed output does not mean the worker is gone, so the child stays in
    /// the slot (and the flag stays set) until `try_wait` reports an exit.
    /// The lock is only held for each poll, leaving `stop()` free to take the
    /// child in between.
    async fn reap(&self, generation: u64) {
        let exit_code = loop {
            {
                let mut slot = self.slot.lock().await;
                if slot.generation != generation {
                    return;
                }
                let Some(child) = slot.child.as_mut() else {
                    // stop() already took this worker
                    return;
                };
                let exited = match child.try_wait() {
                    Ok(Some(status)) => Some(status.code()),
                    Ok(None) => None,
                    Err(e) => {
                        component_warn!(Component::Supervisor, "Polling worker exit failed: {}", e);
                        Some(None)
                    }
                };
                if let Some(code) = exited {
                    slot.child = None;
                    self.running.store(false, Ordering::SeqCst);
                    break code;
                }
            }
            tokio::time::sleep(REAP_POLL_INTERVAL).await;
        };

        let code = exit_code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string());
        self.logs.push_event(format!("Process ended with exit code: {code}"));
        component_warn!(Component::Supervisor, "Worker exited on its own (code {})", code);
    }
}

async fn forward_lines<R>(reader: Option<R>, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                component_debug!(Component::Supervisor, "Worker output read failed: {}", e);
                break;
            }
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                component_warn!(Component::Supervisor, "SIGTERM failed: {}", e);
            }
        }
        None => component_debug!(Component::Supervisor, "Worker already reaped"),
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        component_warn!(Component::Supervisor, "Terminate request failed: {}", e);
    }
}
