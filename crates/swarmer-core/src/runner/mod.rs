//! Run orchestration for the external locust process.
//!
//! Two run shapes exist. A **UI run** pipes the child's output, scans every
//! line for the web-UI URL and opens it in the browser exactly once (with a
//! timed fallback URL when locust never announces one). A **headless run**
//! inherits the terminal so the user sees locust's own output raw; nothing
//! is parsed.
//!
//! At most one run of each shape is tracked at a time. Stopping is
//! best-effort process termination — there is no cooperative cancellation,
//! and a line read just before the kill may still be processed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::{LocustConfig, VENV_DIR_CANDIDATES};
use crate::state::RunStateStore;
use crate::weburl::extract_web_url;

mod opener;
mod stream;

pub use opener::{BrowserOpener, WebUiOpener};
pub use stream::LineBuffer;

/// How often a stopped process is re-checked while waiting for it to die.
#[cfg(unix)]
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long an interrupted process gets before it is killed outright.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Errors that can occur while orchestrating a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(
        "Failed to launch '{program}': {source}. \
         Check the configured locust path and that your virtual environment is set up"
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a runnable locustfile path: {0}")]
    InvalidTarget(PathBuf),

    #[error("IO error while supervising the run: {0}")]
    Io(#[from] std::io::Error),
}

/// Run shape, recorded alongside the tracked pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Ui,
    Headless,
}

/// The one in-flight run this orchestrator tracks.
///
/// UI and headless runs are killed differently (a UI child is terminated
/// outright, a headless child is interrupted first so locust can print its
/// summary), so stop logic branches on this discriminant.
#[derive(Debug, Clone, Copy)]
pub enum ActiveRun {
    Ui { pid: u32 },
    Headless { pid: u32 },
}

/// What a finished run looked like.
#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    /// Child exit code, when the child exited normally.
    pub exit_code: Option<i32>,
    /// Whether a web-UI URL was opened (including the fallback).
    pub url_opened: bool,
    /// Whether the fallback URL had to be used.
    pub timed_out: bool,
}

/// Spawns locust and supervises a single run at a time.
pub struct RunOrchestrator<O: WebUiOpener + 'static> {
    config: LocustConfig,
    state: RunStateStore,
    opener: Arc<O>,
    active: Option<ActiveRun>,
}

impl<O: WebUiOpener + 'static> RunOrchestrator<O> {
    pub fn new(config: LocustConfig, state: RunStateStore, opener: O) -> Self {
        Self {
            config,
            state,
            opener: Arc::new(opener),
            active: None,
        }
    }

    /// The currently tracked run, if any.
    pub fn active(&self) -> Option<ActiveRun> {
        self.active
    }

    /// Run locust with its web UI, opening the UI URL in the browser.
    ///
    /// Streams the child's stdout/stderr to the terminal while scanning each
    /// line for the web-UI URL. The first hit is opened exactly once; if
    /// nothing shows up within the configured timeout the fallback URL is
    /// opened instead. Returns when the child exits (or Ctrl-C stops it).
    ///
    /// `force_dashboard` rewrites the opened URL to land on the pre-run form
    /// rather than the live dashboard; a plain local run leaves it off.
    pub async fn run_ui(
        &mut self,
        target: &Path,
        force_dashboard: bool,
    ) -> Result<RunOutcome, RunError> {
        let (file_name, workdir) = split_target(target)?;

        let mut cmd = Command::new(&self.config.path);
        cmd.arg("-f")
            .arg(file_name)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        apply_venv_path(&mut cmd, workdir);

        let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
            program: self.config.path.clone(),
            source,
        })?;
        let pid = child.id().unwrap_or_default();
        self.active = Some(ActiveRun::Ui { pid });
        self.record_run(pid, RunMode::Ui);
        info!(pid, file = %target.display(), "locust started");

        let opened = Arc::new(AtomicBool::new(false));
        let timed_out = Arc::new(AtomicBool::new(false));

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(scan_stream(
                stdout,
                StreamKind::Stdout,
                opened.clone(),
                self.opener.clone(),
                force_dashboard,
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(scan_stream(
                stderr,
                StreamKind::Stderr,
                opened.clone(),
                self.opener.clone(),
                force_dashboard,
            )));
        }

        let fallback = {
            let opened = opened.clone();
            let timed_out = timed_out.clone();
            let opener = self.opener.clone();
            let url = self.config.fallback_web_url.clone();
            let timeout = Duration::from_secs(self.config.web_url_timeout_secs);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if !opened.swap(true, Ordering::SeqCst) {
                    timed_out.store(true, Ordering::SeqCst);
                    info!(%url, "no web-UI URL seen in time; opening fallback");
                    if let Err(err) = opener.open(&url) {
                        warn!(%err, "failed to open fallback URL");
                    }
                }
            })
        };

        let status = tokio::select! {
            status = child.wait() => Some(status?),
            _ = tokio::signal::ctrl_c() => None,
        };
        let status = match status {
            Some(status) => Some(status),
            None => {
                info!("interrupt received; stopping locust");
                stop_child(&mut child).await
            }
        };

        fallback.abort();
        for reader in readers {
            let _ = reader.await;
        }

        self.active = None;
        self.clear_run();

        let exit_code = status.and_then(|s| s.code());
        if let Some(code) = exit_code.filter(|&c| c != 0) {
            warn!(code, "locust exited with a non-zero status");
        }

        Ok(RunOutcome {
            exit_code,
            url_opened: opened.load(Ordering::SeqCst),
            timed_out: timed_out.load(Ordering::SeqCst),
        })
    }

    /// Run locust headless, inheriting the terminal.
    pub async fn run_headless(
        &mut self,
        target: &Path,
        extra_args: &[String],
    ) -> Result<RunOutcome, RunError> {
        let (file_name, workdir) = split_target(target)?;

        let mut cmd = Command::new(&self.config.path);
        cmd.arg("-f")
            .arg(file_name)
            .arg("--headless")
            .args(extra_args)
            .current_dir(workdir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        apply_venv_path(&mut cmd, workdir);

        let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
            program: self.config.path.clone(),
            source,
        })?;
        let pid = child.id().unwrap_or_default();
        self.active = Some(ActiveRun::Headless { pid });
        self.record_run(pid, RunMode::Headless);
        info!(pid, file = %target.display(), "locust started (headless)");

        let status = tokio::select! {
            status = child.wait() => Some(status?),
            _ = tokio::signal::ctrl_c() => None,
        };
        let status = match status {
            Some(status) => Some(status),
            None => {
                // The terminal already delivered SIGINT to the child; give
                // it a grace period to print its summary, then make sure.
                match tokio::time::timeout(STOP_GRACE, child.wait()).await {
                    Ok(status) => Some(status?),
                    Err(_) => stop_child(&mut child).await,
                }
            }
        };

        self.active = None;
        self.clear_run();

        let exit_code = status.and_then(|s| s.code());
        if let Some(code) = exit_code.filter(|&c| c != 0) {
            warn!(code, "locust exited with a non-zero status");
        }

        Ok(RunOutcome {
            exit_code,
            url_opened: false,
            timed_out: false,
        })
    }

    /// Run a single named task headless via locust's tag filter.
    pub async fn run_task(&mut self, target: &Path, task: &str) -> Result<RunOutcome, RunError> {
        self.run_headless(target, &["--tags".to_string(), task.to_string()])
            .await
    }

    /// Stop the tracked run, if any. Returns whether something was stopped.
    ///
    /// The flag store is reset on every path, so toggles stay consistent
    /// even when the process is already gone.
    pub async fn stop(&mut self) -> bool {
        let stopped = match self.active.take() {
            Some(ActiveRun::Ui { pid }) => terminate_pid(pid).await,
            Some(ActiveRun::Headless { pid }) => interrupt_pid(pid).await,
            None => false,
        };
        self.clear_run();
        stopped
    }

    fn record_run(&self, pid: u32, mode: RunMode) {
        // Flag persistence is best-effort; a failed write never blocks a run.
        if let Err(err) = self.state.record_run(pid, mode) {
            warn!(%err, "failed to persist run state");
        }
    }

    fn clear_run(&self) {
        if let Err(err) = self.state.clear_run() {
            warn!(%err, "failed to reset run state");
        }
    }
}

/// Stop the run recorded by a previous invocation.
///
/// UI runs are terminated, headless runs interrupted first, like
/// [`RunOrchestrator::stop`]. Resets the flag store whether or not a process
/// was found, so toggles recover even after an unexpected termination.
pub async fn stop_detached(state: &RunStateStore) -> bool {
    let recorded = state.load();
    let stopped = match (recorded.last_pid, recorded.last_mode) {
        (Some(pid), Some(RunMode::Ui)) => terminate_pid(pid).await,
        (Some(pid), _) => interrupt_pid(pid).await,
        (None, _) => false,
    };
    if let Err(err) = state.clear_run() {
        warn!(%err, "failed to reset run state");
    }
    stopped
}

/// Which output stream a line came from; echoed to the matching local one.
#[derive(Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

/// Consume one child stream, echoing lines and scanning each for the URL.
async fn scan_stream<R, O>(
    mut stream: R,
    kind: StreamKind,
    opened: Arc<AtomicBool>,
    opener: Arc<O>,
    force_dashboard: bool,
) where
    R: tokio::io::AsyncRead + Unpin,
    O: WebUiOpener + ?Sized,
{
    let mut buf = [0u8; 4096];
    let mut lines = LineBuffer::default();
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                debug!(%err, "child stream closed");
                break;
            }
        };
        let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
        for line in lines.push(&chunk) {
            handle_line(&line, kind, &opened, opener.as_ref(), force_dashboard);
        }
    }
    if let Some(rest) = lines.finish() {
        handle_line(&rest, kind, &opened, opener.as_ref(), force_dashboard);
    }
}

fn handle_line<O: WebUiOpener + ?Sized>(
    line: &str,
    kind: StreamKind,
    opened: &AtomicBool,
    opener: &O,
    force_dashboard: bool,
) {
    match kind {
        StreamKind::Stdout => println!("{line}"),
        StreamKind::Stderr => eprintln!("{line}"),
    }

    if let Some(url) = extract_web_url(line, force_dashboard) {
        // Latched: a later duplicate announcement never re-opens the UI.
        if !opened.swap(true, Ordering::SeqCst) {
            info!(%url, "opening web UI");
            if let Err(err) = opener.open(&url) {
                warn!(%err, "failed to open web UI");
            }
        }
    }
}

/// Split a target path into the `-f` file argument and the run directory.
fn split_target(target: &Path) -> Result<(&std::ffi::OsStr, &Path), RunError> {
    let file_name = target
        .file_name()
        .ok_or_else(|| RunError::InvalidTarget(target.to_path_buf()))?;
    let workdir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((file_name, workdir))
}

/// Prefer a local virtual environment's binaries when one is present.
fn apply_venv_path(cmd: &mut Command, workdir: &Path) {
    let bin_subdir = if cfg!(windows) { "Scripts" } else { "bin" };
    let venv_bin = VENV_DIR_CANDIDATES
        .iter()
        .map(|dir| workdir.join(dir).join(bin_subdir))
        .find(|dir| dir.is_dir());

    let Some(venv_bin) = venv_bin else { return };
    let current = std::env::var_os("PATH").unwrap_or_default();
    let joined = std::env::join_paths(
        std::iter::once(venv_bin.clone()).chain(std::env::split_paths(&current)),
    );
    match joined {
        Ok(path) => {
            debug!(venv = %venv_bin.display(), "prepending virtual environment to PATH");
            cmd.env("PATH", path);
        }
        Err(err) => warn!(%err, "could not splice virtual environment into PATH"),
    }
}

/// Terminate a tracked child outright (UI runs have no summary to save).
async fn terminate_pid(pid: u32) -> bool {
    #[cfg(unix)]
    {
        if !signal_pid(pid, libc::SIGTERM) {
            return false;
        }
        if wait_gone(pid, STOP_GRACE).await {
            return true;
        }
        signal_pid(pid, libc::SIGKILL)
    }
    #[cfg(not(unix))]
    {
        warn!(pid, "stopping by pid is not supported on this platform");
        false
    }
}

/// Interrupt first so locust can print its summary; kill as a last resort.
async fn interrupt_pid(pid: u32) -> bool {
    #[cfg(unix)]
    {
        if !signal_pid(pid, libc::SIGINT) {
            return false;
        }
        if wait_gone(pid, STOP_GRACE).await {
            return true;
        }
        warn!(pid, "process ignored the interrupt; killing it");
        signal_pid(pid, libc::SIGKILL)
    }
    #[cfg(not(unix))]
    {
        warn!(pid, "stopping by pid is not supported on this platform");
        false
    }
}

/// Stop an owned child handle: try a graceful kill, then reap it.
async fn stop_child(child: &mut Child) -> Option<std::process::ExitStatus> {
    if let Err(err) = child.start_kill() {
        debug!(%err, "child already gone");
    }
    match child.wait().await {
        Ok(status) => Some(status),
        Err(err) => {
            warn!(%err, "failed to reap stopped child");
            None
        }
    }
}

#[cfg(unix)]
fn signal_pid(pid: u32, signal: i32) -> bool {
    if pid == 0 {
        return false;
    }
    unsafe { libc::kill(pid as libc::pid_t, signal) == 0 }
}

#[cfg(unix)]
async fn wait_gone(pid: u32, grace: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        if unsafe { libc::kill(pid as libc::pid_t, 0) } != 0 {
            return true;
        }
        tokio::time::sleep(STOP_POLL_INTERVAL).await;
    }
    false
}
