#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use swarmer_core::config::LocustConfig;
use swarmer_core::runner::{self, RunError, RunMode, RunOrchestrator, WebUiOpener};
use swarmer_core::state::RunStateStore;
use tempfile::TempDir;

/// Records opened URLs instead of launching a browser.
#[derive(Clone, Default)]
struct RecordingOpener {
    urls: Arc<Mutex<Vec<String>>>,
}

impl RecordingOpener {
    fn opened(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl WebUiOpener for RecordingOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Drop a fake locust executable into `dir` and return its path.
fn fake_locust(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("locust");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config_with(path: &Path, timeout_secs: u64) -> LocustConfig {
    LocustConfig {
        path: path.to_string_lossy().into_owned(),
        fallback_web_url: "http://localhost:8089".to_string(),
        web_url_timeout_secs: timeout_secs,
    }
}

#[tokio::test]
async fn test_ui_run_opens_url_exactly_once() {
    let dir = TempDir::new().unwrap();
    let locust = fake_locust(
        dir.path(),
        // The announcement repeats; the latch must keep the second copy from
        // opening a second view.
        "echo 'Starting web interface at http://127.0.0.1:8089'\n\
         echo 'Starting web interface at http://127.0.0.1:8089'",
    );
    let target = dir.path().join("locustfile.py");
    fs::write(&target, "import locust\n").unwrap();

    let opener = RecordingOpener::default();
    let mut orchestrator = RunOrchestrator::new(
        config_with(&locust, 60),
        RunStateStore::new(dir.path()),
        opener.clone(),
    );

    let outcome = orchestrator.run_ui(&target, false).await.unwrap();
    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.url_opened);
    assert!(!outcome.timed_out);
    assert_eq!(opener.opened(), vec!["http://127.0.0.1:8089".to_string()]);
}

#[tokio::test]
async fn test_ui_run_falls_back_when_no_url_appears() {
    let dir = TempDir::new().unwrap();
    let locust = fake_locust(dir.path(), "echo 'no interface today'\nsleep 1");
    let target = dir.path().join("locustfile.py");
    fs::write(&target, "import locust\n").unwrap();

    let opener = RecordingOpener::default();
    let mut orchestrator = RunOrchestrator::new(
        config_with(&locust, 0),
        RunStateStore::new(dir.path()),
        opener.clone(),
    );

    let outcome = orchestrator.run_ui(&target, false).await.unwrap();
    assert!(outcome.url_opened);
    assert!(outcome.timed_out);
    assert_eq!(opener.opened(), vec!["http://localhost:8089".to_string()]);
}

#[tokio::test]
async fn test_url_found_on_stderr_too() {
    let dir = TempDir::new().unwrap();
    let locust = fake_locust(
        dir.path(),
        "echo 'Starting web interface at http://0.0.0.0:8089' >&2",
    );
    let target = dir.path().join("locustfile.py");
    fs::write(&target, "import locust\n").unwrap();

    let opener = RecordingOpener::default();
    let mut orchestrator = RunOrchestrator::new(
        config_with(&locust, 60),
        RunStateStore::new(dir.path()),
        opener.clone(),
    );

    let outcome = orchestrator.run_ui(&target, false).await.unwrap();
    assert!(outcome.url_opened);
    assert_eq!(opener.opened(), vec!["http://0.0.0.0:8089".to_string()]);
}

#[tokio::test]
async fn test_run_clears_state_flag_after_exit() {
    let dir = TempDir::new().unwrap();
    let locust = fake_locust(
        dir.path(),
        "echo 'Starting web interface at http://127.0.0.1:8089'",
    );
    let target = dir.path().join("locustfile.py");
    fs::write(&target, "import locust\n").unwrap();

    let state = RunStateStore::new(dir.path());
    let mut orchestrator = RunOrchestrator::new(
        config_with(&locust, 60),
        state.clone(),
        RecordingOpener::default(),
    );

    orchestrator.run_ui(&target, false).await.unwrap();
    let recorded = state.load();
    assert!(!recorded.local_run_active);
    assert!(recorded.last_pid.is_none());
}

#[tokio::test]
async fn test_nonzero_exit_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let locust = fake_locust(
        dir.path(),
        "echo 'Starting web interface at http://127.0.0.1:8089'\nexit 3",
    );
    let target = dir.path().join("locustfile.py");
    fs::write(&target, "import locust\n").unwrap();

    let opener = RecordingOpener::default();
    let mut orchestrator = RunOrchestrator::new(
        config_with(&locust, 60),
        RunStateStore::new(dir.path()),
        opener.clone(),
    );

    let outcome = orchestrator.run_ui(&target, false).await.unwrap();
    assert_eq!(outcome.exit_code, Some(3));
    assert!(outcome.url_opened);
}

#[tokio::test]
async fn test_missing_executable_is_a_spawn_error() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("locustfile.py");
    fs::write(&target, "import locust\n").unwrap();

    let mut orchestrator = RunOrchestrator::new(
        config_with(Path::new("/nonexistent/locust-binary"), 60),
        RunStateStore::new(dir.path()),
        RecordingOpener::default(),
    );

    let err = orchestrator.run_ui(&target, false).await.unwrap_err();
    assert!(matches!(err, RunError::Spawn { .. }));
    assert!(err.to_string().contains("virtual environment"));
}

#[tokio::test]
async fn test_stop_detached_interrupts_recorded_pid() {
    let dir = TempDir::new().unwrap();
    let state = RunStateStore::new(dir.path());

    let mut child = tokio::process::Command::new("sleep")
        .arg("5")
        .spawn()
        .unwrap();
    let pid = child.id().unwrap();
    state.record_run(pid, RunMode::Headless).unwrap();

    let (stopped, status) = tokio::join!(runner::stop_detached(&state), child.wait());
    assert!(stopped);
    assert!(!status.unwrap().success());

    let recorded = state.load();
    assert!(!recorded.local_run_active);
    assert!(recorded.last_pid.is_none());
}

#[tokio::test]
async fn test_stop_detached_terminates_ui_run() {
    let dir = TempDir::new().unwrap();
    let state = RunStateStore::new(dir.path());

    let mut child = tokio::process::Command::new("sleep")
        .arg("5")
        .spawn()
        .unwrap();
    let pid = child.id().unwrap();
    state.record_run(pid, RunMode::Ui).unwrap();

    let (stopped, status) = tokio::join!(runner::stop_detached(&state), child.wait());
    assert!(stopped);
    assert!(!status.unwrap().success());
}

#[tokio::test]
async fn test_stop_without_active_run_still_resets_flag() {
    let dir = TempDir::new().unwrap();
    let state = RunStateStore::new(dir.path());
    state.record_run(12345, RunMode::Ui).unwrap();

    let mut orchestrator = RunOrchestrator::new(
        config_with(Path::new("locust"), 60),
        state.clone(),
        RecordingOpener::default(),
    );
    assert!(orchestrator.active().is_none());
    assert!(!orchestrator.stop().await);
    assert!(!state.load().local_run_active);
}

#[tokio::test]
async fn test_stop_detached_without_recorded_run_resets_flag() {
    let dir = TempDir::new().unwrap();
    let state = RunStateStore::new(dir.path());
    state
        .save(&swarmer_core::state::WorkspaceRunState {
            local_run_active: true,
            last_pid: None,
            last_mode: None,
            updated_at: None,
        })
        .unwrap();

    assert!(!runner::stop_detached(&state).await);
    assert!(!state.load().local_run_active);
}
