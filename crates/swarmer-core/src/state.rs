//! Persisted run-activity flags.
//!
//! Two small JSON files back the toggle state that survives process exits:
//!
//! ```text
//! project/.swarmer/state.json      # workspace-scoped: local run flag + pid
//! ~/.local/share/swarmer/state.json  # user-global: cloud run flag
//! ```
//!
//! The flags drive UI toggles only — the run orchestrator never depends on
//! them for correctness, and every stop path resets them defensively.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::{DEFAULT_DATA_DIR, DEFAULT_STATE_FILE};
use crate::runner::RunMode;

/// Errors that can occur while persisting run state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StateError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Workspace-scoped run state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceRunState {
    /// Whether a local run is believed to be active.
    pub local_run_active: bool,
    /// PID of the most recently spawned run, for detached stop requests.
    pub last_pid: Option<u32>,
    /// Mode of the most recently spawned run.
    pub last_mode: Option<RunMode>,
    /// When this record was last written.
    pub updated_at: Option<DateTime<Utc>>,
}

/// User-global run state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalRunState {
    /// Whether a cloud run is believed to be active.
    pub cloud_run_active: bool,
}

/// File-backed store for the run-activity flags.
#[derive(Debug, Clone)]
pub struct RunStateStore {
    workspace_file: PathBuf,
    global_file: Option<PathBuf>,
}

impl RunStateStore {
    /// Create a store rooted at the given workspace.
    pub fn new(workspace_root: &Path) -> Self {
        let global_file = dirs::data_dir().map(|dir| dir.join("swarmer").join(DEFAULT_STATE_FILE));
        Self {
            workspace_file: workspace_root.join(DEFAULT_DATA_DIR).join(DEFAULT_STATE_FILE),
            global_file,
        }
    }

    /// Load the workspace state; a missing or corrupt file reads as default.
    pub fn load(&self) -> WorkspaceRunState {
        read_json(&self.workspace_file)
    }

    /// Record a freshly spawned run.
    pub fn record_run(&self, pid: u32, mode: RunMode) -> Result<(), StateError> {
        self.save(&WorkspaceRunState {
            local_run_active: true,
            last_pid: Some(pid),
            last_mode: Some(mode),
            updated_at: Some(Utc::now()),
        })
    }

    /// Reset the active flag and drop the tracked pid.
    pub fn clear_run(&self) -> Result<(), StateError> {
        self.save(&WorkspaceRunState {
            local_run_active: false,
            last_pid: None,
            last_mode: None,
            updated_at: Some(Utc::now()),
        })
    }

    /// Overwrite the workspace state.
    pub fn save(&self, state: &WorkspaceRunState) -> Result<(), StateError> {
        write_json(&self.workspace_file, state)
    }

    /// Whether a cloud run is believed to be active.
    pub fn cloud_run_active(&self) -> bool {
        self.global_file
            .as_deref()
            .map(|path| read_json::<GlobalRunState>(path).cloud_run_active)
            .unwrap_or(false)
    }

    /// Set the user-global cloud-run flag.
    pub fn set_cloud_run_active(&self, active: bool) -> Result<(), StateError> {
        let Some(path) = self.global_file.as_deref() else {
            warn!("no user data directory available; cloud-run flag not persisted");
            return Ok(());
        };
        write_json(
            path,
            &GlobalRunState {
                cloud_run_active: active,
            },
        )
    }
}

fn read_json<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> T {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return T::default(),
    };
    match serde_json::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            warn!(path = %path.display(), %err, "corrupt state file; using defaults");
            T::default()
        }
    }
}

fn write_json<T: Serialize>(path: &Path, state: &T) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
        }
    }
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json).map_err(|e| StateError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> RunStateStore {
        RunStateStore {
            workspace_file: dir.path().join(".swarmer").join("state.json"),
            global_file: Some(dir.path().join("global").join("state.json")),
        }
    }

    #[test]
    fn test_missing_file_reads_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let state = store.load();
        assert!(!state.local_run_active);
        assert!(state.last_pid.is_none());
    }

    #[test]
    fn test_record_and_clear_run() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.record_run(4242, RunMode::Ui).unwrap();
        let state = store.load();
        assert!(state.local_run_active);
        assert_eq!(state.last_pid, Some(4242));

        store.clear_run().unwrap();
        let state = store.load();
        assert!(!state.local_run_active);
        assert!(state.last_pid.is_none());
    }

    #[test]
    fn test_corrupt_file_reads_default() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(dir.path().join(".swarmer")).unwrap();
        fs::write(dir.path().join(".swarmer").join("state.json"), "{not json").unwrap();
        assert!(!store.load().local_run_active);
    }

    #[test]
    fn test_cloud_flag_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(!store.cloud_run_active());
        store.set_cloud_run_active(true).unwrap();
        assert!(store.cloud_run_active());
        store.set_cloud_run_active(false).unwrap();
        assert!(!store.cloud_run_active());
    }
}
