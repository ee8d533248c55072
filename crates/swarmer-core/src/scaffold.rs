//! Creation of starter locustfiles.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{
    DEFAULT_DATA_DIR, DEFAULT_LOCUSTFILE_TEMPLATE, DEFAULT_TEMPLATE_FILE,
};

/// Errors that can occur while scaffolding a locustfile.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free locustfile name left under {0}")]
    NoFreeName(PathBuf),
}

impl ScaffoldError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScaffoldError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Create a new locustfile in `dir` and return its path.
///
/// The template comes from `.swarmer/locustfile.template.py` under the
/// workspace root when present, falling back to the built-in starter. The
/// file name is the first free one of `locustfile.py`, `locustfile_001.py`,
/// `locustfile_002.py`, …
pub fn create_locustfile(workspace_root: &Path, dir: &Path) -> Result<PathBuf, ScaffoldError> {
    let template = load_template(workspace_root);
    let dest = next_free_name(dir)?;

    match fs::write(&dest, &template) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            // Destination directory is missing: create it and retry once.
            fs::create_dir_all(dir).map_err(|e| ScaffoldError::io(dir, e))?;
            fs::write(&dest, &template).map_err(|e| ScaffoldError::io(&dest, e))?;
        }
        Err(err) => return Err(ScaffoldError::io(&dest, err)),
    }

    info!(path = %dest.display(), "created locustfile");
    Ok(dest)
}

/// Template text: workspace-provided override, or the built-in starter.
fn load_template(workspace_root: &Path) -> String {
    let override_path = workspace_root
        .join(DEFAULT_DATA_DIR)
        .join(DEFAULT_TEMPLATE_FILE);
    if !override_path.exists() {
        return DEFAULT_LOCUSTFILE_TEMPLATE.to_string();
    }
    match fs::read_to_string(&override_path) {
        Ok(template) => template,
        Err(err) => {
            warn!(
                path = %override_path.display(),
                %err,
                "workspace template unreadable; using the built-in one"
            );
            DEFAULT_LOCUSTFILE_TEMPLATE.to_string()
        }
    }
}

fn next_free_name(dir: &Path) -> Result<PathBuf, ScaffoldError> {
    let plain = dir.join("locustfile.py");
    if !plain.exists() {
        return Ok(plain);
    }
    for n in 1..1000 {
        let candidate = dir.join(format!("locustfile_{n:03}.py"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(ScaffoldError::NoFreeName(dir.to_path_buf()))
}
