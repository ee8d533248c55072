//! HAR-to-locustfile conversion via the external `har2locust` tool.
//!
//! The converter runs module-style (`python -m har2locust`) so whichever
//! environment provides `har2locust` also provides its plugins. Generated
//! source arrives on stdout and is written verbatim to the destination;
//! the converter's own logging passes through on stderr untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::info;

use crate::config::ConvertConfig;

/// Errors that can occur during HAR conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(
        "Failed to launch '{program} -m har2locust': {source}. \
         Is har2locust installed in the active environment?"
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("har2locust exited with status {code:?}")]
    Failed { code: Option<i32> },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convert a HAR capture into a locustfile at `dest`.
pub async fn convert_har(
    config: &ConvertConfig,
    har: &Path,
    dest: &Path,
) -> Result<(), ConvertError> {
    let mut cmd = Command::new(&config.python_path);
    cmd.arg("-m").arg("har2locust");

    if let Some(template) = &config.template {
        cmd.arg("--template").arg(template);
    }
    if !config.plugins.is_empty() {
        cmd.arg("--plugins").arg(config.plugins.join(","));
    }
    if !config.disable_plugins.is_empty() {
        cmd.arg("--disable-plugins")
            .arg(config.disable_plugins.join(","));
    }
    if let Some(resource_types) = &config.resource_types {
        cmd.arg("--resource-types").arg(resource_types);
    }
    if let Some(loglevel) = &config.loglevel {
        cmd.arg("--loglevel").arg(loglevel);
    }

    cmd.arg(har)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let output = cmd.output().await.map_err(|source| ConvertError::Spawn {
        program: config.python_path.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(ConvertError::Failed {
            code: output.status.code(),
        });
    }

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
        }
    }
    fs::write(dest, &output.stdout).map_err(|e| ConvertError::io(dest, e))?;

    info!(
        har = %har.display(),
        dest = %dest.display(),
        bytes = output.stdout.len(),
        "wrote generated locustfile"
    );
    Ok(())
}
