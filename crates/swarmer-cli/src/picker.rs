//! Interactive resolution of "which locustfile should run now".
//!
//! Resolution order: an explicitly named file (validated three ways), then
//! the discovery cache (auto-select a single entry, quick-pick several),
//! then a choose/scaffold/cancel prompt when nothing is known. `Ok(None)`
//! always means the user backed out — callers stop silently.

use std::path::Path;

use color_eyre::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use tracing::{info, warn};

use swarmer_core::discovery::{
    is_locustfile_name, sniff_locust_import, Discovery, DiscoveryOrigin, LocustfileHandle,
};
use swarmer_core::scaffold::create_locustfile;

/// Resolve the locustfile to run. Interactive; never call this from a
/// context that expects a silent result.
pub fn pick_target(
    explicit: Option<&Path>,
    discovery: &Discovery,
    workspace_root: &Path,
) -> Result<Option<LocustfileHandle>> {
    if let Some(path) = explicit {
        if let Some(handle) = accept_explicit(path, discovery, workspace_root) {
            return Ok(Some(handle));
        }
        warn!(path = %path.display(), "not a locustfile; picking from the workspace instead");
    }

    let known = discovery.cache();
    if !known.is_empty() {
        if known.len() == 1 {
            info!(file = %known[0].label, "using the only known locustfile");
            return Ok(Some(known[0].clone()));
        }
        return pick_from_known(known);
    }

    pick_from_nothing(workspace_root)
}

/// Validate an explicitly named file the same three ways the active editor
/// is validated: naming convention, cache membership, or content sniff.
fn accept_explicit(
    path: &Path,
    discovery: &Discovery,
    workspace_root: &Path,
) -> Option<LocustfileHandle> {
    if !path.is_file() {
        return None;
    }
    if is_locustfile_name(path) {
        return Some(LocustfileHandle::from_path(
            path,
            workspace_root,
            DiscoveryOrigin::Explicit,
        ));
    }
    if discovery.contains(path) {
        return discovery.cache().iter().find(|h| h.path == path).cloned();
    }
    let is_python = path.extension().and_then(|e| e.to_str()) == Some("py");
    if is_python && sniff_locust_import(path) {
        return Some(LocustfileHandle::from_path(
            path,
            workspace_root,
            DiscoveryOrigin::Inferred,
        ));
    }
    None
}

fn pick_from_known(known: &[LocustfileHandle]) -> Result<Option<LocustfileHandle>> {
    let labels: Vec<&str> = known.iter().map(|h| h.label.as_str()).collect();
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which locustfile should run?")
        .items(&labels)
        .default(0)
        .interact_opt()?;

    Ok(choice.map(|idx| known[idx].clone()))
}

fn pick_from_nothing(workspace_root: &Path) -> Result<Option<LocustfileHandle>> {
    let options = [
        "Browse for a Python file",
        "Create a new locustfile",
        "Cancel",
    ];
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("No locustfiles found in this workspace")
        .items(&options)
        .default(0)
        .interact_opt()?;

    match choice {
        Some(0) => browse_for_file(workspace_root),
        Some(1) => {
            let created = create_locustfile(workspace_root, workspace_root)?;
            println!("Created {}", created.display());
            Ok(Some(LocustfileHandle::from_path(
                &created,
                workspace_root,
                DiscoveryOrigin::Explicit,
            )))
        }
        _ => Ok(None),
    }
}

fn browse_for_file(workspace_root: &Path) -> Result<Option<LocustfileHandle>> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Path to a Python file")
        .allow_empty(true)
        .interact_text()?;
    if input.trim().is_empty() {
        return Ok(None);
    }

    let path = workspace_root.join(input.trim());
    if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("py") {
        warn!(path = %path.display(), "not a Python file");
        return Ok(None);
    }

    Ok(Some(LocustfileHandle::from_path(
        &path,
        workspace_root,
        DiscoveryOrigin::Inferred,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use swarmer_core::config::DiscoveryConfig;
    use tempfile::TempDir;

    #[test]
    fn test_accept_explicit_by_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locustfile.py");
        fs::write(&path, "# not even importing locust yet\n").unwrap();

        let discovery = Discovery::new(&DiscoveryConfig::default());
        let handle = accept_explicit(&path, &discovery, dir.path()).unwrap();
        assert_eq!(handle.label, "locustfile.py");
        assert_eq!(handle.origin, DiscoveryOrigin::Explicit);
    }

    #[test]
    fn test_accept_explicit_by_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scenario.py");
        fs::write(&path, "from locust import HttpUser\n").unwrap();

        let discovery = Discovery::new(&DiscoveryConfig::default());
        let handle = accept_explicit(&path, &discovery, dir.path()).unwrap();
        assert_eq!(handle.origin, DiscoveryOrigin::Inferred);
    }

    #[test]
    fn test_reject_explicit_plain_python() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("util.py");
        fs::write(&path, "print('hi')\n").unwrap();

        let discovery = Discovery::new(&DiscoveryConfig::default());
        assert!(accept_explicit(&path, &discovery, dir.path()).is_none());
    }

    #[test]
    fn test_reject_explicit_missing_file() {
        let dir = TempDir::new().unwrap();
        let discovery = Discovery::new(&DiscoveryConfig::default());
        assert!(accept_explicit(&dir.path().join("locustfile.py"), &discovery, dir.path()).is_none());
    }
}
