//! Command handlers behind the clap surface.
//!
//! Every handler catches its own failures and reports them as terminal
//! messages; user cancellation is a silent, successful exit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use tracing::warn;

use swarmer_core::config::Config;
use swarmer_core::convert::convert_har;
use swarmer_core::discovery::{Discovery, DiscoveryOrigin, LocustfileHandle, WorkspaceWatcher};
use swarmer_core::locustfile::{task_nodes, user_nodes, TreeNode};
use swarmer_core::runner::{self, BrowserOpener, RunOrchestrator, RunOutcome};
use swarmer_core::scaffold::create_locustfile;
use swarmer_core::state::RunStateStore;

use crate::picker::pick_target;

/// UI-mode run: discover, pick, launch, open the web UI.
pub async fn run_ui(
    config: &Config,
    workspace: &Path,
    file: Option<&Path>,
    form: bool,
) -> Result<()> {
    let state = RunStateStore::new(workspace);
    let Some(target) = resolve_target(config, workspace, file, &state)? else {
        return Ok(());
    };

    let mut orchestrator =
        RunOrchestrator::new(config.locust.clone(), state, BrowserOpener);
    let outcome = orchestrator.run_ui(&target.path, form).await?;
    report_outcome(&outcome);
    Ok(())
}

/// Headless run, with any extra arguments forwarded to locust.
pub async fn run_headless(
    config: &Config,
    workspace: &Path,
    file: Option<&Path>,
    extra: &[String],
) -> Result<()> {
    let state = RunStateStore::new(workspace);
    let Some(target) = resolve_target(config, workspace, file, &state)? else {
        return Ok(());
    };

    let mut orchestrator =
        RunOrchestrator::new(config.locust.clone(), state, BrowserOpener);
    let outcome = orchestrator.run_headless(&target.path, extra).await?;
    report_outcome(&outcome);
    Ok(())
}

/// Headless run of a single task via the tag filter.
pub async fn run_task(
    config: &Config,
    workspace: &Path,
    file: Option<&Path>,
    task: &str,
) -> Result<()> {
    let state = RunStateStore::new(workspace);
    let Some(target) = resolve_target(config, workspace, file, &state)? else {
        return Ok(());
    };

    let mut orchestrator =
        RunOrchestrator::new(config.locust.clone(), state, BrowserOpener);
    let outcome = orchestrator.run_task(&target.path, task).await?;
    report_outcome(&outcome);
    Ok(())
}

/// Stop the run recorded by a previous invocation.
pub async fn stop(workspace: &Path) -> Result<()> {
    let state = RunStateStore::new(workspace);
    if runner::stop_detached(&state).await {
        println!("Stopped the running load test.");
    } else {
        println!("No tracked run to stop.");
    }
    Ok(())
}

/// Print the file → user → task tree; optionally keep watching.
pub async fn list(config: &Config, workspace: &Path, watch: bool) -> Result<()> {
    let roots = vec![workspace.to_path_buf()];
    let mut discovery = Discovery::new(&config.discovery);
    render_tree(discovery.scan(&roots), workspace);

    if !watch {
        return Ok(());
    }

    let quiet = Duration::from_millis(config.discovery.debounce_ms);
    let mut watcher = WorkspaceWatcher::new(&roots, quiet)?;
    println!("\nWatching for changes (Ctrl-C to quit)...");
    loop {
        tokio::select! {
            settled = watcher.settled() => {
                if settled.is_none() {
                    return Ok(());
                }
                println!();
                render_tree(discovery.scan(&roots), workspace);
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

/// Scaffold a fresh locustfile.
pub fn new_locustfile(workspace: &Path, dir: Option<&Path>) -> Result<()> {
    let dir = dir.map(|d| workspace.join(d)).unwrap_or_else(|| workspace.to_path_buf());
    let created = create_locustfile(workspace, &dir)?;
    println!("Created {}", created.display());
    Ok(())
}

/// Convert a HAR capture with har2locust.
pub async fn convert(config: &Config, har: &Path, output: Option<PathBuf>) -> Result<()> {
    let dest = output.unwrap_or_else(|| har.with_extension("py"));
    convert_har(&config.convert, har, &dest).await?;
    println!("Wrote {}", dest.display());
    Ok(())
}

/// Scan the workspace and run the picker; `Ok(None)` means "stop silently".
///
/// When nothing is resolvable the active-run flag is reset defensively so a
/// stale toggle cannot survive a failed launch attempt.
fn resolve_target(
    config: &Config,
    workspace: &Path,
    file: Option<&Path>,
    state: &RunStateStore,
) -> Result<Option<LocustfileHandle>> {
    let mut discovery = Discovery::new(&config.discovery);
    discovery.scan(&[workspace.to_path_buf()]);

    let picked = pick_target(file, &discovery, workspace)?;
    if picked.is_none() {
        if let Err(err) = state.clear_run() {
            warn!(%err, "failed to reset run state");
        }
    }
    Ok(picked)
}

fn report_outcome(outcome: &RunOutcome) {
    if outcome.timed_out {
        println!("Locust never announced its web UI; opened the fallback URL instead.");
    }
    match outcome.exit_code {
        Some(0) | None => {}
        Some(code) => println!("Locust exited with status {code}."),
    }
}

fn render_tree(handles: &[LocustfileHandle], workspace: &Path) {
    if handles.is_empty() {
        println!("No locustfiles found under {}", workspace.display());
        return;
    }

    for handle in handles {
        let marker = match handle.origin {
            DiscoveryOrigin::Explicit => "",
            DiscoveryOrigin::Inferred => " (inferred)",
        };
        println!("{}{marker}", handle.label);

        let source = match std::fs::read_to_string(&handle.path) {
            Ok(source) => source,
            Err(err) => {
                warn!(path = %handle.path.display(), %err, "could not read file");
                continue;
            }
        };

        let users = user_nodes(handle, &source);
        for (i, user) in users.iter().enumerate() {
            let last_user = i + 1 == users.len();
            println!("{} {}", if last_user { "└─" } else { "├─" }, user.label());

            let TreeNode::User { name, .. } = user else {
                continue;
            };
            let tasks = task_nodes(handle, &source, name);
            for (j, task) in tasks.iter().enumerate() {
                let stem = if last_user { "  " } else { "│ " };
                let leaf = if j + 1 == tasks.len() { "└─" } else { "├─" };
                println!("{stem} {leaf} {}", task.label());
            }
        }
    }
}
