//! Filesystem watching with debounced rescan triggering.
//!
//! Filesystem events arrive in bursts (multi-file saves, git checkouts), so
//! a rescan is only triggered after a quiet period with no further events.
//! The debounce is cancel-and-reschedule: a new event restarts the timer,
//! and only the latest pending refresh matters — there is no queue.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

/// Coalesces a stream of change notifications into single triggers.
pub struct Debouncer {
    rx: mpsc::UnboundedReceiver<PathBuf>,
    quiet: Duration,
}

impl Debouncer {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<PathBuf>, quiet: Duration) -> Self {
        Self { rx, quiet }
    }

    /// Wait for the next burst of events to settle.
    ///
    /// Resolves once at least one event has arrived and the quiet period has
    /// elapsed without another; returns `None` when the event source is gone.
    pub async fn settled(&mut self) -> Option<()> {
        self.rx.recv().await?;
        loop {
            match tokio::time::timeout(self.quiet, self.rx.recv()).await {
                // Another event landed inside the window: restart the timer.
                Ok(Some(_)) => continue,
                Ok(None) => return None,
                Err(_) => return Some(()),
            }
        }
    }
}

/// Watches workspace roots for Python file changes.
pub struct WorkspaceWatcher {
    // Held for its side effect; dropping it stops the notify thread.
    _watcher: RecommendedWatcher,
    debouncer: Debouncer,
}

impl WorkspaceWatcher {
    /// Start watching the given roots recursively.
    pub fn new(roots: &[PathBuf], quiet: Duration) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if let Some(path) = relevant_path(&event) {
                        let _ = tx.send(path);
                    }
                }
            },
            notify::Config::default(),
        )?;

        for root in roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
            debug!(root = %root.display(), "watching for locustfile changes");
        }

        Ok(Self {
            _watcher: watcher,
            debouncer: Debouncer::new(rx, quiet),
        })
    }

    /// Wait for the next debounced change burst. See [`Debouncer::settled`].
    pub async fn settled(&mut self) -> Option<()> {
        self.debouncer.settled().await
    }
}

/// Extract the affected path when an event concerns a Python file.
fn relevant_path(event: &Event) -> Option<PathBuf> {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return None;
    }

    event
        .paths
        .iter()
        .find(|path| is_python_file(path))
        .cloned()
}

fn is_python_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("py")
}
