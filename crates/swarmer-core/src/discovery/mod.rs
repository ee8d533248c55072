//! Locustfile discovery across workspace roots.
//!
//! Two classes of candidate are collected on every scan:
//!
//! 1. **Explicit** — files matching the `locustfile*.py` naming convention.
//! 2. **Inferred** — any other `*.py` file whose first 16 KiB contain a
//!    locust import statement.
//!
//! The result is sorted by full path and *replaces* the cache wholesale; the
//! cache is the sole source of truth for pickers until the next scan, so a
//! file deleted from disk disappears after one rescan.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ignore::WalkBuilder;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::{DiscoveryConfig, IMPORT_SNIFF_BYTES};

mod watch;

pub use watch::WorkspaceWatcher;

/// How a candidate file was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOrigin {
    /// Matched the `locustfile*.py` naming convention.
    Explicit,
    /// Recognized by a locust import in its content.
    Inferred,
}

/// One discovered locustfile.
#[derive(Debug, Clone)]
pub struct LocustfileHandle {
    /// Absolute (or root-joined) path of the file.
    pub path: PathBuf,
    /// Workspace-relative display label.
    pub label: String,
    /// How the file was recognized.
    pub origin: DiscoveryOrigin,
}

impl LocustfileHandle {
    /// Build a handle for a known path, labelling it relative to `root`.
    pub fn from_path(path: &Path, root: &Path, origin: DiscoveryOrigin) -> Self {
        let label = path
            .strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string();
        Self {
            path: path.to_path_buf(),
            label,
            origin,
        }
    }
}

/// Workspace scanner with an owned cache of known locustfiles.
pub struct Discovery {
    exclude_dirs: Vec<String>,
    cache: Vec<LocustfileHandle>,
}

impl Discovery {
    /// Create a scanner with the configured exclusion list and an empty cache.
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            exclude_dirs: config.exclude_dirs.clone(),
            cache: Vec::new(),
        }
    }

    /// Scan the given roots and replace the cache with the result.
    ///
    /// Unreadable files are skipped with a warning; a scan never fails as a
    /// whole.
    pub fn scan(&mut self, roots: &[PathBuf]) -> &[LocustfileHandle] {
        let mut explicit = Vec::new();
        let mut inferred = Vec::new();

        for root in roots {
            self.scan_root(root, &mut explicit, &mut inferred);
        }

        let mut files = explicit;
        files.append(&mut inferred);
        files.sort_by(|a, b| a.path.cmp(&b.path));

        debug!(count = files.len(), "discovery scan complete");
        self.cache = files;
        &self.cache
    }

    fn scan_root(
        &self,
        root: &Path,
        explicit: &mut Vec<LocustfileHandle>,
        inferred: &mut Vec<LocustfileHandle>,
    ) {
        let exclude = self.exclude_dirs.clone();
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .map(|name| !exclude.iter().any(|d| d == name))
                    .unwrap_or(true)
            });

        for entry in builder.build().flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("py") {
                continue;
            }

            if is_locustfile_name(path) {
                explicit.push(LocustfileHandle::from_path(
                    path,
                    root,
                    DiscoveryOrigin::Explicit,
                ));
            } else if sniff_locust_import(path) {
                inferred.push(LocustfileHandle::from_path(
                    path,
                    root,
                    DiscoveryOrigin::Inferred,
                ));
            }
        }
    }

    /// The cached result of the last scan.
    pub fn cache(&self) -> &[LocustfileHandle] {
        &self.cache
    }

    /// Whether a path is present in the cache.
    pub fn contains(&self, path: &Path) -> bool {
        self.cache.iter().any(|handle| handle.path == path)
    }
}

/// Whether a file name matches the `locustfile*.py` convention.
pub fn is_locustfile_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with("locustfile") && name.ends_with(".py"))
        .unwrap_or(false)
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:from\s+locust\b|import\s+locust\b)").expect("hard-coded pattern")
    })
}

/// Whether the first 16 KiB of a file contain a locust import statement.
///
/// Unreadable files simply fail the check; the caller treats that the same
/// as "not a locustfile".
pub fn sniff_locust_import(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!(path = %path.display(), %err, "skipping unreadable candidate");
            return false;
        }
    };

    let mut head = vec![0u8; IMPORT_SNIFF_BYTES];
    let mut filled = 0;
    while filled < head.len() {
        match file.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable candidate");
                return false;
            }
        }
    }

    let head = String::from_utf8_lossy(&head[..filled]);
    import_re().is_match(&head)
}
