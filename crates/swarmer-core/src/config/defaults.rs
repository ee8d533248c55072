//! Default values for Swarmer configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Locust Defaults
// ============================================================================

/// Default locust executable. Resolved through `PATH`, which gets a detected
/// virtual-environment `bin/` directory prepended at spawn time.
pub const DEFAULT_LOCUST_PATH: &str = "locust";

/// URL opened when no web-UI URL shows up in the process output in time.
pub const DEFAULT_FALLBACK_WEB_URL: &str = "http://localhost:8089";

/// How long to wait for the web-UI URL before falling back.
pub const DEFAULT_WEB_URL_TIMEOUT_SECS: u64 = 60;

/// Virtual-environment directory names probed under the run directory.
pub const VENV_DIR_CANDIDATES: &[&str] = &["venv", ".venv", "env"];

// ============================================================================
// Discovery Defaults
// ============================================================================

/// Quiet period for coalescing bursts of filesystem events into one rescan.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// How much of a Python file is inspected for a locust import (16 KiB).
pub const IMPORT_SNIFF_BYTES: usize = 16 * 1024;

/// Default directories to exclude from workspace scanning.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Virtual environments
    "venv",
    ".venv",
    "env",
    "site-packages",
    // Caches
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".tox",
    ".cache",
    // Dependencies / build outputs
    "node_modules",
    "build",
    "dist",
    "target",
    ".eggs",
    // Swarmer's own data
    ".swarmer",
];

// ============================================================================
// Converter Defaults
// ============================================================================

/// Default python executable used for `python -m har2locust`.
pub const DEFAULT_PYTHON_PATH: &str = "python3";

// ============================================================================
// UI Defaults
// ============================================================================

/// Default size ratio handed to the split-view surface.
pub const DEFAULT_SPLIT_RATIO: f64 = 0.5;

/// Lower clamp for the split ratio.
pub const MIN_SPLIT_RATIO: f64 = 0.2;

/// Upper clamp for the split ratio.
pub const MAX_SPLIT_RATIO: f64 = 0.8;

// ============================================================================
// Data Directory Defaults
// ============================================================================

/// Workspace-local data directory.
pub const DEFAULT_DATA_DIR: &str = ".swarmer";

/// Run-state file name (inside the data directory).
pub const DEFAULT_STATE_FILE: &str = "state.json";

/// Workspace-provided scaffold template file name (inside the data directory).
pub const DEFAULT_TEMPLATE_FILE: &str = "locustfile.template.py";

// ============================================================================
// Scaffold Template
// ============================================================================

/// Built-in starter locustfile, used when the workspace provides no template.
pub const DEFAULT_LOCUSTFILE_TEMPLATE: &str = r#"from locust import HttpUser, task, between


class QuickstartUser(HttpUser):
    wait_time = between(1, 5)

    @task
    def index(self):
        self.client.get("/")
"#;
