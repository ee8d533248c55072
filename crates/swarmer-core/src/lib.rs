//! Core library for Swarmer, a terminal front-end for the Locust
//! load-testing tool and the `har2locust` converter.
//!
//! The heavy lifting — load generation, request distribution, statistics —
//! happens in the external `locust` process. This crate covers everything
//! around it: finding locustfiles in a workspace, previewing their user
//! classes and task methods, launching runs, scraping the web-UI URL out of
//! process output, and converting HAR captures.

pub mod config;
pub mod convert;
pub mod discovery;
pub mod locustfile;
pub mod runner;
pub mod scaffold;
pub mod state;
pub mod weburl;

pub use config::Config;
pub use discovery::{Discovery, DiscoveryOrigin, LocustfileHandle, WorkspaceWatcher};
pub use runner::{ActiveRun, BrowserOpener, RunMode, RunOrchestrator, RunOutcome, WebUiOpener};
pub use state::RunStateStore;
pub use weburl::extract_web_url;
