//! Seam between the run orchestrator and whatever displays the web UI.

/// Hands an extracted web-UI URL to the host surface.
///
/// The production implementation opens the default browser; tests substitute
/// a recorder to observe the at-most-once open guarantee.
pub trait WebUiOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens URLs in the system default browser.
#[derive(Debug, Default)]
pub struct BrowserOpener;

impl WebUiOpener for BrowserOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}
