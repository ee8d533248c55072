//! Web-UI URL extraction from locust process output.
//!
//! Locust announces its web UI with one of two log lines:
//!
//! ```text
//! Starting web interface at http://0.0.0.0:8089
//! ... web interface is already running, available at http://127.0.0.1:8089
//! ```
//!
//! [`extract_web_url`] scans a single output line for either phrasing (or,
//! failing that, any bare `http(s)://` token), cleans trailing log prose off
//! the match, and optionally forces the `dashboard=false` query parameter so
//! the browser lands on the pre-run form instead of the live dashboard.
//!
//! The function is pure and performs no I/O; it is called once per line of a
//! high-volume stream, and returning `None` is the normal outcome.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Punctuation that commonly trails a URL embedded in log prose.
const TRAILING_PUNCTUATION: &[char] =
    &[')', ']', '}', '.', ',', ';', ':', '\'', '"', '!', '?'];

fn starting_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)starting web interface at\s+(\S+)").expect("hard-coded pattern")
    })
}

fn available_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)available at\s+(\S+)").expect("hard-coded pattern"))
}

fn bare_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bhttps?://\S+").expect("hard-coded pattern"))
}

fn dashboard_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([?&])dashboard=[^&#]*").expect("hard-coded pattern"))
}

/// Scan one line of process output for a usable web-UI URL.
///
/// Match order, first hit wins: the "Starting web interface at" phrasing, the
/// "available at" phrasing (emitted when an instance is already running),
/// then any bare `http://`/`https://` token. Returns `None` when the line
/// carries no URL.
///
/// With `force_dashboard` set, the query parameter `dashboard=false` is set
/// (or overwritten) on the result; otherwise the URL is returned untouched
/// apart from trailing-punctuation cleanup.
pub fn extract_web_url(line: &str, force_dashboard: bool) -> Option<String> {
    let raw = if let Some(cap) = starting_re().captures(line) {
        cap.get(1)?.as_str()
    } else if let Some(cap) = available_re().captures(line) {
        cap.get(1)?.as_str()
    } else if let Some(m) = bare_url_re().find(line) {
        m.as_str()
    } else {
        return None;
    };

    let trimmed = raw.trim_end_matches(TRAILING_PUNCTUATION);
    if trimmed.is_empty() {
        return None;
    }

    // Keep any fragment out of the way of query edits.
    let (base, fragment) = match trimmed.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (trimmed, None),
    };

    if !force_dashboard {
        return Some(reattach_fragment(base.to_string(), fragment));
    }

    let forced = force_dashboard_param(base);
    Some(reattach_fragment(forced, fragment))
}

/// Set (or overwrite) `dashboard=false` on a URL.
///
/// Proper URL parsing first; if that fails the query string is edited with a
/// regex so malformed-but-usable URLs still come out right.
fn force_dashboard_param(base: &str) -> String {
    match Url::parse(base) {
        Ok(mut parsed) => {
            let existing: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(key, _)| key.as_ref() != "dashboard")
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            {
                let mut pairs = parsed.query_pairs_mut();
                pairs.clear();
                for (key, value) in &existing {
                    pairs.append_pair(key, value);
                }
                pairs.append_pair("dashboard", "false");
            }
            parsed.to_string()
        }
        Err(_) => {
            if dashboard_param_re().is_match(base) {
                dashboard_param_re()
                    .replace(base, "${1}dashboard=false")
                    .into_owned()
            } else if base.contains('?') {
                format!("{base}&dashboard=false")
            } else {
                format!("{base}?dashboard=false")
            }
        }
    }
}

fn reattach_fragment(base: String, fragment: Option<&str>) -> String {
    match fragment {
        Some(fragment) => format!("{base}#{fragment}"),
        None => base,
    }
}
