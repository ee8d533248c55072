//! Structural parsing of locustfiles.
//!
//! This is regex-based line scanning, not a real Python parse: the goal is a
//! navigable preview of user classes and their task methods, the same job an
//! editor outline does. Class declarations are anchored on a line-start
//! `class` keyword so a class name that is a prefix of another identifier
//! (`UserA` vs `UserAB`) can never mis-bound the body window.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::discovery::LocustfileHandle;

/// Base classes that mark a class as a simulated-client definition.
pub const USER_BASE_CLASSES: &[&str] = &["FastHttpUser", "HttpUser", "User"];

/// A user class found in a locustfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClass {
    /// Class name as written in the source.
    pub name: String,
    /// 1-based line of the declaration.
    pub line: usize,
}

/// A task method found inside a user class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMethod {
    /// Method name as written in the source.
    pub name: String,
    /// Name of the owning user class.
    pub user: String,
    /// 1-based line of the `def`.
    pub line: usize,
}

/// One node of the file → user → task preview tree.
///
/// Task nodes always carry their owning user name; file nodes never carry
/// user or task names. Nodes are recomputed on demand and never persisted.
#[derive(Debug, Clone)]
pub enum TreeNode {
    File {
        handle: LocustfileHandle,
    },
    User {
        file: PathBuf,
        name: String,
    },
    Task {
        file: PathBuf,
        user: String,
        name: String,
    },
}

impl TreeNode {
    /// Display label for the node.
    pub fn label(&self) -> &str {
        match self {
            TreeNode::File { handle } => &handle.label,
            TreeNode::User { name, .. } => name,
            TreeNode::Task { name, .. } => name,
        }
    }
}

fn class_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^class\s+([A-Za-z_]\w*)\s*\(([^)]*)\)\s*:").expect("hard-coded pattern")
    })
}

fn task_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@task\b(?:\s*\([^)]*\))?\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(")
            .expect("hard-coded pattern")
    })
}

/// Find every user-class declaration in a locustfile.
///
/// A class counts when any entry of its base list is one of
/// [`USER_BASE_CLASSES`], optionally module-qualified
/// (`locust.FastHttpUser`). Duplicate class names are each reported —
/// an editing session can legitimately hold two copies of the same class.
pub fn parse_users(source: &str) -> Vec<UserClass> {
    class_decl_re()
        .captures_iter(source)
        .filter_map(|cap| {
            let bases = cap.get(2)?.as_str();
            if !has_user_base(bases) {
                return None;
            }
            let m = cap.get(1)?;
            Some(UserClass {
                name: m.as_str().to_string(),
                line: line_of_offset(source, m.start()),
            })
        })
        .collect()
}

/// Find every `@task`-decorated method of one user class.
///
/// The search window starts at the class's own line-anchored declaration and
/// ends just before the next top-level `class` declaration (or end of file),
/// so tasks of a following class are never attributed to this one.
pub fn parse_tasks(source: &str, user_name: &str) -> Vec<TaskMethod> {
    let Some(window) = class_body_window(source, user_name) else {
        return Vec::new();
    };
    let body = &source[window.clone()];

    task_decl_re()
        .captures_iter(body)
        .filter_map(|cap| {
            let m = cap.get(1)?;
            Some(TaskMethod {
                name: m.as_str().to_string(),
                user: user_name.to_string(),
                line: line_of_offset(source, window.start + m.start()),
            })
        })
        .collect()
}

/// Expand a locustfile into user nodes.
pub fn user_nodes(handle: &LocustfileHandle, source: &str) -> Vec<TreeNode> {
    parse_users(source)
        .into_iter()
        .map(|user| TreeNode::User {
            file: handle.path.clone(),
            name: user.name,
        })
        .collect()
}

/// Expand a user node into task nodes.
pub fn task_nodes(handle: &LocustfileHandle, source: &str, user_name: &str) -> Vec<TreeNode> {
    parse_tasks(source, user_name)
        .into_iter()
        .map(|task| TreeNode::Task {
            file: handle.path.clone(),
            user: task.user,
            name: task.name,
        })
        .collect()
}

/// Byte range of one class's declaration-to-next-class window.
fn class_body_window(source: &str, user_name: &str) -> Option<std::ops::Range<usize>> {
    // Line-start anchor plus the literal `(` keeps `UserA` from matching
    // inside `class UserAB(...)`.
    let pattern = format!(r"(?m)^class\s+{}\s*\(", regex::escape(user_name));
    let decl_re = Regex::new(&pattern).ok()?;
    let decl = decl_re.find(source)?;

    let end = class_decl_re()
        .find_iter(source)
        .map(|m| m.start())
        .find(|&start| start > decl.start())
        .unwrap_or(source.len());

    Some(decl.start()..end)
}

fn has_user_base(bases: &str) -> bool {
    bases.split(',').any(|base| {
        let name = base.trim().rsplit('.').next().unwrap_or("");
        USER_BASE_CLASSES.contains(&name)
    })
}

/// 1-based line number of a byte offset.
fn line_of_offset(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}
