use std::path::Path;

use swarmer_core::discovery::{DiscoveryOrigin, LocustfileHandle};
use swarmer_core::locustfile::{task_nodes, user_nodes, TreeNode};

const SOURCE: &str = r#"
from locust import HttpUser, FastHttpUser, task


class Browser(HttpUser):
    @task
    def landing(self):
        self.client.get("/")

    @task(3)
    def search(self):
        self.client.get("/search?q=ant")


class ApiClient(FastHttpUser):
    @task
    def health(self):
        self.client.get("/healthz")
"#;

fn handle() -> LocustfileHandle {
    LocustfileHandle::from_path(
        Path::new("/workspace/locustfile.py"),
        Path::new("/workspace"),
        DiscoveryOrigin::Explicit,
    )
}

#[test]
fn test_file_expands_into_user_nodes() {
    let handle = handle();
    let users = user_nodes(&handle, SOURCE);
    assert_eq!(users.len(), 2);

    let labels: Vec<_> = users.iter().map(|n| n.label().to_string()).collect();
    assert_eq!(labels, vec!["Browser", "ApiClient"]);

    // User nodes point back at the owning file.
    for node in &users {
        match node {
            TreeNode::User { file, .. } => assert_eq!(file, &handle.path),
            other => panic!("expected a user node, got {other:?}"),
        }
    }
}

#[test]
fn test_user_expands_into_task_nodes_with_parent() {
    let handle = handle();
    let tasks = task_nodes(&handle, SOURCE, "Browser");
    assert_eq!(tasks.len(), 2);

    // Task nodes always carry a non-empty owning user name.
    for node in &tasks {
        match node {
            TreeNode::Task { user, file, .. } => {
                assert_eq!(user, "Browser");
                assert_eq!(file, &handle.path);
            }
            other => panic!("expected a task node, got {other:?}"),
        }
    }

    let labels: Vec<_> = tasks.iter().map(|n| n.label().to_string()).collect();
    assert_eq!(labels, vec!["landing", "search"]);
}

#[test]
fn test_tasks_stay_inside_their_class() {
    let handle = handle();
    let tasks = task_nodes(&handle, SOURCE, "ApiClient");
    let labels: Vec<_> = tasks.iter().map(|n| n.label().to_string()).collect();
    assert_eq!(labels, vec!["health"]);
}

#[test]
fn test_file_node_labelled_workspace_relative() {
    let handle = handle();
    let node = TreeNode::File {
        handle: handle.clone(),
    };
    assert_eq!(node.label(), "locustfile.py");
}
