use std::fs;

use swarmer_core::scaffold::create_locustfile;
use tempfile::TempDir;

#[test]
fn test_creates_starter_locustfile() {
    let dir = TempDir::new().unwrap();
    let created = create_locustfile(dir.path(), dir.path()).unwrap();

    assert_eq!(created, dir.path().join("locustfile.py"));
    let content = fs::read_to_string(&created).unwrap();
    assert!(content.contains("from locust import"));
    assert!(content.contains("class QuickstartUser(HttpUser):"));
    assert!(content.contains("@task"));
}

#[test]
fn test_names_increment_instead_of_overwriting() {
    let dir = TempDir::new().unwrap();
    let first = create_locustfile(dir.path(), dir.path()).unwrap();
    let second = create_locustfile(dir.path(), dir.path()).unwrap();
    let third = create_locustfile(dir.path(), dir.path()).unwrap();

    assert_eq!(first, dir.path().join("locustfile.py"));
    assert_eq!(second, dir.path().join("locustfile_001.py"));
    assert_eq!(third, dir.path().join("locustfile_002.py"));
}

#[test]
fn test_workspace_template_overrides_builtin() {
    let dir = TempDir::new().unwrap();
    let template_dir = dir.path().join(".swarmer");
    fs::create_dir_all(&template_dir).unwrap();
    fs::write(
        template_dir.join("locustfile.template.py"),
        "from locust import FastHttpUser\n\nclass Custom(FastHttpUser):\n    pass\n",
    )
    .unwrap();

    let created = create_locustfile(dir.path(), dir.path()).unwrap();
    let content = fs::read_to_string(created).unwrap();
    assert!(content.contains("class Custom(FastHttpUser):"));
    assert!(!content.contains("QuickstartUser"));
}

#[test]
fn test_missing_destination_directory_is_created() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("load").join("tests");

    let created = create_locustfile(dir.path(), &nested).unwrap();
    assert_eq!(created, nested.join("locustfile.py"));
    assert!(created.exists());
}
