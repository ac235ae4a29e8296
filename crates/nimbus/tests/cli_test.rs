#![allow(deprecated)] // Command::cargo_bin is deprecated in newer assert_cmd releases

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KAFKA_DOC: &str = r#"
cluster_id: c1
kind: kafka
version: "3.5"
topics:
  - name: t1
    partitions: 3
  - name: t2
    partitions: 6
users:
  - name: u1
    password: secret
    permissions:
      - topic_name: t1
        role: ACCESS_ROLE_CONSUMER
"#;

fn nimbus() -> Command {
    let mut cmd = Command::cargo_bin("nimbus").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("NIMBUS_CONFIG_PATH");
    cmd
}

async fn mount_cluster(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/managed-kafka/v1/clusters/c1/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "topics": [{ "name": "t1", "clusterId": "c1", "partitions": "3" }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/managed-kafka/v1/clusters/c1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [] })))
        .mount(server)
        .await;
}

/// Run the binary off the async runtime and return (success, stdout, stderr)
async fn run(mut cmd: Command) -> (bool, String, String) {
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn test_cli_help() {
    nimbus()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn test_cli_version() {
    nimbus()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nimbus"));
}

#[test]
fn test_apply_help() {
    nimbus()
        .args(["apply", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("<FILE>"));
}

#[test]
fn test_plan_missing_document() {
    let project = TestProject::new();
    nimbus()
        .current_dir(project.path())
        .args(["plan", "missing.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_plan_rejects_collections_of_other_kind() {
    let project = TestProject::new();
    project.write_file("mysql.yaml", "cluster_id: m1\nkind: mysql\ntopics: []\n");

    nimbus()
        .current_dir(project.path())
        .args(["plan", "mysql.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kafka clusters only"));
}

#[test]
fn test_plan_without_configuration() {
    let project = TestProject::new();
    project.write_file("cluster.yaml", KAFKA_DOC);

    nimbus()
        .current_dir(project.path())
        .env("HOME", project.path())
        .env("XDG_CONFIG_HOME", project.path().join("xdg"))
        .args(["plan", "cluster.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_plan_prints_changes() {
    let server = MockServer::start().await;
    mount_cluster(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "op", "done": true })))
        .expect(0)
        .mount(&server)
        .await;

    let project = TestProject::new();
    project.write_config(&server.uri());
    project.write_file("cluster.yaml", KAFKA_DOC);

    let mut cmd = nimbus();
    cmd.current_dir(project.path())
        .args(["--config", "nimbus.yaml", "plan", "cluster.yaml"]);
    let (success, stdout, stderr) = run(cmd).await;

    assert!(success, "stderr: {stderr}");
    assert!(stdout.contains("+ t2"), "stdout: {stdout}");
    assert!(stdout.contains("+ u1"), "stdout: {stdout}");
    assert!(stdout.contains("1 to create, 0 to update, 0 to delete, 1 unchanged"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_plan_tells_empty_from_unmanaged() {
    let server = MockServer::start().await;
    mount_cluster(&server).await;

    let project = TestProject::new();
    project.write_config(&server.uri());
    project.write_file("users.yaml", "cluster_id: c1\nkind: kafka\nusers: []\n");

    let mut cmd = nimbus();
    cmd.current_dir(project.path())
        .args(["--config", "nimbus.yaml", "plan", "users.yaml"]);
    let (success, stdout, stderr) = run(cmd).await;

    assert!(success, "stderr: {stderr}");
    let (topics, users) = stdout.split_once("kafka-user").unwrap();
    assert!(topics.contains("not managed"), "stdout: {stdout}");
    assert!(!users.contains("not managed"), "stdout: {stdout}");
    assert!(users.contains("0 to create, 0 to update, 0 to delete, 0 unchanged"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_apply_records_state() {
    let server = MockServer::start().await;
    mount_cluster(&server).await;
    Mock::given(method("POST"))
        .and(path("/managed-kafka/v1/clusters/c1/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "op-t", "done": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/managed-kafka/v1/clusters/c1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "op-u", "done": true })))
        .expect(1)
        .mount(&server)
        .await;

    let project = TestProject::new();
    project.write_config(&server.uri());
    project.write_file("cluster.yaml", KAFKA_DOC);

    let mut cmd = nimbus();
    cmd.current_dir(project.path())
        .args(["--config", "nimbus.yaml", "apply", "cluster.yaml"]);
    let (success, _, stderr) = run(cmd).await;

    assert!(success, "stderr: {stderr}");
    let state = project.read_file(".nimbus/state.json");
    assert!(state.contains("kafka-user:c1"));
    assert!(state.contains("kafka-topic:c1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_apply_dry_run_changes_nothing() {
    let server = MockServer::start().await;
    mount_cluster(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "op", "done": true })))
        .expect(0)
        .mount(&server)
        .await;

    let project = TestProject::new();
    project.write_config(&server.uri());
    project.write_file("cluster.yaml", KAFKA_DOC);

    let mut cmd = nimbus();
    cmd.current_dir(project.path())
        .args(["--config", "nimbus.yaml", "apply", "--dry-run", "cluster.yaml"]);
    let (success, stdout, stderr) = run(cmd).await;

    assert!(success, "stderr: {stderr}");
    assert!(stdout.contains("Dry run"));
    assert!(!project.path().join(".nimbus/state.json").exists());
}
