mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

/// Templates where the app needs the map and the map needs the group.
fn create_templates_file() -> NamedTempFile {
    let file = NamedTempFile::new().expect("Creating temp templates file failed");
    write(
        file.path(),
        br#"[
  { "itemId": "app1", "type": "Web Mapping Application", "dependencies": ["map1"] },
  { "itemId": "map1", "type": "Web Map", "dependencies": ["grp1"] },
  { "itemId": "grp1", "type": "Group" }
]"#,
    )
    .expect("Writing temp templates failed");
    file
}

#[test]
fn build_order_prints_dependencies_first() {
    let templates = create_templates_file();
    let mut cmd = Command::cargo_bin("solution-deployer").expect("Binary exists");

    cmd.arg("build-order").arg("--templates").arg(templates.path());

    cmd.assert()
        .success()
        .stdout(predicate::eq("grp1\nmap1\napp1\n"));
}

#[test]
fn build_order_reverse_prints_deletion_order() {
    let templates = create_templates_file();
    let mut cmd = Command::cargo_bin("solution-deployer").expect("Binary exists");

    cmd.arg("build-order")
        .arg("--templates")
        .arg(templates.path())
        .arg("--reverse");

    cmd.assert()
        .success()
        .stdout(predicate::eq("app1\nmap1\ngrp1\n"));
}

#[test]
fn build_order_fails_on_cycles() {
    let file = NamedTempFile::new().expect("temp file");
    write(
        file.path(),
        br#"[
  { "itemId": "a", "type": "Web Map", "dependencies": ["b"] },
  { "itemId": "b", "type": "Web Map", "dependencies": ["a"] }
]"#,
    )
    .expect("Writing temp templates failed");

    Command::cargo_bin("solution-deployer")
        .expect("Binary exists")
        .arg("build-order")
        .arg("--templates")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cyclic dependency"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use solution_deployer::cli::{run, Cli, Commands};

    // A missing templates file still gets as far as the first event.
    let cli = Cli {
        command: Commands::BuildOrder {
            templates: std::path::PathBuf::from("dummy.json"),
            reverse: false,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

/// A portal holding one deployed Solution with a single web map.
fn deployed_solution_portal(_method: &str, target: &str) -> String {
    let path = target.split('?').next().unwrap_or_default();
    let body = if path.ends_with("/relatedItems") {
        if target.contains("direction=reverse") {
            r#"{"relatedItems":[{"id":"sln1","type":"Solution"}]}"#
        } else {
            r#"{"relatedItems":[{"id":"map1","type":"Web Map","title":"Map","owner":"casey"}]}"#
        }
    } else if path.ends_with("/unprotect") || path.ends_with("/delete") {
        r#"{"success":true}"#
    } else if path.ends_with("/content/items/sln1/data") {
        r#"{"metadata":{"version":1},"templates":[{"itemId":"map1","type":"Web Map"}]}"#
    } else if path.ends_with("/content/items/sln1") {
        r#"{"id":"sln1","type":"Solution","title":"Solution","owner":"casey","ownerFolder":"fld1","typeKeywords":["Solution","Deployed"]}"#
    } else if path.ends_with("/community/self") {
        r#"{"username":"casey"}"#
    } else if path.ends_with("/search") {
        r#"{"total":0,"start":1,"num":100,"nextStart":-1,"results":[]}"#
    } else {
        r#"{"error":{"code":400,"message":"Item does not exist or is inaccessible."}}"#
    };
    body.to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_keeps_stdout_for_the_json_result() {
    let (base_url, requests) = common::serve(deployed_solution_portal).await;
    let config = NamedTempFile::new().expect("temp file");
    write(
        config.path(),
        format!("portal_url: {base_url}\njob_id: job7\nconsole_progress: true\n"),
    )
    .expect("Writing temp config failed");
    let config_path = config.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("solution-deployer")
            .expect("Binary exists")
            .env("ARCGIS_USERNAME", "casey")
            .env("ARCGIS_TOKEN", "token")
            .arg("delete")
            .arg("--config")
            .arg(&config_path)
            .arg("--solution-id")
            .arg("sln1")
            .output()
            .expect("run binary")
    })
    .await
    .expect("command task");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "delete failed: {stderr}");

    let result: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be exactly the JSON result");
    assert_eq!(result["deleted"]["items"][0]["id"], "map1");
    assert_eq!(result["failed"]["items"], serde_json::json!([]));

    // Console progress goes to stderr instead.
    assert!(stderr.contains("map1 job7 3 Finished"), "missing progress line: {stderr}");
    assert!(requests
        .lock()
        .unwrap()
        .iter()
        .any(|r| r.starts_with("POST") && r.contains("/items/sln1/delete")));
}
