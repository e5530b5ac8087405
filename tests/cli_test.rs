//! End-to-end runs of the `infra-usage` binary against a mock gateway.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use infra_usage::test_utils::{
    TestDir, make_test_config_toml, make_test_query_location, make_test_status_body,
};
use infra_usage::{assert_contains, assert_no_ansi_codes, assert_not_contains};

use common::gateway::Gateway;
use common::logger::TestLogger;

const CLEARED_ENV: &[&str] = &[
    "INFRA_USAGE_URL",
    "INFRA_USAGE_USER",
    "INFRA_USAGE_PASSWORD",
    "INFRA_USAGE_CA_FILE",
    "INFRA_USAGE_INSECURE",
    "INFRA_USAGE_FORMAT",
    "INFRA_USAGE_PRETTY",
    "INFRA_USAGE_POLL_INTERVAL_MS",
    "INFRA_USAGE_MAX_POLL_ATTEMPTS",
    "INFRA_USAGE_NO_COLOR",
    "INFRA_USAGE_LOG",
    "INFRA_USAGE_LOG_FORMAT",
    "INFRA_USAGE_LOG_FILE",
    "RUST_LOG",
];

/// The binary with a private config file pointing at `url`.
fn infra_usage(dir: &TestDir, url: &str) -> Command {
    dir.create_file("config.toml", &make_test_config_toml(url));
    let mut cmd = Command::cargo_bin("infra-usage").unwrap();
    for key in CLEARED_ENV {
        cmd.env_remove(key);
    }
    cmd.env("INFRA_USAGE_CONFIG", dir.file_path("config.toml"))
        .env("NO_COLOR", "1");
    cmd
}

/// Run a prepared command off the async runtime so the mock server keeps serving.
async fn run(mut cmd: Command) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap()
}

async fn mount_report_flow(gateway: &Gateway, final_status: &str) -> String {
    gateway.mount_login().await;
    gateway.mount_logout().await;
    gateway.mount_orchestrators(&["o1"]).await;
    gateway.mount_collectors("o1", &["heappe"]).await;
    let location = make_test_query_location("o1", "heappe", "q1");
    Mock::given(method("POST"))
        .and(path(Gateway::api("/orchestrators/o1/infra_usage/heappe/cluster1")))
        .respond_with(ResponseTemplate::new(201).insert_header("location", location.clone()))
        .mount(&gateway.server)
        .await;
    gateway
        .mount_status(&location, make_test_status_body("RUNNING", json!({})), Some(1))
        .await;
    gateway
        .mount_status(
            &location,
            make_test_status_body(final_status, json!({"cpu": 42, "hours": 1.5})),
            None,
        )
        .await;
    Mock::given(method("DELETE"))
        .and(path(location.clone()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&gateway.server)
        .await;
    location
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("infra-usage")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("orchestrators"))
        .stdout(predicate::str::contains("collectors"));
}

#[test]
fn query_parameter_without_equals_is_rejected() {
    Command::cargo_bin("infra-usage")
        .unwrap()
        .args(["report", "-o", "o1", "-t", "heappe", "-l", "c1", "-q", "start"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key=value"));
}

#[test]
fn malformed_query_id_is_rejected() {
    Command::cargo_bin("infra-usage")
        .unwrap()
        .args(["status", "o1/heappe/q1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed query reference"));
}

#[tokio::test(flavor = "multi_thread")]
async fn report_prints_json_envelope_and_cleans_up() {
    let log = TestLogger::new("report_prints_json_envelope_and_cleans_up");
    log.phase("setup");
    let gateway = Gateway::start().await;
    let location = mount_report_flow(&gateway, "DONE").await;
    let dir = TestDir::new();

    log.phase("execute");
    let mut cmd = infra_usage(&dir, &gateway.uri());
    cmd.args([
        "report", "-o", "o1", "-t", "heappe", "-l", "cluster1", "-q", "start=2024-01-01", "--json",
    ]);
    let assert = run(cmd).await.success();

    log.phase("verify");
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let envelope: Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(envelope["schema_version"], "infra-usage.v1");
    assert_eq!(envelope["command"], "report");
    assert_eq!(envelope["data"]["id"], "o1/infra_usage/heappe/tasks/q1");
    assert_eq!(envelope["data"]["status"], "DONE");
    assert_eq!(envelope["data"]["result_set"]["cpu"], 42);
    assert_eq!(gateway.hits("GET", &location).await, 2);
    assert_eq!(gateway.hits("POST", "/logout").await, 1);
    log.finish_ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn report_prints_human_summary() {
    let gateway = Gateway::start().await;
    mount_report_flow(&gateway, "DONE").await;
    let dir = TestDir::new();

    let mut cmd = infra_usage(&dir, &gateway.uri());
    cmd.args(["report", "-o", "o1", "-t", "heappe", "-l", "cluster1"]);
    let assert = run(cmd).await.success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert_no_ansi_codes!(&stdout);
    assert_contains!(&stdout, "Status: DONE");
    assert_contains!(&stdout, "cpu");
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_report_exits_non_zero_after_printing() {
    let gateway = Gateway::start().await;
    mount_report_flow(&gateway, "FAILED").await;
    let dir = TestDir::new();

    let mut cmd = infra_usage(&dir, &gateway.uri());
    cmd.args(["report", "-o", "o1", "-t", "heappe", "-l", "cluster1", "--json"]);
    let assert = run(cmd).await.code(1);

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert_contains!(&stdout, "\"status\":\"FAILED\"");
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert_contains!(&stderr, "IU-S030");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_orchestrator_exits_not_found() {
    let gateway = Gateway::start().await;
    gateway.mount_login().await;
    gateway.mount_logout().await;
    gateway.mount_orchestrators(&["o1", "o2"]).await;
    let dir = TestDir::new();

    let mut cmd = infra_usage(&dir, &gateway.uri());
    cmd.args(["report", "-o", "nope", "-t", "heappe", "-l", "cluster1"]);
    run(cmd)
        .await
        .code(2)
        .stderr(predicate::str::contains("known orchestrators: o1, o2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_login_exits_with_auth_code() {
    let gateway = Gateway::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&gateway.server)
        .await;
    let dir = TestDir::new();

    let mut cmd = infra_usage(&dir, &gateway.uri());
    cmd.args(["orchestrators", "--json"]);
    let assert = run(cmd).await.code(5);

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    let error: Value = serde_json::from_str(stderr.lines().last().unwrap_or_default()).unwrap();
    assert_eq!(error["error_code"], "IU-A001");
}

#[tokio::test(flavor = "multi_thread")]
async fn orchestrators_lists_names() {
    let gateway = Gateway::start().await;
    gateway.mount_login().await;
    gateway.mount_logout().await;
    gateway.mount_orchestrators(&["o1", "o2"]).await;
    let dir = TestDir::new();

    let mut cmd = infra_usage(&dir, &gateway.uri());
    cmd.arg("orchestrators");
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("o1").and(predicate::str::contains("o2")));
}

#[test]
fn config_show_never_prints_password() {
    let dir = TestDir::new();
    let mut cmd = infra_usage(&dir, "http://127.0.0.1:1");
    cmd.args(["--password", "hunter2", "config", "show", "--json"]);
    let assert = cmd.assert().success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert_not_contains!(&stdout, "hunter2");
    let envelope: Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(envelope["data"]["url"], "http://127.0.0.1:1");
    assert_eq!(envelope["data"]["sources"]["url"], "config_file");
    assert_eq!(envelope["data"]["sources"]["password"], "cli");
}
