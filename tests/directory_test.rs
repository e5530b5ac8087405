//! Orchestrator and collector directory lookups.

mod common;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use infra_usage::error::UsageError;

use common::gateway::Gateway;
use common::logger::TestLogger;

#[tokio::test]
async fn lists_orchestrators_in_server_order() {
    let log = TestLogger::new("lists_orchestrators_in_server_order");
    let gateway = Gateway::start().await;
    gateway.mount_orchestrators(&["zeta", "alpha"]).await;

    let orchestrators = gateway.client().orchestrators().list().await.unwrap();

    let names: Vec<&str> = orchestrators.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["zeta", "alpha"]);
    assert!(orchestrators[0].href.ends_with("/orchestrators/zeta"));
    log.finish_ok();
}

#[tokio::test]
async fn empty_listing_is_not_an_error() {
    let gateway = Gateway::start().await;
    Mock::given(method("GET"))
        .and(path(Gateway::api("/orchestrators")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {}})))
        .mount(&gateway.server)
        .await;

    let orchestrators = gateway.client().orchestrators().list().await.unwrap();

    assert!(orchestrators.is_empty());
}

#[tokio::test]
async fn find_orchestrator_by_name() {
    let gateway = Gateway::start().await;
    gateway.mount_orchestrators(&["o1", "o2"]).await;

    let found = gateway.client().orchestrators().find("o2").await.unwrap();

    assert_eq!(found.name, "o2");
}

#[tokio::test]
async fn unknown_orchestrator_lists_known_names() {
    let gateway = Gateway::start().await;
    gateway.mount_orchestrators(&["o1", "o2"]).await;

    let err = gateway
        .client()
        .orchestrators()
        .find("o3")
        .await
        .unwrap_err();

    match &err {
        UsageError::OrchestratorNotFound { name, known } => {
            assert_eq!(name, "o3");
            assert_eq!(known, &["o1", "o2"]);
        }
        other => panic!("expected OrchestratorNotFound, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "no orchestrator o3 found, known orchestrators: o1, o2"
    );
    assert_eq!(err.exit_code(), infra_usage::ExitCode::NotFound);
}

#[tokio::test]
async fn lists_collectors_of_an_orchestrator() {
    let gateway = Gateway::start().await;
    gateway.mount_collectors("o1", &["heappe", "slurm"]).await;

    let collectors = gateway.client().collectors().list("o1").await.unwrap();

    assert_eq!(collectors.len(), 2);
    assert_eq!(collectors[0].id, "heappe");
    assert_eq!(collectors[0].origin, "heappe-plugin");
}

#[tokio::test]
async fn find_collector_by_location_type() {
    let gateway = Gateway::start().await;
    gateway.mount_collectors("o1", &["heappe", "slurm"]).await;

    let found = gateway
        .client()
        .collectors()
        .find("o1", "slurm")
        .await
        .unwrap();

    assert_eq!(found.id, "slurm");
}

#[tokio::test]
async fn missing_collector_is_not_found() {
    let gateway = Gateway::start().await;
    gateway.mount_collectors("o1", &["heappe"]).await;

    let err = gateway
        .client()
        .collectors()
        .find("o1", "kubernetes")
        .await
        .unwrap_err();

    assert!(
        matches!(
            &err,
            UsageError::CollectorNotFound { orchestrator, collector }
                if orchestrator == "o1" && collector == "kubernetes"
        ),
        "{err:?}"
    );
    assert_eq!(
        err.to_string(),
        "found no collector for kubernetes on orchestrator o1"
    );
}

#[tokio::test]
async fn collector_listing_failure_is_propagated() {
    let gateway = Gateway::start().await;
    Mock::given(method("GET"))
        .and(path(Gateway::api(
            "/orchestrators/o1/registry/infra_usage_collectors",
        )))
        .respond_with(ResponseTemplate::new(404))
        .mount(&gateway.server)
        .await;

    let err = gateway.client().collectors().list("o1").await.unwrap_err();

    assert_eq!(err.http_status(), Some(404));
}

#[tokio::test]
async fn listings_require_ok() {
    let gateway = Gateway::start().await;
    Mock::given(method("GET"))
        .and(path(Gateway::api("/orchestrators")))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({"data": {}})))
        .mount(&gateway.server)
        .await;
    Mock::given(method("GET"))
        .and(path(Gateway::api(
            "/orchestrators/o1/registry/infra_usage_collectors",
        )))
        .respond_with(ResponseTemplate::new(204))
        .mount(&gateway.server)
        .await;
    let client = gateway.client();

    let err = client.orchestrators().list().await.unwrap_err();
    assert_eq!(err.http_status(), Some(202));

    let err = client.collectors().list("o1").await.unwrap_err();
    assert_eq!(err.http_status(), Some(204));
}
