//! A wiremock stand-in for the usage collection gateway.

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use infra_usage::core::{ClientOptions, Credentials, DEFAULT_API_PREFIX, PollPolicy, UsageClient};
use infra_usage::test_utils::{make_test_collectors_body, make_test_orchestrators_body};

pub const SESSION_COOKIE: &str = "JSESSIONID=abc123";

/// Mock server plus helpers mounting the common gateway endpoints.
pub struct Gateway {
    pub server: MockServer,
}

impl Gateway {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Full path of an API resource.
    pub fn api(resource: &str) -> String {
        format!("{DEFAULT_API_PREFIX}{resource}")
    }

    /// Client pointing at this gateway with admin/changeme credentials.
    pub fn client(&self) -> UsageClient {
        let options = ClientOptions::new(self.uri(), Credentials::new("admin", "changeme"))
            .with_timeout(Duration::from_secs(5));
        UsageClient::new(&options).unwrap()
    }

    /// Polling fast enough for tests.
    pub fn fast_poll(max_attempts: Option<u32>) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(5)).with_max_attempts(max_attempts)
    }

    /// Login accepting admin/changeme and setting [`SESSION_COOKIE`].
    pub async fn mount_login(&self) {
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_string_contains("username=admin"))
            .and(body_string_contains("password=changeme"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", format!("{SESSION_COOKIE}; Path=/; HttpOnly")),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mount_logout(&self) {
        Mock::given(method("POST"))
            .and(path("/logout"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_orchestrators(&self, names: &[&str]) {
        Mock::given(method("GET"))
            .and(path(Self::api("/orchestrators")))
            .respond_with(ResponseTemplate::new(200).set_body_json(make_test_orchestrators_body(names)))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_collectors(&self, orchestrator: &str, ids: &[&str]) {
        Mock::given(method("GET"))
            .and(path(Self::api(&format!(
                "/orchestrators/{orchestrator}/registry/infra_usage_collectors"
            ))))
            .respond_with(ResponseTemplate::new(200).set_body_json(make_test_collectors_body(ids)))
            .mount(&self.server)
            .await;
    }

    /// Query status answered with `body`, optionally for a limited number of calls.
    pub async fn mount_status(&self, query_path: &str, body: Value, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(query_path.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body));
        match times {
            Some(n) => mock.up_to_n_times(n).mount(&self.server).await,
            None => mock.mount(&self.server).await,
        }
    }

    /// Number of received requests matching `method` and `path`.
    pub async fn hits(&self, http_method: &str, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
            .count()
    }
}
