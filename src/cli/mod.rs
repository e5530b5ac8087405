//! CLI argument parsing and command dispatch.

pub mod args;
pub mod config;
pub mod directory;
pub mod query;
pub mod report;

pub use args::{Cli, Commands, OutputFormat};

use crate::core::UsageClient;
use crate::error::Result;
use crate::storage::ResolvedConfig;

/// Build a client and log in.
pub(crate) async fn connect(config: &ResolvedConfig) -> Result<UsageClient> {
    let client = UsageClient::new(&config.client_options())?;
    tracing::debug!(url = %client.transport().base_url(), user = %config.user, "logging in");
    client.login().await?;
    Ok(client)
}

/// Log out; a failure here does not change the command's outcome.
pub(crate) async fn disconnect(client: &UsageClient) {
    if let Err(err) = client.logout().await {
        tracing::warn!(error = %err, "logout failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClientOptions, Credentials};
    use tracing_test::traced_test;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    #[traced_test]
    async fn failed_logout_only_warns() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logout"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        let client =
            UsageClient::new(&ClientOptions::new(server.uri(), Credentials::new("a", "b"))).unwrap();

        disconnect(&client).await;

        assert!(logs_contain("logout failed"));
    }
}
