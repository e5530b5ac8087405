//! Client facade over the transport and the gateway services.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::directory::{Collectors, Orchestrators};
use super::http::{DEFAULT_TIMEOUT, Transport};
use super::query::Queries;
use super::session::Credentials;
use crate::error::Result;

/// REST prefix of the usage collector plugin.
pub const DEFAULT_API_PREFIX: &str = "/rest/yorc-collector-plugin/latest";

/// Certificate verification for `https` gateways.
///
/// Exactly one of `ca_file` and `insecure` must be set for `https`; both are
/// ignored for `http`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// PEM file of the certificate authority to trust.
    pub ca_file: Option<PathBuf>,
    /// Skip certificate verification.
    pub insecure: bool,
}

/// Everything needed to build a [`UsageClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub credentials: Credentials,
    pub api_prefix: String,
    pub tls: TlsOptions,
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new(url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            url: url.into(),
            credentials,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            tls: TlsOptions::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client of the usage collection gateway.
///
/// Cheap to clone; clones share the transport and its session cookies.
#[derive(Debug, Clone)]
pub struct UsageClient {
    transport: Arc<Transport>,
}

impl UsageClient {
    /// Build a client. No request is sent until [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a malformed URL or TLS setup.
    pub fn new(options: &ClientOptions) -> Result<Self> {
        Ok(Self {
            transport: Arc::new(Transport::new(options)?),
        })
    }

    /// Log in; the session cookie is kept for later calls.
    ///
    /// # Errors
    ///
    /// [`UsageError::Auth`](crate::error::UsageError::Auth) when rejected.
    pub async fn login(&self) -> Result<()> {
        self.transport.login().await
    }

    /// Log out. Local cookies are left in place.
    ///
    /// # Errors
    ///
    /// Any non-200 answer or transport failure.
    pub async fn logout(&self) -> Result<()> {
        self.transport.logout().await
    }

    #[must_use]
    pub fn orchestrators(&self) -> Orchestrators<'_> {
        Orchestrators::new(&self.transport)
    }

    #[must_use]
    pub fn collectors(&self) -> Collectors<'_> {
        Collectors::new(&self.transport)
    }

    #[must_use]
    pub fn queries(&self) -> Queries<'_> {
        Queries::new(&self.transport)
    }

    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}
