//! HTTP transport to the authentication gateway.
//!
//! Every call goes through [`Transport::send`], which attaches the session
//! cookies, records the ones the gateway sets, and logs in again once when the
//! gateway answers 403 because the session expired.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, SET_COOKIE};
use reqwest::{Certificate, Client, ClientBuilder, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::client::{ClientOptions, TlsOptions};
use super::cookies::{Cookie, SessionStore};
use super::models::ErrorEnvelope;
use super::session::Credentials;
use crate::error::{Result, UsageError};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trim trailing slashes and default to `http://` when no scheme is given.
///
/// # Errors
///
/// Returns [`UsageError::ConfigInvalid`] when the result is not a valid URL.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let invalid = |message: String| UsageError::ConfigInvalid {
        key: "url".to_string(),
        value: raw.to_string(),
        message,
    };

    let raw_trimmed = raw.trim();
    let (scheme, rest) = match raw_trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => ("http".to_string(), raw_trimmed),
    };
    if scheme != "http" && scheme != "https" {
        return Err(invalid(format!("unsupported scheme '{scheme}', use http or https")));
    }

    let rest = rest.trim_end_matches('/');
    if rest.is_empty() || rest.starts_with('/') {
        return Err(invalid("gateway URL has no host".to_string()));
    }
    let url = format!("{scheme}://{rest}");

    let parsed =
        Url::parse(&url).map_err(|e| invalid(format!("malformed gateway URL: {e}")))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("gateway URL has no host".to_string()));
    }
    Ok(url)
}

/// Build a configured HTTP client.
///
/// `https` gateways need exactly one of a CA file or insecure mode.
///
/// # Errors
///
/// Returns a configuration error for an invalid TLS setup, or a transport
/// error if client construction fails.
pub fn build_client(base_url: &str, tls: &TlsOptions, timeout: Duration) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(format!("infra-usage/{}", env!("CARGO_PKG_VERSION")));

    if base_url.to_ascii_lowercase().starts_with("https://") {
        builder = match (&tls.ca_file, tls.insecure) {
            (Some(_), true) => {
                return Err(UsageError::ConfigInvalid {
                    key: "tls".to_string(),
                    value: "ca_file + insecure".to_string(),
                    message: "choose either a certificate authority file or insecure mode"
                        .to_string(),
                });
            }
            (None, false) => {
                return Err(UsageError::ConfigInvalid {
                    key: "tls.ca_file".to_string(),
                    value: String::new(),
                    message: "a certificate authority file is required in TLS verify mode"
                        .to_string(),
                });
            }
            (Some(path), false) => builder.add_root_certificate(load_ca(path)?),
            (None, true) => {
                tracing::warn!("TLS certificate verification disabled");
                builder.danger_accept_invalid_certs(true)
            }
        };
    }

    builder.build().map_err(|e| UsageError::Transport {
        message: e.to_string(),
    })
}

fn load_ca(path: &Path) -> Result<Certificate> {
    let invalid = |message: String| UsageError::ConfigInvalid {
        key: "tls.ca_file".to_string(),
        value: path.display().to_string(),
        message,
    };
    let pem = std::fs::read(path)
        .map_err(|e| invalid(format!("failed to read certificate authority file: {e}")))?;
    Certificate::from_pem(&pem)
        .map_err(|e| invalid(format!("not a valid certificate authority: {e}")))
}

/// Authenticated request channel to one gateway.
#[derive(Debug)]
pub struct Transport {
    client: Client,
    base_url: String,
    api_prefix: String,
    pub(crate) credentials: Credentials,
    cookies: SessionStore,
    timeout_secs: u64,
}

impl Transport {
    /// Create a transport from client options.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed URL or TLS configuration.
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let base_url = normalize_base_url(&options.url)?;
        let client = build_client(&base_url, &options.tls, options.timeout)?;
        Ok(Self {
            client,
            base_url,
            api_prefix: options.api_prefix.trim_end_matches('/').to_string(),
            credentials: options.credentials.clone(),
            cookies: SessionStore::new(),
            timeout_secs: options.timeout.as_secs(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// Path of an API resource, e.g. `api_path("/orchestrators")`.
    #[must_use]
    pub fn api_path(&self, resource: &str) -> String {
        format!("{}{}", self.api_prefix, resource)
    }

    /// Path of an API resource built from raw segments, each percent-encoded.
    #[must_use]
    pub fn api_segments(&self, segments: &[&str]) -> String {
        let mut path = self.api_prefix.clone();
        for segment in segments {
            path.push('/');
            path.push_str(&urlencoding::encode(segment));
        }
        path
    }

    /// The cookie jar shared by every request of this transport.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.cookies
    }

    /// Send an API request, re-authenticating once on 403.
    ///
    /// `Accept` and `Content-Type` default to `application/json`; entries in
    /// `headers` replace them.
    ///
    /// # Errors
    ///
    /// Network failures, a rejected re-login, or any non-2xx final status.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        headers: HeaderMap,
    ) -> Result<Response> {
        let mut merged = json_headers();
        merged.extend(headers);

        let response = self
            .execute(method.clone(), path, body.clone(), &merged)
            .await?;
        if response.status() != StatusCode::FORBIDDEN {
            return check_success(response).await;
        }

        tracing::info!(%method, path, "session rejected, logging in again");
        self.login().await?;

        // The replay is final: a second 403 goes back to the caller.
        let replay = self.execute(method, path, body, &merged).await?;
        check_success(replay).await
    }

    /// One request with no retry and no status check.
    pub(crate) async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        headers: &HeaderMap,
    ) -> Result<Response> {
        let url = Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            UsageError::Config(format!("invalid request URL {}{path}: {e}", self.base_url))
        })?;

        let mut headers = headers.clone();
        if let Some(cookie) = self.cookies.header_for(&SessionStore::host_key(&url)) {
            headers.insert(COOKIE, cookie);
        }

        tracing::debug!(%method, %url, "sending request");
        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UsageError::from_reqwest(&e, self.timeout_secs))?;
        tracing::debug!(status = response.status().as_u16(), "received response");

        self.remember_cookies(&response);
        Ok(response)
    }

    fn remember_cookies(&self, response: &Response) {
        let cookies: Vec<Cookie> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(Cookie::parse_set_cookie)
            .collect();
        if !cookies.is_empty() {
            self.cookies
                .store(&SessionStore::host_key(response.url()), cookies);
        }
    }

    /// Request timeout, in seconds, reported by timeout errors.
    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Turn a failed response into [`UsageError::HttpStatus`].
///
/// The body is read as `{error:{code,message}}`; anything unreadable yields an
/// empty message.
pub async fn error_from_response(response: Response) -> UsageError {
    let status = response.status().as_u16();
    let body = response.bytes().await.unwrap_or_default();
    let envelope: ErrorEnvelope = serde_json::from_slice(&body).unwrap_or_default();
    UsageError::HttpStatus {
        status,
        code: envelope.error.code,
        message: envelope.error.message,
    }
}

async fn check_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

/// Accept only `expected`; any other status, 2xx included, is an error.
///
/// # Errors
///
/// Returns [`UsageError::HttpStatus`] for any other status.
pub async fn expect_status(response: Response, expected: StatusCode) -> Result<Response> {
    if response.status() == expected {
        return Ok(response);
    }
    match error_from_response(response).await {
        UsageError::HttpStatus {
            status,
            code,
            message,
        } if message.is_empty() => Err(UsageError::HttpStatus {
            status,
            code,
            message: format!("unexpected status, expected {expected}"),
        }),
        other => Err(other),
    }
}

/// Read a JSON body, mapping parse failures to [`UsageError::Decode`].
///
/// # Errors
///
/// Returns a transport error if the body cannot be read, or a decode error.
pub async fn read_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let body = response.bytes().await.map_err(|e| UsageError::Transport {
        message: format!("unable to read {context} response: {e}"),
    })?;
    serde_json::from_slice(&body).map_err(|e| UsageError::decode(context, e))
}
