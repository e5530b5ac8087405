//! Login and logout against the gateway.
//!
//! A successful login leaves the session cookie in the transport's
//! [`SessionStore`](super::cookies::SessionStore); logout does not clear it,
//! the stale cookie is simply replaced by the next login.

use std::fmt;

use reqwest::header::{CONNECTION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};

use super::http::{Transport, error_from_response};
use crate::error::{Result, UsageError};

/// Username and password posted to `/login`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `application/x-www-form-urlencoded` login body.
    #[must_use]
    pub fn form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", &self.username)
            .append_pair("password", &self.password)
            .append_pair("submit", "Login")
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Transport {
    /// Log in with the transport's credentials. No retry.
    ///
    /// # Errors
    ///
    /// [`UsageError::Auth`] when the gateway answers anything but 200,
    /// transport errors when it cannot be reached.
    pub async fn login(&self) -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let body = self.credentials.form_body().into_bytes();
        let response = self
            .execute(Method::POST, "/login", Some(body), &headers)
            .await?;

        if response.status() != StatusCode::OK {
            let message = match error_from_response(response).await {
                UsageError::HttpStatus {
                    status, message, ..
                } if message.is_empty() => format!("HTTP {status}"),
                UsageError::HttpStatus { message, .. } => message,
                other => other.to_string(),
            };
            tracing::warn!(user = %self.credentials.username, %message, "login rejected");
            return Err(UsageError::Auth { message });
        }

        tracing::debug!(user = %self.credentials.username, "logged in");
        Ok(())
    }

    /// Log out and ask the server to close the connection.
    ///
    /// # Errors
    ///
    /// [`UsageError::HttpStatus`] on any status but 200.
    pub async fn logout(&self) -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let response = self
            .execute(Method::POST, "/logout", None, &headers)
            .await?;
        if response.status() != StatusCode::OK {
            return Err(error_from_response(response).await);
        }
        tracing::debug!("logged out");
        Ok(())
    }
}
