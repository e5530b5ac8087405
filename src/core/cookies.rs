//! Session cookie store.
//!
//! Holds the cookies set by the gateway, keyed by `host[:port]`. The store is
//! owned by the transport and shared by every request issued through it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Url;
use reqwest::header::HeaderValue;

/// One `name=value` pair kept from a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// The server asked for the cookie to be removed (`Max-Age<=0` or a past `Expires`).
    pub expired: bool,
}

impl Cookie {
    /// Parse the leading `name=value` of a `Set-Cookie` header.
    ///
    /// Of the attributes only `Max-Age` and `Expires` are read, to notice
    /// cookies the server clears.
    #[must_use]
    pub fn parse_set_cookie(header: &str) -> Option<Self> {
        Self::parse_set_cookie_at(header, Utc::now())
    }

    fn parse_set_cookie_at(header: &str, now: DateTime<Utc>) -> Option<Self> {
        let mut parts = header.split(';');
        let pair = parts.next()?.trim();
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut max_age = None;
        let mut expires = None;
        for attribute in parts {
            let Some((key, raw)) = attribute.split_once('=') else {
                continue;
            };
            let raw = raw.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "max-age" => max_age = raw.parse::<i64>().ok(),
                "expires" => expires = parse_cookie_date(raw),
                _ => {}
            }
        }
        // Max-Age wins over Expires when both are present.
        let expired = match (max_age, expires) {
            (Some(seconds), _) => seconds <= 0,
            (None, Some(at)) => at <= now,
            (None, None) => false,
        };

        Some(Self {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            expired,
        })
    }
}

/// `Expires` value: RFC 1123 (`Thu, 01 Jan 1970 00:00:00 GMT`) or the older
/// dashed form (`Thu, 01-Jan-1970 00:00:00 GMT`).
fn parse_cookie_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%a, %d-%b-%Y %H:%M:%S GMT")
                .ok()
                .map(|at| at.and_utc())
        })
}

/// Thread-safe per-host cookie jar.
#[derive(Debug, Default)]
pub struct SessionStore {
    cookies: Mutex<HashMap<String, Vec<Cookie>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key used for a URL: host plus explicit or default port.
    #[must_use]
    pub fn host_key(url: &Url) -> String {
        let host = url.host_str().unwrap_or_default();
        match url.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Cookie>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record cookies for a host. Cookies with the same name are replaced,
    /// expired ones are removed.
    pub fn store(&self, host: &str, cookies: impl IntoIterator<Item = Cookie>) {
        let mut jar = self.lock();
        let entry = jar.entry(host.to_string()).or_default();
        for cookie in cookies {
            if cookie.expired {
                entry.retain(|c| c.name != cookie.name);
                continue;
            }
            match entry.iter_mut().find(|c| c.name == cookie.name) {
                Some(existing) => existing.value = cookie.value,
                None => entry.push(cookie),
            }
        }
    }

    /// Snapshot of the cookies held for a host.
    #[must_use]
    pub fn cookies(&self, host: &str) -> Vec<Cookie> {
        self.lock().get(host).cloned().unwrap_or_default()
    }

    /// `Cookie` request header for a host, `None` when the jar is empty.
    #[must_use]
    pub fn header_for(&self, host: &str) -> Option<HeaderValue> {
        let jar = self.lock();
        let cookies = jar.get(host).filter(|c| !c.is_empty())?;
        let joined = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }
}
