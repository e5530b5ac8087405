//! Test utilities for infra-usage.
//!
//! Provides gateway payload factories, a temporary directory helper, and
//! assertion macros for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_usage::test_utils::*;
//!
//! let body = make_test_status_body("DONE", serde_json::json!({"cpu": 42}));
//! let dir = TestDir::new();
//! dir.create_file("config.toml", &make_test_config_toml("http://127.0.0.1:8088"));
//! ```

use serde_json::{Value, json};
use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

use crate::core::client::DEFAULT_API_PREFIX;

// =============================================================================
// Gateway Payload Factories
// =============================================================================

/// Body of `GET /orchestrators`.
#[must_use]
pub fn make_test_orchestrators_body(names: &[&str]) -> Value {
    let orchestrators: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "href": format!("{DEFAULT_API_PREFIX}/orchestrators/{name}"),
            })
        })
        .collect();
    json!({ "data": { "orchestrators": orchestrators } })
}

/// Body of `GET /orchestrators/{o}/registry/infra_usage_collectors`.
#[must_use]
pub fn make_test_collectors_body(ids: &[&str]) -> Value {
    let infrastructures: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "origin": format!("{id}-plugin") }))
        .collect();
    json!({ "data": { "infrastructures": infrastructures } })
}

/// Body of `GET /orchestrators/{o}/infra_usage`; hrefs are used verbatim.
#[must_use]
pub fn make_test_tasks_body(hrefs: &[&str]) -> Value {
    let tasks: Vec<Value> = hrefs.iter().map(|href| json!({ "href": href })).collect();
    json!({ "data": { "tasks": tasks } })
}

/// Body of a query status call.
#[must_use]
pub fn make_test_status_body(status: &str, result_set: Value) -> Value {
    json!({ "data": { "status": status, "result_set": result_set } })
}

/// `{ "error": { "code", "message" } }` body of a failed call.
#[must_use]
pub fn make_test_error_body(code: i64, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}

/// Path of a query resource, as found in a `Location` header.
#[must_use]
pub fn make_test_query_location(orchestrator: &str, collector: &str, task: &str) -> String {
    format!("{DEFAULT_API_PREFIX}/orchestrators/{orchestrator}/infra_usage/{collector}/tasks/{task}")
}

/// A config file pointing at `url` with fast polling.
#[must_use]
pub fn make_test_config_toml(url: &str) -> String {
    format!(
        r#"[gateway]
url = "{url}"
user = "admin"
password = "changeme"
timeout_seconds = 5

[polling]
interval_ms = 10
max_attempts = 50

[output]
color = false
"#
    )
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// Isolated temporary directory, removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file in the temporary directory with the given content.
    ///
    /// Creates parent directories as needed.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
    }

    /// Read a file from the temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.inner.path().join(name))
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string is valid JSON.
#[macro_export]
macro_rules! assert_json_valid {
    ($json:expr) => {
        let json = $json;
        if let Err(e) = serde_json::from_str::<serde_json::Value>(json) {
            panic!(
                "Expected valid JSON, but parsing failed: {}\n\nJSON string:\n{}",
                e, json
            );
        }
    };
}

/// Assert that a string does NOT contain ANSI escape codes.
#[macro_export]
macro_rules! assert_no_ansi_codes {
    ($text:expr) => {
        let text = $text;
        assert!(
            !text.contains('\x1b'),
            "Expected string to NOT contain ANSI escape codes.\n\nActual string:\n{:?}",
            text
        );
    };
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Strip ANSI escape codes from a string.
#[must_use]
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}
