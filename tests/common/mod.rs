//! Common test utilities for integration tests.
//!
//! # Modules
//!
//! - `gateway`: wiremock stand-in for the usage collection gateway
//! - `logger`: phase-tracking test logger
//! - `log_capture`: tracing layer that records events for assertions

#![allow(dead_code)]

pub mod gateway;
pub mod log_capture;
pub mod logger;
