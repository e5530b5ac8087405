//! Orchestrator and usage collector directories.
//!
//! Pure reads: each call fetches a fresh listing from the gateway.

use reqwest::{Method, StatusCode};
use reqwest::header::HeaderMap;

use super::http::{Transport, expect_status, read_json};
use super::models::{CollectorList, DataEnvelope, Orchestrator, OrchestratorList, UsageCollector};
use crate::error::{Result, UsageError};

/// Orchestrators configured on the service.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrators<'a> {
    transport: &'a Transport,
}

impl<'a> Orchestrators<'a> {
    #[must_use]
    pub const fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// List the orchestrators configured on the service.
    ///
    /// # Errors
    ///
    /// Transport errors are propagated, any status but 200 is
    /// [`UsageError::HttpStatus`], and a malformed envelope is a decode error.
    pub async fn list(&self) -> Result<Vec<Orchestrator>> {
        let path = self.transport.api_path("/orchestrators");
        let response = self
            .transport
            .send(Method::GET, &path, None, HeaderMap::new())
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        let envelope: DataEnvelope<OrchestratorList> =
            read_json(response, "orchestrator list").await?;
        Ok(envelope.data.orchestrators)
    }

    /// Find an orchestrator by name.
    ///
    /// # Errors
    ///
    /// [`UsageError::OrchestratorNotFound`] with the known names when absent.
    pub async fn find(&self, name: &str) -> Result<Orchestrator> {
        let orchestrators = self.list().await?;
        let known = orchestrators.iter().map(|o| o.name.clone()).collect();
        orchestrators
            .into_iter()
            .find(|o| o.name == name)
            .ok_or_else(|| UsageError::OrchestratorNotFound {
                name: name.to_string(),
                known,
            })
    }
}

/// Usage collectors registered on orchestrators.
#[derive(Debug, Clone, Copy)]
pub struct Collectors<'a> {
    transport: &'a Transport,
}

impl<'a> Collectors<'a> {
    #[must_use]
    pub const fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// List the usage collectors registered for an orchestrator.
    ///
    /// # Errors
    ///
    /// Transport errors are propagated, any status but 200 is
    /// [`UsageError::HttpStatus`], and a malformed envelope is a decode error.
    pub async fn list(&self, orchestrator: &str) -> Result<Vec<UsageCollector>> {
        let path = self.transport.api_segments(&[
            "orchestrators",
            orchestrator,
            "registry",
            "infra_usage_collectors",
        ]);
        let response = self
            .transport
            .send(Method::GET, &path, None, HeaderMap::new())
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        let envelope: DataEnvelope<CollectorList> =
            read_json(response, &format!("collector list of {orchestrator}")).await?;
        Ok(envelope.data.infrastructures)
    }

    /// Find the collector handling a location type on an orchestrator.
    ///
    /// # Errors
    ///
    /// [`UsageError::CollectorNotFound`] when no collector has that id.
    pub async fn find(&self, orchestrator: &str, collector_id: &str) -> Result<UsageCollector> {
        self.list(orchestrator)
            .await?
            .into_iter()
            .find(|c| c.id == collector_id)
            .ok_or_else(|| UsageError::CollectorNotFound {
                orchestrator: orchestrator.to_string(),
                collector: collector_id.to_string(),
            })
    }
}
