//! Clients for the external systems a tenant connects (Jira, Notion).
//!
//! Every client takes the bundled credential it should act with; none of
//! them hold credentials of their own.

pub mod jira;
pub mod notion;

pub use jira::JiraClient;
pub use notion::NotionClient;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ConnectorConfig;
use crate::db::enums::SystemType;
use crate::gateway::BundledCredential;

/// A document or task fetched from an external system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDocument {
    pub integration_id: Uuid,
    pub source: SystemType,
    pub external_id: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{system} responded with status {status}")]
    Status { system: SystemType, status: u16 },

    #[error("unexpected {system} payload: {message}")]
    Decode { system: SystemType, message: String },

    #[error("no client registered for {0}")]
    Unsupported(SystemType),

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

#[async_trait]
pub trait IntegrationClient: Send + Sync {
    fn system_type(&self) -> SystemType;

    async fn fetch_documents(
        &self,
        credential: &BundledCredential,
    ) -> Result<Vec<SourceDocument>, ConnectorError>;
}

/// Integration clients keyed by the system they talk to.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    clients: HashMap<SystemType, Arc<dyn IntegrationClient>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jira and Notion clients sharing one HTTP client.
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let mut registry = Self::new();
        registry.register(Arc::new(JiraClient::new(http.clone(), &config.jira_base_url)?));
        registry.register(Arc::new(NotionClient::new(http, &config.notion_base_url)?));
        Ok(registry)
    }

    pub fn register(&mut self, client: Arc<dyn IntegrationClient>) {
        self.clients.insert(client.system_type(), client);
    }

    pub fn get(
        &self,
        system_type: SystemType,
    ) -> Result<Arc<dyn IntegrationClient>, ConnectorError> {
        self.clients
            .get(&system_type)
            .cloned()
            .ok_or(ConnectorError::Unsupported(system_type))
    }
}

/// Appends path segments to `base`, keeping any path `base` already has.
pub(crate) fn endpoint(base: &url::Url, segments: &[&str]) -> Result<url::Url, ConnectorError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
