use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ConnectorError, IntegrationClient, SourceDocument, endpoint};
use crate::db::enums::SystemType;
use crate::gateway::BundledCredential;

pub const NOTION_VERSION: &str = "2022-06-28";

/// Notion client. The workspace key is the database id to query.
pub struct NotionClient {
    http: reqwest::Client,
    base_url: url::Url,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl NotionClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self, ConnectorError> {
        Ok(Self {
            http,
            base_url: url::Url::parse(base_url)?,
        })
    }
}

#[async_trait]
impl IntegrationClient for NotionClient {
    fn system_type(&self) -> SystemType {
        SystemType::Notion
    }

    async fn fetch_documents(
        &self,
        credential: &BundledCredential,
    ) -> Result<Vec<SourceDocument>, ConnectorError> {
        let url = endpoint(
            &self.base_url,
            &["databases", credential.workspace_or_project_key.as_str(), "query"],
        )?;

        tracing::debug!(
            integration_id = %credential.integration_id,
            token = %credential.access_token.fingerprint(),
            database = %credential.workspace_or_project_key,
            "Querying Notion database"
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(credential.access_token.expose())
            .header("Notion-Version", NOTION_VERSION)
            .json(&json!({ "page_size": 50 }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::Status {
                system: SystemType::Notion,
                status: status.as_u16(),
            });
        }

        let body: QueryResponse = response.json().await.map_err(|e| ConnectorError::Decode {
            system: SystemType::Notion,
            message: e.to_string(),
        })?;

        Ok(body
            .results
            .into_iter()
            .map(|page| {
                let (title, body) = page_text(&page.properties);
                SourceDocument {
                    integration_id: credential.integration_id,
                    source: SystemType::Notion,
                    external_id: page.id,
                    title,
                    body,
                    url: page.url,
                }
            })
            .collect())
    }
}

/// Title property text, and the remaining rich-text properties joined as body.
fn page_text(properties: &Map<String, Value>) -> (String, String) {
    let mut title = String::new();
    let mut body = Vec::new();

    for property in properties.values() {
        match property.get("type").and_then(Value::as_str) {
            Some("title") => title = rich_text(property.get("title")),
            Some("rich_text") => {
                let text = rich_text(property.get("rich_text"));
                if !text.is_empty() {
                    body.push(text);
                }
            }
            _ => {}
        }
    }

    if title.is_empty() {
        title = "Untitled".to_string();
    }
    (title, body.join(" "))
}

fn rich_text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_array)
        .map(|spans| {
            spans
                .iter()
                .filter_map(|span| span.get("plain_text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}
