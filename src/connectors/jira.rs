use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{ConnectorError, IntegrationClient, SourceDocument, endpoint};
use crate::db::enums::SystemType;
use crate::gateway::BundledCredential;

const MAX_RESULTS: &str = "50";

/// Atlassian cloud Jira client. `scope_id` is the cloud id, the project key
/// selects the issues.
pub struct JiraClient {
    http: reqwest::Client,
    base_url: url::Url,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Deserialize)]
struct Issue {
    key: String,
    #[serde(rename = "self")]
    self_url: Option<String>,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: Option<Value>,
}

impl JiraClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self, ConnectorError> {
        Ok(Self {
            http,
            base_url: url::Url::parse(base_url)?,
        })
    }
}

#[async_trait]
impl IntegrationClient for JiraClient {
    fn system_type(&self) -> SystemType {
        SystemType::Jira
    }

    async fn fetch_documents(
        &self,
        credential: &BundledCredential,
    ) -> Result<Vec<SourceDocument>, ConnectorError> {
        let url = endpoint(
            &self.base_url,
            &[credential.scope_id.as_str(), "rest", "api", "3", "search"],
        )?;
        let jql = project_jql(&credential.workspace_or_project_key);

        tracing::debug!(
            integration_id = %credential.integration_id,
            token = %credential.access_token.fingerprint(),
            project = %credential.workspace_or_project_key,
            "Searching Jira issues"
        );

        let response = self
            .http
            .get(url)
            .bearer_auth(credential.access_token.expose())
            .query(&[("jql", jql.as_str()), ("maxResults", MAX_RESULTS)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::Status {
                system: SystemType::Jira,
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response.json().await.map_err(|e| ConnectorError::Decode {
            system: SystemType::Jira,
            message: e.to_string(),
        })?;

        Ok(body
            .issues
            .into_iter()
            .map(|issue| SourceDocument {
                integration_id: credential.integration_id,
                source: SystemType::Jira,
                body: issue
                    .fields
                    .description
                    .as_ref()
                    .map(plain_text)
                    .unwrap_or_default(),
                title: format!("{}: {}", issue.key, issue.fields.summary),
                external_id: issue.key,
                url: issue.self_url,
            })
            .collect())
    }
}

/// JQL restricting the search to one project; the key is always a quoted literal.
fn project_jql(project_key: &str) -> String {
    let escaped = project_key.replace('\\', "\\\\").replace('"', "\\\"");
    format!("project = \"{}\"", escaped)
}

/// Flattens an Atlassian document (or a plain string) into text.
fn plain_text(value: &Value) -> String {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.push(s.clone()),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    out.push(text.clone());
                }
                if let Some(Value::Array(children)) = map.get("content") {
                    children.iter().for_each(|child| collect(child, out));
                }
            }
            Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
            _ => {}
        }
    }

    let mut parts = Vec::new();
    collect(value, &mut parts);
    parts.join(" ")
}
