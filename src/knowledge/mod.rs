//! Tenant-scoped document index.
//!
//! Documents are only ever stored as [`ScopedArtifact`]s tagged by the
//! gateway, and a search only looks at artifacts carrying the caller's tag.
//! Answers are extracted from the caller's top hits and keep their tag.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use uuid::Uuid;

use crate::connectors::{ConnectorRegistry, SourceDocument};
use crate::db::enums::SystemType;
use crate::gateway::{CredentialBundle, ScopedArtifact, TenantDomain, TenantGateway, TenantTag};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
/// Hits an answer is assembled from.
pub const ANSWER_CONTEXT_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub integration_id: Uuid,
    pub system_type: SystemType,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub organization_id: Uuid,
    pub ingested: usize,
    pub retained: usize,
    pub failures: Vec<SyncFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub score: usize,
    pub document: SourceDocument,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSource {
    pub integration_id: Uuid,
    pub source: SystemType,
    pub title: String,
    pub url: Option<String>,
    pub score: usize,
}

/// Extractive answer: the best matching passage of each top hit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question: String,
    pub text: String,
    /// Top hit score over the best possible score for the question, 0..=1.
    pub confidence: f64,
    pub sources: Vec<AnswerSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    NotSynced,
    Empty,
    Ready,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDocuments {
    pub system_type: SystemType,
    pub documents: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSummary {
    pub organization_id: Uuid,
    pub domain: TenantDomain,
    pub status: IndexStatus,
    pub total_documents: usize,
    pub by_system: Vec<SystemDocuments>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

struct TenantDocuments {
    documents: Vec<ScopedArtifact<SourceDocument>>,
    synced_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct KnowledgeIndex {
    tenants: RwLock<HashMap<TenantTag, TenantDocuments>>,
}

impl KnowledgeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches documents for every credential in `bundle` and replaces the
    /// tenant's documents with them. Documents of integrations whose fetch
    /// failed are kept from the previous sync.
    pub async fn ingest(
        &self,
        gateway: &TenantGateway,
        bundle: &CredentialBundle,
        registry: &ConnectorRegistry,
    ) -> SyncReport {
        let tag = bundle.tag();
        let fetches = bundle.credentials().iter().map(|credential| async move {
            let result = match registry.get(credential.system_type) {
                Ok(client) => client.fetch_documents(credential).await,
                Err(err) => Err(err),
            };
            (credential, result)
        });

        let mut documents = Vec::new();
        let mut failures = Vec::new();
        for (credential, result) in join_all(fetches).await {
            match result {
                Ok(fetched) => documents.extend(
                    fetched
                        .into_iter()
                        .map(|doc| gateway.scope_derived_artifact(doc, &tag)),
                ),
                Err(err) => {
                    tracing::warn!(
                        organization_id = %tag.organization_id(),
                        integration_id = %credential.integration_id,
                        system_type = %credential.system_type,
                        token = %credential.access_token.fingerprint(),
                        error = %err,
                        "Document fetch failed, keeping previous documents"
                    );
                    failures.push(SyncFailure {
                        integration_id: credential.integration_id,
                        system_type: credential.system_type,
                        message: err.to_string(),
                    });
                }
            }
        }

        let ingested = documents.len();
        let failed: HashSet<Uuid> = failures.iter().map(|f| f.integration_id).collect();
        let retained = self.replace_tenant(&tag, documents, &failed);

        tracing::info!(
            organization_id = %tag.organization_id(),
            ingested,
            retained,
            failures = failures.len(),
            "Knowledge sync finished"
        );

        SyncReport {
            organization_id: tag.organization_id(),
            ingested,
            retained,
            failures,
        }
    }

    /// Swaps the tenant's documents, keeping previous ones from `keep`
    /// integrations. Returns how many were kept.
    fn replace_tenant(
        &self,
        tag: &TenantTag,
        mut documents: Vec<ScopedArtifact<SourceDocument>>,
        keep: &HashSet<Uuid>,
    ) -> usize {
        let mut tenants = self.tenants.write().unwrap_or_else(|e| e.into_inner());
        let previous = tenants
            .remove(tag)
            .map(|tenant| tenant.documents)
            .unwrap_or_default();
        let before = documents.len();
        documents.extend(
            previous
                .into_iter()
                .filter(|doc| doc.belongs_to(tag) && keep.contains(&doc.artifact().integration_id)),
        );
        let retained = documents.len() - before;
        tenants.insert(
            tag.clone(),
            TenantDocuments {
                documents,
                synced_at: Utc::now(),
            },
        );
        retained
    }

    /// Ranks the caller's documents by how many query terms they contain.
    pub fn search(
        &self,
        tag: &TenantTag,
        query: &str,
        limit: usize,
    ) -> Vec<ScopedArtifact<SearchHit>> {
        let terms = terms(query);
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let tenants = self.tenants.read().unwrap_or_else(|e| e.into_inner());
        let Some(tenant) = tenants.get(tag) else {
            return Vec::new();
        };

        let mut hits: Vec<ScopedArtifact<SearchHit>> = tenant
            .documents
            .iter()
            .filter(|doc| doc.belongs_to(tag))
            .filter_map(|doc| {
                let score = score(doc.artifact(), &terms);
                (score > 0).then(|| doc.clone().map(|document| SearchHit { score, document }))
            })
            .collect();

        hits.sort_by(|a, b| {
            b.artifact()
                .score
                .cmp(&a.artifact().score)
                .then_with(|| a.artifact().document.title.cmp(&b.artifact().document.title))
        });
        hits.truncate(limit);
        hits
    }

    /// Answers `question` from the caller's best matching documents.
    ///
    /// Returns `None` when no document of the tenant matches. The answer is
    /// derived from the top hit with [`ScopedArtifact::map`], so it carries
    /// the same tag as the documents it was built from.
    pub fn answer(&self, tag: &TenantTag, question: &str) -> Option<ScopedArtifact<Answer>> {
        let terms = terms(question);
        let mut hits = self.search(tag, question, ANSWER_CONTEXT_LIMIT).into_iter();
        let top = hits.next()?;
        let rest: Vec<SearchHit> = hits
            .filter(|hit| hit.belongs_to(tag))
            .map(ScopedArtifact::into_inner)
            .collect();

        let best_possible = 3 * terms.len();
        Some(top.map(|top| {
            let confidence = (top.score as f64 / best_possible as f64).min(1.0);
            let hits: Vec<SearchHit> = std::iter::once(top).chain(rest).collect();
            let text = hits
                .iter()
                .map(|hit| passage(&hit.document, &terms))
                .collect::<Vec<_>>()
                .join("\n\n");
            let sources = hits
                .into_iter()
                .map(|hit| AnswerSource {
                    integration_id: hit.document.integration_id,
                    source: hit.document.source,
                    title: hit.document.title,
                    url: hit.document.url,
                    score: hit.score,
                })
                .collect();
            Answer {
                question: question.to_string(),
                text,
                confidence,
                sources,
            }
        }))
    }

    pub fn summary(&self, tag: &TenantTag) -> KnowledgeSummary {
        let tenants = self.tenants.read().unwrap_or_else(|e| e.into_inner());
        let tenant = tenants.get(tag);

        let mut counts: HashMap<SystemType, usize> = HashMap::new();
        for doc in tenant.iter().flat_map(|t| &t.documents) {
            if doc.belongs_to(tag) {
                *counts.entry(doc.artifact().source).or_default() += 1;
            }
        }
        let mut by_system: Vec<SystemDocuments> = counts
            .into_iter()
            .map(|(system_type, documents)| SystemDocuments {
                system_type,
                documents,
            })
            .collect();
        by_system.sort_by_key(|s| s.system_type.as_str());

        let total_documents = by_system.iter().map(|s| s.documents).sum();
        let status = match (tenant, total_documents) {
            (None, _) => IndexStatus::NotSynced,
            (Some(_), 0) => IndexStatus::Empty,
            (Some(_), _) => IndexStatus::Ready,
        };

        KnowledgeSummary {
            organization_id: tag.organization_id(),
            domain: tag.domain().clone(),
            status,
            total_documents,
            by_system,
            last_synced_at: tenant.map(|t| t.synced_at),
        }
    }

    pub fn document_count(&self, tag: &TenantTag) -> usize {
        self.tenants
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(tag)
            .map_or(0, |tenant| tenant.documents.len())
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

// Title matches count double.
fn score(document: &SourceDocument, query: &HashSet<String>) -> usize {
    let title = terms(&document.title);
    let body = terms(&document.body);
    query
        .iter()
        .map(|t| 2 * usize::from(title.contains(t)) + usize::from(body.contains(t)))
        .sum()
}

/// `title: sentence` for the body sentence sharing most terms with the
/// question, or just the title when no sentence matches.
fn passage(document: &SourceDocument, query: &HashSet<String>) -> String {
    let best = document
        .body
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .enumerate()
        .map(|(i, sentence)| (terms(sentence).intersection(query).count(), Reverse(i), sentence))
        .filter(|(matched, _, _)| *matched > 0)
        .max();

    match best {
        Some((_, _, sentence)) => format!("{}: {}", document.title, sentence),
        None => document.title.clone(),
    }
}
