use crate::AppState;
use crate::db::models::{ApiResponse, OrganizationInfo};
use crate::error::AppResult;
use crate::gateway::{CredentialBundle, TenantDomain};
use crate::knowledge::{Answer, KnowledgeSummary, SearchHit, SyncReport};
use crate::middleware::AuthenticatedCaller;
use crate::validation::{AnswerParams, SearchParams, ValidatedQuery};
use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
pub struct TenantResponse {
    pub domain: TenantDomain,
    pub organization: OrganizationInfo,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub domain: TenantDomain,
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub domain: TenantDomain,
    pub question: String,
    pub context_found: bool,
    pub answer: Option<Answer>,
}

/// Cancels in-flight store reads when axum drops the handler future.
fn request_cancellation() -> (CancellationToken, tokio_util::sync::DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedCaller,
) -> AppResult<Json<ApiResponse<TenantResponse>>> {
    let (cancel, _guard) = request_cancellation();
    let resolved = state
        .gateway
        .resolve_organization(caller.email(), &cancel)
        .await?;

    let response = TenantResponse {
        domain: resolved.tag.domain().clone(),
        organization: resolved.organization,
    };
    Ok(Json(ApiResponse::success(response, "Tenant resolved")))
}

pub async fn get_credentials(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedCaller,
) -> AppResult<Json<ApiResponse<CredentialBundle>>> {
    let (cancel, _guard) = request_cancellation();
    let bundle = state
        .gateway
        .credentials_for_identity(caller.email(), &cancel)
        .await?;

    let message = if bundle.warnings().is_empty() {
        "Credentials resolved"
    } else {
        "Credentials resolved with warnings"
    };
    Ok(Json(ApiResponse::success(bundle, message)))
}

pub async fn sync_knowledge(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedCaller,
) -> AppResult<Json<ApiResponse<SyncReport>>> {
    let (cancel, _guard) = request_cancellation();
    let bundle = state
        .gateway
        .credentials_for_identity(caller.email(), &cancel)
        .await?;

    let report = state
        .knowledge
        .ingest(&state.gateway, &bundle, &state.connectors)
        .await;

    let message = if report.failures.is_empty() {
        "Knowledge synced"
    } else {
        "Knowledge synced with failures"
    };
    Ok(Json(ApiResponse::success(report, message)))
}

pub async fn search_knowledge(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedCaller,
    ValidatedQuery(params): ValidatedQuery<SearchParams>,
) -> AppResult<Json<ApiResponse<SearchResponse>>> {
    let (cancel, _guard) = request_cancellation();
    let resolved = state
        .gateway
        .resolve_organization(caller.email(), &cancel)
        .await?;

    let results = state
        .knowledge
        .search(&resolved.tag, &params.q, params.limit())
        .into_iter()
        .map(|hit| hit.into_inner())
        .collect();

    let response = SearchResponse {
        domain: resolved.tag.domain().clone(),
        query: params.q,
        results,
    };
    Ok(Json(ApiResponse::success(response, "Search completed")))
}

pub async fn answer_question(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedCaller,
    ValidatedQuery(params): ValidatedQuery<AnswerParams>,
) -> AppResult<Json<ApiResponse<AnswerResponse>>> {
    let (cancel, _guard) = request_cancellation();
    let resolved = state
        .gateway
        .resolve_organization(caller.email(), &cancel)
        .await?;

    let answer = state
        .knowledge
        .answer(&resolved.tag, &params.q)
        .map(|answer| answer.into_inner());

    let message = if answer.is_some() {
        "Answer found"
    } else {
        "No matching knowledge for this question"
    };
    let response = AnswerResponse {
        domain: resolved.tag.domain().clone(),
        question: params.q,
        context_found: answer.is_some(),
        answer,
    };
    Ok(Json(ApiResponse::success(response, message)))
}

pub async fn knowledge_summary(
    State(state): State<Arc<AppState>>,
    caller: AuthenticatedCaller,
) -> AppResult<Json<ApiResponse<KnowledgeSummary>>> {
    let (cancel, _guard) = request_cancellation();
    let resolved = state
        .gateway
        .resolve_organization(caller.email(), &cancel)
        .await?;

    let summary = state.knowledge.summary(&resolved.tag);
    Ok(Json(ApiResponse::success(summary, "Knowledge summary")))
}
