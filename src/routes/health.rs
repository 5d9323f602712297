use crate::AppState;
use crate::db::models::api::{ApiResponse, error_codes};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub store: &'static str,
    pub cache_enabled: bool,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.gateway.health().await {
        Ok(()) => {
            let status = HealthStatus {
                status: "ok",
                store: "reachable",
                cache_enabled: state.gateway.cache().is_some(),
            };
            (StatusCode::OK, Json(ApiResponse::success(status, "Service healthy"))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed to reach store");
            let response = ApiResponse::<()>::service_unavailable(
                "Credential store unreachable",
                error_codes::STORE_UNAVAILABLE,
            );
            (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
        }
    }
}
