pub mod health;
pub mod tenant;

use crate::AppState;
use crate::middleware::{auth_middleware, request_tracking_middleware};
use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub fn create_router(state: Arc<AppState>) -> Router {
    let tenant_routes = Router::new()
        .route("/tenant", get(tenant::get_tenant))
        .route("/tenant/credentials", post(tenant::get_credentials))
        .route("/tenant/knowledge/sync", post(tenant::sync_knowledge))
        .route("/tenant/knowledge/search", get(tenant::search_knowledge))
        .route("/tenant/knowledge/answer", get(tenant::answer_question))
        .route("/tenant/knowledge/summary", get(tenant::knowledge_summary))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state.clone());

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .with_state(state)
        .nest("/api", tenant_routes)
        .layer(cors)
        .layer(from_fn(request_tracking_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
