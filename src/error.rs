use crate::db::models::api::{ApiResponse, ErrorDetail, error_codes};
use crate::gateway::GatewayError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Vec<ErrorDetail>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ApiResponse<()>) {
        match self {
            AppError::Pool(e) => {
                tracing::error!("Connection pool error: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ApiResponse::service_unavailable(
                        "Connection error",
                        error_codes::STORE_UNAVAILABLE,
                    ),
                )
            }
            AppError::Auth { message } => (
                StatusCode::UNAUTHORIZED,
                ApiResponse::unauthorized(message),
            ),
            AppError::Validation { message, details } if details.is_empty() => (
                StatusCode::BAD_REQUEST,
                ApiResponse::bad_request(message, error_codes::VALIDATION_FAILED),
            ),
            AppError::Validation { details, .. } => (
                StatusCode::BAD_REQUEST,
                ApiResponse::validation_error(details.clone()),
            ),
            AppError::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::internal_error("Configuration error"),
                )
            }
            AppError::Jwt(e) => {
                tracing::warn!("JWT error: {}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    ApiResponse::error(
                        401,
                        "Invalid token",
                        vec![ErrorDetail::new(error_codes::AUTH_INVALID_TOKEN, "Invalid token")],
                    ),
                )
            }
            AppError::Gateway(e) => gateway_response(e),
        }
    }
}

fn gateway_response(err: &GatewayError) -> (StatusCode, ApiResponse<()>) {
    match err {
        GatewayError::MalformedIdentity { reason } => (
            StatusCode::BAD_REQUEST,
            ApiResponse::bad_request(
                &format!("Malformed identity: {}", reason),
                error_codes::TENANT_MALFORMED_IDENTITY,
            ),
        ),
        GatewayError::OrganizationNotFound { .. } => (
            StatusCode::NOT_FOUND,
            ApiResponse::not_found("Unknown tenant", error_codes::TENANT_NOT_FOUND),
        ),
        GatewayError::OrganizationSuspended { .. } => (
            StatusCode::FORBIDDEN,
            ApiResponse::forbidden("Organization is suspended", error_codes::TENANT_SUSPENDED),
        ),
        GatewayError::StoreUnavailable { .. } | GatewayError::Store { .. } => {
            tracing::error!("Tenant resolution failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::service_unavailable(
                    "Credential store unavailable",
                    error_codes::STORE_UNAVAILABLE,
                ),
            )
        }
        GatewayError::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            ApiResponse::service_unavailable("Resolution cancelled", error_codes::STORE_CANCELLED),
        ),
        GatewayError::DeadlineExceeded { .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            ApiResponse::gateway_timeout(
                "Tenant resolution timed out",
                error_codes::STORE_DEADLINE_EXCEEDED,
            ),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, response) = self.status_and_body();
        (status, Json(response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }
}
