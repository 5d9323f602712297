use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::{Deserialize, de::DeserializeOwned};
use validator::{Validate, ValidationErrors};

use crate::{db::models::api::ErrorDetail, error::AppError, knowledge::DEFAULT_SEARCH_LIMIT};

/// Query string extractor that runs `validator` rules before the handler.
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::validation("Invalid query parameters"))?;

        value.validate().map_err(validation_failure)?;
        Ok(ValidatedQuery(value))
    }
}

pub fn validation_failure(errors: ValidationErrors) -> AppError {
    let details: Vec<ErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| ErrorDetail {
                field: Some(field.to_string()),
                code: error.code.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation failed for field: {}", field)),
            })
        })
        .collect();

    AppError::Validation {
        message: format!("Validation failed with {} errors", details.len()),
        details,
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 256, message = "q must be between 1 and 256 characters"))]
    pub q: String,
    #[validate(range(min = 1, max = 50, message = "limit must be between 1 and 50"))]
    pub limit: Option<usize>,
}

impl SearchParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerParams {
    #[validate(length(min = 1, max = 512, message = "q must be between 1 and 512 characters"))]
    pub q: String,
}
