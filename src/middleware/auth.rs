use crate::AppState;
use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: uuid::Uuid, // user_id
    pub email: String,   // tenant is resolved from this
    pub exp: u64,
    pub iat: u64,
    pub jti: String,
}

/// HS256 signing and verification of caller tokens.
#[derive(Clone)]
pub struct JwtService {
    secret: String,
    expiration: Duration,
}

impl JwtService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration: Duration::from_secs(3600),
        }
    }

    pub fn generate_access_token(
        &self,
        user_id: uuid::Uuid,
        email: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            exp: now + self.expiration.as_secs(),
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(token_data.claims)
    }
}

pub async fn auth_middleware<B>(
    State(state): State<Arc<AppState>>,
    mut request: Request<B>,
    next: Next<B>,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::auth("Missing bearer token"))?;

    let claims = state.jwt.verify_token(token)?;
    tracing::debug!(user_id = %claims.sub, "Authenticated caller");

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// The verified caller. Only available behind [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller(pub Claims);

impl AuthenticatedCaller {
    pub fn email(&self) -> &str {
        &self.0.email
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthenticatedCaller)
            .ok_or_else(|| AppError::auth("Authentication required"))
    }
}
