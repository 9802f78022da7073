//! JWT authentication middleware.
//!
//! Tokens are issued by the external authentication service with the
//! shared secret; this service only verifies them.

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::web::error::ApiError;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: i64,
    /// Username, when the issuer includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
}

/// Application state for JWT authentication.
#[derive(Clone)]
pub struct JwtState {
    /// Decoding key for JWT verification.
    pub decoding_key: DecodingKey,
    /// Validation settings.
    pub validation: Validation,
}

impl JwtState {
    /// Create a new JWT state from a secret key.
    pub fn new(secret: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key,
            validation,
        }
    }
}

/// Extractor for authenticated users.
///
/// The handler receives the verified claims; `claims.sub` is the owner of
/// every file and folder the request touches.
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

impl AuthUser {
    /// The caller's user ID.
    pub fn id(&self) -> i64 {
        self.0.sub
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

// Browser downloads cannot set headers, so `?token=` is accepted as well.
fn query_token(parts: &Parts) -> Option<String> {
    parts.uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "token" {
            urlencoding::decode(value).ok().map(|s| s.into_owned())
        } else {
            None
        }
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = bearer_token(parts)
                .or_else(|| query_token(parts))
                .ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

            // Get JWT state from extensions (set by middleware)
            let jwt_state = parts
                .extensions
                .get::<Arc<JwtState>>()
                .ok_or_else(|| ApiError::internal("JWT state not configured"))?;

            let token_data =
                decode::<JwtClaims>(&token, &jwt_state.decoding_key, &jwt_state.validation)
                    .map_err(|e| {
                        tracing::debug!("JWT validation failed: {}", e);
                        ApiError::unauthorized("Invalid or expired token")
                    })?;

            Ok(AuthUser(token_data.claims))
        })
    }
}

/// Middleware function to inject JWT state into request extensions.
pub async fn jwt_auth(
    jwt_state: Arc<JwtState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(jwt_state);
    next.run(request).await
}
