//! Authorization gate
//!
//! Resolves the bearer credential of a request into an [`Identity`]. A
//! missing or invalid credential yields no identity and never rejects the
//! request; operations that need one fail with `Unauthenticated` themselves.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, jwt::JwtService, state::AppState};

/// The authenticated user behind one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Resolve a raw token; `None` when absent, malformed, forged or expired.
pub fn resolve_identity(jwt: &JwtService, token: Option<&str>) -> Option<Identity> {
    let token = token?.trim();
    if token.is_empty() {
        return None;
    }

    match jwt.validate_token(token) {
        Ok(claims) => Some(Identity {
            id: claims.sub,
            username: claims.username,
            email: claims.email,
        }),
        Err(e) => {
            warn!("Ignoring invalid session token: {}", e);
            None
        }
    }
}

/// Unwrap an identity or fail before anything else happens.
pub fn require(identity: Option<&Identity>) -> Result<&Identity, ApiError> {
    identity.ok_or(ApiError::Unauthenticated)
}

/// Token from the `token` query parameter, if present
fn query_token(req: &Request<Body>) -> Option<String> {
    req.uri().query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "token").then(|| value.to_string())
    })
}

/// Attach the resolved identity (if any) to the request extensions
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string());
    let token = bearer.or_else(|| query_token(&req));

    if let Some(identity) = resolve_identity(&state.jwt_service, token.as_deref()) {
        req.extensions_mut().insert(identity);
    }

    next.run(req).await
}
