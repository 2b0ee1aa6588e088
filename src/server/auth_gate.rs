//! Bearer-token middleware
//!
//! Guards every route except login. The token is verified, the principal is
//! re-resolved through the credential source (a revoked or disabled account
//! invalidates otherwise-valid tokens immediately), and the claims payload
//! is attached as a request extension for the handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::host::GatewayHost;
use crate::core::error::GatewayError;

pub async fn auth_gate(
    State(host): State<Arc<GatewayHost>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let token = bearer_token(request.headers()).ok_or(GatewayError::MissingCredentials)?;
    let claims = host.codec.verify(token)?;

    let principal = host
        .credentials
        .find_by("id", &claims.credentials.id)
        .await?
        .ok_or_else(|| GatewayError::Unauthorized("token principal no longer exists".to_string()))?;
    host.credentials.validate(&principal)?;

    request.extensions_mut().insert(claims.credentials);
    Ok(next.run(request).await)
}

/// Accepts either the raw token or the `Bearer <token>` form.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    (!token.is_empty()).then_some(token)
}
