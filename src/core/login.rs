//! Login flow
//!
//! Payload shape check, principal lookup, account-state validation, bcrypt
//! comparison, then a signed token. Order matters: an attacker probing with
//! a bad password against a disabled account still sees the 403, never a
//! hint about the password.

use serde_json::Value;

use super::credentials::{CredentialSource, PayloadForge};
use super::error::GatewayError;
use super::token::{Claims, TokenCodec};

/// Authenticate a login payload and issue a token.
///
/// `identity_property` names both the payload key and the lookup property
/// (default `login`); the password key is always `password`. The token goes
/// into the `Authorization` response header and the returned claims are the
/// response body.
pub async fn authenticate(
    source: &dyn CredentialSource,
    identity_property: &str,
    payload: Option<Value>,
    forge: &PayloadForge,
    codec: &TokenCodec,
) -> Result<(String, Claims), GatewayError> {
    let (identity, password) =
        extract_credentials(payload.as_ref(), identity_property).ok_or(GatewayError::BadCredentials)?;

    let principal = source
        .find_by(identity_property, &Value::String(identity.to_string()))
        .await?
        .ok_or(GatewayError::BadCredentials)?;

    source.validate(&principal)?;

    let hash = principal
        .password_hash
        .as_deref()
        .ok_or_else(|| GatewayError::Internal("principal has no password hash".to_string()))?;

    let matches = bcrypt::verify(password, hash)
        .map_err(|e| GatewayError::Internal(format!("password verification failed: {e}")))?;
    if !matches {
        return Err(GatewayError::BadCredentials);
    }

    let credentials = forge(&principal);
    codec.sign(credentials)
}

/// Both fields must be present, strings, and non-empty.
fn extract_credentials<'a>(
    payload: Option<&'a Value>,
    identity_property: &str,
) -> Option<(&'a str, &'a str)> {
    let object = payload?.as_object()?;
    let identity = object.get(identity_property)?.as_str()?;
    let password = object.get("password")?.as_str()?;
    if identity.is_empty() || password.is_empty() {
        return None;
    }
    Some((identity, password))
}
