//! Principals and credentials
//!
//! A [`Principal`] is what the embedding application knows about a user; a
//! [`Credentials`] value is the small claims payload that travels inside
//! tokens and request extensions. The [`CredentialSource`] trait is the
//! lookup boundary: the gateway resolves principals through it at login and
//! again on every authenticated request.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::GatewayError;

/// Role name treated as exempt from the confirmation requirement.
pub const ADMIN_ROLE: &str = "admin";

/// Claims payload carried in tokens and attached to authenticated requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Principal identifier, store-defined (integer or string)
    pub id: Value,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A user as known to the embedding application.
///
/// Only `id`, `role` and the auth flags matter to the gateway; everything
/// else lives in `properties` and is searchable through
/// [`CredentialSource::find_by`].
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Value,
    pub role: String,
    pub scope: Option<String>,
    /// bcrypt hash; a principal without one can never log in
    pub password_hash: Option<String>,
    pub disabled: bool,
    /// `None` when the application does not track confirmation
    pub confirmed: Option<bool>,
    pub properties: Map<String, Value>,
}

impl Principal {
    pub fn new(id: impl Into<Value>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            scope: None,
            password_hash: None,
            disabled: false,
            confirmed: None,
            properties: Map::new(),
        }
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = Some(confirmed);
        self
    }
}

/// Principal lookup boundary.
///
/// `find_by` must answer for `"id"` (token re-resolution) and for the
/// configured identity property (login). `validate` is the account-state
/// policy; the default refuses disabled accounts and unconfirmed non-admin
/// accounts, and implementations may override it.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn find_by(
        &self,
        property: &str,
        value: &Value,
    ) -> Result<Option<Principal>, GatewayError>;

    fn validate(&self, principal: &Principal) -> Result<(), GatewayError> {
        if principal.disabled {
            return Err(GatewayError::UserDisabled);
        }
        if principal.confirmed == Some(false) && principal.role != ADMIN_ROLE {
            return Err(GatewayError::InvalidUser);
        }
        Ok(())
    }
}

/// Hook turning a resolved principal into the claims payload.
pub type PayloadForge = Arc<dyn Fn(&Principal) -> Credentials + Send + Sync>;

/// Default forge: id + role + scope, nothing else leaks into the token.
pub fn default_payload_forge() -> PayloadForge {
    Arc::new(|principal: &Principal| Credentials {
        id: principal.id.clone(),
        role: principal.role.clone(),
        scope: principal.scope.clone(),
    })
}
