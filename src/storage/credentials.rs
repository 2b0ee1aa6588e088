//! Static credential source for testing and development
//!
//! Holds a fixed set of principals in memory. Lookup answers for `"id"`
//! and for any property stored on the principal, which covers both token
//! re-resolution and login by the configured identity property.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::credentials::{CredentialSource, Principal};
use crate::core::error::GatewayError;

/// In-memory credential source
pub struct StaticCredentialSource {
    principals: Vec<Principal>,
}

impl StaticCredentialSource {
    pub fn new(principals: Vec<Principal>) -> Self {
        Self { principals }
    }

    /// Hash a plain password for a fixture principal.
    ///
    /// `cost` trades setup time against realism; tests use a low cost.
    pub fn hash_password(password: &str, cost: u32) -> Result<String, GatewayError> {
        bcrypt::hash(password, cost)
            .map_err(|e| GatewayError::Internal(format!("password hashing failed: {e}")))
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn find_by(
        &self,
        property: &str,
        value: &Value,
    ) -> Result<Option<Principal>, GatewayError> {
        let found = self.principals.iter().find(|principal| match property {
            "id" => &principal.id == value,
            other => principal.properties.get(other) == Some(value),
        });
        Ok(found.cloned())
    }
}
