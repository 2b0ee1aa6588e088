//! Configuration loading and validation
//!
//! `GatewayConfig` is an explicit struct with serde defaults, loadable from
//! YAML or built literally. There is no deep-merge layer: array-valued
//! options such as the sanitizer allow-lists replace wholesale when set.
//! `validate()` runs at build time and is fatal on nonsense values.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::sanitize::{DEFAULT_ERROR_FIELDS, DEFAULT_ITEM_FIELDS, Sanitizer};

/// Shared secrets shorter than this are refused at build time.
pub const MIN_SECRET_LEN: usize = 10;

/// Complete gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Path prefix all routes are nested under (e.g. "/api")
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,

    /// Maximum records returned by a collection read
    #[serde(default = "default_collection_limit")]
    pub collection_limit: usize,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub sanitize: SanitizeConfig,
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared signing secret; must be at least [`MIN_SECRET_LEN`] characters
    #[serde(default)]
    pub secret: String,

    /// Route exempt from the auth gate (e.g. "/login")
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Payload key and lookup property identifying the principal
    #[serde(default = "default_identity_property")]
    pub identity_property: String,

    /// JWT signing algorithm name (e.g. "HS256")
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Token lifetime in seconds
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
}

/// Sanitizer allow-lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizeConfig {
    /// Fields kept at the top of a failure-shaped object
    #[serde(default = "default_item_fields")]
    pub item_fields: Vec<String>,

    /// Fields kept on each validation entry
    #[serde(default = "default_error_fields")]
    pub error_fields: Vec<String>,
}

fn default_mount_prefix() -> String {
    "/api".to_string()
}

fn default_collection_limit() -> usize {
    20
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_identity_property() -> String {
    "login".to_string()
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_token_ttl_secs() -> i64 {
    24 * 3600
}

fn default_item_fields() -> Vec<String> {
    DEFAULT_ITEM_FIELDS.iter().map(|s| s.to_string()).collect()
}

fn default_error_fields() -> Vec<String> {
    DEFAULT_ERROR_FIELDS.iter().map(|s| s.to_string()).collect()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mount_prefix: default_mount_prefix(),
            collection_limit: default_collection_limit(),
            auth: AuthConfig::default(),
            sanitize: SanitizeConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            login_path: default_login_path(),
            identity_property: default_identity_property(),
            algorithm: default_algorithm(),
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            item_fields: default_item_fields(),
            error_fields: default_error_fields(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Convenience constructor: defaults plus a secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.auth.secret = secret.into();
        config
    }

    /// Reject configurations that cannot possibly run.
    pub fn validate(&self) -> Result<()> {
        if self.auth.secret.len() < MIN_SECRET_LEN {
            bail!(
                "auth.secret must be at least {} characters ({} given)",
                MIN_SECRET_LEN,
                self.auth.secret.len()
            );
        }
        if !self.auth.login_path.starts_with('/') || self.auth.login_path.len() < 2 {
            bail!("auth.login_path must be a non-empty path starting with '/'");
        }
        if !self.mount_prefix.is_empty() && !self.mount_prefix.starts_with('/') {
            bail!("mount_prefix must be empty or start with '/'");
        }
        if self.collection_limit == 0 {
            bail!("collection_limit must be at least 1");
        }
        self.auth
            .algorithm
            .parse::<jsonwebtoken::Algorithm>()
            .map_err(|_| anyhow::anyhow!("unknown JWT algorithm '{}'", self.auth.algorithm))?;
        Ok(())
    }

    /// Build the sanitizer from the configured allow-lists.
    pub fn sanitizer(&self) -> Sanitizer {
        Sanitizer::new(
            self.sanitize.item_fields.clone(),
            self.sanitize.error_fields.clone(),
        )
    }
}
