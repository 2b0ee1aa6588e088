//! Gateway host holding all assembled state
//!
//! The host is what the router closes over: configuration, the persistence
//! store, the credential source, the token codec and the sanitizer. It also
//! carries the small programmatic surface an embedding application can call
//! directly (path forging, option lookup, ad-hoc sanitization).

use std::sync::Arc;

use serde_json::Value;

use crate::config::GatewayConfig;
use crate::core::credentials::{CredentialSource, PayloadForge};
use crate::core::sanitize::Sanitizer;
use crate::core::store::ModelStore;
use crate::core::token::TokenCodec;

/// Assembled gateway state, shared behind an `Arc` by every handler.
pub struct GatewayHost {
    pub config: Arc<GatewayConfig>,
    pub store: Arc<dyn ModelStore>,
    pub credentials: Arc<dyn CredentialSource>,
    pub codec: TokenCodec,
    sanitizer: Sanitizer,
    pub forge: PayloadForge,
    /// Config re-serialized once for dotted-path lookups
    options: Value,
}

impl GatewayHost {
    pub(crate) fn new(
        config: GatewayConfig,
        store: Arc<dyn ModelStore>,
        credentials: Arc<dyn CredentialSource>,
        codec: TokenCodec,
        forge: PayloadForge,
    ) -> Self {
        let sanitizer = config.sanitizer();
        let options = serde_json::to_value(&config).unwrap_or(Value::Null);
        Self {
            config: Arc::new(config),
            store,
            credentials,
            codec,
            sanitizer,
            forge,
            options,
        }
    }

    /// Look up a configuration value by dotted path, e.g. `"auth.login_path"`.
    pub fn option(&self, path: &str) -> Option<Value> {
        let mut current = &self.options;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Build the public path of a model collection or record, including the
    /// mount prefix.
    pub fn forge_path(&self, model: &str, key: Option<&str>) -> String {
        match key {
            Some(key) => format!("{}/{}/{}", self.config.mount_prefix, model, key),
            None => format!("{}/{}", self.config.mount_prefix, model),
        }
    }

    /// Run an arbitrary JSON tree through the configured sanitizer.
    pub fn sanitize(&self, value: Value) -> Value {
        self.sanitizer.value(value)
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Toggle the store's per-operation debug tracing.
    pub fn set_store_verbose(&self, verbose: bool) {
        self.store.set_verbose(verbose);
    }

    pub fn store(&self) -> &Arc<dyn ModelStore> {
        &self.store
    }
}
