//! GatewayBuilder for fluent assembly of the gateway
//!
//! # Example
//!
//! ```ignore
//! let app = GatewayBuilder::new()
//!     .with_config(GatewayConfig::with_secret("!AmazingSecret!"))
//!     .with_store(store)
//!     .with_credential_source(users)
//!     .build()?;
//! ```

use std::sync::Arc;

use anyhow::{Result, bail};
use axum::Router;
use tokio::net::TcpListener;

use super::host::GatewayHost;
use super::routes;
use crate::config::GatewayConfig;
use crate::core::credentials::{CredentialSource, PayloadForge, default_payload_forge};
use crate::core::store::ModelStore;
use crate::core::token::TokenCodec;

/// Builder producing a [`GatewayHost`] and its router.
pub struct GatewayBuilder {
    config: Option<GatewayConfig>,
    store: Option<Arc<dyn ModelStore>>,
    credentials: Option<Arc<dyn CredentialSource>>,
    forge: Option<PayloadForge>,
    custom_routes: Vec<Router>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            credentials: None,
            forge: None,
            custom_routes: Vec::new(),
        }
    }

    /// Set the configuration (required; the secret has no default)
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the persistence store (required)
    pub fn with_store(mut self, store: impl ModelStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set the principal lookup source (required)
    pub fn with_credential_source(mut self, source: impl CredentialSource + 'static) -> Self {
        self.credentials = Some(Arc::new(source));
        self
    }

    /// Override the claims-forging hook
    pub fn with_payload_forge(mut self, forge: PayloadForge) -> Self {
        self.forge = Some(forge);
        self
    }

    /// Add routes outside the model pattern (health checks, webhooks, ...)
    ///
    /// Custom routes are mounted under the same prefix but are not guarded
    /// by the auth gate.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Validate everything and assemble the host.
    ///
    /// Fails fast on a missing store or credential source, an invalid
    /// configuration, or a registered model that does not declare both the
    /// `collection` and `single` scopes.
    pub fn build_host(mut self) -> Result<GatewayHost> {
        let config = self
            .config
            .take()
            .ok_or_else(|| anyhow::anyhow!("configuration is required. Call .with_config()"))?;
        config.validate()?;

        let store = self
            .store
            .take()
            .ok_or_else(|| anyhow::anyhow!("a ModelStore is required. Call .with_store()"))?;
        let credentials = self.credentials.take().ok_or_else(|| {
            anyhow::anyhow!("a CredentialSource is required. Call .with_credential_source()")
        })?;

        for descriptor in store.models() {
            if !descriptor.has_required_scopes() {
                bail!(
                    "model '{}' must declare both 'collection' and 'single' scopes",
                    descriptor.name
                );
            }
        }

        // already checked by config.validate()
        let algorithm = config
            .auth
            .algorithm
            .parse::<jsonwebtoken::Algorithm>()
            .map_err(|_| anyhow::anyhow!("unknown JWT algorithm '{}'", config.auth.algorithm))?;
        let codec = TokenCodec::new(&config.auth.secret, algorithm, config.auth.token_ttl_secs);
        let forge = self.forge.take().unwrap_or_else(default_payload_forge);

        Ok(GatewayHost::new(config, store, credentials, codec, forge))
    }

    /// Build the final router.
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        Ok(routes::build_router(host, custom_routes))
    }

    /// Serve the gateway with graceful shutdown
    ///
    /// Binds the address, serves requests, and drains on SIGTERM or Ctrl+C.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Gateway listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Gateway shutdown complete");
        Ok(())
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
