//! # restgate
//!
//! An embeddable REST gateway exposing named, schema-described models as
//! collection/single endpoints with JWT authentication and pluggable
//! persistence.
//!
//! ## Features
//!
//! - **Model Endpoints**: `GET/POST /{model}` and `GET/PATCH/PUT/DELETE
//!   /{model}/{id}` for every model the store registers
//! - **JWT Login**: bcrypt-verified login issuing HS256 tokens, token in the
//!   `Authorization` response header
//! - **Pluggable Persistence**: bring any backend behind the `ModelStore`
//!   trait; an in-memory store ships for tests and development
//! - **Pluggable Principals**: account lookup and validation behind the
//!   `CredentialSource` trait, with an overridable claims-forging hook
//! - **Result Sanitization**: allow-list driven cleanup of records and
//!   validation reports before anything reaches the wire
//! - **Closed Error Taxonomy**: every store failure maps to a fixed status
//!   code through an exhaustive classifier
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use restgate::prelude::*;
//!
//! let store = InMemoryStore::new().register(
//!     ModelSpec::new(ModelDescriptor::new(
//!         "Task",
//!         "id",
//!         vec!["id".into(), "title".into()],
//!         vec!["id".into(), "title".into(), "content".into()],
//!     ))
//!     .require("title")
//!     .role("admin", RoleRule::all()),
//! );
//!
//! GatewayBuilder::new()
//!     .with_config(GatewayConfig::with_secret("!AmazingSecret!"))
//!     .with_store(store)
//!     .with_credential_source(users)
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        credentials::{
            CredentialSource, Credentials, PayloadForge, Principal, default_payload_forge,
        },
        error::{ErrorResponse, GatewayError, GatewayResult},
        login::authenticate,
        model::{ModelDescriptor, Scope},
        sanitize::Sanitizer,
        store::{
            DeleteResult, ModelStore, ReadOutcome, ReadQuery, Record, RichRecord, StoreError,
            UpdateOutcomes, UpdateResult, ValidationFailure, ValidationItem,
        },
        token::{Claims, TokenCodec},
    };

    // === Storage ===
    pub use crate::storage::{
        Access, InMemoryStore, ModelSpec, RoleRule, StaticCredentialSource,
    };

    // === Config ===
    pub use crate::config::{AuthConfig, GatewayConfig, SanitizeConfig};

    // === Server ===
    pub use crate::server::{GatewayBuilder, GatewayHost, build_router};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{
        Router,
        extract::{Path, State},
        http::HeaderMap,
        routing::{delete, get, post, put},
    };
}
