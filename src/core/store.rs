//! Persistence boundary
//!
//! The gateway never talks to a database directly. Everything goes through
//! the [`ModelStore`] trait, and everything the store can refuse is a
//! [`StoreError`] variant. The enum is closed on purpose: the HTTP error
//! classifier matches it exhaustively, so a new failure mode cannot ship
//! without a status code.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::credentials::Credentials;
use super::model::{ModelDescriptor, Scope};

/// Everything a [`ModelStore`] can refuse to do.
///
/// Tagged, never matched by message text. `Backend` is the only open-ended
/// variant and always classifies to an opaque 500.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("UnknownModel: no model named '{model}'")]
    UnknownModel { model: String },

    #[error("RecordNotFound: no {model} record for key '{key}'")]
    RecordNotFound { model: String, key: String },

    #[error("CloneSrcNotFound: no {model} source record for key '{key}'")]
    CloneSourceNotFound { model: String, key: String },

    #[error("UndefinedProperties: no properties supplied for {model}")]
    UndefinedProperties { model: String },

    #[error("CredentialsMissingProperty: credentials lack '{property}'")]
    CredentialsMissingProperty { property: String },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("ScopeViolation: model {model} does not declare scope '{scope}'")]
    ScopeViolation { model: String, scope: String },

    #[error("{0}")]
    Validation(ValidationFailure),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Structured validation report, the store-side shape behind 422 responses.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationFailure {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    pub errors: Vec<ValidationItem>,
}

impl ValidationFailure {
    /// First item whose path mentions `field`, if any.
    pub fn get(&self, field: &str) -> Option<&ValidationItem> {
        self.errors
            .iter()
            .find(|item| item.path.as_deref() == Some(field))
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// One entry of a validation report.
///
/// Field names follow the wire shape the sanitizer allow-list expects, so
/// serialization needs no further renaming.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationItem {
    pub message: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(rename = "validatorKey", skip_serializing_if = "Option::is_none")]
    pub validator_key: Option<String>,
    #[serde(rename = "validatorName", skip_serializing_if = "Option::is_none")]
    pub validator_name: Option<String>,
    #[serde(rename = "validatorArgs", skip_serializing_if = "Option::is_none")]
    pub validator_args: Option<Value>,
}

impl ValidationItem {
    /// Shorthand for the common "required field is missing" entry.
    pub fn missing(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            message: format!("{path} cannot be null"),
            kind: Some("notNull Violation".to_string()),
            path: Some(path),
            value: Some(Value::Null),
            origin: Some("CORE".to_string()),
            validator_key: Some("is_null".to_string()),
            validator_name: None,
            validator_args: None,
        }
    }
}

/// A record as handed back by a store.
///
/// Stores backed by ORMs often return handles wrapping the row; `Rich`
/// carries those without forcing an early serialization, `Plain` is the
/// already-flat JSON case. Resolution happens exactly once, at the
/// sanitizer.
pub enum Record {
    Plain(Value),
    Rich(Box<dyn RichRecord>),
}

/// Store-side record handle that knows its plain JSON projection.
pub trait RichRecord: Send + Sync {
    fn plain(&self) -> Value;
}

impl Record {
    /// Resolve to plain JSON, consuming the record.
    pub fn into_plain(self) -> Value {
        match self {
            Record::Plain(value) => value,
            Record::Rich(rich) => rich.plain(),
        }
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Record::Plain(value)
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Record::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Record::Rich(_) => f.debug_tuple("Rich").field(&"<handle>").finish(),
        }
    }
}

/// Parameters of a read.
#[derive(Debug, Clone)]
pub struct ReadQuery {
    pub scope: Scope,
    /// Primary-key value; `None` reads the whole (limited) collection.
    pub key: Option<String>,
    pub limit: Option<usize>,
}

impl ReadQuery {
    pub fn collection(limit: usize) -> Self {
        Self {
            scope: Scope::Collection,
            key: None,
            limit: Some(limit),
        }
    }

    pub fn single(key: impl Into<String>) -> Self {
        Self {
            scope: Scope::Single,
            key: Some(key.into()),
            limit: None,
        }
    }
}

/// What a read produced. A keyed read may legitimately find nothing; the
/// dispatcher decides whether that is a 404.
pub enum ReadOutcome {
    Many(Vec<Record>),
    One(Option<Record>),
}

/// Outcome of an update for one key.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UpdateResult {
    /// Number of rows changed
    pub result: u64,
}

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeleteResult {
    pub del_count: u64,
}

/// Per-key outcomes of a batch update, keyed by primary-key value and
/// reported in request order.
pub type UpdateOutcomes = IndexMap<String, Result<UpdateResult, StoreError>>;

/// Persistence boundary consumed by the gateway.
///
/// Implementations own model registration, row-level access policy, scope
/// field projection, and validation. Credentials are passed through so the
/// store can apply owner/role rules.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Descriptor lookup; unknown names are `StoreError::UnknownModel`.
    fn model(&self, name: &str) -> Result<ModelDescriptor, StoreError>;

    /// All registered descriptors, in registration order.
    fn models(&self) -> Vec<ModelDescriptor>;

    async fn create(
        &self,
        model: &str,
        properties: Value,
        credentials: &Credentials,
    ) -> Result<Record, StoreError>;

    /// Duplicate the record at `source_key`, reading it through `scope` and
    /// layering `overrides` on top before inserting.
    async fn clone_record(
        &self,
        model: &str,
        source_key: &str,
        overrides: Value,
        scope: Scope,
        credentials: &Credentials,
    ) -> Result<Record, StoreError>;

    async fn read(
        &self,
        model: &str,
        query: ReadQuery,
        credentials: &Credentials,
    ) -> Result<ReadOutcome, StoreError>;

    /// Apply `changes` (primary-key value -> new properties) and report the
    /// outcome per key. A key may fail individually without aborting the
    /// batch.
    async fn update(
        &self,
        model: &str,
        changes: IndexMap<String, Value>,
        credentials: &Credentials,
    ) -> Result<UpdateOutcomes, StoreError>;

    async fn delete(
        &self,
        model: &str,
        key: &str,
        limit: u32,
        credentials: &Credentials,
    ) -> Result<DeleteResult, StoreError>;

    /// Toggle per-operation debug tracing.
    fn set_verbose(&self, verbose: bool);
}
