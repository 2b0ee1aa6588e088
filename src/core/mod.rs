//! Core module containing the gateway's fundamental traits and types

pub mod credentials;
pub mod error;
pub mod login;
pub mod model;
pub mod sanitize;
pub mod store;
pub mod token;

pub use credentials::{
    ADMIN_ROLE, CredentialSource, Credentials, PayloadForge, Principal, default_payload_forge,
};
pub use error::{ErrorResponse, GatewayError, GatewayResult};
pub use model::{ModelDescriptor, Scope};
pub use sanitize::{DEFAULT_ERROR_FIELDS, DEFAULT_ITEM_FIELDS, Sanitizer};
pub use store::{
    DeleteResult, ModelStore, ReadOutcome, ReadQuery, Record, RichRecord, StoreError,
    UpdateOutcomes, UpdateResult, ValidationFailure, ValidationItem,
};
pub use token::{Claims, TokenCodec};
