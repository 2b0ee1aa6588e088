//! Storage implementations
//!
//! The in-memory pair here backs tests and development; production hosts
//! bring their own [`ModelStore`](crate::core::store::ModelStore) and
//! [`CredentialSource`](crate::core::credentials::CredentialSource).

pub mod credentials;
pub mod in_memory;

pub use credentials::StaticCredentialSource;
pub use in_memory::{Access, InMemoryStore, ModelSpec, RoleRule};
