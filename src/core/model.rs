//! Model descriptors and scopes
//!
//! A model is a named resource exposed through the collection/single
//! endpoints. The gateway only reads the primary-key field name and the
//! scope names from a descriptor; field-level visibility is enforced by
//! the store that owns it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named view of a model restricting which fields are visible.
///
/// Every model exposed through the gateway must declare both scopes;
/// the builder rejects stores that register a model without them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// List context (`GET /{model}`)
    Collection,
    /// Detail context (`GET /{model}/{id}` and clone sources)
    Single,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Collection => "collection",
            Scope::Single => "single",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor for a model registered with a [`ModelStore`](crate::core::store::ModelStore)
///
/// Scope entries map a scope name to the list of visible fields in that
/// context. An empty field list means "all fields".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model name as it appears in URLs (e.g. "Task")
    pub name: String,

    /// Primary-key field name (e.g. "id"), used to forge Location headers
    pub primary_key: String,

    /// Scope name -> visible fields
    pub scopes: IndexMap<String, Vec<String>>,
}

impl ModelDescriptor {
    /// Create a descriptor with the two required scopes.
    pub fn new(
        name: impl Into<String>,
        primary_key: impl Into<String>,
        collection_fields: Vec<String>,
        single_fields: Vec<String>,
    ) -> Self {
        let mut scopes = IndexMap::new();
        scopes.insert(Scope::Collection.as_str().to_string(), collection_fields);
        scopes.insert(Scope::Single.as_str().to_string(), single_fields);
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            scopes,
        }
    }

    /// Check that both required scopes are declared.
    pub fn has_required_scopes(&self) -> bool {
        self.scopes.contains_key(Scope::Collection.as_str())
            && self.scopes.contains_key(Scope::Single.as_str())
    }

    /// Visible fields for a scope, if the scope restricts them.
    pub fn scope_fields(&self, scope: Scope) -> Option<&[String]> {
        self.scopes
            .get(scope.as_str())
            .filter(|fields| !fields.is_empty())
            .map(|fields| fields.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_descriptor() -> ModelDescriptor {
        ModelDescriptor::new(
            "Task",
            "id",
            vec!["id".into(), "title".into()],
            vec!["id".into(), "title".into(), "content".into()],
        )
    }

    #[test]
    fn test_new_declares_both_scopes() {
        let descriptor = task_descriptor();
        assert!(descriptor.has_required_scopes());
    }

    #[test]
    fn test_missing_scope_detected() {
        let mut descriptor = task_descriptor();
        descriptor.scopes.shift_remove(Scope::Single.as_str());
        assert!(!descriptor.has_required_scopes());
    }

    #[test]
    fn test_scope_fields_restricting() {
        let descriptor = task_descriptor();
        let fields = descriptor
            .scope_fields(Scope::Collection)
            .expect("collection scope should restrict fields");
        assert_eq!(fields, &["id".to_string(), "title".to_string()]);
    }

    #[test]
    fn test_empty_scope_means_all_fields() {
        let descriptor = ModelDescriptor::new("Log", "id", vec![], vec![]);
        assert!(descriptor.has_required_scopes());
        assert!(descriptor.scope_fields(Scope::Collection).is_none());
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::Collection.to_string(), "collection");
        assert_eq!(Scope::Single.to_string(), "single");
    }
}
