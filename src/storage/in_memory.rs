//! In-memory implementation of ModelStore for testing and development
//!
//! Rows live in ordered maps behind an `RwLock`, keys are auto-incremented
//! integers, and access policy is declared per role: create permission,
//! all/owner/denied access per operation, and an optional per-role list of
//! updatable fields. Scope field projection happens here, at read time.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::core::credentials::Credentials;
use crate::core::model::{ModelDescriptor, Scope};
use crate::core::store::{
    DeleteResult, ModelStore, ReadOutcome, ReadQuery, Record, StoreError, UpdateOutcomes,
    UpdateResult, ValidationFailure, ValidationItem,
};

/// Row-level access granted to a role for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    All,
    /// Only rows whose owner field matches the caller's id
    Owner,
    Denied,
}

/// What one role may do with a model.
#[derive(Debug, Clone)]
pub struct RoleRule {
    pub create: bool,
    pub read: Access,
    pub update: Access,
    pub delete: Access,
    /// When set, updates silently ignore any other field
    pub update_fields: Option<Vec<String>>,
}

impl RoleRule {
    /// Full access, the typical admin rule.
    pub fn all() -> Self {
        Self {
            create: true,
            read: Access::All,
            update: Access::All,
            delete: Access::All,
            update_fields: None,
        }
    }

    /// Full access restricted to owned rows.
    pub fn owner() -> Self {
        Self {
            create: true,
            read: Access::Owner,
            update: Access::Owner,
            delete: Access::Owner,
            update_fields: None,
        }
    }

    pub fn with_update_fields(mut self, fields: Vec<String>) -> Self {
        self.update_fields = Some(fields);
        self
    }
}

/// A model registered with the in-memory store: its descriptor plus the
/// validation and policy the store enforces.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub descriptor: ModelDescriptor,
    /// Fields that may not be missing or null on create
    pub required: Vec<String>,
    /// Field compared against the caller's id for `Access::Owner`
    pub owner_field: Option<String>,
    /// Role name -> rule; roles without a rule have no access at all
    pub roles: HashMap<String, RoleRule>,
}

impl ModelSpec {
    pub fn new(descriptor: ModelDescriptor) -> Self {
        Self {
            descriptor,
            required: Vec::new(),
            owner_field: None,
            roles: HashMap::new(),
        }
    }

    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }

    pub fn owned_by(mut self, field: impl Into<String>) -> Self {
        self.owner_field = Some(field.into());
        self
    }

    pub fn role(mut self, name: impl Into<String>, rule: RoleRule) -> Self {
        self.roles.insert(name.into(), rule);
        self
    }
}

struct Table {
    rows: IndexMap<u64, Map<String, Value>>,
    next_id: u64,
}

impl Table {
    fn new() -> Self {
        Self {
            rows: IndexMap::new(),
            next_id: 1,
        }
    }
}

/// In-memory model store
///
/// Models are registered up front; rows are seeded through [`seed`] or
/// created through the trait. Thread-safe via `RwLock`, like every
/// in-memory backend here.
///
/// [`seed`]: InMemoryStore::seed
pub struct InMemoryStore {
    models: IndexMap<String, ModelSpec>,
    tables: RwLock<HashMap<String, Table>>,
    verbose: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            models: IndexMap::new(),
            tables: RwLock::new(HashMap::new()),
            verbose: AtomicBool::new(false),
        }
    }

    /// Register a model. Call before handing the store to the builder.
    pub fn register(mut self, spec: ModelSpec) -> Self {
        let name = spec.descriptor.name.clone();
        self.tables
            .write()
            .expect("store lock poisoned during registration")
            .insert(name.clone(), Table::new());
        self.models.insert(name, spec);
        self
    }

    /// Insert a row directly, bypassing role checks and validation. Returns
    /// the assigned key. Meant for fixtures.
    pub fn seed(&self, model: &str, properties: Value) -> Result<u64, StoreError> {
        let spec = self.spec(model)?;
        let object = as_object(properties).ok_or_else(|| StoreError::UndefinedProperties {
            model: model.to_string(),
        })?;
        let mut tables = self.write_tables()?;
        let table = table_mut(&mut tables, model)?;
        Ok(insert_row(table, &spec.descriptor.primary_key, object))
    }

    fn spec(&self, model: &str) -> Result<&ModelSpec, StoreError> {
        self.models.get(model).ok_or_else(|| StoreError::UnknownModel {
            model: model.to_string(),
        })
    }

    fn rule<'a>(
        &self,
        spec: &'a ModelSpec,
        credentials: &Credentials,
    ) -> Result<&'a RoleRule, StoreError> {
        spec.roles
            .get(&credentials.role)
            .ok_or_else(|| StoreError::Unauthorized {
                reason: format!(
                    "role '{}' has no access to {}",
                    credentials.role, spec.descriptor.name
                ),
            })
    }

    fn read_tables(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Table>>, StoreError> {
        self.tables
            .read()
            .map_err(|e| StoreError::Backend(format!("failed to acquire read lock: {e}")))
    }

    fn write_tables(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Table>>, StoreError> {
        self.tables
            .write()
            .map_err(|e| StoreError::Backend(format!("failed to acquire write lock: {e}")))
    }

    /// Owner check for a row; `Err` means the caller's credentials cannot
    /// express ownership at all.
    fn owns(
        spec: &ModelSpec,
        row: &Map<String, Value>,
        credentials: &Credentials,
    ) -> Result<bool, StoreError> {
        let Some(owner_field) = &spec.owner_field else {
            return Ok(false);
        };
        if credentials.id.is_null() {
            return Err(StoreError::CredentialsMissingProperty {
                property: "id".to_string(),
            });
        }
        Ok(row
            .get(owner_field)
            .is_some_and(|value| values_match(value, &credentials.id)))
    }

    fn validate_required(
        spec: &ModelSpec,
        object: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        let missing: Vec<&String> = spec
            .required
            .iter()
            .filter(|field| object.get(*field).is_none_or(Value::is_null))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(StoreError::Validation(ValidationFailure {
            name: "ValidationError".to_string(),
            message: format!("{} required field(s) missing", missing.len()),
            fields: Some(missing.iter().map(|f| f.to_string()).collect()),
            errors: missing
                .iter()
                .map(|f| ValidationItem::missing(f.as_str()))
                .collect(),
        }))
    }

    fn trace(&self, operation: &str, model: &str, detail: &str) {
        if self.verbose.load(Ordering::Relaxed) {
            tracing::debug!(%operation, %model, %detail, "store operation");
        }
    }

    fn insert_checked(
        &self,
        spec: &ModelSpec,
        mut object: Map<String, Value>,
        credentials: &Credentials,
    ) -> Result<Record, StoreError> {
        // owner rows default to the caller
        if let Some(owner_field) = &spec.owner_field {
            if object.get(owner_field).is_none_or(Value::is_null) && !credentials.id.is_null() {
                object.insert(owner_field.clone(), credentials.id.clone());
            }
        }
        Self::validate_required(spec, &object)?;

        let model = spec.descriptor.name.clone();
        let mut tables = self.write_tables()?;
        let table = table_mut(&mut tables, &model)?;
        let key = insert_row(table, &spec.descriptor.primary_key, object);
        let row = table.rows.get(&key).cloned().unwrap_or_default();
        Ok(Record::Plain(Value::Object(row)))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelStore for InMemoryStore {
    fn model(&self, name: &str) -> Result<ModelDescriptor, StoreError> {
        self.spec(name).map(|spec| spec.descriptor.clone())
    }

    fn models(&self) -> Vec<ModelDescriptor> {
        self.models
            .values()
            .map(|spec| spec.descriptor.clone())
            .collect()
    }

    async fn create(
        &self,
        model: &str,
        properties: Value,
        credentials: &Credentials,
    ) -> Result<Record, StoreError> {
        let spec = self.spec(model)?;
        let rule = self.rule(spec, credentials)?;
        if !rule.create {
            return Err(StoreError::Unauthorized {
                reason: format!("role '{}' may not create {}", credentials.role, model),
            });
        }
        let object = as_object(properties).ok_or_else(|| StoreError::UndefinedProperties {
            model: model.to_string(),
        })?;
        self.trace("create", model, &format!("{} field(s)", object.len()));
        self.insert_checked(spec, object, credentials)
    }

    async fn clone_record(
        &self,
        model: &str,
        source_key: &str,
        overrides: Value,
        scope: Scope,
        credentials: &Credentials,
    ) -> Result<Record, StoreError> {
        let spec = self.spec(model)?;
        let rule = self.rule(spec, credentials)?;
        if !rule.create {
            return Err(StoreError::Unauthorized {
                reason: format!("role '{}' may not create {}", credentials.role, model),
            });
        }

        // read the source through the caller's read access
        let mut base = {
            let tables = self.read_tables()?;
            let table = table_ref(&tables, model)?;
            let row = parse_key(source_key)
                .and_then(|key| table.rows.get(&key))
                .ok_or_else(|| StoreError::CloneSourceNotFound {
                    model: model.to_string(),
                    key: source_key.to_string(),
                })?;
            let visible = match rule.read {
                Access::All => true,
                Access::Owner => Self::owns(spec, row, credentials)?,
                Access::Denied => false,
            };
            if !visible {
                return Err(StoreError::CloneSourceNotFound {
                    model: model.to_string(),
                    key: source_key.to_string(),
                });
            }
            project(row.clone(), spec.descriptor.scope_fields(scope))
        };

        // the copy gets its own key
        base.shift_remove(&spec.descriptor.primary_key);
        if let Some(overrides) = as_object(overrides) {
            for (field, value) in overrides {
                base.insert(field, value);
            }
        }
        self.trace("clone", model, source_key);
        self.insert_checked(spec, base, credentials)
    }

    async fn read(
        &self,
        model: &str,
        query: ReadQuery,
        credentials: &Credentials,
    ) -> Result<ReadOutcome, StoreError> {
        let spec = self.spec(model)?;
        let rule = self.rule(spec, credentials)?;
        if rule.read == Access::Denied {
            return Err(StoreError::Unauthorized {
                reason: format!("role '{}' may not read {}", credentials.role, model),
            });
        }
        if spec.descriptor.scopes.get(query.scope.as_str()).is_none() {
            return Err(StoreError::ScopeViolation {
                model: model.to_string(),
                scope: query.scope.to_string(),
            });
        }
        let fields = spec.descriptor.scope_fields(query.scope);
        self.trace("read", model, query.key.as_deref().unwrap_or("*"));

        let tables = self.read_tables()?;
        let table = table_ref(&tables, model)?;

        match &query.key {
            Some(key) => {
                let row = parse_key(key).and_then(|k| table.rows.get(&k));
                let record = match row {
                    Some(row) => {
                        let visible = match rule.read {
                            Access::All => true,
                            Access::Owner => Self::owns(spec, row, credentials)?,
                            Access::Denied => false,
                        };
                        // an invisible row reads the same as an absent one
                        visible.then(|| Record::Plain(Value::Object(project(row.clone(), fields))))
                    }
                    None => None,
                };
                Ok(ReadOutcome::One(record))
            }
            None => {
                let limit = query.limit.unwrap_or(usize::MAX);
                let mut records = Vec::new();
                for row in table.rows.values() {
                    if records.len() >= limit {
                        break;
                    }
                    let visible = match rule.read {
                        Access::All => true,
                        Access::Owner => Self::owns(spec, row, credentials)?,
                        Access::Denied => false,
                    };
                    if visible {
                        records.push(Record::Plain(Value::Object(project(row.clone(), fields))));
                    }
                }
                Ok(ReadOutcome::Many(records))
            }
        }
    }

    async fn update(
        &self,
        model: &str,
        changes: IndexMap<String, Value>,
        credentials: &Credentials,
    ) -> Result<UpdateOutcomes, StoreError> {
        let spec = self.spec(model)?;
        let rule = self.rule(spec, credentials)?;
        if rule.update == Access::Denied {
            return Err(StoreError::Unauthorized {
                reason: format!("role '{}' may not update {}", credentials.role, model),
            });
        }
        self.trace("update", model, &format!("{} key(s)", changes.len()));

        let mut tables = self.write_tables()?;
        let table = table_mut(&mut tables, model)?;
        let mut outcomes = UpdateOutcomes::new();

        for (key, properties) in changes {
            let outcome = apply_update(spec, rule, table, &key, properties, credentials);
            outcomes.insert(key, outcome);
        }
        Ok(outcomes)
    }

    async fn delete(
        &self,
        model: &str,
        key: &str,
        limit: u32,
        credentials: &Credentials,
    ) -> Result<DeleteResult, StoreError> {
        let spec = self.spec(model)?;
        let rule = self.rule(spec, credentials)?;
        if rule.delete == Access::Denied {
            return Err(StoreError::Unauthorized {
                reason: format!("role '{}' may not delete {}", credentials.role, model),
            });
        }
        self.trace("delete", model, key);

        let mut tables = self.write_tables()?;
        let table = table_mut(&mut tables, model)?;

        if limit == 0 {
            return Ok(DeleteResult { del_count: 0 });
        }
        let Some(parsed) = parse_key(key) else {
            return Ok(DeleteResult { del_count: 0 });
        };
        let Some(row) = table.rows.get(&parsed) else {
            return Ok(DeleteResult { del_count: 0 });
        };
        let allowed = match rule.delete {
            Access::All => true,
            Access::Owner => Self::owns(spec, row, credentials)?,
            Access::Denied => false,
        };
        if !allowed {
            return Ok(DeleteResult { del_count: 0 });
        }
        table.rows.shift_remove(&parsed);
        Ok(DeleteResult { del_count: 1 })
    }

    fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }
}

fn apply_update(
    spec: &ModelSpec,
    rule: &RoleRule,
    table: &mut Table,
    key: &str,
    properties: Value,
    credentials: &Credentials,
) -> Result<UpdateResult, StoreError> {
    let object = as_object(properties).ok_or_else(|| StoreError::UndefinedProperties {
        model: spec.descriptor.name.clone(),
    })?;

    let Some(parsed) = parse_key(key) else {
        return Ok(UpdateResult { result: 0 });
    };
    let Some(row) = table.rows.get(&parsed) else {
        return Ok(UpdateResult { result: 0 });
    };
    let allowed = match rule.update {
        Access::All => true,
        Access::Owner => InMemoryStore::owns(spec, row, credentials)?,
        Access::Denied => false,
    };
    if !allowed {
        return Ok(UpdateResult { result: 0 });
    }

    // nulling a required field is refused outright
    let nulled: Vec<&String> = spec
        .required
        .iter()
        .filter(|field| object.get(*field).is_some_and(Value::is_null))
        .collect();
    if !nulled.is_empty() {
        return Err(StoreError::Validation(ValidationFailure {
            name: "ValidationError".to_string(),
            message: format!("{} required field(s) set to null", nulled.len()),
            fields: Some(nulled.iter().map(|f| f.to_string()).collect()),
            errors: nulled
                .iter()
                .map(|f| ValidationItem::missing(f.as_str()))
                .collect(),
        }));
    }

    let row = table.rows.get_mut(&parsed).ok_or_else(|| {
        StoreError::Backend("row vanished during update".to_string())
    })?;
    for (field, value) in object {
        if field == spec.descriptor.primary_key {
            continue;
        }
        if let Some(updatable) = &rule.update_fields {
            if !updatable.contains(&field) {
                continue;
            }
        }
        row.insert(field, value);
    }
    Ok(UpdateResult { result: 1 })
}

fn insert_row(table: &mut Table, primary_key: &str, mut object: Map<String, Value>) -> u64 {
    let key = table.next_id;
    table.next_id += 1;
    object.insert(primary_key.to_string(), Value::from(key));
    table.rows.insert(key, object);
    key
}

fn table_ref<'a>(
    tables: &'a HashMap<String, Table>,
    model: &str,
) -> Result<&'a Table, StoreError> {
    tables.get(model).ok_or_else(|| StoreError::UnknownModel {
        model: model.to_string(),
    })
}

fn table_mut<'a>(
    tables: &'a mut HashMap<String, Table>,
    model: &str,
) -> Result<&'a mut Table, StoreError> {
    tables.get_mut(model).ok_or_else(|| StoreError::UnknownModel {
        model: model.to_string(),
    })
}

fn as_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    }
}

fn project(row: Map<String, Value>, fields: Option<&[String]>) -> Map<String, Value> {
    match fields {
        Some(fields) => row
            .into_iter()
            .filter(|(key, _)| fields.iter().any(|f| f == key))
            .collect(),
        None => row,
    }
}

fn parse_key(key: &str) -> Option<u64> {
    key.parse().ok()
}

/// Owner columns may hold `1` while tokens carry `"1"`; compare loosely.
fn values_match(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            s == &n.to_string()
        }
        _ => false,
    }
}
