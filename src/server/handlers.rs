//! Request dispatcher for the collection/single endpoints
//!
//! Handlers stay thin: parse the body, call the store, classify failures,
//! sanitize results. Bodies are read as raw bytes and parsed manually so the
//! gateway controls every error shape (axum's JSON rejections would leak
//! 400/415 responses outside the error taxonomy).

use std::sync::Arc;

use axum::Json;
use indexmap::IndexMap;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::header::{AUTHORIZATION, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use super::host::GatewayHost;
use crate::core::credentials::Credentials;
use crate::core::error::GatewayError;
use crate::core::login::authenticate;
use crate::core::model::Scope;
use crate::core::store::{ReadOutcome, ReadQuery};

/// `POST {login_path}` — the only ungated route.
///
/// The issued token travels in the `Authorization` response header; the
/// body is the claims object the token carries.
pub async fn login(
    State(host): State<Arc<GatewayHost>>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    // a malformed body is indistinguishable from a missing one here
    let payload = parse_body(&body).unwrap_or(None);
    let (token, claims) = authenticate(
        host.credentials.as_ref(),
        &host.config.auth.identity_property,
        payload,
        &host.forge,
        &host.codec,
    )
    .await?;

    let header = HeaderValue::from_str(&token)
        .map_err(|_| GatewayError::Internal("token not representable as header".to_string()))?;
    let mut response = (StatusCode::OK, Json(claims)).into_response();
    response.headers_mut().insert(AUTHORIZATION, header);
    Ok(response)
}

/// `GET /{model}` — limited collection read, always an array.
pub async fn read_collection(
    State(host): State<Arc<GatewayHost>>,
    Path(model): Path<String>,
    Extension(credentials): Extension<Credentials>,
) -> Result<Response, GatewayError> {
    let query = ReadQuery::collection(host.config.collection_limit);
    let outcome = host
        .store
        .read(&model, query, &credentials)
        .await
        .map_err(|e| GatewayError::classify(e, host.sanitizer()))?;

    let items: Vec<Value> = match outcome {
        ReadOutcome::Many(records) => records
            .into_iter()
            .map(|record| host.sanitizer().record(record))
            .collect(),
        ReadOutcome::One(record) => record
            .into_iter()
            .map(|record| host.sanitizer().record(record))
            .collect(),
    };
    Ok((StatusCode::OK, Json(Value::Array(items))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    /// Primary-key value of a record to clone instead of creating from
    /// scratch
    clone: Option<String>,
}

/// `POST /{model}` — create, or clone when `?clone={key}` is present.
pub async fn create_record(
    State(host): State<Arc<GatewayHost>>,
    Path(model): Path<String>,
    Query(params): Query<CreateParams>,
    Extension(credentials): Extension<Credentials>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let properties = parse_body(&body)?.unwrap_or(Value::Null);

    let result = match params.clone {
        Some(source_key) => {
            host.store
                .clone_record(&model, &source_key, properties, Scope::Single, &credentials)
                .await
        }
        None => host.store.create(&model, properties, &credentials).await,
    };
    let record = result.map_err(|e| GatewayError::classify(e, host.sanitizer()))?;
    let value = host.sanitizer().record(record);

    let descriptor = host
        .store
        .model(&model)
        .map_err(|e| GatewayError::classify(e, host.sanitizer()))?;
    let location = value
        .get(&descriptor.primary_key)
        .and_then(key_segment)
        .map(|key| host.forge_path(&model, Some(&key)));

    let mut response = (StatusCode::CREATED, Json(value)).into_response();
    if let Some(location) = location {
        if let Ok(header) = HeaderValue::from_str(&location) {
            response.headers_mut().insert(LOCATION, header);
        }
    }
    Ok(response)
}

/// `GET /{model}/{id}` — single read; an absent record is a 404.
pub async fn read_single(
    State(host): State<Arc<GatewayHost>>,
    Path((model, id)): Path<(String, String)>,
    Extension(credentials): Extension<Credentials>,
) -> Result<Response, GatewayError> {
    let outcome = host
        .store
        .read(&model, ReadQuery::single(&id), &credentials)
        .await
        .map_err(|e| GatewayError::classify(e, host.sanitizer()))?;

    let record = match outcome {
        ReadOutcome::One(record) => record,
        ReadOutcome::Many(records) => records.into_iter().next(),
    }
    .ok_or_else(|| GatewayError::RecordNotFound {
        model: model.clone(),
        key: id.clone(),
    })?;

    Ok((StatusCode::OK, Json(host.sanitizer().record(record))).into_response())
}

/// `PATCH|PUT /{model}/{id}` — update; the body is the changed properties
/// and the response body is the bare update count.
pub async fn update_record(
    State(host): State<Arc<GatewayHost>>,
    Path((model, id)): Path<(String, String)>,
    Extension(credentials): Extension<Credentials>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let properties = parse_body(&body)?.unwrap_or(Value::Null);
    let mut changes = IndexMap::new();
    changes.insert(id.clone(), properties);

    let mut outcomes = host
        .store
        .update(&model, changes, &credentials)
        .await
        .map_err(|e| GatewayError::classify(e, host.sanitizer()))?;

    let outcome = outcomes.swap_remove(&id).ok_or_else(|| {
        GatewayError::Internal(format!("store returned no update outcome for key '{id}'"))
    })?;
    let result = outcome.map_err(|e| GatewayError::classify(e, host.sanitizer()))?;

    if result.result == 0 {
        return Err(GatewayError::RecordNotFound { model, key: id });
    }
    Ok((StatusCode::OK, Json(json!(result.result))).into_response())
}

/// `DELETE /{model}/{id}` — delete one record.
pub async fn delete_record(
    State(host): State<Arc<GatewayHost>>,
    Path((model, id)): Path<(String, String)>,
    Extension(credentials): Extension<Credentials>,
) -> Result<Response, GatewayError> {
    let result = host
        .store
        .delete(&model, &id, 1, &credentials)
        .await
        .map_err(|e| GatewayError::classify(e, host.sanitizer()))?;

    if result.del_count == 0 {
        return Err(GatewayError::RecordNotFound { model, key: id });
    }
    Ok((StatusCode::OK, Json(json!({ "del_count": result.del_count }))).into_response())
}

/// Empty bodies are `None`; anything non-empty must be valid JSON.
fn parse_body(body: &Bytes) -> Result<Option<Value>, GatewayError> {
    if body.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| GatewayError::InvalidPayload(e.to_string()))
}

/// Primary-key values are integers or strings; anything else cannot appear
/// in a path.
fn key_segment(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
