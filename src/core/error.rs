//! Typed error handling for the gateway
//!
//! Every failure a client can observe is a [`GatewayError`] variant with a
//! fixed status code and a stable error code. Store-side failures enter
//! through [`GatewayError::classify`], an exhaustive match over
//! [`StoreError`] — there is no message-text sniffing anywhere, and a new
//! store failure mode cannot compile without a mapping.
//!
//! # Example
//!
//! ```rust,ignore
//! use restgate::prelude::*;
//!
//! match result {
//!     Ok(record) => println!("{record:?}"),
//!     Err(GatewayError::RecordNotFound { model, key }) => {
//!         println!("{model} {key} is gone");
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use super::sanitize::Sanitizer;
use super::store::StoreError;

/// The public error type of the gateway
///
/// Grouped by status: 401 for credential/token problems, 403 for account
/// state, 404 for missing models/records, 422 for payload problems, 500 for
/// anything internal. 500 bodies never carry internals.
#[derive(Debug)]
pub enum GatewayError {
    // ── 401 ──
    /// Login payload rejected or password mismatch
    BadCredentials,
    /// No Authorization header on a guarded route
    MissingCredentials,
    /// Token malformed or signature invalid
    InvalidToken,
    /// Token past its expiry
    ExpiredToken,
    /// Token valid but the principal no longer resolves, or the store
    /// refused the operation for this caller
    Unauthorized(String),

    // ── 403 ──
    UserDisabled,
    UserNotConfirmed,
    InvalidUser,

    // ── 404 ──
    UnknownModel(String),
    RecordNotFound { model: String, key: String },
    CloneSourceNotFound { model: String, key: String },

    // ── 422 ──
    UndefinedProperties(String),
    CredentialsMissingProperty(String),
    /// Request body was not valid JSON
    InvalidPayload(String),
    /// Store validation report, errors already sanitized
    Validation { message: String, errors: Vec<Value> },

    // ── 500 ──
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::BadCredentials => write!(f, "BadCredentials: login rejected"),
            GatewayError::MissingCredentials => {
                write!(f, "MissingCredentials: no authorization header")
            }
            GatewayError::InvalidToken => write!(f, "InvalidToken: token rejected"),
            GatewayError::ExpiredToken => write!(f, "ExpiredToken: token expired"),
            GatewayError::Unauthorized(reason) => write!(f, "Unauthorized: {}", reason),
            GatewayError::UserDisabled => write!(f, "UserDisabled: account disabled"),
            GatewayError::UserNotConfirmed => {
                write!(f, "UserNotConfirmed: account awaiting confirmation")
            }
            GatewayError::InvalidUser => write!(f, "InvalidUser: account not usable"),
            GatewayError::UnknownModel(model) => {
                write!(f, "UnknownModel: no model named '{}'", model)
            }
            GatewayError::RecordNotFound { model, key } => {
                write!(f, "RecordNotFound: no {} record for key '{}'", model, key)
            }
            GatewayError::CloneSourceNotFound { model, key } => {
                write!(
                    f,
                    "CloneSrcNotFound: no {} source record for key '{}'",
                    model, key
                )
            }
            GatewayError::UndefinedProperties(model) => {
                write!(f, "UndefinedProperties: no properties supplied for {}", model)
            }
            GatewayError::CredentialsMissingProperty(property) => {
                write!(f, "CredentialsMissingProperty: credentials lack '{}'", property)
            }
            GatewayError::InvalidPayload(message) => {
                write!(f, "InvalidPayload: {}", message)
            }
            GatewayError::Validation { message, .. } => write!(f, "{}", message),
            GatewayError::Internal(message) => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Sanitized validation entries, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
}

impl GatewayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::BadCredentials
            | GatewayError::MissingCredentials
            | GatewayError::InvalidToken
            | GatewayError::ExpiredToken
            | GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            GatewayError::UserDisabled
            | GatewayError::UserNotConfirmed
            | GatewayError::InvalidUser => StatusCode::FORBIDDEN,

            GatewayError::UnknownModel(_)
            | GatewayError::RecordNotFound { .. }
            | GatewayError::CloneSourceNotFound { .. } => StatusCode::NOT_FOUND,

            GatewayError::UndefinedProperties(_)
            | GatewayError::CredentialsMissingProperty(_)
            | GatewayError::InvalidPayload(_)
            | GatewayError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::BadCredentials => "BadCredentials",
            GatewayError::MissingCredentials => "MissingCredentials",
            GatewayError::InvalidToken => "InvalidToken",
            GatewayError::ExpiredToken => "ExpiredToken",
            GatewayError::Unauthorized(_) => "Unauthorized",
            GatewayError::UserDisabled => "UserDisabled",
            GatewayError::UserNotConfirmed => "UserNotConfirmed",
            GatewayError::InvalidUser => "InvalidUser",
            GatewayError::UnknownModel(_) => "UnknownModel",
            GatewayError::RecordNotFound { .. } => "RecordNotFound",
            GatewayError::CloneSourceNotFound { .. } => "CloneSrcNotFound",
            GatewayError::UndefinedProperties(_) => "UndefinedProperties",
            GatewayError::CredentialsMissingProperty(_) => "CredentialsMissingProperty",
            GatewayError::InvalidPayload(_) => "InvalidPayload",
            GatewayError::Validation { .. } => "Validation",
            GatewayError::Internal(_) => "Internal",
        }
    }

    /// Map a store failure to its HTTP shape.
    ///
    /// Exhaustive over [`StoreError`]; validation reports are run through
    /// the sanitizer so only allow-listed fields reach the wire. Backend
    /// failures are logged here and become opaque 500s.
    pub fn classify(err: StoreError, sanitizer: &Sanitizer) -> Self {
        match err {
            StoreError::UnknownModel { model } => GatewayError::UnknownModel(model),
            StoreError::RecordNotFound { model, key } => {
                GatewayError::RecordNotFound { model, key }
            }
            StoreError::CloneSourceNotFound { model, key } => {
                GatewayError::CloneSourceNotFound { model, key }
            }
            StoreError::UndefinedProperties { model } => {
                GatewayError::UndefinedProperties(model)
            }
            StoreError::CredentialsMissingProperty { property } => {
                GatewayError::CredentialsMissingProperty(property)
            }
            StoreError::Unauthorized { reason } => GatewayError::Unauthorized(reason),
            StoreError::ScopeViolation { model, scope } => GatewayError::Validation {
                message: format!("model {} does not declare scope '{}'", model, scope),
                errors: Vec::new(),
            },
            StoreError::Validation(failure) => {
                let message = failure.to_string();
                let cleaned = sanitizer.failure(&failure);
                let errors = match cleaned.get("errors") {
                    Some(Value::Array(entries)) => entries.clone(),
                    _ => Vec::new(),
                };
                GatewayError::Validation { message, errors }
            }
            StoreError::Backend(message) => {
                tracing::error!(error = %message, "store backend failure");
                GatewayError::Internal(message)
            }
        }
    }

    /// Convert to an error response body
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            // internals stay in the logs
            GatewayError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        let errors = match self {
            GatewayError::Validation { errors, .. } if !errors.is_empty() => {
                Some(errors.clone())
            }
            _ => None,
        };
        ErrorResponse {
            error: self.error_code().to_string(),
            message,
            errors,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let GatewayError::Internal(message) = &self {
            tracing::error!(error = %message, "request failed internally");
        }
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

/// A specialized Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{ValidationFailure, ValidationItem};

    fn sanitizer() -> Sanitizer {
        Sanitizer::default()
    }

    // ── status mapping ──

    #[test]
    fn test_auth_errors_are_401() {
        for err in [
            GatewayError::BadCredentials,
            GatewayError::MissingCredentials,
            GatewayError::InvalidToken,
            GatewayError::ExpiredToken,
            GatewayError::Unauthorized("user gone".to_string()),
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{err}");
        }
    }

    #[test]
    fn test_account_state_errors_are_403() {
        for err in [
            GatewayError::UserDisabled,
            GatewayError::UserNotConfirmed,
            GatewayError::InvalidUser,
        ] {
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN, "{err}");
        }
    }

    #[test]
    fn test_missing_things_are_404() {
        assert_eq!(
            GatewayError::UnknownModel("Ghost".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::RecordNotFound {
                model: "Task".to_string(),
                key: "99".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_message_carries_error_code() {
        let err = GatewayError::BadCredentials;
        assert!(err.to_string().contains("BadCredentials"));

        let err = GatewayError::CloneSourceNotFound {
            model: "Task".to_string(),
            key: "9".to_string(),
        };
        assert!(err.to_string().contains("CloneSrcNotFound"));
        assert_eq!(err.error_code(), "CloneSrcNotFound");
    }

    // ── classifier ──

    #[test]
    fn test_classify_not_found() {
        let err = GatewayError::classify(
            StoreError::RecordNotFound {
                model: "Task".to_string(),
                key: "7".to_string(),
            },
            &sanitizer(),
        );
        assert!(matches!(err, GatewayError::RecordNotFound { .. }));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_classify_unauthorized() {
        let err = GatewayError::classify(
            StoreError::Unauthorized {
                reason: "role 'user' may not create Task".to_string(),
            },
            &sanitizer(),
        );
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_classify_validation_sanitizes_entries() {
        let failure = ValidationFailure {
            name: "ValidationError".to_string(),
            message: "1 required field missing".to_string(),
            fields: Some(vec!["title".to_string()]),
            errors: vec![ValidationItem::missing("title")],
        };
        let err = GatewayError::classify(StoreError::Validation(failure), &sanitizer());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let GatewayError::Validation { errors, .. } = err else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["path"], "title");
    }

    #[test]
    fn test_classify_backend_is_opaque() {
        let err = GatewayError::classify(
            StoreError::Backend("connection reset by peer".to_string()),
            &sanitizer(),
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.to_response();
        assert_eq!(body.message, "internal server error");
        assert!(!body.message.contains("connection reset"));
    }

    // ── response body ──

    #[test]
    fn test_response_shape() {
        let err = GatewayError::RecordNotFound {
            model: "Task".to_string(),
            key: "3".to_string(),
        };
        let body = err.to_response();
        assert_eq!(body.error, "RecordNotFound");
        assert!(body.message.contains("Task"));
        assert!(body.errors.is_none());
    }
}
