//! Error-to-response translation.
//!
//! Application errors are matched by their concrete Rust type against a
//! table configured at startup:
//!
//! ```rust
//! use astor_restful::{ErrorSpec, ErrorTable};
//! use http::StatusCode;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("user already exists")]
//! struct UserAlreadyExistsError;
//!
//! let errors = ErrorTable::new().map::<UserAlreadyExistsError>(
//!     ErrorSpec::new(StatusCode::CONFLICT, "A user with that username already exists.")
//!         .extra("code", "user_exists"),
//! );
//! ```
//!
//! Anything not in the table becomes `500 Internal Server Error` with a
//! generic message.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::error::Error as StdError;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::api_error::ApiError;

const GENERIC_MESSAGE: &str = "Internal Server Error";

fn default_status() -> u16 {
    StatusCode::INTERNAL_SERVER_ERROR.as_u16()
}

/// How one error type is presented to clients.
///
/// Deserializable, so messages and statuses can live in configuration:
/// `{"message": "...", "status": 409, "code": "user_exists"}`. Keys other
/// than `message` and `status` are copied into the body.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ErrorSpec {
    pub message: String,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorSpec {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { message: message.into(), status: status.as_u16(), extra: Map::new() }
    }

    /// Adds a field to the error body next to `message`.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or_else(|_| {
            warn!(status = self.status, "configured error status is not valid, using 500");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }

    fn body(&self) -> Value {
        let mut body = self.extra.clone();
        body.insert("message".to_owned(), Value::String(self.message.clone()));
        Value::Object(body)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    type_name: &'static str,
    spec: ErrorSpec,
}

/// Maps error types to [`ErrorSpec`]s. Built once, read on every failure.
#[derive(Clone, Debug, Default)]
pub struct ErrorTable {
    entries: HashMap<TypeId, Entry>,
}

impl ErrorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the presentation of errors of type `E`. A second call for
    /// the same type replaces the first.
    pub fn map<E: StdError + 'static>(mut self, spec: ErrorSpec) -> Self {
        self.entries
            .insert(TypeId::of::<E>(), Entry { type_name: type_name::<E>(), spec });
        self
    }

    pub fn get<E: StdError + 'static>(&self) -> Option<&ErrorSpec> {
        self.entries.get(&TypeId::of::<E>()).map(|e| &e.spec)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turns an error into the status and body to send back.
    pub fn translate(&self, err: &ApiError) -> (StatusCode, Value) {
        match err {
            ApiError::Http { status, message } => {
                let message = message.clone().unwrap_or_else(|| {
                    Value::String(status.canonical_reason().unwrap_or("Unknown Error").to_owned())
                });
                (*status, message_body(message))
            }
            ApiError::Validation(errors) => {
                debug!(fields = %errors, "request arguments failed validation");
                (StatusCode::BAD_REQUEST, message_body(errors.to_value()))
            }
            ApiError::Application(app) => match self.entries.get(&app.type_id) {
                Some(entry) => {
                    debug!(error_type = entry.type_name, "mapped application error: {}", app.source());
                    (entry.spec.status_code(), entry.spec.body())
                }
                None => {
                    error!(error_type = app.type_name(), "unhandled application error: {}", app.source());
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        message_body(Value::String(GENERIC_MESSAGE.to_owned())),
                    )
                }
            },
        }
    }
}

fn message_body(message: Value) -> Value {
    let mut body = Map::new();
    body.insert("message".to_owned(), message);
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("user already exists")]
    struct UserAlreadyExistsError;

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct DiskError;

    fn table() -> ErrorTable {
        ErrorTable::new().map::<UserAlreadyExistsError>(
            ErrorSpec::new(StatusCode::CONFLICT, "A user with that username already exists.")
                .extra("code", "user_exists"),
        )
    }

    #[test]
    fn mapped_error_uses_spec() {
        let (status, body) = table().translate(&UserAlreadyExistsError.into());
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            json!({"message": "A user with that username already exists.", "code": "user_exists"})
        );
    }

    #[test]
    fn unmapped_error_is_generic_500() {
        let (status, body) = table().translate(&DiskError.into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "Internal Server Error"}));
    }

    #[test]
    fn http_error_defaults_to_reason_phrase() {
        let (status, body) = ErrorTable::new().translate(&ApiError::method_not_allowed());
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({"message": "Method Not Allowed"}));
    }

    #[test]
    fn spec_deserializes_with_extras() {
        let spec: ErrorSpec =
            serde_json::from_value(json!({"message": "gone", "status": 410, "hint": "retry"})).unwrap();
        assert_eq!(spec.status, 410);
        assert_eq!(spec.extra.get("hint"), Some(&json!("retry")));

        let spec: ErrorSpec = serde_json::from_value(json!({"message": "boom"})).unwrap();
        assert_eq!(spec.status, 500);
    }

    #[test]
    fn invalid_configured_status_falls_back() {
        let spec = ErrorSpec { message: "x".into(), status: 42, extra: Map::new() };
        let (status, _) = ErrorTable::new().map::<DiskError>(spec).translate(&DiskError.into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
