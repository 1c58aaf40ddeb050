//! Errors raised on the request path.
//!
//! [`ApiError`] does not implement [`std::error::Error`]: that
//! leaves room for a blanket `From<E>` so handlers can use `?` on any error
//! type and have it looked up in the [`ErrorTable`](crate::ErrorTable) by
//! its concrete type.

use std::any::{TypeId, type_name};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// A request-path failure, rendered into a negotiated error response.
#[derive(Debug)]
pub enum ApiError {
    /// An explicit HTTP error, e.g. from [`abort`].
    Http { status: StatusCode, message: Option<Value> },

    /// Every field that failed request-argument parsing.
    Validation(ValidationErrors),

    /// Any other error a handler propagated with `?`.
    Application(AppError),
}

impl ApiError {
    /// An HTTP error with an explicit message.
    pub fn abort(status: StatusCode, message: impl Into<Value>) -> Self {
        Self::Http { status, message: Some(message.into()) }
    }

    /// An HTTP error whose body carries the canonical reason phrase.
    pub fn status(status: StatusCode) -> Self {
        Self::Http { status, message: None }
    }

    pub fn bad_request(message: impl Into<Value>) -> Self {
        Self::abort(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::status(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::status(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// The wrapped application error, if this is one.
    pub fn application(&self) -> Option<&AppError> {
        match self {
            Self::Application(e) => Some(e),
            _ => None,
        }
    }

    /// `true` if this wraps an application error of type `E`.
    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.application().is_some_and(|e| e.type_id == TypeId::of::<E>())
    }
}

impl<E> From<E> for ApiError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::Application(AppError {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            source: Box::new(error),
        })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, message: Some(Value::String(m)) } => write!(f, "{status}: {m}"),
            Self::Http { status, message: Some(m) } => write!(f, "{status}: {m}"),
            Self::Http { status, message: None } => write!(f, "{status}"),
            Self::Validation(errors) => write!(f, "invalid request arguments: {errors}"),
            Self::Application(e) => write!(f, "{}: {}", e.type_name, e.source),
        }
    }
}

/// Raise an HTTP error from a handler: `return Err(abort(StatusCode::FORBIDDEN, "nope"))`.
pub fn abort(status: StatusCode, message: impl Into<Value>) -> ApiError {
    ApiError::abort(status, message)
}

// ── AppError ──────────────────────────────────────────────────────────────────

/// An application error together with the type it was raised as.
pub struct AppError {
    pub(crate) type_id: TypeId,
    type_name: &'static str,
    source: Box<dyn StdError + Send + Sync>,
}

impl AppError {
    /// Fully qualified type name of the original error.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref()
    }

    pub fn source(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.source
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("type", &self.type_name)
            .field("source", &self.source)
            .finish()
    }
}

// ── ValidationErrors ──────────────────────────────────────────────────────────

/// Argument name → message for every argument that failed one parse.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.0.insert(name.into(), message.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Failing argument names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{name}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("user {0} already exists")]
    struct UserAlreadyExistsError(String);

    fn create() -> Result<(), ApiError> {
        Err(UserAlreadyExistsError("alice".into()).into())
    }

    #[test]
    fn question_mark_records_the_concrete_type() {
        let err = create().unwrap_err();
        assert!(err.is::<UserAlreadyExistsError>());
        assert!(!err.is::<std::io::Error>());
        let app = err.application().unwrap();
        assert!(app.type_name().ends_with("UserAlreadyExistsError"));
        assert_eq!(app.downcast_ref::<UserAlreadyExistsError>().unwrap().0, "alice");
    }

    #[test]
    fn validation_errors_display_sorted() {
        let mut errors = ValidationErrors::new();
        errors.insert("rate", "bad");
        errors.insert("name", "missing");
        assert_eq!(errors.to_string(), "name: missing; rate: bad");
        assert_eq!(errors.names().collect::<Vec<_>>(), vec!["name", "rate"]);
    }

    #[test]
    fn http_errors_display_status() {
        assert_eq!(ApiError::not_found().to_string(), "404 Not Found");
        assert_eq!(
            abort(StatusCode::FORBIDDEN, "nope").to_string(),
            "403 Forbidden: nope"
        );
    }
}
