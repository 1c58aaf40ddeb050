//! Output representations: one serializer per media type.
//!
//! A representation turns handler data into a [`Response`]. It owns the
//! encoding; the status and headers come from the handler's
//! [`Output`](crate::Output). Register extra ones on the [`Api`](crate::Api):
//!
//! ```rust
//! use astor_restful::{Api, ContentType, Response};
//! use http::{HeaderMap, StatusCode};
//! use serde_json::Value;
//!
//! fn csv(data: &Value, status: StatusCode, headers: HeaderMap) -> Response {
//!     let rows = data.as_array().cloned().unwrap_or_default();
//!     let body: String = rows.iter().map(|r| format!("{r}\n")).collect();
//!     Response::builder().status(status).headers(headers).bytes(ContentType::Csv, body)
//! }
//!
//! let api = Api::new().representation("text/csv", csv);
//! ```

use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::error;

use crate::response::Response;

pub const APPLICATION_JSON: &str = "application/json";

/// A serializer registered for one media type.
pub trait Representation: Send + Sync + 'static {
    fn render(&self, data: &Value, status: StatusCode, headers: HeaderMap) -> Response;
}

impl<F> Representation for F
where
    F: Fn(&Value, StatusCode, HeaderMap) -> Response + Send + Sync + 'static,
{
    fn render(&self, data: &Value, status: StatusCode, headers: HeaderMap) -> Response {
        self(data, status, headers)
    }
}

// ── JSON ──────────────────────────────────────────────────────────────────────

/// Options for the built-in JSON representation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JsonSettings {
    /// Indent the output instead of writing it compactly.
    pub pretty: bool,
}

/// The default representation: JSON followed by a newline.
#[derive(Clone, Copy, Debug, Default)]
pub struct Json {
    settings: JsonSettings,
}

impl Json {
    pub fn new(settings: JsonSettings) -> Self {
        Self { settings }
    }
}

impl Representation for Json {
    fn render(&self, data: &Value, status: StatusCode, headers: HeaderMap) -> Response {
        let encoded = if self.settings.pretty {
            serde_json::to_vec_pretty(data)
        } else {
            serde_json::to_vec(data)
        };
        match encoded {
            Ok(mut body) => {
                body.push(b'\n');
                Response::builder().status(status).headers(headers).json(body)
            }
            Err(e) => {
                error!("failed to encode JSON response: {e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

// ── Representations ───────────────────────────────────────────────────────────

/// Media type → representation, in registration order.
///
/// Starts with `application/json`. Registering a type that is already
/// present replaces its serializer in place.
#[derive(Clone)]
pub struct Representations {
    entries: Vec<(String, Arc<dyn Representation>)>,
}

impl Representations {
    /// A table holding only the JSON representation.
    pub fn new(json: JsonSettings) -> Self {
        Self { entries: vec![(APPLICATION_JSON.to_owned(), Arc::new(Json::new(json)))] }
    }

    /// A table with no representations at all.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn insert(&mut self, media_type: &str, repr: impl Representation) {
        let repr: Arc<dyn Representation> = Arc::new(repr);
        match self
            .entries
            .iter_mut()
            .find(|(m, _)| m.eq_ignore_ascii_case(media_type))
        {
            Some(entry) => entry.1 = repr,
            None => self.entries.push((media_type.to_owned(), repr)),
        }
    }

    pub fn get(&self, media_type: &str) -> Option<&dyn Representation> {
        self.entries
            .iter()
            .find(|(m, _)| m.eq_ignore_ascii_case(media_type))
            .map(|(_, r)| r.as_ref())
    }

    pub fn media_types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(m, _)| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Representations {
    fn default() -> Self {
        Self::new(JsonSettings::default())
    }
}

impl fmt::Debug for Representations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.media_types()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_appends_newline() {
        let res = Json::default().render(&json!({"a": 1}), StatusCode::CREATED, HeaderMap::new());
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.body(), b"{\"a\":1}\n");
    }

    #[test]
    fn pretty_json_is_indented() {
        let res = Json::new(JsonSettings { pretty: true })
            .render(&json!({"a": 1}), StatusCode::OK, HeaderMap::new());
        assert_eq!(res.body(), b"{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn empty_table_starts_without_json() {
        let mut table = Representations::empty();
        assert!(table.is_empty());
        assert!(table.get(APPLICATION_JSON).is_none());
        table.insert("text/csv", |_: &Value, s: StatusCode, _: HeaderMap| Response::status(s));
        assert_eq!(table.media_types().collect::<Vec<_>>(), vec!["text/csv"]);
        assert_eq!(Representations::default().len(), 1);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut table = Representations::default();
        table.insert("text/csv", |_: &Value, s: StatusCode, _: HeaderMap| Response::status(s));
        table.insert("application/json", |_: &Value, _: StatusCode, _: HeaderMap| {
            Response::text("custom")
        });
        assert_eq!(table.media_types().collect::<Vec<_>>(), vec!["application/json", "text/csv"]);
        let res = table
            .get("application/json")
            .unwrap()
            .render(&Value::Null, StatusCode::OK, HeaderMap::new());
        assert_eq!(res.body(), b"custom");
    }
}
