//! Incoming HTTP request type.
//!
//! The body is collected before a handler runs, so every accessor here is
//! synchronous. Decoded views of the query string, form body and JSON body
//! are computed on first use and cached on the request, which keeps repeated
//! parses of the same request cheap and identical.

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Uri};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::method::Method;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An incoming HTTP request with its body fully read.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    query: OnceLock<Vec<(String, String)>>,
    form: OnceLock<Vec<(String, String)>>,
    json: OnceLock<Option<Map<String, Value>>>,
}

impl Request {
    pub(crate) fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            params: HashMap::new(),
            query: OnceLock::new(),
            form: OnceLock::new(),
            json: OnceLock::new(),
        }
    }

    /// Builder for requests constructed in-process, e.g. in tests.
    pub fn builder() -> RequestBuilder {
        RequestBuilder {
            method: Method::Get,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub fn method(&self) -> Method { self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query_string(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Returns the first value if repeated.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a possibly repeated header, in arrival order.
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// The raw `Accept` header, if the client sent one.
    pub fn accept(&self) -> Option<&str> {
        self.headers.get(ACCEPT).and_then(|v| v.to_str().ok())
    }

    /// The media type of the body without parameters, e.g. `application/json`.
    pub fn content_type(&self) -> Option<&str> {
        let raw = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        raw.split(';').next().map(str::trim)
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Decoded query-string pairs. Repeated keys appear once per occurrence.
    pub fn query_pairs(&self) -> &[(String, String)] {
        self.query.get_or_init(|| match self.uri.query() {
            Some(q) => decode_pairs(q.as_bytes()),
            None => Vec::new(),
        })
    }

    /// Decoded `application/x-www-form-urlencoded` body pairs.
    ///
    /// Empty for any other content type.
    pub fn form_pairs(&self) -> &[(String, String)] {
        self.form.get_or_init(|| {
            let is_form = self
                .content_type()
                .is_some_and(|ct| ct.eq_ignore_ascii_case(FORM_URLENCODED));
            if is_form { decode_pairs(&self.body) } else { Vec::new() }
        })
    }

    /// The body decoded as a JSON object.
    ///
    /// `None` when the body is empty, is not JSON, or is JSON but not an object.
    pub fn json(&self) -> Option<&Map<String, Value>> {
        self.json
            .get_or_init(|| {
                if self.body.is_empty() {
                    return None;
                }
                match serde_json::from_slice::<Value>(&self.body) {
                    Ok(Value::Object(map)) => Some(map),
                    _ => None,
                }
            })
            .as_ref()
    }
}

fn decode_pairs(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input).into_owned().collect()
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Fluent builder for [`Request`]. Obtain via [`Request::builder()`].
///
/// ```rust
/// use astor_restful::{Method, Request};
///
/// let req = Request::builder()
///     .method(Method::Post)
///     .uri("/users?notify=true")
///     .header("accept", "text/csv")
///     .json(&serde_json::json!({"name": "alice"}))
///     .build();
/// assert_eq!(req.json().unwrap()["name"], "alice");
/// ```
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// # Panics
    ///
    /// Panics if `uri` is not a valid request target.
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri
            .parse()
            .unwrap_or_else(|e| panic!("invalid request uri `{uri}`: {e}"));
        self
    }

    /// Appends a header; repeated names keep every value.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `value` are not valid header text.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name = HeaderName::from_bytes(name.as_bytes())
            .unwrap_or_else(|e| panic!("invalid header name `{name}`: {e}"));
        let value = HeaderValue::from_str(value)
            .unwrap_or_else(|e| panic!("invalid header value `{value}`: {e}"));
        self.headers.append(name, value);
        self
    }

    /// Sets a raw body without touching `content-type`.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and `content-type: application/json`.
    pub fn json(mut self, value: &Value) -> Self {
        self.body = Bytes::from(value.to_string());
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    /// Sets a url-encoded form body and the matching `content-type`.
    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.body = Bytes::from(encoded);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
        self
    }

    pub fn build(self) -> Request {
        Request::new(self.method, self.uri, self.headers, self.body)
    }
}
