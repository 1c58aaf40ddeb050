//! What resource handlers return.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api_error::ApiError;
use crate::response::Response;

/// A handler result before content negotiation.
///
/// Convert from the shapes a handler naturally produces:
///
/// ```rust
/// use astor_restful::Output;
/// use http::{HeaderMap, StatusCode};
/// use serde_json::json;
///
/// let _: Output = json!({"id": 1}).into();                                // 200
/// let _: Output = (json!({"id": 1}), StatusCode::CREATED).into();
/// let _: Output = (json!(null), StatusCode::ACCEPTED, HeaderMap::new()).into();
/// ```
///
/// A [`Response`] bypasses the representation stage and is sent as is.
#[derive(Debug)]
pub enum Output {
    Data { data: Value, status: StatusCode, headers: HeaderMap },
    Raw(Response),
}

impl Output {
    pub fn new(data: impl Into<Value>) -> Self {
        Self::Data { data: data.into(), status: StatusCode::OK, headers: HeaderMap::new() }
    }

    /// Serializes any `Serialize` value as the payload.
    pub fn serialize<T: Serialize>(data: &T) -> Result<Self, ApiError> {
        Ok(Self::new(serde_json::to_value(data)?))
    }

    pub fn with_status(mut self, code: StatusCode) -> Self {
        if let Self::Data { status, .. } = &mut self {
            *status = code;
        }
        self
    }

    /// Filters the payload down to `fields` as [`marshal`] does, keeping
    /// status and headers. Raw responses pass through untouched.
    pub fn marshal(self, fields: &[&str], envelope: Option<&str>) -> Self {
        match self {
            Self::Data { data, status, headers } => {
                Self::Data { data: wrap(select(data, fields), envelope), status, headers }
            }
            raw @ Self::Raw(_) => raw,
        }
    }

    /// Adds a response header. Invalid header text is ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Self::Data { headers, .. } = &mut self {
            if let (Ok(name), Ok(value)) =
                (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
            {
                headers.append(name, value);
            }
        }
        self
    }
}

impl From<Value> for Output {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

impl From<(Value, StatusCode)> for Output {
    fn from((data, status): (Value, StatusCode)) -> Self {
        Self::Data { data, status, headers: HeaderMap::new() }
    }
}

impl From<(Value, StatusCode, HeaderMap)> for Output {
    fn from((data, status, headers): (Value, StatusCode, HeaderMap)) -> Self {
        Self::Data { data, status, headers }
    }
}

impl From<Response> for Output {
    fn from(res: Response) -> Self {
        Self::Raw(res)
    }
}

/// Serializes `data` and keeps only `fields`, optionally wrapped under an
/// `envelope` key.
///
/// Objects are cut down to the listed keys; a listed key the data lacks comes
/// out as `null`. Arrays are filtered element by element and enveloped as a
/// whole: `[a, b]` becomes `{"items": [a', b']}`.
///
/// ```rust
/// use astor_restful::marshal;
/// use serde_json::json;
///
/// let todos = json!([{"id": 1, "task": "write", "owner": "ana"}]);
/// assert_eq!(
///     marshal(&todos, &["id", "task"], Some("items")).unwrap(),
///     json!({"items": [{"id": 1, "task": "write"}]}),
/// );
/// ```
pub fn marshal<T: Serialize>(
    data: &T,
    fields: &[&str],
    envelope: Option<&str>,
) -> Result<Value, ApiError> {
    let value = serde_json::to_value(data)?;
    Ok(wrap(select(value, fields), envelope))
}

fn select(value: Value, fields: &[&str]) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(|v| select(v, fields)).collect()),
        Value::Object(mut source) => Value::Object(
            fields
                .iter()
                .map(|f| ((*f).to_owned(), source.remove(*f).unwrap_or(Value::Null)))
                .collect(),
        ),
        _ => Value::Object(fields.iter().map(|f| ((*f).to_owned(), Value::Null)).collect()),
    }
}

fn wrap(value: Value, envelope: Option<&str>) -> Value {
    match envelope {
        Some(key) => {
            let mut wrapped = Map::new();
            wrapped.insert(key.to_owned(), value);
            Value::Object(wrapped)
        }
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Todo {
        id: u32,
        task: &'static str,
    }

    #[test]
    fn tuple_shapes_carry_status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-total", HeaderValue::from_static("3"));
        match Output::from((json!([]), StatusCode::PARTIAL_CONTENT, headers)) {
            Output::Data { status, headers, .. } => {
                assert_eq!(status, StatusCode::PARTIAL_CONTENT);
                assert_eq!(headers["x-total"], "3");
            }
            Output::Raw(_) => panic!("expected data"),
        }
    }

    #[test]
    fn builder_methods_ignore_raw() {
        let out = Output::from(Response::text("raw")).with_status(StatusCode::CREATED);
        assert!(matches!(out, Output::Raw(res) if res.status_code() == StatusCode::OK));
    }

    #[test]
    fn marshal_filters_fields_per_element() {
        let todos = vec![Todo { id: 1, task: "write" }, Todo { id: 2, task: "test" }];
        assert_eq!(
            marshal(&todos, &["task"], Some("data")).unwrap(),
            json!({"data": [{"task": "write"}, {"task": "test"}]})
        );
        assert_eq!(
            marshal(&todos[0], &["id", "done"], None).unwrap(),
            json!({"id": 1, "done": null})
        );
    }

    #[test]
    fn output_marshal_keeps_status_and_headers() {
        let out = Output::new(json!({"id": 7, "secret": "x"}))
            .with_status(StatusCode::CREATED)
            .with_header("location", "/todos/7")
            .marshal(&["id"], Some("todo"));
        match out {
            Output::Data { data, status, headers } => {
                assert_eq!(data, json!({"todo": {"id": 7}}));
                assert_eq!(status, StatusCode::CREATED);
                assert_eq!(headers["location"], "/todos/7");
            }
            Output::Raw(_) => panic!("expected data"),
        }
    }

    #[test]
    fn serialize_builds_ok_output() {
        let out = Output::serialize(&Todo { id: 2, task: "test" }).unwrap();
        assert!(matches!(out, Output::Data { status, .. } if status == StatusCode::OK));
    }
}
