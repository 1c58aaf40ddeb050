use std::sync::{Arc, Mutex};
use std::time::Duration;

use astor_restful::middleware::Middleware;
use astor_restful::reqparse::{Argument, RequestParser};
use astor_restful::{
    inputs, Api, ApiError, ContentType, Endpoint, ErrorSpec, ErrorTable, HeaderMap, Method, Output,
    Reply, Request, Resource, Response, Router, StatusCode,
};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
#[error("user already exists")]
struct UserAlreadyExistsError;

#[derive(Debug, thiserror::Error)]
#[error("database unavailable")]
struct DatabaseDown;

struct Users {
    parser: RequestParser,
}

impl Users {
    fn new() -> Self {
        let parser = RequestParser::new()
            .add_argument(Argument::new("name").required(true))
            .add_argument(Argument::new("age").arg_type(inputs::natural()).required(true));
        Self { parser }
    }
}

#[async_trait]
impl Resource for Users {
    async fn get(&self, _req: &Request) -> Reply {
        Ok(json!([{"name": "alice", "age": 30}, {"name": "bob", "age": 25}]).into())
    }

    async fn post(&self, req: &Request) -> Reply {
        let args = self.parser.parse_args(req)?;
        match args.get_str("name") {
            Some("alice") => Err(UserAlreadyExistsError.into()),
            Some("crash") => Err(DatabaseDown.into()),
            _ => Ok(Output::new(args.into_value()).with_status(StatusCode::CREATED)),
        }
    }
}

struct User;

#[async_trait]
impl Resource for User {
    async fn get(&self, req: &Request) -> Reply {
        let id = req.param("user_id").unwrap_or_default();
        Ok(json!({"id": id}).into())
    }
}

/// Renders an array of flat objects as CSV, anything else as one JSON line.
fn csv(data: &Value, status: StatusCode, headers: HeaderMap) -> Response {
    let body = match data {
        Value::Array(rows) => {
            let mut out = String::new();
            if let Some(Value::Object(first)) = rows.first() {
                let cols: Vec<&String> = first.keys().collect();
                out.push_str(&cols.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(","));
                out.push('\n');
                for row in rows {
                    let cells: Vec<String> = cols
                        .iter()
                        .map(|c| match &row[c.as_str()] {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect();
                    out.push_str(&cells.join(","));
                    out.push('\n');
                }
            }
            out
        }
        other => format!("{other}\n"),
    };
    Response::builder().status(status).headers(headers).bytes(ContentType::Csv, body)
}

fn errors() -> ErrorTable {
    ErrorTable::new().map::<UserAlreadyExistsError>(ErrorSpec::new(
        StatusCode::CONFLICT,
        "A user with that username already exists.",
    ))
}

fn api() -> Api {
    Api::new()
        .errors(errors())
        .representation("text/csv", csv)
        .add_resource(Endpoint::new(Users::new()).url("/users"))
        .add_resource(Endpoint::new(User).url("/users/{user_id}"))
}

fn router() -> Router {
    api().into_router(Router::new())
}

fn body_json(res: &Response) -> Value {
    serde_json::from_slice(res.body()).expect("json body")
}

fn post_user(body: Value) -> astor_restful::RequestBuilder {
    Request::builder().method(Method::Post).uri("/users").json(&body)
}

#[tokio::test]
async fn same_data_rendered_per_accept_header() {
    let router = router();

    let res = router.handle(Request::builder().uri("/users").build()).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(body_json(&res)[1]["name"], "bob");

    let res = router
        .handle(Request::builder().uri("/users").header("accept", "text/csv").build())
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.header("content-type"), Some("text/csv"));
    assert_eq!(res.body(), b"age,name\n30,alice\n25,bob\n");
}

#[tokio::test]
async fn quality_values_pick_the_preferred_type() {
    let res = router()
        .handle(
            Request::builder()
                .uri("/users")
                .header("accept", "application/json;q=0.5, text/csv;q=0.9")
                .build(),
        )
        .await;
    assert_eq!(res.header("content-type"), Some("text/csv"));
}

#[tokio::test]
async fn unsupported_accept_falls_back_to_default() {
    let res = router()
        .handle(Request::builder().uri("/users").header("accept", "application/xml").build())
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn no_default_mediatype_answers_406() {
    let router = api().default_mediatype(None).into_router(Router::new());
    let res = router
        .handle(Request::builder().uri("/users").header("accept", "application/xml").build())
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn mapped_error_uses_table_and_negotiation() {
    let router = router();

    let res = router.handle(post_user(json!({"name": "alice", "age": 3})).build()).await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(&res),
        json!({"message": "A user with that username already exists."})
    );

    let res = router
        .handle(post_user(json!({"name": "alice", "age": 3})).header("accept", "text/csv").build())
        .await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);
    assert_eq!(res.header("content-type"), Some("text/csv"));
}

#[tokio::test]
async fn unmapped_error_is_a_generic_500() {
    let res = router().handle(post_user(json!({"name": "crash", "age": 3})).build()).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(&res), json!({"message": "Internal Server Error"}));
    assert!(!String::from_utf8_lossy(res.body()).contains("database"));
}

#[tokio::test]
async fn validation_errors_list_every_field() {
    let res = router().handle(post_user(json!({"age": "old"})).build()).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    let body = body_json(&res);
    let fields = body["message"].as_object().expect("field map");
    assert_eq!(fields.len(), 2);
    assert!(fields.contains_key("name"));
    assert_eq!(fields["age"], "Invalid age: old. age must be a non-negative integer");
}

#[tokio::test]
async fn created_output_keeps_status() {
    let res = router().handle(post_user(json!({"name": "carol", "age": "41"})).build()).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert_eq!(body_json(&res), json!({"name": "carol", "age": 41}));
}

#[tokio::test]
async fn unimplemented_verbs_are_405_and_head_uses_get() {
    let router = router();

    let res = router
        .handle(Request::builder().method(Method::Delete).uri("/users/7").build())
        .await;
    assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(&res), json!({"message": "Method Not Allowed"}));

    let res = router
        .handle(Request::builder().method(Method::Head).uri("/users/7").build())
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body_json(&res), json!({"id": "7"}));
}

#[tokio::test]
async fn unknown_routes_with_and_without_catch_all() {
    let bare = router().handle(Request::builder().uri("/nope").build()).await;
    assert_eq!(bare.status_code(), StatusCode::NOT_FOUND);
    assert!(bare.body().is_empty());

    let caught = api()
        .catch_all_404(true)
        .into_router(Router::new())
        .handle(Request::builder().uri("/nope").build())
        .await;
    assert_eq!(caught.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(caught.header("content-type"), Some("application/json"));
    assert_eq!(body_json(&caught), json!({"message": "Not Found"}));
}

#[tokio::test]
async fn prefix_applies_to_every_url() {
    let router = api().prefix("/v1").into_router(Router::new());
    let res = router.handle(Request::builder().uri("/v1/users/3").build()).await;
    assert_eq!(body_json(&res), json!({"id": "3"}));

    let res = router.handle(Request::builder().uri("/users/3").build()).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

/// Records hook calls as `"<label>.before"` / `"<label>.after:<status>"`.
struct Recorder {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    deny: bool,
}

impl Middleware for Recorder {
    fn before(&self, _req: &Request) -> Result<(), ApiError> {
        self.log.lock().unwrap().push(format!("{}.before", self.label));
        if self.deny {
            return Err(ApiError::abort(StatusCode::UNAUTHORIZED, "token required"));
        }
        Ok(())
    }

    fn after(&self, _req: &Request, res: &Response, _latency: Duration) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}.after:{}", self.label, res.status_code().as_u16()));
    }
}

#[tokio::test]
async fn middleware_runs_in_order_and_unwinds_in_reverse() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mw = |label, deny| Recorder { label, log: Arc::clone(&log), deny };

    let router = Api::new()
        .middleware(mw("api", false))
        .add_resource(
            Endpoint::new(User)
                .url("/users/{user_id}")
                .middleware(Method::Get, mw("get", false))
                .middleware(Method::Delete, mw("delete", true)),
        )
        .into_router(Router::new());

    router.handle(Request::builder().uri("/users/1").build()).await;
    assert_eq!(
        *log.lock().unwrap(),
        ["api.before", "get.before", "get.after:200", "api.after:200"]
    );

    log.lock().unwrap().clear();
    let res = router
        .handle(Request::builder().method(Method::Delete).uri("/users/1").build())
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(&res), json!({"message": "token required"}));
    assert_eq!(
        *log.lock().unwrap(),
        ["api.before", "delete.before", "api.after:401"]
    );
}

#[tokio::test]
async fn raw_responses_bypass_negotiation() {
    struct Download;

    #[async_trait]
    impl Resource for Download {
        async fn get(&self, _req: &Request) -> Reply {
            Ok(Response::builder().bytes(ContentType::OctetStream, vec![1u8, 2, 3]).into())
        }
    }

    let res = Api::new()
        .add_resource(Endpoint::new(Download).url("/blob"))
        .into_router(Router::new())
        .handle(Request::builder().uri("/blob").header("accept", "text/csv").build())
        .await;
    assert_eq!(res.header("content-type"), Some("application/octet-stream"));
    assert_eq!(res.body(), &[1, 2, 3]);
}
