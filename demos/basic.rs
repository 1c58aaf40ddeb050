//! Minimal astor-restful example: an in-memory todo list.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/v1/todos
//!   curl -H 'accept: text/csv' http://localhost:3000/v1/todos
//!   curl -X POST http://localhost:3000/v1/todos \
//!        -H 'content-type: application/json' \
//!        -d '{"task":"write docs","priority":2}'
//!   curl -X POST http://localhost:3000/v1/todos -d 'priority=9'
//!   curl http://localhost:3000/v1/todos/todo1
//!   curl -X DELETE http://localhost:3000/v1/todos/todo1

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use astor_restful::middleware::Trace;
use astor_restful::reqparse::{Argument, RequestParser};
use astor_restful::{
    inputs, Api, ContentType, Endpoint, ErrorSpec, ErrorTable, HeaderMap, Output, Reply, Request,
    Resource, Response, Router, Server, StatusCode,
};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
#[error("todo {0} does not exist")]
struct TodoDoesNotExist(String);

type Store = Arc<Mutex<BTreeMap<String, Value>>>;

// GET, POST /todos
struct TodoList {
    store: Store,
    parser: RequestParser,
}

#[async_trait]
impl Resource for TodoList {
    async fn get(&self, _req: &Request) -> Reply {
        let store = self.store.lock().unwrap();
        let todos: Vec<Value> = store
            .iter()
            .map(|(id, todo)| json!({"id": id, "task": todo["task"], "priority": todo["priority"]}))
            .collect();
        Ok(Value::Array(todos).into())
    }

    async fn post(&self, req: &Request) -> Reply {
        let args = self.parser.parse_args(req)?;
        let mut store = self.store.lock().unwrap();
        let id = format!("todo{}", store.len() + 1);
        store.insert(id.clone(), args.into_value());
        Ok(Output::new(store[&id].clone())
            .with_status(StatusCode::CREATED)
            .with_header("location", &format!("/v1/todos/{id}")))
    }
}

// GET, DELETE /todos/{todo_id}
struct Todo {
    store: Store,
}

impl Todo {
    fn id(req: &Request) -> String {
        req.param("todo_id").unwrap_or_default().to_owned()
    }
}

#[async_trait]
impl Resource for Todo {
    async fn get(&self, req: &Request) -> Reply {
        let id = Self::id(req);
        let store = self.store.lock().unwrap();
        let todo = store.get(&id).cloned().ok_or(TodoDoesNotExist(id))?;
        Ok(Output::new(todo).marshal(&["task", "priority"], None))
    }

    async fn delete(&self, req: &Request) -> Reply {
        let id = Self::id(req);
        self.store.lock().unwrap().remove(&id).ok_or(TodoDoesNotExist(id))?;
        Ok(Response::status(StatusCode::NO_CONTENT).into())
    }
}

// One line per row, columns in key order.
fn csv(data: &Value, status: StatusCode, headers: HeaderMap) -> Response {
    let rows = match data {
        Value::Array(rows) => rows.clone(),
        other => vec![other.clone()],
    };
    let mut out = String::new();
    for row in rows {
        if let Value::Object(fields) = row {
            let cells: Vec<String> = fields.values().map(|v| v.to_string()).collect();
            out.push_str(&cells.join(","));
        }
        out.push('\n');
    }
    Response::builder().status(status).headers(headers).bytes(ContentType::Csv, out)
}

#[tokio::main]
async fn main() -> Result<(), astor_restful::Error> {
    tracing_subscriber::fmt::init();

    let store = Store::default();
    let parser = RequestParser::new()
        .trim(true)
        .add_argument(Argument::new("task").required(true).help("Task cannot be blank!"))
        .add_argument(Argument::new("priority").arg_type(inputs::int_range(1, 5)).default(3));

    let errors = ErrorTable::new().map::<TodoDoesNotExist>(
        ErrorSpec::new(StatusCode::NOT_FOUND, "That todo does not exist.").extra("code", "no_todo"),
    );

    let app = Api::new()
        .prefix("/v1")
        .catch_all_404(true)
        .errors(errors)
        .representation("text/csv", csv)
        .middleware(Trace)
        .add_resource(Endpoint::new(TodoList { store: Arc::clone(&store), parser }).url("/todos"))
        .add_resource(Endpoint::new(Todo { store }).url("/todos/{todo_id}"))
        .into_router(Router::new());

    Server::bind("0.0.0.0:3000")?.serve(app).await
}
