//! # astor-restful
//!
//! Resource-oriented REST APIs on top of a small hyper server.
//!
//! You write resources: one async method per HTTP verb, returning plain
//! data. The framework does the rest:
//!
//! - **Routing**: radix-tree lookup via [`matchit`], with an optional URL prefix
//! - **Request parsing**: declarative arguments with coercion, defaults and
//!   bundled validation errors ([`reqparse`], [`inputs`])
//! - **Content negotiation**: the `Accept` header picks a registered
//!   [`Representation`]; JSON is built in
//! - **Error translation**: your error types map to status codes and bodies
//!   through an [`ErrorTable`], and go through the same negotiation
//! - **Middleware**: `before` hooks that may short-circuit, `after` hooks that
//!   see the final response
//! - **Graceful shutdown**: SIGTERM / Ctrl-C drains in-flight requests
//!
//! TLS, body-size limits and rate limiting belong to the reverse proxy in
//! front.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use astor_restful::reqparse::{Argument, RequestParser};
//! use astor_restful::{inputs, Api, Endpoint, Reply, Request, Resource, Router, Server};
//! use async_trait::async_trait;
//! use serde_json::json;
//!
//! struct Todos {
//!     parser: RequestParser,
//! }
//!
//! #[async_trait]
//! impl Resource for Todos {
//!     async fn get(&self, req: &Request) -> Reply {
//!         let args = self.parser.parse_args(req)?;
//!         let limit = args.get_i64("limit").unwrap_or(10);
//!         Ok(json!({"todos": [], "limit": limit}).into())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), astor_restful::Error> {
//!     let parser = RequestParser::new()
//!         .add_argument(Argument::new("limit").arg_type(inputs::int_range(1, 100)).default(10));
//!
//!     let router = Api::new()
//!         .prefix("/v1")
//!         .add_resource(Endpoint::new(Todos { parser }).url("/todos"))
//!         .into_router(Router::new());
//!
//!     Server::bind("0.0.0.0:3000")?.serve(router).await
//! }
//! ```

mod api;
mod api_error;
mod config;
mod error;
mod error_table;
mod handler;
mod method;
mod output;
mod representation;
mod request;
mod resource;
mod response;
mod router;
mod server;

pub mod inputs;
pub mod middleware;
pub mod negotiation;
pub mod reqparse;

pub use api::Api;
pub use api_error::{abort, ApiError, AppError, ValidationErrors};
pub use config::ApiConfig;
pub use error::Error;
pub use error_table::{ErrorSpec, ErrorTable};
pub use handler::Handler;
pub use method::Method;
pub use output::{marshal, Output};
pub use representation::{Json, JsonSettings, Representation, Representations, APPLICATION_JSON};
pub use request::{Request, RequestBuilder};
pub use resource::{Endpoint, Reply, Resource};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;

pub use http::{HeaderMap, StatusCode};
