//! Radix-tree request router.
//!
//! One tree per HTTP method, plus a method-agnostic tree for handlers that
//! dispatch on the verb themselves (resource endpoints). O(path-length)
//! lookup via [`matchit`].

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    any: MatchitRouter<BoxedHandler>,
    fallback: Option<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), any: MatchitRouter::new(), fallback: None }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or conflicts with an existing route.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self
    }

    /// Register a handler for every method on `path`.
    ///
    /// Method-specific routes registered with [`Router::on`] take precedence.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or conflicts with an existing route.
    pub fn any(self, path: &str, handler: impl Handler) -> Self {
        self.any_erased(path, handler.into_boxed_handler())
    }

    pub(crate) fn any_erased(mut self, path: &str, handler: BoxedHandler) -> Self {
        self.any
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Handler for requests no route matches. Without one the router answers
    /// a bare `404 Not Found`.
    pub fn fallback(self, handler: impl Handler) -> Self {
        self.fallback_erased(handler.into_boxed_handler())
    }

    pub(crate) fn fallback_erased(mut self, handler: BoxedHandler) -> Self {
        self.fallback = Some(handler);
        self
    }

    /// Routes one request and produces one response.
    pub async fn handle(&self, mut req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.set_params(params);
                handler.call(req).await
            }
            None => match &self.fallback {
                Some(handler) => handler.call(req).await,
                None => Response::status(StatusCode::NOT_FOUND),
            },
        }
    }

    fn lookup(&self, method: Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let matched = self
            .routes
            .get(&method)
            .and_then(|tree| tree.at(path).ok())
            .or_else(|| self.any.at(path).ok())?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn echo_id(req: Request) -> String {
        req.param("id").unwrap_or("none").to_owned()
    }

    async fn any_verb(req: Request) -> String {
        format!("any {}", req.method())
    }

    #[tokio::test]
    async fn method_routes_capture_params() {
        let router = Router::new().on(Method::Get, "/users/{id}", echo_id);
        let res = router
            .handle(Request::builder().uri("/users/42").build())
            .await;
        assert_eq!(res.body(), b"42");
    }

    #[tokio::test]
    async fn method_routes_beat_any_routes() {
        let router = Router::new()
            .on(Method::Get, "/things/{id}", echo_id)
            .any("/things/{id}", any_verb);
        let get = router.handle(Request::builder().uri("/things/7").build()).await;
        assert_eq!(get.body(), b"7");
        let put = router
            .handle(Request::builder().method(Method::Put).uri("/things/7").build())
            .await;
        assert_eq!(put.body(), b"any PUT");
    }

    #[tokio::test]
    async fn unmatched_uses_fallback_or_bare_404() {
        let bare = Router::new();
        let res = bare.handle(Request::builder().uri("/nope").build()).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert!(res.body().is_empty());

        let with_fallback = Router::new().fallback(|_req: Request| async { StatusCode::GONE });
        let res = with_fallback.handle(Request::builder().uri("/nope").build()).await;
        assert_eq!(res.status_code(), StatusCode::GONE);
    }
}
