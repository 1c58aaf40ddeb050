//! Resources: one async method per HTTP verb.
//!
//! ```rust
//! use astor_restful::{ApiError, Output, Request, Resource};
//! use async_trait::async_trait;
//! use serde_json::json;
//!
//! struct HelloWorld;
//!
//! #[async_trait]
//! impl Resource for HelloWorld {
//!     async fn get(&self, _req: &Request) -> Result<Output, ApiError> {
//!         Ok(json!({"hello": "world"}).into())
//!     }
//! }
//! ```
//!
//! Verbs a resource does not implement answer `405 Method Not Allowed`.
//! `HEAD` falls back to `get`.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api_error::ApiError;
use crate::method::Method;
use crate::middleware::Middleware;
use crate::output::Output;
use crate::request::Request;

/// The result every resource method produces.
pub type Reply = Result<Output, ApiError>;

#[async_trait]
pub trait Resource: Send + Sync + 'static {
    async fn get(&self, _req: &Request) -> Reply {
        Err(ApiError::method_not_allowed())
    }

    async fn post(&self, _req: &Request) -> Reply {
        Err(ApiError::method_not_allowed())
    }

    async fn put(&self, _req: &Request) -> Reply {
        Err(ApiError::method_not_allowed())
    }

    async fn patch(&self, _req: &Request) -> Reply {
        Err(ApiError::method_not_allowed())
    }

    async fn delete(&self, _req: &Request) -> Reply {
        Err(ApiError::method_not_allowed())
    }

    async fn options(&self, _req: &Request) -> Reply {
        Err(ApiError::method_not_allowed())
    }

    async fn head(&self, req: &Request) -> Reply {
        self.get(req).await
    }
}

/// Calls the resource method matching the request's verb.
pub(crate) async fn dispatch(resource: &dyn Resource, req: &Request) -> Reply {
    match req.method() {
        Method::Get => resource.get(req).await,
        Method::Head => resource.head(req).await,
        Method::Post => resource.post(req).await,
        Method::Put => resource.put(req).await,
        Method::Patch => resource.patch(req).await,
        Method::Delete => resource.delete(req).await,
        Method::Options => resource.options(req).await,
        Method::Connect | Method::Trace => Err(ApiError::method_not_allowed()),
    }
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// A resource plus the URLs it answers on, its name and per-verb middleware.
///
/// ```rust
/// # use astor_restful::{Endpoint, Method, Resource, Request, ApiError};
/// # struct Users;
/// # impl Resource for Users {}
/// # fn require_token(_: &Request) -> Result<(), ApiError> { Ok(()) }
/// let users = Endpoint::new(Users)
///     .urls(["/users", "/members"])
///     .middleware(Method::Post, require_token);
/// assert_eq!(users.endpoint_name(), "users");
/// ```
pub struct Endpoint {
    pub(crate) resource: Arc<dyn Resource>,
    pub(crate) urls: Vec<String>,
    pub(crate) name: String,
    pub(crate) every_verb: Vec<Arc<dyn Middleware>>,
    pub(crate) middleware: HashMap<Method, Vec<Arc<dyn Middleware>>>,
}

impl Endpoint {
    /// Wraps `resource`. The endpoint name defaults to the lowercased type
    /// name, e.g. `todolist` for `TodoList`.
    pub fn new<R: Resource>(resource: R) -> Self {
        Self {
            resource: Arc::new(resource),
            urls: Vec::new(),
            name: default_name::<R>(),
            every_verb: Vec::new(),
            middleware: HashMap::new(),
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.urls.push(url.to_owned());
        self
    }

    pub fn urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Overrides the endpoint name used by [`Api::url_for`](crate::Api::url_for).
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Appends middleware that only runs for `method`.
    pub fn middleware(mut self, method: Method, mw: impl Middleware) -> Self {
        self.middleware.entry(method).or_default().push(Arc::new(mw));
        self
    }

    /// Appends middleware that runs for every verb, ahead of the per-verb
    /// lists.
    pub fn middleware_all(mut self, mw: impl Middleware) -> Self {
        self.every_verb.push(Arc::new(mw));
        self
    }

    pub fn endpoint_name(&self) -> &str {
        &self.name
    }

    pub(crate) fn middleware_for(
        &self,
        method: Method,
    ) -> impl Iterator<Item = &Arc<dyn Middleware>> {
        let verb = self.middleware.get(&method).map(Vec::as_slice).unwrap_or(&[]);
        self.every_verb.iter().chain(verb)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("urls", &self.urls)
            .finish_non_exhaustive()
    }
}

fn default_name<R>() -> String {
    let full = type_name::<R>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}
