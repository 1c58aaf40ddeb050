//! The [`Api`] facade: resources, representations and error translation
//! registered onto a [`Router`].
//!
//! # Request pipeline
//!
//! ```text
//! Router ─▶ middleware.before ─▶ Resource::{get,post,…} ─▶ Output ─┐
//!                 │ Err                     │ Err                    │
//!                 └────────▶ ErrorTable::translate ─▶ (status, body) ┤
//!                                                                    ▼
//!                       Accept header ─▶ best_match ─▶ Representation::render
//!                                                                    │
//!                                         middleware.after ◀─ Response
//! ```
//!
//! Success and error bodies take the same path through negotiation, so a
//! client asking for CSV gets CSV errors too.

use std::sync::Arc;
use std::time::Instant;

use http::{HeaderMap, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use crate::api_error::ApiError;
use crate::config::ApiConfig;
use crate::error_table::ErrorTable;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Middleware;
use crate::negotiation;
use crate::output::Output;
use crate::representation::{
    APPLICATION_JSON, Json, JsonSettings, Representation, Representations,
};
use crate::request::Request;
use crate::resource::{self, Endpoint};
use crate::response::Response;
use crate::router::Router;

/// Entry point for building a REST API.
///
/// ```rust,no_run
/// use astor_restful::{Api, ApiError, Endpoint, Output, Request, Resource, Router, Server};
/// use async_trait::async_trait;
/// use serde_json::json;
///
/// struct HelloWorld;
///
/// #[async_trait]
/// impl Resource for HelloWorld {
///     async fn get(&self, _req: &Request) -> Result<Output, ApiError> {
///         Ok(json!({"hello": "world"}).into())
///     }
/// }
///
/// # async fn run() -> Result<(), astor_restful::Error> {
/// let router = Api::new()
///     .prefix("/v1")
///     .add_resource(Endpoint::new(HelloWorld).url("/"))
///     .into_router(Router::new());
///
/// Server::bind("0.0.0.0:3000")?.serve(router).await
/// # }
/// ```
pub struct Api {
    config: ApiConfig,
    representations: Representations,
    errors: ErrorTable,
    middleware: Vec<Arc<dyn Middleware>>,
    endpoints: Vec<Endpoint>,
}

impl Api {
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        Self {
            representations: Representations::new(config.json),
            config,
            errors: ErrorTable::new(),
            middleware: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    /// Prefix for every resource URL, e.g. `/v1`.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.config.prefix = prefix.to_owned();
        self
    }

    /// Media type used when negotiation finds no match. `None` answers
    /// `406 Not Acceptable` instead.
    pub fn default_mediatype(mut self, media_type: Option<&str>) -> Self {
        self.config.default_mediatype = media_type.map(str::to_owned);
        self
    }

    pub fn catch_all_404(mut self, enabled: bool) -> Self {
        self.config.catch_all_404 = enabled;
        self
    }

    /// Reconfigures the built-in JSON representation. Replaces any custom
    /// `application/json` representation registered before.
    pub fn json_settings(mut self, settings: JsonSettings) -> Self {
        self.config.json = settings;
        self.representations.insert(APPLICATION_JSON, Json::new(settings));
        self
    }

    pub fn errors(mut self, table: ErrorTable) -> Self {
        self.errors = table;
        self
    }

    /// Registers (or replaces) the serializer for `media_type`.
    pub fn representation(mut self, media_type: &str, repr: impl Representation) -> Self {
        self.representations.insert(media_type, repr);
        self
    }

    /// Middleware run for every verb of every resource, before the
    /// endpoint's own.
    pub fn middleware(mut self, mw: impl Middleware) -> Self {
        self.middleware.push(Arc::new(mw));
        self
    }

    /// Adds a resource endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the endpoint has no URL or its name is already taken.
    pub fn add_resource(mut self, endpoint: Endpoint) -> Self {
        if endpoint.urls.is_empty() {
            panic!("endpoint `{}` has no urls", endpoint.name);
        }
        if self.endpoints.iter().any(|e| e.name == endpoint.name) {
            panic!("endpoint name `{}` is already registered", endpoint.name);
        }
        self.endpoints.push(endpoint);
        self
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(|e| e.name.as_str())
    }

    /// Builds the first URL of `endpoint` with the prefix applied and
    /// `{name}` segments filled from `params`. Values are inserted verbatim.
    ///
    /// `None` if the endpoint is unknown or a segment was left unfilled.
    pub fn url_for(&self, endpoint: &str, params: &[(&str, &str)]) -> Option<String> {
        let ep = self.endpoints.iter().find(|e| e.name == endpoint)?;
        let mut url = complete_url(&self.config.prefix, ep.urls.first()?);
        for (name, value) in params {
            url = url
                .replace(&format!("{{{name}}}"), value)
                .replace(&format!("{{*{name}}}"), value);
        }
        (!url.contains('{')).then_some(url)
    }

    /// Registers every endpoint on `router`, for every verb, and installs
    /// the 404 fallback when `catch_all_404` is set.
    pub fn into_router(self, mut router: Router) -> Router {
        let Api { config, representations, errors, middleware, endpoints } = self;
        let shared = Arc::new(Shared {
            representations,
            errors,
            default_mediatype: config.default_mediatype,
            middleware,
        });

        for endpoint in endpoints {
            let paths: Vec<String> = endpoint
                .urls
                .iter()
                .map(|url| complete_url(&config.prefix, url))
                .collect();
            debug!(endpoint = %endpoint.name, paths = ?paths, "registering resource");
            let route: BoxedHandler = Arc::new(ResourceRoute {
                shared: Arc::clone(&shared),
                endpoint: Arc::new(endpoint),
            });
            for path in &paths {
                router = router.any_erased(path, Arc::clone(&route));
            }
        }

        if config.catch_all_404 {
            router = router.fallback_erased(Arc::new(NotFound(shared)));
        }
        router
    }
}

impl Default for Api {
    fn default() -> Self { Self::new() }
}

fn complete_url(prefix: &str, url: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        url.to_owned()
    } else if url.starts_with('/') {
        format!("{prefix}{url}")
    } else {
        format!("{prefix}/{url}")
    }
}

// ── Per-request pipeline ──────────────────────────────────────────────────────

/// Routing-tree entry for one endpoint; shared by all of its URLs.
struct ResourceRoute {
    shared: Arc<Shared>,
    endpoint: Arc<Endpoint>,
}

impl ErasedHandler for ResourceRoute {
    fn call(&self, req: Request) -> BoxFuture {
        let shared = Arc::clone(&self.shared);
        let endpoint = Arc::clone(&self.endpoint);
        Box::pin(async move { shared.serve(&endpoint, req).await })
    }
}

/// Fallback installed by `catch_all_404`.
struct NotFound(Arc<Shared>);

impl ErasedHandler for NotFound {
    fn call(&self, req: Request) -> BoxFuture {
        let response = self.0.handle_error(&req, ApiError::not_found());
        Box::pin(async move { response })
    }
}

/// Everything the request path reads. Immutable once the router is built.
struct Shared {
    representations: Representations,
    errors: ErrorTable,
    default_mediatype: Option<String>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Shared {
    async fn serve(&self, endpoint: &Endpoint, req: Request) -> Response {
        let started = Instant::now();
        let chain: Vec<&Arc<dyn Middleware>> = self
            .middleware
            .iter()
            .chain(endpoint.middleware_for(req.method()))
            .collect();

        let mut passed = 0;
        let result = 'run: {
            for mw in &chain {
                if let Err(e) = mw.before(&req) {
                    break 'run Err(e);
                }
                passed += 1;
            }
            resource::dispatch(endpoint.resource.as_ref(), &req).await
        };

        let response = match result {
            Ok(output) => self.make_response(&req, output),
            Err(err) => self.handle_error(&req, err),
        };

        let latency = started.elapsed();
        for mw in chain[..passed].iter().rev() {
            mw.after(&req, &response, latency);
        }
        response
    }

    fn make_response(&self, req: &Request, output: Output) -> Response {
        match output {
            Output::Raw(res) => res,
            Output::Data { data, status, headers } => self.represent(req, &data, status, headers),
        }
    }

    fn handle_error(&self, req: &Request, err: ApiError) -> Response {
        let (status, body) = self.errors.translate(&err);
        self.represent(req, &body, status, HeaderMap::new())
    }

    fn represent(&self, req: &Request, data: &Value, status: StatusCode, headers: HeaderMap) -> Response {
        let available: Vec<&str> = self.representations.media_types().collect();
        let default = self.default_mediatype.as_deref();
        let Some(media_type) = negotiation::best_match(req.accept(), &available, default) else {
            debug!(accept = ?req.accept(), "no acceptable representation");
            return Response::builder()
                .status(StatusCode::NOT_ACCEPTABLE)
                .text("Not Acceptable");
        };

        if let Some(repr) = self.representations.get(media_type) {
            debug!(media_type, status = status.as_u16(), "rendering response");
            let mut res = repr.render(data, status, headers);
            res.set_content_type(media_type);
            return res;
        }

        if media_type.eq_ignore_ascii_case("text/plain") {
            let body = match data {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Response::builder().status(status).headers(headers).text(body);
        }

        error!(media_type, "default media type has no registered representation");
        Response::status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
