//! Route table and chain assembly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use futures::future::BoxFuture;

use crate::error::ApiError;
use crate::handlers;
use crate::http::{Bindings, Request, RequestContext, ResponseParts};
use crate::identity::HashedIdentity;
use crate::limiter::WindowCounter;
use crate::middleware::{
    BearerAuth, Chain, ContractEnforcement, DefaultHeaders, ErrorNormalization, Handler,
    RateLimit,
};
use crate::store::MemoryStore;

/// Counter binding consulted by the public API limiter.
pub const PUBLIC_API_COUNTER: &str = "public_api";

type HandlerFn = for<'a> fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), ApiError>>;

enum Segment {
    Literal(String),
    Param(String),
}

struct Route {
    method: Method,
    segments: Vec<Segment>,
    handler: HandlerFn,
}

impl Route {
    fn parse(method: Method, pattern: &str, handler: HandlerFn) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            method,
            segments,
            handler,
        }
    }

    fn matches(&self, method: &Method, path: &str) -> Option<HashMap<String, String>> {
        if *method != self.method {
            return None;
        }

        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

/// Terminal handler: dispatches the request to the matching route.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn route(mut self, method: Method, pattern: &str, handler: HandlerFn) -> Self {
        self.routes.push(Route::parse(method, pattern, handler));
        self
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for Router {
    async fn call(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        for route in &self.routes {
            if let Some(params) = route.matches(&ctx.request.method, &ctx.request.path) {
                ctx.params = params;
                return (route.handler)(ctx).await;
            }
        }
        Err(ApiError::not_found(format!(
            "no route for {} {}",
            ctx.request.method, ctx.request.path
        )))
    }
}

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub rate_limiting: bool,
}

impl AppOptions {
    pub fn from_config() -> Self {
        Self {
            rate_limiting: crate::config::config().api.enable_rate_limiting,
        }
    }
}

/// The assembled service: one linear middleware chain around the router.
pub struct App {
    chain: Chain,
    bindings: Arc<Bindings>,
}

impl App {
    pub fn new(bindings: Arc<Bindings>) -> Self {
        Self::with_options(bindings, AppOptions::from_config())
    }

    pub fn with_options(bindings: Arc<Bindings>, options: AppOptions) -> Self {
        // Registration order is the onion order: the normalizer is outermost
        // so it traps everything, contract enforcement sits just outside the
        // router so it sees the final accumulated body.
        let mut chain = Chain::new(Arc::new(default_router()))
            .with(Arc::new(ErrorNormalization))
            .with(Arc::new(DefaultHeaders))
            .with(Arc::new(BearerAuth));

        if options.rate_limiting {
            chain = chain.with(Arc::new(RateLimit::new(
                PUBLIC_API_COUNTER,
                "public_api",
                "/api",
            )));
        }

        let chain = chain.with(Arc::new(ContractEnforcement));
        Self { chain, bindings }
    }

    /// Run one request through the chain and hand back the accumulated
    /// response. One logical task per request; nothing here is shared
    /// mutable state.
    pub async fn dispatch(&self, request: Request) -> ResponseParts {
        let mut ctx = RequestContext::new(request, self.bindings.clone());
        self.chain.run(&mut ctx).await;
        ctx.response
    }
}

fn default_router() -> Router {
    Router::new()
        .route(Method::GET, "/", root_route)
        .route(Method::GET, "/health", health_route)
        .route(Method::GET, "/api/entries/:id", entry_get_route)
        .route(Method::POST, "/api/search", search_route)
        .route(Method::GET, "/api/bulk/:dataset/keys", bulk_keys_route)
        .route(Method::POST, "/api/bulk/:dataset/values", bulk_values_route)
}

fn root_route(ctx: &mut RequestContext) -> BoxFuture<'_, Result<(), ApiError>> {
    Box::pin(handlers::root(ctx))
}

fn health_route(ctx: &mut RequestContext) -> BoxFuture<'_, Result<(), ApiError>> {
    Box::pin(handlers::health(ctx))
}

fn entry_get_route(ctx: &mut RequestContext) -> BoxFuture<'_, Result<(), ApiError>> {
    Box::pin(handlers::entries::get(ctx))
}

fn search_route(ctx: &mut RequestContext) -> BoxFuture<'_, Result<(), ApiError>> {
    Box::pin(handlers::search::post(ctx))
}

fn bulk_keys_route(ctx: &mut RequestContext) -> BoxFuture<'_, Result<(), ApiError>> {
    Box::pin(handlers::bulk::keys(ctx))
}

fn bulk_values_route(ctx: &mut RequestContext) -> BoxFuture<'_, Result<(), ApiError>> {
    Box::pin(handlers::bulk::values(ctx))
}

/// Bindings for local development and the CLI: in-memory namespaces, the
/// configured window counter, and hashed identity derivation.
pub fn default_bindings() -> Arc<Bindings> {
    let datasets = std::env::var("ATLAS_DATASETS").unwrap_or_else(|_| "entries".to_string());

    let mut bindings = Bindings::new(Arc::new(HashedIdentity::from_config()))
        .with_counter(PUBLIC_API_COUNTER, Arc::new(WindowCounter::from_config()));

    let mut names: Vec<&str> = datasets
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !names.contains(&"entries") {
        names.push("entries");
    }
    for name in names {
        bindings = bindings.with_namespace(name, Arc::new(MemoryStore::default()));
    }

    Arc::new(bindings)
}
