//! Transport-agnostic request/response types.
//!
//! The middleware chain operates above an existing transport; the axum
//! adapter in `server` converts hyper requests into these types and back.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::http::Method;
use serde_json::Value;

use crate::error::ApiError;
use crate::identity::IdentityProvider;
use crate::limiter::RateCounter;
use crate::response::Body;
use crate::store::KvStore;

/// Parsed inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names lowercased at the adapter boundary.
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    /// Remote address, input to anonymous identity derivation.
    pub caller: Option<String>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: None,
            caller: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }
}

/// Mutable response accumulator owned by the request context.
///
/// Handlers set `body`; the contract middleware consumes it and produces
/// `payload`, the wire-ready JSON. The adapter refuses to send a response
/// whose `body` was never inspected.
#[derive(Debug)]
pub struct ResponseParts {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Body>,
    pub payload: Option<Value>,
}

impl ResponseParts {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            body: None,
            payload: None,
        }
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_string(), value.into());
    }

    /// Drop every header accumulated so far. Used by error normalization to
    /// avoid leaking partial state from a failed handler.
    pub fn reset_headers(&mut self) {
        self.headers.clear();
    }
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment bindings: the narrow operation sets the core is allowed to
/// touch. Constructed at process start and shared across requests.
pub struct Bindings {
    namespaces: HashMap<String, Arc<dyn KvStore>>,
    counters: HashMap<String, Arc<dyn RateCounter>>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Bindings {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            namespaces: HashMap::new(),
            counters: HashMap::new(),
            identity,
        }
    }

    pub fn with_namespace(mut self, name: impl Into<String>, store: Arc<dyn KvStore>) -> Self {
        self.namespaces.insert(name.into(), store);
        self
    }

    pub fn with_counter(mut self, name: impl Into<String>, counter: Arc<dyn RateCounter>) -> Self {
        self.counters.insert(name.into(), counter);
        self
    }

    pub fn namespace(&self, name: &str) -> Result<Arc<dyn KvStore>, ApiError> {
        self.namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("unknown dataset: {}", name)))
    }

    pub fn counter(&self, name: &str) -> Result<Arc<dyn RateCounter>, ApiError> {
        self.counters.get(name).cloned().ok_or_else(|| {
            tracing::error!("rate counter binding missing: {}", name);
            ApiError::internal_server_error(crate::error::INTERNAL_ERROR_MESSAGE)
        })
    }
}

/// Ephemeral per-request state threaded through the middleware chain.
/// Created at request entry, destroyed after the response is sent; never
/// shared across requests.
pub struct RequestContext {
    pub request: Request,
    pub response: ResponseParts,
    /// Set by the auth middleware when a valid bearer token is presented.
    pub authenticated: bool,
    /// Token subject, when authenticated.
    pub subject: Option<String>,
    /// Path parameters filled in by the route table.
    pub params: HashMap<String, String>,
    pub bindings: Arc<Bindings>,
}

impl RequestContext {
    pub fn new(request: Request, bindings: Arc<Bindings>) -> Self {
        Self {
            request,
            response: ResponseParts::new(),
            authenticated: false,
            subject: None,
            params: HashMap::new(),
            bindings,
        }
    }

    pub fn param(&self, name: &str) -> Result<&str, ApiError> {
        self.params
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| ApiError::bad_request(format!("missing path parameter: {}", name)))
    }

    /// Respond with a marker-carrying value; the contract middleware applies
    /// the exposure rules before anything reaches the wire.
    pub fn respond(&mut self, value: impl crate::response::Approved + 'static) {
        self.response.body = Some(Body::Approved(Box::new(value)));
    }

    /// Respond with a pre-shaped payload, skipping exposure serialization.
    pub fn respond_bypass(&mut self, value: Value) {
        self.response.body = Some(Body::Bypass(value));
    }

    /// Respond with an empty body (204-style).
    pub fn respond_no_content(&mut self) {
        self.response.status = 204;
        self.response.body = None;
    }
}
