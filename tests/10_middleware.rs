mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::http::Method;
use serde_json::json;

use atlas_api::error::{ApiError, INTERNAL_ERROR_MESSAGE, NESTED_MIDDLEWARE_FAILURE};
use atlas_api::http::{Request, RequestContext};
use atlas_api::middleware::errors::normalize_boundary;
use atlas_api::middleware::{Chain, ErrorNormalization, Handler, Middleware, Next};

type Log = Arc<Mutex<Vec<String>>>;

struct Recording {
    label: &'static str,
    log: Log,
}

#[async_trait]
impl Middleware for Recording {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), ApiError> {
        self.log.lock().unwrap().push(format!("pre-{}", self.label));
        next.run(ctx).await?;
        self.log.lock().unwrap().push(format!("post-{}", self.label));
        Ok(())
    }
}

struct ShortCircuit;

#[async_trait]
impl Middleware for ShortCircuit {
    async fn handle(&self, ctx: &mut RequestContext, _next: Next<'_>) -> Result<(), ApiError> {
        ctx.respond_bypass(json!({ "shortCircuit": true }));
        Ok(())
    }
}

struct PartialHeaders;

#[async_trait]
impl Middleware for PartialHeaders {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), ApiError> {
        ctx.response.set_header("X-Partial", "leaked");
        next.run(ctx).await
    }
}

struct Panicking;

#[async_trait]
impl Middleware for Panicking {
    async fn handle(&self, _ctx: &mut RequestContext, _next: Next<'_>) -> Result<(), ApiError> {
        panic!("broken middleware composition");
    }
}

struct TerminalHandler {
    log: Log,
    fail_with: Option<ApiError>,
}

#[async_trait]
impl Handler for TerminalHandler {
    async fn call(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        self.log.lock().unwrap().push("handler".to_string());
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => {
                ctx.respond_bypass(json!({ "ok": true }));
                Ok(())
            }
        }
    }
}

fn context() -> RequestContext {
    let (bindings, _) = common::test_bindings();
    RequestContext::new(Request::new(Method::GET, "/"), Arc::new(bindings))
}

#[tokio::test]
async fn onion_ordering_reverses_for_post_processing() -> Result<()> {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let chain = Chain::new(Arc::new(TerminalHandler {
        log: log.clone(),
        fail_with: None,
    }))
    .with(Arc::new(Recording {
        label: "outer",
        log: log.clone(),
    }))
    .with(Arc::new(Recording {
        label: "inner",
        log: log.clone(),
    }));

    let mut ctx = context();
    chain.run(&mut ctx).await;

    let order = log.lock().unwrap().clone();
    assert_eq!(
        order,
        vec!["pre-outer", "pre-inner", "handler", "post-inner", "post-outer"]
    );
    Ok(())
}

#[tokio::test]
async fn short_circuit_skips_terminal_handler() -> Result<()> {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let chain = Chain::new(Arc::new(TerminalHandler {
        log: log.clone(),
        fail_with: None,
    }))
    .with(Arc::new(ShortCircuit));

    let mut ctx = context();
    chain.run(&mut ctx).await;

    assert!(log.lock().unwrap().is_empty(), "handler must not run");
    Ok(())
}

#[tokio::test]
async fn classified_errors_keep_status_and_reset_headers() -> Result<()> {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let chain = Chain::new(Arc::new(TerminalHandler {
        log,
        fail_with: Some(ApiError::bad_request("missing field")),
    }))
    .with(Arc::new(ErrorNormalization))
    .with(Arc::new(PartialHeaders));

    let mut ctx = context();
    chain.run(&mut ctx).await;

    assert_eq!(ctx.response.status, 400);
    assert!(!ctx.response.headers.contains_key("X-Partial"));
    let payload = ctx.response.payload.as_ref().unwrap();
    assert_eq!(payload["message"], "missing field");
    assert_eq!(payload["status"], 400);
    Ok(())
}

#[tokio::test]
async fn internal_errors_never_leak_detail() -> Result<()> {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let err = ApiError::coerce("pool exhausted at backend 10.1.2.3");
    let chain = Chain::new(Arc::new(TerminalHandler {
        log,
        fail_with: Some(err),
    }))
    .with(Arc::new(ErrorNormalization));

    let mut ctx = context();
    chain.run(&mut ctx).await;

    assert_eq!(ctx.response.status, 500);
    let payload = ctx.response.payload.as_ref().unwrap();
    assert_eq!(payload["message"], INTERNAL_ERROR_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn panicking_middleware_yields_fixed_nested_failure() -> Result<()> {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let chain = Chain::new(Arc::new(TerminalHandler {
        log: log.clone(),
        fail_with: None,
    }))
    .with(Arc::new(ErrorNormalization))
    .with(Arc::new(Panicking));

    let mut ctx = context();
    chain.run(&mut ctx).await;

    assert_eq!(ctx.response.status, 500);
    let payload = ctx.response.payload.as_ref().unwrap();
    assert_eq!(payload["message"], NESTED_MIDDLEWARE_FAILURE);
    assert!(log.lock().unwrap().is_empty(), "handler must not run");
    Ok(())
}

#[tokio::test]
async fn boundary_wrapper_coerces_foreign_errors() -> Result<()> {
    let outcome: Result<(), ApiError> = normalize_boundary(async {
        Err::<(), std::io::Error>(std::io::Error::new(
            std::io::ErrorKind::Other,
            "socket closed unexpectedly",
        ))
    })
    .await;

    let err = outcome.unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.message(), INTERNAL_ERROR_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn unknown_routes_get_the_error_envelope() -> Result<()> {
    let (bindings, _) = common::test_bindings();
    let app = common::app_without_rate_limiting(bindings);

    let parts = app
        .dispatch(common::anonymous(Request::new(Method::GET, "/nope")))
        .await;

    assert_eq!(parts.status, 404);
    let payload = parts.payload.unwrap();
    assert_eq!(payload["status"], 404);
    Ok(())
}
