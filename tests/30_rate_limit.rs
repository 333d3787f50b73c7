mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::Method;

use atlas_api::app::PUBLIC_API_COUNTER;
use atlas_api::http::Request;
use atlas_api::limiter::WindowCounter;
use atlas_api::middleware::auth::issue_token;

fn limited_app(threshold: u32, burst: u32) -> atlas_api::app::App {
    let (bindings, _) = common::test_bindings();
    let bindings = bindings.with_counter(
        PUBLIC_API_COUNTER,
        Arc::new(WindowCounter::new(threshold, burst, Duration::from_secs(60))),
    );
    common::app_with_rate_limiting(bindings)
}

fn api_request() -> Request {
    Request::new(Method::GET, "/api/entries/missing")
}

#[tokio::test]
async fn requests_past_threshold_are_rejected() -> Result<()> {
    let app = limited_app(2, 0);

    for _ in 0..2 {
        let parts = app.dispatch(common::anonymous(api_request())).await;
        assert_eq!(parts.status, 404, "within threshold requests reach the handler");
    }

    let parts = app.dispatch(common::anonymous(api_request())).await;
    assert_eq!(parts.status, 429);
    let payload = parts.payload.unwrap();
    assert_eq!(payload["status"], 429);
    assert_eq!(payload["message"], "rate limit exceeded");
    Ok(())
}

#[tokio::test]
async fn authenticated_requests_bypass_limiting() -> Result<()> {
    let app = limited_app(1, 0);
    let token = issue_token("tester")?;

    // Exhaust the anonymous budget first.
    app.dispatch(common::anonymous(api_request())).await;
    let parts = app.dispatch(common::anonymous(api_request())).await;
    assert_eq!(parts.status, 429);

    // The privileged caller is never limited, whatever the anonymous history.
    for _ in 0..5 {
        let parts = app
            .dispatch(common::bearer(common::anonymous(api_request()), &token))
            .await;
        assert_eq!(parts.status, 404);
    }
    Ok(())
}

#[tokio::test]
async fn distinct_callers_have_independent_budgets() -> Result<()> {
    let app = limited_app(1, 0);

    let parts = app
        .dispatch(api_request().with_caller("198.51.100.1"))
        .await;
    assert_eq!(parts.status, 404);
    let parts = app
        .dispatch(api_request().with_caller("198.51.100.1"))
        .await;
    assert_eq!(parts.status, 429);

    let parts = app
        .dispatch(api_request().with_caller("198.51.100.2"))
        .await;
    assert_eq!(parts.status, 404);
    Ok(())
}

#[tokio::test]
async fn burst_tolerance_admits_extra_requests() -> Result<()> {
    let app = limited_app(1, 1);

    for _ in 0..2 {
        let parts = app.dispatch(common::anonymous(api_request())).await;
        assert_eq!(parts.status, 404);
    }
    let parts = app.dispatch(common::anonymous(api_request())).await;
    assert_eq!(parts.status, 429);
    Ok(())
}

#[tokio::test]
async fn routes_outside_the_family_are_not_limited() -> Result<()> {
    let app = limited_app(1, 0);

    for _ in 0..5 {
        let parts = app
            .dispatch(common::anonymous(Request::new(Method::GET, "/")))
            .await;
        assert_eq!(parts.status, 200);
    }
    Ok(())
}
