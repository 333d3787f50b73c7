//! Axum adapter.
//!
//! The chain operates above the transport: this module converts hyper
//! requests into the spine's own types, runs the chain, and converts the
//! accumulated response back.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::error::{ApiError, INTERNAL_ERROR_MESSAGE};
use crate::http::{Request, ResponseParts};

pub fn router(app: Arc<App>) -> axum::Router {
    axum::Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

pub async fn serve(app: Arc<App>) -> anyhow::Result<()> {
    // Allow deployments to override port via env
    let port = std::env::var("ATLAS_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Atlas API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        router(app).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn dispatch(
    State(app): State<Arc<App>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = convert_request(method, &uri, &headers, &body, addr);
    let parts = app.dispatch(request).await;
    convert_response(parts)
}

fn convert_request(
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
    addr: SocketAddr,
) -> Request {
    let mut request = Request::new(method, uri.path()).with_caller(addr.ip().to_string());

    if let Some(query) = uri.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            request.query.insert(key.into_owned(), value.into_owned());
        }
    }

    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            request
                .headers
                .insert(name.as_str().to_ascii_lowercase(), value.to_string());
        }
    }

    if !body.is_empty() {
        match serde_json::from_slice(body) {
            Ok(value) => request.body = Some(value),
            Err(e) => tracing::debug!("discarding unparseable request body: {}", e),
        }
    }

    request
}

fn convert_response(parts: ResponseParts) -> Response {
    // A body that was never inspected by contract enforcement must not be
    // serialized, even partially. Fail closed.
    if parts.body.is_some() {
        tracing::error!("response body reached the adapter without contract inspection");
        let err = ApiError::internal_server_error(INTERNAL_ERROR_MESSAGE);
        return err.into_response();
    }

    let status = StatusCode::from_u16(parts.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = match parts.payload {
        Some(payload) => (status, axum::Json(payload)).into_response(),
        None => status.into_response(),
    };

    let headers = response.headers_mut();
    for (name, value) in &parts.headers {
        if let (Ok(name), Ok(value)) = (
            axum::http::HeaderName::try_from(name.as_str()),
            axum::http::HeaderValue::try_from(value.as_str()),
        ) {
            headers.insert(name, value);
        }
    }

    response
}
