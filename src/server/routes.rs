use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use super::AppState;
use crate::service_check::diagnose_services;
use crate::sweep::report::ManualProbeView;
use crate::sweep::{manual_response, probe_single, sweep};
use crate::target::resolve;

/// Largest request body accepted by the manual probe.
const MAX_BODY_BYTES: usize = 64 * 1024;

const ROUTES: [&str; 4] = [
    "/health",
    "/api/diagnose-manual",
    "/api/backend-test",
    "/api/diagnose-network",
];

#[derive(Debug, Deserialize)]
struct ManualRequest {
    url: Option<String>,
}

/// Dispatch a request. Never fails: errors become JSON responses.
pub async fn route<B>(state: Arc<AppState>, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/health") => json_response(StatusCode::OK, &json!({ "status": "ok" })),
        (&Method::POST, "/api/diagnose-manual") => diagnose_manual(state, req).await,
        (&Method::GET, "/api/backend-test") => backend_test(&state).await,
        (&Method::GET, "/api/diagnose-network") => diagnose_network(&state).await,
        (_, p) if ROUTES.contains(&p) => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &json!({ "error": "method not allowed" }),
        ),
        _ => json_response(StatusCode::NOT_FOUND, &json!({ "error": "not found" })),
    };

    info!(%method, %path, status = response.status().as_u16(), "request handled");
    response
}

async fn diagnose_manual<B>(state: Arc<AppState>, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return invalid_body(e.to_string()),
    };
    let request: ManualRequest = match serde_json::from_slice(&bytes) {
        Ok(request) => request,
        Err(e) => return invalid_body(e.to_string()),
    };
    let Some(url) = request.url.filter(|u| !u.trim().is_empty()) else {
        warn!("manual diagnosis without url");
        return json_response(StatusCode::BAD_REQUEST, &json!({ "error": "url not provided" }));
    };

    let prober = state.prober.clone();
    let base_url = state.config.backend_url.clone();
    let raw = url.clone();
    let task = tokio::spawn(async move { probe_single(&prober, &raw, &base_url).await });

    match task.await {
        Ok(outcome) => {
            let (status, view) = manual_response(&outcome);
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            json_response(status, &view)
        }
        Err(e) => {
            error!(%url, error = %e, "manual probe task failed");
            let resolved = resolve(&url, &state.config.backend_url);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ManualProbeView::unknown(&resolved, Some(e.to_string())),
            )
        }
    }
}

async fn backend_test(state: &AppState) -> Response<Full<Bytes>> {
    let report = sweep(
        &state.prober,
        &state.config.sweep.targets,
        &state.config.backend_url,
        state.config.sweep.timeout,
    )
    .await;
    json_response(StatusCode::OK, &report.to_view())
}

async fn diagnose_network(state: &AppState) -> Response<Full<Bytes>> {
    let report = diagnose_services(&state.prober, &state.resolver, &state.config.services).await;
    json_response(StatusCode::OK, &report)
}

fn invalid_body(details: String) -> Response<Full<Bytes>> {
    warn!(%details, "invalid request body");
    json_response(
        StatusCode::BAD_REQUEST,
        &json!({ "error": "invalid request body", "details": details }),
    )
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let (status, body) = match serde_json::to_vec(value) {
        Ok(body) => (status, body),
        Err(e) => {
            error!(error = %e, "failed to serialise response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"failed to serialise response"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
