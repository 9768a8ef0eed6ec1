//! JSON HTTP API for the diagnostics UI.
//!
//! One HTTP/1.1 connection per tokio task. Routes:
//! - `GET /health`
//! - `POST /api/diagnose-manual` with `{"url": ...}`
//! - `GET /api/backend-test`
//! - `GET /api/diagnose-network`

pub mod routes;

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};
use trust_dns_resolver::TokioAsyncResolver;

use crate::config::AppConfig;
use crate::http_probe::prelude::Prober;

/// Shared, read-only state of the API.
pub struct AppState {
    pub config: AppConfig,
    pub prober: Prober,
    pub resolver: TokioAsyncResolver,
}

impl AppState {
    pub fn new(config: AppConfig, prober: Prober, resolver: TokioAsyncResolver) -> Self {
        Self {
            config,
            prober,
            resolver,
        }
    }
}

/// Serve the API on `listener` until `shutdown` completes.
pub async fn serve(
    state: Arc<AppState>,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "diagnostics API listening");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!(error = %e, "accept failed");
                        continue;
                    }
                };
                let state = state.clone();

                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let state = state.clone();
                        async move { Ok::<_, Infallible>(routes::route(state, req).await) }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                        error!(%peer_addr, error = %e, "connection error");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("diagnostics API shutting down");
                break;
            }
        }
    }

    Ok(())
}
