//! Connectivity checks for the services the backend depends on.
//!
//! Each service gets a TCP check (name resolution + connect) and an HTTP
//! check against an endpoint with an expected status. Both checks of a
//! service run concurrently, and all services are checked concurrently.

pub mod tcp;

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};
use trust_dns_resolver::TokioAsyncResolver;

use crate::config::ServiceConfig;
use crate::http_probe::body::truncate_with;
use crate::http_probe::prelude::*;
use crate::http_probe::probe::format_budget;

pub use tcp::check_tcp;

const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult<D> {
    pub success: bool,
    pub details: D,
}

impl<D> CheckResult<D> {
    pub fn passed(details: impl Into<D>) -> Self {
        Self {
            success: true,
            details: details.into(),
        }
    }

    pub fn failed(details: impl Into<D>) -> Self {
        Self {
            success: false,
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceResult {
    pub name: String,
    pub tcp_connectivity: CheckResult<String>,
    pub http_connectivity: CheckResult<HttpDetails>,
}

impl ServiceResult {
    pub fn connected(&self) -> bool {
        self.tcp_connectivity.success && self.http_connectivity.success
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    pub timestamp: String,
    pub services: Vec<ServiceResult>,
    pub all_connected: bool,
    pub hints: Vec<String>,
}

/// Check that `url` answers with `expected_status` within `budget`.
pub async fn check_http(
    prober: &Prober,
    url: &str,
    expected_status: u16,
    budget: Duration,
) -> CheckResult<HttpDetails> {
    let outcome = prober.probe(url, budget).await;
    http_check_result(&outcome, expected_status, budget)
}

fn http_check_result(
    outcome: &ProbeOutcome,
    expected_status: u16,
    budget: Duration,
) -> CheckResult<HttpDetails> {
    let response_time = Some(format!("{:.2}s", outcome.elapsed().as_secs_f64()));

    // A head followed by a stalled body still counts as a timeout.
    match (outcome.kind(), outcome.status()) {
        (OutcomeKind::Timeout, status) => CheckResult::failed(HttpDetails {
            status,
            error: Some(format!("timeout after {}", format_budget(budget))),
            ..Default::default()
        }),
        (_, Some(status)) if status == expected_status => CheckResult::passed(HttpDetails {
            status: Some(status),
            response_time,
            body: body_preview(outcome.body()),
            error: None,
        }),
        (_, Some(status)) => CheckResult::failed(HttpDetails {
            status: Some(status),
            response_time,
            body: None,
            error: Some(format!("unexpected status code: {status}")),
        }),
        (_, None) => CheckResult::failed(HttpDetails {
            error: Some(format!("connection error: {}", outcome.message())),
            ..Default::default()
        }),
    }
}

fn body_preview(body: &ProbeBody) -> Option<String> {
    let text = match body {
        ProbeBody::Json(value) => value.to_string(),
        ProbeBody::Text(text) => text.clone(),
        ProbeBody::Omitted => return None,
    };
    Some(truncate_with(text, BODY_PREVIEW_CHARS, "..."))
}

async fn check_service(
    prober: &Prober,
    resolver: &TokioAsyncResolver,
    service: &ServiceConfig,
) -> ServiceResult {
    let budget = Duration::from_millis(service.timeout_ms);
    let (tcp_connectivity, http_connectivity) = tokio::join!(
        check_tcp(resolver, &service.host, service.port, budget),
        check_http(prober, &service.http_url, service.expected_status, budget),
    );
    ServiceResult {
        name: service.name.clone(),
        tcp_connectivity,
        http_connectivity,
    }
}

/// Run the TCP and HTTP checks for every service, in configuration order.
pub async fn diagnose_services(
    prober: &Prober,
    resolver: &TokioAsyncResolver,
    services: &[ServiceConfig],
) -> ServiceReport {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    info!(services = services.len(), "starting service diagnostics");

    let handles: Vec<_> = services
        .iter()
        .cloned()
        .map(|service| {
            let prober = prober.clone();
            let resolver = resolver.clone();
            tokio::spawn(async move { check_service(&prober, &resolver, &service).await })
        })
        .collect();

    let mut results = Vec::with_capacity(services.len());
    for (service, handle) in services.iter().zip(handles) {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!(service = %service.name, error = %e, "service check task failed");
                let message = format!("check task failed: {e}");
                ServiceResult {
                    name: service.name.clone(),
                    tcp_connectivity: CheckResult::failed(message.clone()),
                    http_connectivity: CheckResult::failed(HttpDetails {
                        error: Some(message),
                        ..Default::default()
                    }),
                }
            }
        };
        results.push(result);
    }

    for result in &results {
        if result.connected() {
            info!(service = %result.name, "service connected");
        } else {
            warn!(
                service = %result.name,
                tcp = result.tcp_connectivity.success,
                http = result.http_connectivity.success,
                "service not connected"
            );
        }
    }

    let all_connected = results.iter().all(ServiceResult::connected);
    let hints = troubleshooting_hints(&results);

    ServiceReport {
        timestamp,
        services: results,
        all_connected,
        hints,
    }
}

/// Suggestions for every service that is not fully connected.
pub fn troubleshooting_hints(results: &[ServiceResult]) -> Vec<String> {
    let mut hints = Vec::new();
    for result in results {
        let name = &result.name;
        if !result.tcp_connectivity.success {
            hints.push(format!(
                "{name}: check that the {name} container is running (docker-compose ps)"
            ));
            hints.push(format!("{name}: check the network settings in docker-compose.yml"));
            hints.push(format!("{name}: check that the service exposes the expected port"));
        } else if !result.http_connectivity.success {
            hints.push(format!(
                "{name}: the service accepts connections but its API is not answering as expected"
            ));
            hints.push(format!("{name}: check the service logs (docker-compose logs {name})"));
            hints.push(format!("{name}: check that the application starts up correctly"));
        }
    }
    hints
}
