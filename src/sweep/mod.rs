pub mod report;

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::http_probe::prelude::*;
use crate::target::ProbeTarget;
use report::{ManualProbeView, ProbeReport, ReportEntry};

/// Budget of a single-shot probe.
pub const SINGLE_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A named destination, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepTarget {
    pub name: String,
    pub url: String,
}

impl SweepTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Probe every target concurrently, one task and one timer per target.
///
/// Results are collected in submission order. A task that dies still yields
/// a `TransportError` entry, so the report is always complete.
pub async fn sweep(
    prober: &Prober,
    targets: &[SweepTarget],
    base_url: &str,
    timeout: Duration,
) -> ProbeReport {
    let started_at = Utc::now();
    info!(targets = targets.len(), %base_url, "starting sweep");

    let mut handles = Vec::with_capacity(targets.len());
    let mut resolved = Vec::with_capacity(targets.len());

    for target in targets {
        let target = ProbeTarget::new(&target.name, &target.url, base_url);
        let prober = prober.clone();
        let url = target.url().to_string();

        handles.push(tokio::spawn(async move { prober.probe(&url, timeout).await }));
        resolved.push(target);
    }

    let mut entries = Vec::with_capacity(resolved.len());
    for (target, handle) in resolved.into_iter().zip(handles) {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url = target.url(), error = %e, "probe task failed");
                ProbeOutcome::failure(
                    OutcomeKind::TransportError,
                    target.url(),
                    Duration::ZERO,
                    format!("probe task failed: {e}"),
                )
            }
        };
        entries.push(ReportEntry { target, outcome });
    }

    ProbeReport::new(started_at, base_url, entries)
}

/// Probe one raw destination with the single-shot budget.
pub async fn probe_single(prober: &Prober, raw: &str, base_url: &str) -> ProbeOutcome {
    let target = ProbeTarget::new("manual", raw, base_url);
    if target.url() != raw {
        info!(%raw, url = target.url(), "rewrote target");
    }
    prober.probe(target.url(), SINGLE_PROBE_TIMEOUT).await
}

/// HTTP status handed back to the caller of a single probe.
pub fn caller_status(outcome: &ProbeOutcome) -> u16 {
    match outcome.kind() {
        OutcomeKind::Timeout => 504,
        OutcomeKind::ConnectionRefused => 502,
        OutcomeKind::TransportError => 500,
        OutcomeKind::Success | OutcomeKind::HttpFailure => outcome.status().unwrap_or(500),
    }
}

/// Single probe mapped onto the caller's status code and JSON body.
pub fn manual_response(outcome: &ProbeOutcome) -> (u16, ManualProbeView) {
    (caller_status(outcome), ManualProbeView::from(outcome))
}
