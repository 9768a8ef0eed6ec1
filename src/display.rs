use unicode_truncate::{Alignment, UnicodeTruncateStr};

use crate::http_probe::prelude::*;
use crate::service_check::ServiceReport;
use crate::sweep::report::ProbeReport;

/// Pad or cut `input` to exactly `width` display columns.
pub fn to_fixed_width(input: &str, width: usize) -> String {
    input.unicode_pad(width, Alignment::Left, true).into_owned()
}

/// One line per outcome, prefixed with `name` padded to `width`.
pub fn outcome_line(name: &str, width: usize, outcome: &ProbeOutcome) -> String {
    let name = to_fixed_width(name, width);
    match outcome.kind() {
        OutcomeKind::Success => format!(
            "[{name}] ✅ URL: {}, Status: {}, Elapsed: {}",
            outcome.url(),
            outcome.status().unwrap_or_default(),
            outcome.response_time()
        ),
        OutcomeKind::HttpFailure => format!(
            "[{name}] ❌ Unexpected status for {}: {} {}, Elapsed: {}",
            outcome.url(),
            outcome.status().unwrap_or_default(),
            outcome.status_text().unwrap_or(""),
            outcome.response_time()
        ),
        kind => format!(
            "[{name}] ❌ {} for {}: {}",
            kind_label(kind),
            outcome.url(),
            outcome.message()
        ),
    }
}

fn kind_label(kind: OutcomeKind) -> &'static str {
    match kind {
        OutcomeKind::Success => "Success",
        OutcomeKind::HttpFailure => "HTTP failure",
        OutcomeKind::Timeout => "Timeout",
        OutcomeKind::ConnectionRefused => "Connection refused",
        OutcomeKind::TransportError => "Probe error",
    }
}

pub fn render_report(report: &ProbeReport) -> String {
    let width = report
        .entries()
        .iter()
        .map(|e| e.target.name().chars().count())
        .max()
        .unwrap_or(10);

    let mut lines = vec![format!(
        "Sweep of {} at {} ({} targets)",
        report.base_url(),
        report.started_at().to_rfc3339(),
        report.entries().len()
    )];
    lines.extend(
        report
            .entries()
            .iter()
            .map(|e| outcome_line(e.target.name(), width, &e.outcome)),
    );
    lines.join("\n")
}

pub fn render_services(report: &ServiceReport) -> String {
    let width = report
        .services
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(10);
    let mark = |ok: bool| if ok { "✅" } else { "❌" };

    let mut lines = Vec::new();
    for service in &report.services {
        let name = to_fixed_width(&service.name, width);
        let tcp = &service.tcp_connectivity;
        let http = &service.http_connectivity;
        lines.push(format!("[{name}] TCP:  {} {}", mark(tcp.success), tcp.details));
        let http_detail = match (&http.details.status, &http.details.error) {
            (_, Some(error)) => error.clone(),
            (Some(status), None) => format!(
                "status {status} in {}",
                http.details.response_time.as_deref().unwrap_or("?")
            ),
            (None, None) => String::new(),
        };
        lines.push(format!("[{name}] HTTP: {} {http_detail}", mark(http.success)));
    }

    if report.all_connected {
        lines.push("✅ All services are connected and responding".to_string());
    } else {
        lines.push("❌ Some services are not connected or not responding".to_string());
        lines.extend(report.hints.iter().map(|h| format!("  • {h}")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fixed_width_pads_and_cuts() {
        assert_eq!(to_fixed_width("ab", 4), "ab  ");
        assert_eq!(to_fixed_width("abcdef", 4), "abcd");
        // Wide characters count as two columns.
        assert_eq!(to_fixed_width("日本語", 4), "日本");
    }

    #[test]
    fn failure_line_names_the_kind() {
        let outcome = ProbeOutcome::failure(
            OutcomeKind::ConnectionRefused,
            "http://backend:8000/health",
            Duration::from_millis(2),
            "refused",
        );
        let line = outcome_line("backend", 8, &outcome);
        assert_eq!(
            line,
            "[backend ] ❌ Connection refused for http://backend:8000/health: refused"
        );
    }
}
