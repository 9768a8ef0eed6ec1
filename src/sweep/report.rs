use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::http_probe::prelude::*;
use crate::target::ProbeTarget;

/// `data` of a sweep entry whose body did not decode as JSON.
pub const NOT_JSON_ERROR: &str = "could not obtain JSON from the response";

/// One probed target, in the position it was submitted.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub target: ProbeTarget,
    pub outcome: ProbeOutcome,
}

/// Result of a sweep. Per-target failures live in the entries; the report
/// itself always exists.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    started_at: DateTime<Utc>,
    base_url: String,
    entries: Vec<ReportEntry>,
}

impl ProbeReport {
    pub(crate) fn new(
        started_at: DateTime<Utc>,
        base_url: &str,
        entries: Vec<ReportEntry>,
    ) -> Self {
        Self {
            started_at,
            base_url: base_url.to_string(),
            entries,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|e| e.outcome.is_success())
    }

    pub fn to_view(&self) -> SweepView {
        SweepView {
            backend_url: self.base_url.clone(),
            test_time: self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            results: self.entries.iter().map(|e| SweepEntryView::from(&e.outcome)).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepView {
    pub backend_url: String,
    pub test_time: String,
    pub results: Vec<SweepEntryView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepEntryView {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ProbeOutcome> for SweepEntryView {
    fn from(outcome: &ProbeOutcome) -> Self {
        if outcome.kind().reached() {
            Self {
                url: outcome.url().to_string(),
                success: outcome.is_success(),
                status: outcome.status(),
                status_text: outcome.status_text().map(str::to_string),
                response_time: Some(outcome.response_time()),
                data: Some(sweep_data(outcome.body())),
                error: None,
            }
        } else {
            Self {
                url: outcome.url().to_string(),
                success: false,
                status: None,
                status_text: None,
                response_time: None,
                data: None,
                error: Some(outcome.message().to_string()),
            }
        }
    }
}

fn sweep_data(body: &ProbeBody) -> serde_json::Value {
    match body {
        ProbeBody::Json(value) => value.clone(),
        ProbeBody::Text(_) | ProbeBody::Omitted => serde_json::json!({ "error": NOT_JSON_ERROR }),
    }
}

/// Failure category reported to the UI for a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Timeout,
    ConnectionRefused,
    ConnectionError,
    UnknownError,
}

/// Single-probe result as rendered by the UI.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ManualProbeView {
    Reached(ReachedView),
    Failed(FailedView),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachedView {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_time: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct FailedView {
    pub url: String,
    pub error: String,
    #[serde(rename = "type")]
    pub kind: ErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ManualProbeView {
    /// For a probe task that ended without producing an outcome.
    pub fn unknown(url: &str, message: Option<String>) -> Self {
        ManualProbeView::Failed(FailedView {
            url: url.to_string(),
            error: "unknown error while connecting".to_string(),
            kind: ErrorType::UnknownError,
            message,
        })
    }
}

impl From<&ProbeOutcome> for ManualProbeView {
    fn from(outcome: &ProbeOutcome) -> Self {
        let url = outcome.url().to_string();
        let message = Some(outcome.message().to_string());
        match (outcome.kind(), outcome.status()) {
            (OutcomeKind::Success | OutcomeKind::HttpFailure, Some(status)) => {
                ManualProbeView::Reached(ReachedView {
                    url,
                    status,
                    status_text: outcome.status_text().unwrap_or("").to_string(),
                    response_time: outcome.response_time(),
                    headers: outcome.headers().cloned().unwrap_or_default(),
                    body: outcome.body().to_json(),
                })
            }
            (OutcomeKind::Timeout, _) => ManualProbeView::Failed(FailedView {
                url,
                error: "connection timeout".to_string(),
                kind: ErrorType::Timeout,
                message,
            }),
            (OutcomeKind::ConnectionRefused, _) => ManualProbeView::Failed(FailedView {
                url,
                error: "connection refused".to_string(),
                kind: ErrorType::ConnectionRefused,
                message,
            }),
            _ => ManualProbeView::Failed(FailedView {
                error: format!("error while connecting: {}", outcome.message()),
                url,
                kind: ErrorType::ConnectionError,
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    fn reached(status: u16, body: ProbeBody) -> ProbeOutcome {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        ProbeOutcome::response(
            "http://backend:8000/health",
            Duration::from_millis(42),
            status,
            headers,
            body,
            String::new(),
        )
    }

    #[test]
    fn sweep_view_shape() {
        let started_at = Utc.with_ymd_and_hms(2026, 10, 15, 8, 30, 0).unwrap();
        let base = "http://backend:8000";
        let ok = reached(200, ProbeBody::Json(json!({"status": "ok"})));
        let refused = ProbeOutcome::failure(
            OutcomeKind::ConnectionRefused,
            "http://backend:8000/other",
            Duration::from_millis(1),
            "refused",
        );
        let report = ProbeReport::new(
            started_at,
            base,
            vec![
                ReportEntry { target: ProbeTarget::new("a", "/health", base), outcome: ok },
                ReportEntry { target: ProbeTarget::new("b", "/other", base), outcome: refused },
            ],
        );

        let value = serde_json::to_value(report.to_view()).unwrap();

        assert_eq!(
            value,
            json!({
                "backendUrl": "http://backend:8000",
                "testTime": "2026-10-15T08:30:00.000Z",
                "results": [
                    {
                        "url": "http://backend:8000/health",
                        "success": true,
                        "status": 200,
                        "statusText": "OK",
                        "responseTime": "42ms",
                        "data": {"status": "ok"}
                    },
                    {
                        "url": "http://backend:8000/other",
                        "success": false,
                        "error": "refused"
                    }
                ]
            })
        );
        assert!(!report.all_succeeded());
    }

    #[test]
    fn http_failure_is_reported_as_unsuccessful_with_status() {
        let view = SweepEntryView::from(&reached(500, ProbeBody::Text("boom".into())));
        assert!(!view.success);
        assert_eq!(view.status, Some(500));
        assert_eq!(view.data, Some(json!({"error": NOT_JSON_ERROR})));
    }

    #[test]
    fn manual_view_for_response() {
        let view = ManualProbeView::from(&reached(404, ProbeBody::Omitted));
        let value = serde_json::to_value(view).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "http://backend:8000/health",
                "status": 404,
                "statusText": "Not Found",
                "responseTime": "42ms",
                "headers": {"content-type": "application/json"}
            })
        );
    }

    #[test]
    fn manual_view_failure_types() {
        let cases = [
            (OutcomeKind::Timeout, "timeout"),
            (OutcomeKind::ConnectionRefused, "connection_refused"),
            (OutcomeKind::TransportError, "connection_error"),
        ];
        for (kind, expected) in cases {
            let outcome = ProbeOutcome::failure(kind, "http://x", Duration::ZERO, "why");
            let value = serde_json::to_value(ManualProbeView::from(&outcome)).unwrap();
            assert_eq!(value["type"], expected);
            assert_eq!(value["url"], "http://x");
            assert_eq!(value["message"], "why");
            assert!(value.get("status").is_none());
        }
    }

    #[test]
    fn unknown_view() {
        let value = serde_json::to_value(ManualProbeView::unknown("http://x", None)).unwrap();
        assert_eq!(value["type"], "unknown_error");
        assert!(value.get("message").is_none());
    }
}
