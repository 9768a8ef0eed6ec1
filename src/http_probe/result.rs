use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

/// Terminal state of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The target answered with a status below 400.
    Success,
    /// The target answered with a status of 400 or above.
    HttpFailure,
    /// The time budget ran out before the exchange completed.
    Timeout,
    /// The destination actively refused the connection.
    ConnectionRefused,
    /// Any other failure before a response was received.
    TransportError,
}

impl OutcomeKind {
    /// Whether a response was received at all.
    pub fn reached(self) -> bool {
        matches!(self, OutcomeKind::Success | OutcomeKind::HttpFailure)
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeBody {
    Json(serde_json::Value),
    Text(String),
    Omitted,
}

impl ProbeBody {
    /// The body as a JSON value, text bodies becoming JSON strings.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            ProbeBody::Json(value) => Some(value.clone()),
            ProbeBody::Text(text) => Some(serde_json::Value::String(text.clone())),
            ProbeBody::Omitted => None,
        }
    }
}

/// Everything observed during one probe attempt.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    kind: OutcomeKind,
    url: String,
    elapsed: Duration,
    status: Option<u16>,
    headers: Option<BTreeMap<String, String>>,
    body: ProbeBody,
    message: String,
}

impl ProbeOutcome {
    pub(crate) fn response(
        url: &str,
        elapsed: Duration,
        status: u16,
        headers: BTreeMap<String, String>,
        body: ProbeBody,
        message: String,
    ) -> Self {
        let kind = if status >= 400 {
            OutcomeKind::HttpFailure
        } else {
            OutcomeKind::Success
        };
        Self {
            kind,
            url: url.to_string(),
            elapsed,
            status: Some(status),
            headers: Some(headers),
            body,
            message,
        }
    }

    /// A failure before (or while) the response was read.
    pub(crate) fn failure(
        kind: OutcomeKind,
        url: &str,
        elapsed: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            url: url.to_string(),
            elapsed,
            status: None,
            headers: None,
            body: ProbeBody::Omitted,
            message: message.into(),
        }
    }

    /// Keeps what was already observed of a response whose body timed out.
    pub(crate) fn with_response_head(
        mut self,
        status: u16,
        headers: BTreeMap<String, String>,
    ) -> Self {
        self.status = Some(status);
        self.headers = Some(headers);
        self
    }

    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Canonical reason phrase for the received status, empty when unknown.
    pub fn status_text(&self) -> Option<&'static str> {
        self.status.map(|code| {
            reqwest::StatusCode::from_u16(code)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("")
        })
    }

    pub fn headers(&self) -> Option<&BTreeMap<String, String>> {
        self.headers.as_ref()
    }

    pub fn body(&self) -> &ProbeBody {
        &self.body
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    /// Elapsed time rendered as `<ms>ms`.
    pub fn response_time(&self) -> String {
        format!("{}ms", self.elapsed.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_below_400_is_success() {
        for status in [200, 204, 301, 304, 399] {
            let outcome = ProbeOutcome::response(
                "http://x",
                Duration::from_millis(5),
                status,
                BTreeMap::new(),
                ProbeBody::Omitted,
                String::new(),
            );
            assert_eq!(outcome.kind(), OutcomeKind::Success, "status {status}");
        }
    }

    #[test]
    fn status_from_400_is_http_failure() {
        for status in [400, 404, 500, 503] {
            let outcome = ProbeOutcome::response(
                "http://x",
                Duration::from_millis(5),
                status,
                BTreeMap::new(),
                ProbeBody::Omitted,
                String::new(),
            );
            assert_eq!(outcome.kind(), OutcomeKind::HttpFailure, "status {status}");
            assert!(outcome.kind().reached());
        }
    }

    #[test]
    fn failure_has_no_response_parts() {
        let outcome = ProbeOutcome::failure(
            OutcomeKind::ConnectionRefused,
            "http://x",
            Duration::from_millis(1),
            "refused",
        );
        assert_eq!(outcome.status(), None);
        assert!(outcome.headers().is_none());
        assert_eq!(outcome.body(), &ProbeBody::Omitted);
        assert!(!outcome.kind().reached());
    }

    #[test]
    fn response_time_is_formatted_in_milliseconds() {
        let outcome = ProbeOutcome::failure(
            OutcomeKind::Timeout,
            "http://x",
            Duration::from_micros(1_234_567),
            "",
        );
        assert_eq!(outcome.response_time(), "1234ms");
    }

    #[test]
    fn status_text_uses_canonical_reason() {
        let outcome = ProbeOutcome::response(
            "http://x",
            Duration::ZERO,
            404,
            BTreeMap::new(),
            ProbeBody::Omitted,
            String::new(),
        );
        assert_eq!(outcome.status_text(), Some("Not Found"));
    }
}
