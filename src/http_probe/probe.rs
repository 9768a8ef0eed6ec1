use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue, PRAGMA};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

use super::prelude::*;
use super::{body, is_connection_refused, report};

const USER_AGENT: &str = concat!("svcprobe/", env!("CARGO_PKG_VERSION"));

/// Stand-in deadline for budgets too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Issues probes. Cloning is cheap and clones share the client configuration.
///
/// Idle connections are not kept, so every probe opens its own connection
/// and releases it when the probe returns.
#[derive(Debug, Clone)]
pub struct Prober {
    client: Client,
}

impl Prober {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self { client })
    }

    /// Probe `url` with a GET, giving up after `budget`.
    ///
    /// The budget covers connecting, the response head and reading the body.
    /// When it runs out the request future is dropped, which aborts the
    /// exchange and closes the connection.
    pub async fn probe(&self, url: &str, budget: Duration) -> ProbeOutcome {
        let start = Instant::now();
        let deadline = deadline_after(start, budget);

        let request = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache");

        let response = match timeout_at(deadline, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return classify_error(url, start.elapsed(), budget, &e),
            Err(_) => return timed_out(url, start.elapsed(), budget),
        };

        let elapsed = start.elapsed();
        let status = response.status();
        let headers = flatten_headers(response.headers());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        info!(
            %url,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "response received"
        );

        let (body, message) = match timeout_at(deadline, response.text()).await {
            Ok(Ok(text)) => (
                body::decode(content_type.as_deref(), text),
                status.to_string(),
            ),
            Ok(Err(e)) => {
                debug!(%url, error = %e, "response body could not be read");
                (
                    ProbeBody::Omitted,
                    format!("{status}; body could not be read: {}", report(&e)),
                )
            }
            Err(_) => {
                return timed_out(url, start.elapsed(), budget)
                    .with_response_head(status.as_u16(), headers);
            }
        };

        ProbeOutcome::response(url, elapsed, status.as_u16(), headers, body, message)
    }
}

/// `start + budget`, saturating instead of overflowing.
fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

fn timed_out(url: &str, elapsed: Duration, budget: Duration) -> ProbeOutcome {
    info!(%url, budget_ms = budget.as_millis() as u64, "probe timed out");
    ProbeOutcome::failure(
        OutcomeKind::Timeout,
        url,
        elapsed,
        format!("request exceeded the time limit of {}", format_budget(budget)),
    )
}

fn classify_error(
    url: &str,
    elapsed: Duration,
    budget: Duration,
    err: &reqwest::Error,
) -> ProbeOutcome {
    if err.is_timeout() {
        return timed_out(url, elapsed, budget);
    }
    if is_connection_refused(err) {
        info!(%url, "connection refused");
        return ProbeOutcome::failure(
            OutcomeKind::ConnectionRefused,
            url,
            elapsed,
            "the server refused the connection; check that the service is running and reachable",
        );
    }
    let message = report(err);
    info!(%url, error = %message, "probe failed");
    ProbeOutcome::failure(OutcomeKind::TransportError, url, elapsed, message)
}

/// Header map as name -> value, repeated headers joined with `", "`.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = header_text(value);
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

fn header_text(value: &HeaderValue) -> String {
    match value.to_str() {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
    }
}

/// `10s` for whole seconds, `1500ms` otherwise.
pub fn format_budget(budget: Duration) -> String {
    if budget.subsec_millis() == 0 {
        format!("{}s", budget.as_secs())
    } else {
        format!("{}ms", budget.as_millis())
    }
}
