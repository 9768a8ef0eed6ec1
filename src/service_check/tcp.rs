use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use trust_dns_resolver::TokioAsyncResolver;

use super::CheckResult;
use crate::http_probe::probe::format_budget;

/// Resolve `host` and time the lookup. IP literals skip the resolver.
async fn resolve_host(
    host: &str,
    resolver: &TokioAsyncResolver,
    budget: Duration,
) -> Result<(IpAddr, Option<f64>), String> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok((ip, None));
    }

    let start = Instant::now();
    let lookup = timeout(budget, resolver.lookup_ip(host)).await;
    let dns_time = start.elapsed().as_secs_f64();

    match lookup {
        Ok(Ok(ips)) => match ips.iter().next() {
            Some(ip) => Ok((ip, Some(dns_time))),
            None => Err(format!("host name {host} resolved to no addresses")),
        },
        Ok(Err(e)) => Err(format!("failed to resolve host name {host}: {e}")),
        Err(_) => Err(format!(
            "resolving host name {host} took longer than {}",
            format_budget(budget)
        )),
    }
}

/// Check that `host:port` accepts TCP connections within `budget`.
pub async fn check_tcp(
    resolver: &TokioAsyncResolver,
    host: &str,
    port: u16,
    budget: Duration,
) -> CheckResult<String> {
    info!(%host, port, "checking TCP connectivity");

    let (ip, dns_time) = match resolve_host(host, resolver, budget).await {
        Ok(resolved) => resolved,
        Err(message) => {
            warn!(%host, error = %message, "host name resolution failed");
            return CheckResult::failed(message);
        }
    };
    if let Some(dns_time) = dns_time {
        debug!(%host, %ip, dns_time, "host name resolved");
    }

    match timeout(budget, TcpStream::connect((ip, port))).await {
        Ok(Ok(_stream)) => {
            info!(%host, port, "TCP connection established");
            CheckResult::passed(format!(
                "TCP connection established to {host}:{port} ({ip})"
            ))
        }
        Ok(Err(e)) => {
            warn!(%host, port, error = %e, "TCP connection failed");
            CheckResult::failed(format!("failed to connect to {host}:{port} ({ip}): {e}"))
        }
        Err(_) => {
            warn!(%host, port, "TCP connection timed out");
            CheckResult::failed(format!(
                "timed out connecting to {host}:{port} ({ip}) after {}",
                format_budget(budget)
            ))
        }
    }
}
