use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
};

use super::error::ConfigError;
use super::model::{FileConfig, ServiceConfig, default_check_timeout_ms, default_expected_status};
use crate::sweep::SweepTarget;

pub const DEFAULT_BACKEND_URL: &str = "http://backend:8000";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SWEEP_TIMEOUT: Duration = Duration::from_secs(3);

const DEFAULT_CREWAI_HOST: &str = "crewai";
const DEFAULT_CREWAI_PORT: u16 = 8004;
const DEFAULT_OLLAMA_HOST: &str = "http://ollama:11434";
const OLLAMA_PORT: u16 = 11434;

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub targets: Vec<SweepTarget>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base for relative targets; the backend as seen from this process.
    pub backend_url: String,
    pub listen_addr: SocketAddr,
    pub sweep: SweepConfig,
    pub services: Vec<ServiceConfig>,
    /// Explicit name servers. Empty means the system configuration.
    pub dns_hosts: Vec<String>,
}

/// Load the application configuration.
///
/// Reads `.env` if present, then the process environment. When
/// `CONFIG_FILE` is set, the YAML file it names replaces the sweep targets,
/// the sweep timeout and the service list it defines.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) => debug!(error = %e, "no .env loaded"),
    }

    let vars = |key: &str| env::var(key).ok();
    let config = AppConfig::from_vars(vars)?;

    let config = match vars("CONFIG_FILE").filter(|v| !v.trim().is_empty()) {
        Some(location) => config.with_file(read_file_config(Path::new(&location))?),
        None => config,
    };

    info!(
        backend_url = %config.backend_url,
        sweep_targets = config.sweep.targets.len(),
        services = config.services.len(),
        "configuration loaded"
    );
    Ok(config)
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: PathBuf::from(path),
        source,
    })?;
    serde_yaml::from_str(&config_str).map_err(|source| ConfigError::Parse {
        path: PathBuf::from(path),
        source,
    })
}

impl AppConfig {
    /// Build the configuration from a variable lookup. Empty values count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_url = var("BACKEND_URL")
            .or_else(|| var("NEXT_PUBLIC_BACKEND_URL"))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let listen = var("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = listen.parse().map_err(|_| ConfigError::InvalidValue {
            key: "LISTEN_ADDR",
            value: listen.clone(),
        })?;

        let dns_hosts: Vec<String> = var("DNS_HOSTS")
            .map(|hosts| {
                hosts
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let crewai_host = var("CREWAI_HOST").unwrap_or_else(|| DEFAULT_CREWAI_HOST.to_string());
        let crewai_port: u16 = match var("CREWAI_PORT") {
            Some(port) => port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "CREWAI_PORT",
                value: port.clone(),
            })?,
            None => DEFAULT_CREWAI_PORT,
        };
        let crewai_url =
            var("CREWAI_BASE_URL").unwrap_or_else(|| format!("http://{crewai_host}:{crewai_port}"));

        let ollama_host_url = var("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());
        let ollama_host = ollama_host_name(&ollama_host_url);

        let services = vec![
            ServiceConfig {
                name: "crewai".to_string(),
                http_url: format!("{crewai_url}/health"),
                host: crewai_host,
                port: crewai_port,
                expected_status: default_expected_status(),
                timeout_ms: default_check_timeout_ms(),
            },
            ServiceConfig {
                name: "ollama".to_string(),
                http_url: format!("http://{ollama_host}:{OLLAMA_PORT}/api/version"),
                host: ollama_host,
                port: OLLAMA_PORT,
                expected_status: default_expected_status(),
                timeout_ms: default_check_timeout_ms(),
            },
        ];

        Ok(AppConfig {
            backend_url,
            listen_addr,
            sweep: SweepConfig {
                targets: default_sweep_targets(),
                timeout: DEFAULT_SWEEP_TIMEOUT,
            },
            services,
            dns_hosts,
        })
    }

    /// Apply the sections present in a config file.
    pub fn with_file(mut self, file: FileConfig) -> Self {
        if let Some(sweep) = file.sweep {
            if let Some(timeout_ms) = sweep.timeout_ms {
                self.sweep.timeout = Duration::from_millis(timeout_ms);
            }
            if let Some(targets) = sweep.targets {
                self.sweep.targets = targets
                    .into_iter()
                    .map(|t| SweepTarget::new(t.name, t.url))
                    .collect();
            }
        }
        if let Some(services) = file.services {
            self.services = services;
        }
        self
    }
}

/// The endpoints checked by the backend sweep: the configured backend, the
/// in-cluster name and the loopback address (rewritten to the in-cluster name).
pub fn default_sweep_targets() -> Vec<SweepTarget> {
    vec![
        SweepTarget::new("configured backend", "/health"),
        SweepTarget::new("in-cluster backend", "http://backend:8000/health"),
        SweepTarget::new("loopback backend", "http://localhost:8000/health"),
    ]
}

/// `http://ollama:11434` -> `ollama`. Only a leading `http://` is understood.
fn ollama_host_name(url: &str) -> String {
    url.replace("http://", "")
        .split(':')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Set up a DNS resolver.
///
/// With no explicit hosts the system configuration is used, which includes
/// the container runtime's embedded DNS and `/etc/hosts`. Otherwise the given
/// name servers are queried over UDP and TCP, with 2 attempts and a
/// 2 second timeout per query.
pub fn setup_resolver(dns_hosts: &[String]) -> Result<TokioAsyncResolver, ConfigError> {
    if dns_hosts.is_empty() {
        return Ok(TokioAsyncResolver::tokio_from_system_conf()?);
    }

    let mut opts = ResolverOpts::default();
    opts.attempts = 2;
    opts.timeout = Duration::from_secs(2);
    opts.cache_size = 1024;

    let ips = dns_hosts
        .iter()
        .map(|host| {
            host.parse::<IpAddr>().map_err(|_| ConfigError::InvalidValue {
                key: "DNS_HOSTS",
                value: host.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(?dns_hosts, "using explicit DNS hosts");

    let name_servers = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
    let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}
