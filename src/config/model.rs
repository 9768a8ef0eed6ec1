use serde::Deserialize;

/// Optional YAML file overriding the built-in sweep and service lists.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub sweep: Option<SweepFileConfig>,

    #[serde(default)]
    pub services: Option<Vec<ServiceConfig>>,
}

#[derive(Debug, Deserialize)]
pub struct SweepFileConfig {
    /// Budget for each probe of the sweep.
    pub timeout_ms: Option<u64>,

    /// Endpoints probed by the sweep, in display order.
    pub targets: Option<Vec<TargetConfig>>,
}

/// A sweep endpoint. The URL may be a path relative to the backend URL.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    pub url: String,
}

/// A dependent service checked at the TCP and HTTP level.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    pub name: String,

    /// Host name as seen from inside the container network.
    pub host: String,

    pub port: u16,

    /// Endpoint expected to answer with `expected_status`.
    pub http_url: String,

    /// Defaults to 200 if not specified.
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,

    /// Budget of each check. Defaults to 5 seconds.
    #[serde(default = "default_check_timeout_ms")]
    pub timeout_ms: u64,
}

pub(crate) fn default_expected_status() -> u16 {
    200
}

pub(crate) fn default_check_timeout_ms() -> u64 {
    5000
}
