//! Reachability diagnostics for containerised service endpoints.
//!
//! The crate is split the way the probe runs:
//! - [`target`]: rewrites raw destinations into canonical URLs.
//! - [`http_probe`]: one time-boxed GET per URL, classified into an outcome.
//! - [`sweep`]: concurrent probing of a target list and the single-shot entry point.
//! - [`service_check`]: TCP + HTTP connectivity checks for dependent services.
//! - [`server`]: the JSON HTTP API used by the UI layer.

pub mod config;
pub mod display;
pub mod http_probe;
pub mod server;
pub mod service_check;
pub mod sweep;
pub mod target;

#[cfg(test)]
pub(crate) mod testing;
