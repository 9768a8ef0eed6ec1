//! svcprobe: reachability diagnostics for containerised services.
//!
//! ```text
//! svcprobe serve --listen 0.0.0.0:8080
//! svcprobe probe http://localhost:8000/health
//! svcprobe sweep --json
//! svcprobe services
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use svcprobe::config::{AppConfig, load_config, setup_resolver};
use svcprobe::display::{outcome_line, render_report, render_services};
use svcprobe::http_probe::prelude::*;
use svcprobe::server::{AppState, serve};
use svcprobe::service_check::diagnose_services;
use svcprobe::sweep::{manual_response, probe_single, sweep};

#[derive(Parser)]
#[command(name = "svcprobe", about = "Service reachability diagnostics", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the diagnostics API (default).
    Serve {
        /// Address to listen on. Overrides LISTEN_ADDR.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Probe a single URL or backend path with a 10 second budget.
    Probe {
        /// Absolute URL, or a path relative to the backend URL.
        url: String,
        /// Print the JSON result instead of a summary line.
        #[arg(long)]
        json: bool,
    },
    /// Probe the configured backend endpoints concurrently.
    Sweep {
        #[arg(long)]
        json: bool,
    },
    /// Check TCP and HTTP connectivity of the dependent services.
    Services {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config().context("failed to load configuration")?;
    let prober = Prober::new().context("failed to build HTTP client")?;

    match cli.command.unwrap_or(Command::Serve { listen: None }) {
        Command::Serve { listen } => run_server(config, prober, listen).await,
        Command::Probe { url, json } => {
            let outcome = probe_single(&prober, &url, &config.backend_url).await;
            if json {
                let (status, view) = manual_response(&outcome);
                println!("{}", serde_json::json!({ "status": status, "result": view }));
            } else {
                println!("{}", outcome_line("probe", 5, &outcome));
            }
            Ok(())
        }
        Command::Sweep { json } => {
            let report = sweep(
                &prober,
                &config.sweep.targets,
                &config.backend_url,
                config.sweep.timeout,
            )
            .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.to_view())?);
            } else {
                println!("{}", render_report(&report));
            }
            Ok(())
        }
        Command::Services { json } => {
            let resolver =
                setup_resolver(&config.dns_hosts).context("failed to set up DNS resolver")?;
            let report = diagnose_services(&prober, &resolver, &config.services).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_services(&report));
            }
            Ok(())
        }
    }
}

async fn run_server(
    config: AppConfig,
    prober: Prober,
    listen: Option<SocketAddr>,
) -> anyhow::Result<()> {
    let addr = listen.unwrap_or(config.listen_addr);
    let resolver = setup_resolver(&config.dns_hosts).context("failed to set up DNS resolver")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(backend_url = %config.backend_url, "starting diagnostics API");
    let state = Arc::new(AppState::new(config, prober, resolver));

    serve(state, listener, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("diagnostics API failed")
}
