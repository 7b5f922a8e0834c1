use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use dito::config::AppConfig;
use dito::metrics::{self, Metrics};
use dito::server::MockServer;
use dito::specs::{build_domain_table, SpecContext};
use dito::workdir::DirWorkDir;

#[derive(Parser, Debug)]
#[command(name = "dito", version, about = "Rule-driven mock API server")]
struct Args {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long, global = true, env = "DITO_CONFIG_PATH", default_value = "config.yaml")]
    config: PathBuf,

    /// Directory that rule files, schemas and response files are read from
    #[arg(long, global = true, default_value = ".")]
    workdir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile all domains and serve them (default)
    Serve,
    /// Compile all domains and exit
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::from_file(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;

    config.telemetry.logging.init_subscriber()?;

    let ctx = SpecContext::new(Arc::new(DirWorkDir::new(&args.workdir)));
    let domains = build_domain_table(&config.domains, &ctx).context("invalid domain configuration")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Check => {
            info!(domains = domains.len(), "configuration is valid");
            println!("configuration OK: {} domain(s)", domains.len());
            Ok(())
        }
        Command::Serve => {
            let address = config.server.bind_address();
            let listener = tokio::net::TcpListener::bind(&address)
                .await
                .with_context(|| format!("failed to bind {address}"))?;

            let request_metrics = Arc::new(Metrics::new().context("failed to register metrics")?);
            let metrics_task = match config.telemetry.metrics.port {
                Some(port) => {
                    let address = config.server.metrics_address(port);
                    let listener = tokio::net::TcpListener::bind(&address)
                        .await
                        .with_context(|| format!("failed to bind metrics on {address}"))?;
                    Some(tokio::spawn(metrics::serve(listener, Arc::clone(&request_metrics))))
                }
                None => None,
            };

            let server = MockServer::new(domains, &config.server).with_metrics(request_metrics);
            let result = server
                .serve(listener, async {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %err, "failed to listen for ctrl-c");
                        std::future::pending::<()>().await;
                    }
                })
                .await;
            if let Some(task) = metrics_task {
                task.abort();
            }
            result
        }
    }
}
