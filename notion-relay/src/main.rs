mod config;
mod logging;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use relay::errors::RelayError;
use relay::metrics_defs::ALL_METRICS;
use shared::metrics_defs::MetricType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Relays task requests to a Notion database")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve /add_task and /list_tasks
    Run(RunArgs),
    /// List the metrics emitted by the relay
    Metrics,
}

#[derive(Args)]
struct RunArgs {
    /// YAML config file. Credentials may also come from NOTION_TOKEN and NOTION_DATABASE_ID.
    #[arg(long)]
    config_file_path: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Run(args) => run(args),
        CliCommand::Metrics => {
            for def in ALL_METRICS {
                println!(
                    "{:<20} {:<10} {}",
                    def.name,
                    def.metric_type.as_str(),
                    def.description
                );
            }
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<(), CliError> {
    let config = Config::load(args.config_file_path.as_deref())?;

    // Sentry must be initialized before the runtime starts.
    let _sentry = logging::init(&config.logging);

    if let Some(metrics_config) = &config.metrics {
        init_statsd(metrics_config)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(relay::run(config.relay)).map_err(|e| {
        tracing::error!(error = %e, "Relay stopped");
        e
    })?;

    Ok(())
}

fn init_statsd(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(config.prefix.as_str()))
        .map_err(|e| CliError::Metrics(e.to_string()))?;

    metrics::set_global_recorder(recorder)
        .map_err(|_| CliError::Metrics("a metrics recorder is already installed".into()))?;

    for def in ALL_METRICS {
        match def.metric_type {
            MetricType::Counter => {
                metrics::describe_counter!(def.name, def.description);
            }
            MetricType::Gauge => {
                metrics::describe_gauge!(def.name, def.description);
            }
            MetricType::Histogram => {
                metrics::describe_histogram!(def.name, def.description);
            }
        }
    }

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Sending metrics to statsd"
    );
    Ok(())
}
