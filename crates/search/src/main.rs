//! PaperRank command line
//!
//! Builds the search engine from configuration, runs one query and prints
//! the clustered report to stdout. Logs go to stderr.

use anyhow::Context;
use clap::Parser;
use paperrank_common::{config::AppConfig, metrics, VERSION};
use paperrank_search::report::{self, ReportFormat};
use paperrank_search::SearchEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "paperrank")]
#[command(about = "Citation-aware semantic search and clustering over a paper corpus")]
#[command(version)]
struct Cli {
    /// Query text, e.g. "neural networks" or 'title:"belief networks" -survey'
    query: String,

    /// Number of ranked papers to cluster (default: query.top_n)
    top_n: Option<usize>,

    /// Number of clusters (default: query.num_clusters)
    num_clusters: Option<usize>,

    /// Configuration file to use instead of the layered config/ directory
    #[arg(long)]
    config: Option<String>,

    /// Report format: text or json (default: query.output_format)
    #[arg(long)]
    format: Option<String>,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;
    config.validate()?;

    init_tracing(&config.observability.log_level, config.observability.json_logging);
    info!(
        version = VERSION,
        service = %config.observability.service_name,
        "Starting PaperRank"
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "Metrics exporter listening");
    }
    metrics::register_metrics();

    let top_n = cli.top_n.unwrap_or(config.query.top_n);
    let num_clusters = cli.num_clusters.unwrap_or(config.query.num_clusters);
    let format = ReportFormat::from_name(cli.format.as_deref().unwrap_or(&config.query.output_format));
    let timeout = config.query_timeout();

    // Build the engine off the async workers
    let config = Arc::new(config);
    let engine = {
        let config = Arc::clone(&config);
        tokio::task::spawn_blocking(move || SearchEngine::from_config(&config))
            .await
            .context("Engine construction task failed")??
    };
    let engine = Arc::new(engine);

    let clusters = engine
        .query_with_timeout(cli.query, top_n, num_clusters, timeout)
        .await?;

    print!("{}", report::render(&clusters, format)?);

    info!("Done");
    Ok(())
}
