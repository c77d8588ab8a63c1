//! CLI entry point for the Insight catalog.
//!
//! Designed for subprocess invocation: reads a JSON request from stdin,
//! writes a JSON result to stdout. Logs go to stderr.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use insight_core::config::InsightConfig;
use insight_core::EntityKind;
use insight_graph::{ConnectionManager, Neo4jConnector, RetryPolicy};
use insight_pathfind::{read_request, CatalogApi, CatalogRequest, DomainPathOptions, PathEngine};

#[derive(Parser)]
#[command(name = "insight-catalog", version)]
#[command(about = "Metrics catalog and path resolution over a Neo4j graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: insight).
    #[arg(short, long, default_value = "insight", global = true)]
    config: String,

    /// Abort the request after this many milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one catalog request (reads JSON from stdin).
    Call,
    /// Shortest path between two named entities.
    Path {
        /// Entity kind: metric, domain or dashboard.
        #[arg(long, default_value = "dashboard")]
        kind: EntityKind,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Maximum hops (1-15).
        #[arg(long)]
        max_hops: Option<u32>,
    },
    /// Check that the graph store answers within the health-check timeout.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = InsightConfig::load(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let manager = Arc::new(ConnectionManager::new(
        Arc::new(Neo4jConnector::new(config.neo4j.clone())),
        RetryPolicy::from(&config.lifecycle),
    ));
    let engine = PathEngine::new(manager.clone())
        .with_options(DomainPathOptions::from(&config.paths))
        .with_default_max_hops(config.paths.default_max_hops);
    let mut api = CatalogApi::new(engine);
    if let Some(ms) = cli.timeout_ms {
        api = api.with_deadline(Duration::from_millis(ms));
    }

    run_until_interrupted(
        &manager,
        run(&cli, &config, &manager, &api),
        tokio::signal::ctrl_c(),
    )
    .await
}

/// Drive `work` (startup connect included) unless `interrupt` fires first,
/// then release the store.
async fn run_until_interrupted<W, I>(
    manager: &ConnectionManager,
    work: W,
    interrupt: I,
) -> anyhow::Result<()>
where
    W: Future<Output = anyhow::Result<()>>,
    I: Future,
{
    let outcome = tokio::select! {
        result = work => result,
        _ = interrupt => {
            tracing::info!("Interrupted; shutting down");
            Ok(())
        }
    };

    manager.shutdown();
    outcome
}

async fn run(
    cli: &Cli,
    config: &InsightConfig,
    manager: &ConnectionManager,
    api: &CatalogApi,
) -> anyhow::Result<()> {
    manager.ensure_connected().await?;

    match cli.command {
        Command::Call => {
            let request = read_request(std::io::stdin())?;
            let result = api.handle(request).await?;
            println!("{}", serde_json::to_string(&result)?);
        }
        Command::Path {
            kind,
            ref from,
            ref to,
            max_hops,
        } => {
            let request = CatalogRequest::FindPath {
                kind,
                name1: from.clone(),
                name2: to.clone(),
                max_hops,
            };
            let result = api.handle(request).await?;
            println!("{}", serde_json::to_string(&result)?);
        }
        Command::Health => {
            let timeout = config.lifecycle.health_check_timeout();
            manager.health_check(timeout).await?;
            tracing::info!(uri = %config.neo4j.uri, "Graph store healthy");
            println!("{}", serde_json::json!({ "status": "ok" }));
        }
    }
    Ok(())
}
