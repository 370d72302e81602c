//! SentAI Annotation Worker
//!
//! Runs the analysis pass outside the request path:
//! 1. Copies every review lacking a processed row
//! 2. Fills each unset dimension through the configured analyzer
//! 3. Logs failures and moves on
//!
//! Runs once by default; `--interval-secs` repeats the pass until shutdown.

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use sentai_common::{
    analyzer::create_analyzer,
    config::AppConfig,
    db::{DbPool, Repository},
    logging, metrics,
    pipeline::{AnalyzeAllReport, Annotator},
    VERSION,
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "annotation-worker", version = VERSION)]
#[command(about = "Copy and analyze reviews in the background")]
struct Cli {
    /// Repeat the pass every N seconds instead of exiting after one
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init(&config.observability);

    info!("Starting SentAI Annotation Worker v{}", VERSION);

    if config.observability.metrics_port != 0 {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port)))
            .install()
            .context("Failed to install Prometheus exporter")?;
    }
    metrics::register_metrics();

    info!("Connecting to database...");
    let pool = DbPool::new(&config.database).await?;
    pool.init_schema().await?;

    let analyzer = create_analyzer(&config.analyzer)?;
    let annotator = Annotator::new(Repository::new(pool), analyzer);

    info!(provider = %config.analyzer.provider, model = %config.analyzer.model, "Analyzer initialized");

    let Some(interval) = cli.interval_secs.map(Duration::from_secs) else {
        let report = run_pass(&annotator).await?;
        if !report.failures.is_empty() {
            warn!(failures = report.failures.len(), "Pass finished with failures");
        }
        return Ok(());
    };

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_pass(&annotator).await {
                    error!(error = %e, "Analysis pass failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    info!("Annotation worker shutting down");
    Ok(())
}

/// One copy + analyze-all pass
async fn run_pass(annotator: &Annotator) -> anyhow::Result<AnalyzeAllReport> {
    let report = annotator.analyze_all().await.context("Analysis pass failed")?;

    for failure in &report.failures {
        warn!(failure = %failure, "Dimension skipped");
    }
    info!(
        copied = report.copied,
        visited = report.visited,
        written = report.written,
        failures = report.failures.len(),
        "Analysis pass complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentai_common::{
        analyzer::MockAnalyzer,
        auth::Role,
        db::{NewReview, ProcessedFilter},
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_pass_fills_every_dimension_once() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let owner = repo.create_user("Olga Admin", "Acme", Role::Admin).await.unwrap();
        let now = chrono::Utc::now();
        repo.insert_reviews(
            owner.id,
            vec![NewReview {
                text: "Курьер опоздал, цены выше чем у конкурентов".into(),
                rating: 2.0,
                date: now,
                collection_time: now,
            }],
        )
        .await
        .unwrap();

        let annotator = Annotator::new(repo.clone(), Arc::new(MockAnalyzer::new()));

        let first = tokio_test::assert_ok!(run_pass(&annotator).await);
        assert_eq!(first.copied, 1);
        assert_eq!(first.written, 6);

        let second = tokio_test::assert_ok!(run_pass(&annotator).await);
        assert_eq!(second.copied, 0);
        assert_eq!(second.written, 0);

        let processed = repo.list_processed(&ProcessedFilter::default()).await.unwrap();
        assert!(!processed[0].is_unanalyzed());
    }
}
