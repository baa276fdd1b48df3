//! # Company Intel
//!
//! A bulk company-research pipeline that scrapes company websites and social
//! profiles, extracts structured business intelligence, and writes per-company
//! reports plus an aggregate research table.
//!
//! ## Features
//!
//! - Smart routing between two scraping backends: a cheap browser-style
//!   fetcher with optional LLM extraction, and a reliable managed extraction
//!   service used as the fallback
//! - Per-page cost tracking with per-backend running totals
//! - Batched parallel processing with a checkpoint after every batch
//! - Uniform-random proxy selection from a configured pool
//! - Markdown report, JSON record, and master CSV outputs
//!
//! ## Usage
//!
//! ```sh
//! company_intel -i data/companies.csv -l 10 -b 5
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Ingestion**: Load company records from the input CSV
//! 2. **Routing**: Per URL, try the browser backend, fall back to Firecrawl
//! 3. **Orchestration**: Fan batches out concurrently, join, checkpoint
//! 4. **Output**: Write per-company Markdown/JSON and the cumulative CSV

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod backends;
mod cli;
mod config;
mod costs;
mod ingest;
mod llm;
mod models;
mod orchestrator;
mod outputs;
mod prompts;
mod proxy;
mod router;
mod utils;

use backends::browser::BrowserFetcher;
use backends::firecrawl::FirecrawlClient;
use cli::Cli;
use config::Settings;
use ingest::load_companies;
use orchestrator::{Orchestrator, RunStatus};
use outputs::OutputSink;
use router::SmartRouter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("company_intel starting up");

    if dotenvy::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }

    let args = Cli::parse();

    // --- Configuration ---
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return Err(e);
        }
    };
    info!(
        llm_provider = settings
            .llm
            .as_ref()
            .map(|l| l.provider.as_str())
            .unwrap_or("none"),
        proxy_enabled = settings.proxy.is_enabled(),
        daily_cost_limit = settings.daily_cost_limit,
        "Configuration loaded"
    );

    let browser = BrowserFetcher::new(
        settings.proxy.clone(),
        settings.llm.as_ref().map(|l| l.client()),
    );
    let firecrawl = FirecrawlClient::new(&settings.firecrawl);
    let router = SmartRouter::new(browser, firecrawl);

    // --- Bulk mode: flat URL list, sequential with a politeness delay ---
    if let Some(ref path) = args.bulk_urls {
        let content = tokio::fs::read_to_string(path).await?;
        let urls: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        info!(count = urls.len(), "Bulk scraping URL list");

        let summary = router
            .bulk_scrape(&urls, None, Duration::from_secs(args.rate_limit_secs))
            .await;
        for url in &summary.failed_urls {
            warn!(%url, "URL failed on both backends");
        }
        info!(
            total = summary.total_urls,
            successful = summary.results.len(),
            failed = summary.failed_urls.len(),
            "Bulk scrape complete"
        );
        info!("{}", summary.snapshot.format_summary());
        return Ok(());
    }

    // --- Ingestion ---
    let input = args.input.as_deref().expect("clap requires --input outside bulk mode");
    let companies = load_companies(Path::new(input))?;
    if companies.is_empty() {
        error!(path = input, "No usable company records in input");
        return Err("no usable company records in input".into());
    }

    // --- Output sink (early writability check) ---
    let sink = OutputSink::new(&args.output_dir);
    if let Err(e) = sink.prepare().await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // --- Interrupt handling: finish the current batch checkpoint, then stop ---
    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = Arc::clone(&interrupt);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; finishing the current batch before exiting");
                interrupt.store(true, Ordering::SeqCst);
            }
        });
    }

    // --- Run the pipeline ---
    let orchestrator = Orchestrator::new(
        router,
        sink,
        Arc::clone(&interrupt),
        settings.daily_cost_limit,
    );
    let outcome = orchestrator
        .run(companies, args.batch_size, args.limit)
        .await?;

    // --- Final summary ---
    let successful_scrapes = outcome
        .results
        .iter()
        .filter(|r| r.targets.iter().any(|(_, outcome)| outcome.succeeded()))
        .count();
    info!(
        companies = outcome.results.len(),
        successful_scrapes,
        checkpoints = orchestrator.sink().checkpoints_written(),
        "Research finished"
    );
    info!("{}", orchestrator.cost_snapshot().format_summary());
    info!(
        markdown = %orchestrator.sink().output_dir().join("markdown").display(),
        json = %orchestrator.sink().output_dir().join("json").display(),
        master_csv = %orchestrator.sink().master_csv_path().display(),
        "Output locations"
    );
    for result in outcome.results.iter().take(5) {
        info!(
            company = %result.company.company_name,
            industry = %result.company.industry,
            cost = result.scraping_cost,
            "Sample company processed"
        );
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    if outcome.status == RunStatus::Interrupted {
        warn!("Run interrupted by user; last checkpoint was flushed");
        std::process::exit(130);
    }

    Ok(())
}
