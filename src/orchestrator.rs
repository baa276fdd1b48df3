//! Batched pipeline driver.
//!
//! Partitions the company list into contiguous batches and drives each batch
//! through a two-phase protocol: a fetch phase that fans the per-company
//! driver out with `buffer_unordered` (bounded by the batch size), then an
//! aggregation phase that writes per-company outputs, appends to the
//! cumulative collection, and checkpoints the master CSV. Batches run
//! strictly one after another, so a crash or interrupt loses at most one
//! batch of work and peak concurrency never exceeds the batch size.
//!
//! Per-target failures stay inside their [`CompanyResult`]; only checkpoint
//! I/O failures abort the run.

use futures::stream::{self, StreamExt};
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument, warn};

use crate::backends::Fetch;
use crate::costs::CostSnapshot;
use crate::ingest::{clean_url, validate_unique_basenames};
use crate::models::{CompanyRecord, CompanyResult, TargetOutcome};
use crate::outputs::OutputSink;
use crate::prompts::{company_extraction_prompt, social_profile_prompt};
use crate::router::SmartRouter;

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Stopped early on user interrupt, after flushing the current
    /// batch's checkpoint.
    Interrupted,
}

/// Cumulative results plus how the run ended.
#[derive(Debug)]
pub struct RunOutcome {
    pub results: Vec<CompanyResult>,
    pub status: RunStatus,
}

/// Drives the Smart Router across a company list in checkpointed batches.
pub struct Orchestrator<P, S> {
    router: SmartRouter<P, S>,
    sink: OutputSink,
    interrupt: Arc<AtomicBool>,
    daily_cost_limit: f64,
}

impl<P: Fetch, S: Fetch> Orchestrator<P, S> {
    pub fn new(
        router: SmartRouter<P, S>,
        sink: OutputSink,
        interrupt: Arc<AtomicBool>,
        daily_cost_limit: f64,
    ) -> Self {
        Orchestrator {
            router,
            sink,
            interrupt,
            daily_cost_limit,
        }
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    pub fn cost_snapshot(&self) -> CostSnapshot {
        self.router.cost_snapshot()
    }

    /// Run the whole pipeline. `limit` truncates the task list up front;
    /// `batch_size` bounds both batch length and in-batch concurrency.
    pub async fn run(
        &self,
        mut tasks: Vec<CompanyRecord>,
        batch_size: usize,
        limit: Option<usize>,
    ) -> Result<RunOutcome, Box<dyn Error>> {
        if batch_size == 0 {
            return Err("batch size must be at least 1".into());
        }
        if let Some(limit) = limit {
            if tasks.len() > limit {
                tasks.truncate(limit);
                info!(limit, "Truncated task list");
            }
        }
        validate_unique_basenames(&tasks)?;

        let total = tasks.len();
        let batch_count = total.div_ceil(batch_size);
        let mut all_results: Vec<CompanyResult> = Vec::with_capacity(total);

        for (index, batch) in tasks.chunks(batch_size).enumerate() {
            info!(
                batch = index + 1,
                total_batches = batch_count,
                companies = batch.len(),
                "Processing batch"
            );

            // Fetch phase. Collect is the join barrier: aggregation starts
            // only after every fetch in the batch has resolved.
            let batch_results: Vec<CompanyResult> = stream::iter(batch.iter().cloned())
                .map(|task| self.research_company(task))
                .buffer_unordered(batch_size)
                .collect()
                .await;

            // Aggregation phase. A company whose report fails to write is
            // still part of the run; the master CSV is the checkpoint.
            for result in &batch_results {
                if let Err(e) = self.sink.write_company(result).await {
                    warn!(
                        company = %result.company.company_name,
                        error = %e,
                        "Failed to write company outputs"
                    );
                }
            }
            all_results.extend(batch_results);

            self.sink.checkpoint_master_table(&all_results).await?;

            let snapshot = self.router.cost_snapshot();
            info!(companies = all_results.len(), "{}", snapshot.format_summary());
            if snapshot.total() >= 0.8 * self.daily_cost_limit {
                warn!(
                    total = snapshot.total(),
                    limit = self.daily_cost_limit,
                    "Approaching the daily cost limit"
                );
            }

            if self.interrupt.load(Ordering::SeqCst) {
                warn!(
                    completed = all_results.len(),
                    total,
                    "Interrupt received; stopping after checkpoint"
                );
                return Ok(RunOutcome {
                    results: all_results,
                    status: RunStatus::Interrupted,
                });
            }
        }

        info!(companies = all_results.len(), "Research pipeline complete");
        Ok(RunOutcome {
            results: all_results,
            status: RunStatus::Completed,
        })
    }

    /// Resolve every target of one company. Never fails: whatever could not
    /// be fetched is recorded as a failed or skipped target outcome.
    #[instrument(level = "info", skip_all, fields(company = %task.company_name))]
    async fn research_company(&self, task: CompanyRecord) -> CompanyResult {
        let prompt = company_extraction_prompt(&task.company_name, &task.industry);
        let mut targets: Vec<(String, TargetOutcome)> = Vec::new();

        match clean_url(&task.website) {
            Some(url) => {
                let result = self.router.scrape_url(&url, Some(&prompt)).await;
                targets.push(("main_site".to_string(), TargetOutcome::Fetched(result)));
            }
            None => {
                targets.push((
                    "main_site".to_string(),
                    TargetOutcome::Skipped {
                        reason: "no website URL configured".to_string(),
                    },
                ));
            }
        }

        let socials: Vec<(&'static str, String)> = task
            .social_urls()
            .into_iter()
            .map(|(label, url)| (label, url.to_string()))
            .collect();
        for (label, url) in socials {
            let url = url.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                let result = self
                    .router
                    .scrape_url(url, Some(social_profile_prompt()))
                    .await;
                targets.push((label.to_string(), TargetOutcome::Fetched(result)));
            } else {
                targets.push((
                    label.to_string(),
                    TargetOutcome::Skipped {
                        reason: format!("not an absolute http(s) URL: {}", url),
                    },
                ));
            }
        }

        CompanyResult::new(task, targets)
    }
}
