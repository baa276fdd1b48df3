//! Smart scrape routing: cheap backend first, reliable fallback second.
//!
//! One routing decision is a small state machine: attempt the primary
//! (browser) backend, and on any failure attempt the secondary (Firecrawl)
//! backend once with the same URL and instructions. The first success is
//! recorded in the cost ledger and returned; if both attempts fail the
//! caller gets a failed [`FetchResult`] with an aggregate error and nothing
//! is recorded. Each backend gets exactly one attempt per call; re-invoking
//! the whole decision on a later pass is the caller's retry mechanism.
//!
//! The router owns the run's [`CostLedger`] behind a mutex; one serialized
//! update per completed fetch is the only shared-state write in the whole
//! pipeline.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::backends::Fetch;
use crate::costs::{CostLedger, CostSnapshot};
use crate::models::FetchResult;

/// Routes each URL across the two scraping backends and keeps the books.
pub struct SmartRouter<P, S> {
    primary: P,
    secondary: S,
    ledger: Mutex<CostLedger>,
}

/// Outcome of a [`SmartRouter::bulk_scrape`] run.
#[derive(Debug)]
pub struct BulkSummary {
    pub total_urls: usize,
    /// Successful fetches, in input order.
    pub results: Vec<FetchResult>,
    pub failed_urls: Vec<String>,
    pub snapshot: CostSnapshot,
}

impl<P: Fetch, S: Fetch> SmartRouter<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        SmartRouter {
            primary,
            secondary,
            ledger: Mutex::new(CostLedger::new()),
        }
    }

    /// Fetch one URL, falling back once on primary failure.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn scrape_url(&self, url: &str, instructions: Option<&str>) -> FetchResult {
        let primary_result = self.primary.fetch(url, instructions).await;
        if primary_result.success {
            info!(
                backend = %primary_result.source,
                cost = primary_result.cost,
                "Primary backend succeeded"
            );
            self.record(&primary_result);
            return primary_result;
        }
        let primary_error = primary_result
            .error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        warn!(
            backend = %self.primary.kind(),
            error = %primary_error,
            "Primary backend failed; trying fallback"
        );

        let secondary_result = self.secondary.fetch(url, instructions).await;
        if secondary_result.success {
            info!(
                backend = %secondary_result.source,
                cost = secondary_result.cost,
                "Fallback backend succeeded"
            );
            self.record(&secondary_result);
            return secondary_result;
        }
        let secondary_error = secondary_result
            .error
            .unwrap_or_else(|| "unknown error".to_string());
        error!(
            primary_error = %primary_error,
            secondary_error = %secondary_error,
            "Both scraping backends failed"
        );
        FetchResult::failed(
            self.secondary.kind(),
            format!(
                "both backends failed: {}: {}; {}: {}",
                self.primary.kind(),
                primary_error,
                self.secondary.kind(),
                secondary_error
            ),
        )
    }

    /// Scrape a flat URL list sequentially with a politeness delay between
    /// requests. This is the non-batched path; the orchestrator's batch
    /// pipeline does its own fan-out.
    pub async fn bulk_scrape(
        &self,
        urls: &[String],
        instructions: Option<&str>,
        delay: Duration,
    ) -> BulkSummary {
        info!(total = urls.len(), "Starting bulk scrape");
        let mut results = Vec::new();
        let mut failed_urls = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            info!(position = i + 1, total = urls.len(), %url, "Processing URL");
            let result = self.scrape_url(url, instructions).await;
            if result.success {
                results.push(result);
            } else {
                failed_urls.push(url.clone());
            }

            if i + 1 < urls.len() {
                sleep(delay).await;
            }
            if (i + 1) % 10 == 0 {
                info!("{}", self.cost_snapshot().format_summary());
            }
        }

        BulkSummary {
            total_urls: urls.len(),
            results,
            failed_urls,
            snapshot: self.cost_snapshot(),
        }
    }

    pub fn cost_snapshot(&self) -> CostSnapshot {
        self.ledger.lock().expect("cost ledger lock poisoned").snapshot()
    }

    fn record(&self, result: &FetchResult) {
        self.ledger
            .lock()
            .expect("cost ledger lock poisoned")
            .record(result.source, result.cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendKind, PagePayload};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubBackend {
        kind: BackendKind,
        succeed: bool,
        cost: f64,
        calls: Arc<AtomicUsize>,
    }

    impl StubBackend {
        fn new(kind: BackendKind, succeed: bool, cost: f64) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                StubBackend {
                    kind,
                    succeed,
                    cost,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl Fetch for StubBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn fetch(&self, _url: &str, _instructions: Option<&str>) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                FetchResult::ok(
                    self.kind,
                    self.cost,
                    PagePayload {
                        markdown: "stub".to_string(),
                        extracted: None,
                        links: vec![],
                    },
                    None,
                )
            } else {
                FetchResult::failed(self.kind, "stub failure")
            }
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let (primary, _) = StubBackend::new(BackendKind::Browser, true, 0.002);
        let (secondary, secondary_calls) = StubBackend::new(BackendKind::Firecrawl, true, 0.01);
        let router = SmartRouter::new(primary, secondary);

        let result = router.scrape_url("https://example.com", None).await;
        assert!(result.success);
        assert_eq!(result.source, BackendKind::Browser);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);

        let snapshot = router.cost_snapshot();
        assert!((snapshot.cost_for(BackendKind::Browser) - 0.002).abs() < 1e-12);
        assert_eq!(snapshot.cost_for(BackendKind::Firecrawl), 0.0);
        assert_eq!(snapshot.total_pages, 1);
    }

    #[tokio::test]
    async fn test_fallback_records_secondary_cost() {
        let (primary, primary_calls) = StubBackend::new(BackendKind::Browser, false, 0.0);
        let (secondary, _) = StubBackend::new(BackendKind::Firecrawl, true, 0.01);
        let router = SmartRouter::new(primary, secondary);

        let result = router.scrape_url("https://example.com", None).await;
        assert!(result.success);
        assert_eq!(result.source, BackendKind::Firecrawl);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);

        let snapshot = router.cost_snapshot();
        assert!((snapshot.cost_for(BackendKind::Firecrawl) - 0.01).abs() < 1e-12);
        assert_eq!(snapshot.cost_for(BackendKind::Browser), 0.0);
    }

    #[tokio::test]
    async fn test_total_failure_leaves_ledger_untouched() {
        let (primary, primary_calls) = StubBackend::new(BackendKind::Browser, false, 0.0);
        let (secondary, secondary_calls) = StubBackend::new(BackendKind::Firecrawl, false, 0.0);
        let router = SmartRouter::new(primary, secondary);

        let result = router.scrape_url("https://example.com", None).await;
        assert!(!result.success);
        assert!(result.payload.is_none());
        let error = result.error.unwrap();
        assert!(error.contains("browser"));
        assert!(error.contains("firecrawl"));
        // Exactly one attempt each, no retries.
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);

        let snapshot = router.cost_snapshot();
        assert_eq!(snapshot.total(), 0.0);
        assert_eq!(snapshot.total_pages, 0);
    }

    #[tokio::test]
    async fn test_concurrent_scrapes_lose_no_ledger_updates() {
        let (primary, _) = StubBackend::new(BackendKind::Browser, true, 0.001);
        let (secondary, _) = StubBackend::new(BackendKind::Firecrawl, true, 0.01);
        let router = SmartRouter::new(primary, secondary);

        let fetches: Vec<_> = (0..50)
            .map(|_| router.scrape_url("https://example.com", None))
            .collect();
        futures::future::join_all(fetches).await;

        let snapshot = router.cost_snapshot();
        assert_eq!(snapshot.total_pages, 50);
        assert!((snapshot.cost_for(BackendKind::Browser) - 0.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_bulk_scrape_separates_failures() {
        let (primary, _) = StubBackend::new(BackendKind::Browser, false, 0.0);
        let (secondary, _) = StubBackend::new(BackendKind::Firecrawl, false, 0.0);
        let router = SmartRouter::new(primary, secondary);

        let urls = vec![
            "https://a.example".to_string(),
            "https://b.example".to_string(),
        ];
        let summary = router
            .bulk_scrape(&urls, None, Duration::from_millis(0))
            .await;
        assert_eq!(summary.total_urls, 2);
        assert!(summary.results.is_empty());
        assert_eq!(summary.failed_urls, urls);
        assert_eq!(summary.snapshot.total_pages, 0);
    }
}
