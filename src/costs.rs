//! Run-scoped cost accounting for the scraping backends.
//!
//! The [`CostLedger`] keeps per-backend running totals plus a page counter.
//! It is pure bookkeeping: the Smart Router records a cost immediately after
//! each successful fetch, and reporting code reads immutable [`CostSnapshot`]
//! copies. Totals only ever grow and reset only at process start; cumulative
//! cross-run history comes from summing the persisted per-company JSON
//! records instead.

use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::warn;

use crate::models::BackendKind;

/// Approximate the token count of rendered page text.
///
/// Uses the chars-divided-by-four rule of thumb. This is a coarse
/// approximation of real tokenizer output, not an exact count; it exists to
/// keep per-page LLM cost estimates in the right order of magnitude. Swap
/// this function out if a real tokenizer ever becomes worth the dependency.
pub fn approximate_token_count(text: &str) -> f64 {
    text.chars().count() as f64 / 4.0
}

/// Per-backend monetary totals for the current process.
#[derive(Debug, Default)]
pub struct CostLedger {
    totals: BTreeMap<BackendKind, f64>,
    total_pages: u64,
}

impl CostLedger {
    pub fn new() -> Self {
        CostLedger::default()
    }

    /// Add `cost` to `backend`'s running total and count one more page.
    ///
    /// Totals are monotonically non-decreasing: a negative cost is clamped to
    /// zero (and logged) rather than ever subtracting.
    pub fn record(&mut self, backend: BackendKind, cost: f64) {
        if cost < 0.0 {
            warn!(%backend, cost, "negative cost recorded; clamping to zero");
        }
        *self.totals.entry(backend).or_insert(0.0) += cost.max(0.0);
        self.total_pages += 1;
    }

    /// Immutable copy of the current totals for reporting.
    pub fn snapshot(&self) -> CostSnapshot {
        CostSnapshot {
            per_backend: self.totals.clone(),
            total_pages: self.total_pages,
        }
    }
}

/// Point-in-time copy of the ledger, safe to format and compare.
#[derive(Debug, Clone, PartialEq)]
pub struct CostSnapshot {
    pub per_backend: BTreeMap<BackendKind, f64>,
    pub total_pages: u64,
}

impl CostSnapshot {
    pub fn cost_for(&self, backend: BackendKind) -> f64 {
        self.per_backend.get(&backend).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.per_backend.values().sum()
    }

    /// Render the running totals. Pure function of the snapshot, so
    /// formatting the same snapshot twice yields identical text.
    pub fn format_summary(&self) -> String {
        let total = self.total();
        let avg = total / self.total_pages.max(1) as f64;
        let mut out = String::from("Cost summary:\n");
        writeln!(
            out,
            "- Browser: ${:.4}",
            self.cost_for(BackendKind::Browser)
        )
        .unwrap();
        writeln!(
            out,
            "- Firecrawl: ${:.4}",
            self.cost_for(BackendKind::Firecrawl)
        )
        .unwrap();
        writeln!(out, "- Total: ${:.4}", total).unwrap();
        writeln!(out, "- Pages processed: {}", self.total_pages).unwrap();
        write!(out, "- Average cost per page: ${:.4}", avg).unwrap();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_record_accumulates_per_backend() {
        let mut ledger = CostLedger::new();
        ledger.record(BackendKind::Browser, 0.002);
        ledger.record(BackendKind::Browser, 0.003);
        ledger.record(BackendKind::Firecrawl, 0.01);

        let snapshot = ledger.snapshot();
        assert!((snapshot.cost_for(BackendKind::Browser) - 0.005).abs() < 1e-12);
        assert!((snapshot.cost_for(BackendKind::Firecrawl) - 0.01).abs() < 1e-12);
        assert!((snapshot.total() - 0.015).abs() < 1e-12);
        assert_eq!(snapshot.total_pages, 3);
    }

    #[test]
    fn test_negative_cost_never_decrements() {
        let mut ledger = CostLedger::new();
        ledger.record(BackendKind::Browser, 0.01);
        ledger.record(BackendKind::Browser, -5.0);
        let snapshot = ledger.snapshot();
        assert!((snapshot.cost_for(BackendKind::Browser) - 0.01).abs() < 1e-12);
        assert_eq!(snapshot.total_pages, 2);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let ledger = Arc::new(Mutex::new(CostLedger::new()));
        let mut handles = Vec::new();
        for worker in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                let backend = if worker % 2 == 0 {
                    BackendKind::Browser
                } else {
                    BackendKind::Firecrawl
                };
                for _ in 0..100 {
                    ledger.lock().unwrap().record(backend, 0.001);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let snapshot = ledger.lock().unwrap().snapshot();
        assert_eq!(snapshot.total_pages, 800);
        assert!((snapshot.total() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_format_summary_is_idempotent() {
        let mut ledger = CostLedger::new();
        ledger.record(BackendKind::Browser, 0.0042);
        ledger.record(BackendKind::Firecrawl, 0.01);
        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.format_summary(), snapshot.format_summary());
        assert!(snapshot.format_summary().contains("Pages processed: 2"));
    }

    #[test]
    fn test_token_count_is_quarter_of_chars() {
        assert_eq!(approximate_token_count(""), 0.0);
        assert_eq!(approximate_token_count("abcd"), 1.0);
        assert_eq!(approximate_token_count(&"x".repeat(4_000)), 1_000.0);
    }
}
