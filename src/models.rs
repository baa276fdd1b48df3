//! Data models for scrape attempts, company tasks, and research results.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`FetchResult`]: the outcome of one fetch-and-extract attempt
//! - [`PagePayload`]: the content a successful attempt carries
//! - [`CompanyRecord`]: one company row from the input CSV
//! - [`CompanyResult`]: everything the pipeline learned about one company
//! - [`TargetOutcome`]: per-target result that keeps "skipped" distinct from
//!   "failed" and "succeeded"
//!
//! `FetchResult` is only built through its constructors so the success/error
//! and failure/payload exclusivity holds everywhere downstream.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::safe_basename;

/// Which scraping backend produced a [`FetchResult`].
///
/// `Browser` is the cheap, variable-cost path (plain rendered fetch plus
/// optional LLM extraction). `Firecrawl` is the fixed-cost managed extraction
/// service used as the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Browser,
    Firecrawl,
}

impl BackendKind {
    /// Stable name used as the cost-ledger key and in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Browser => "browser",
            BackendKind::Firecrawl => "firecrawl",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content carried by a successful fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagePayload {
    /// Readable text rendition of the page.
    pub markdown: String,
    /// Structured fields pulled out by the extraction step, when it ran and
    /// produced parseable JSON. Absent means the fetch degraded to raw text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<serde_json::Value>,
    /// Deduplicated outbound links found on the page.
    pub links: Vec<String>,
}

/// Outcome of one fetch-and-extract attempt against a single URL.
///
/// Immutable once built. Constructors enforce the invariants:
/// a successful result has no error and a non-negative cost; a failed result
/// has no payload and zero cost.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub success: bool,
    pub source: BackendKind,
    /// Estimated or fixed monetary cost of this attempt, in USD.
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<PagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_used: Option<String>,
}

impl FetchResult {
    /// A successful attempt. Negative cost estimates are clamped to zero.
    pub fn ok(
        source: BackendKind,
        cost: f64,
        payload: PagePayload,
        proxy_used: Option<String>,
    ) -> Self {
        FetchResult {
            success: true,
            source,
            cost: cost.max(0.0),
            payload: Some(payload),
            error: None,
            proxy_used,
        }
    }

    /// A failed attempt. Carries no payload and contributes no cost.
    pub fn failed(source: BackendKind, error: impl Into<String>) -> Self {
        FetchResult {
            success: false,
            source,
            cost: 0.0,
            payload: None,
            error: Some(error.into()),
            proxy_used: None,
        }
    }
}

/// One company row from the input CSV.
///
/// Only `company_name`, `website`, and the social URLs influence routing;
/// everything else passes through untouched to the output sink. The
/// deserialize-side renames match the column headers of the source CSV, while
/// serialization keeps snake_case keys for the JSON record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyRecord {
    #[serde(rename(deserialize = "Company Name"), default)]
    pub company_name: String,
    #[serde(rename(deserialize = "Website"), default)]
    pub website: String,
    #[serde(rename(deserialize = "Founded Year"), default)]
    pub founded_year: String,
    #[serde(rename(deserialize = "Revenue (in 000s USD)"), default)]
    pub revenue: String,
    #[serde(rename(deserialize = "Revenue Range (in USD)"), default)]
    pub revenue_range: String,
    #[serde(rename(deserialize = "Employees"), default)]
    pub employees: String,
    #[serde(rename(deserialize = "Employee Range"), default)]
    pub employee_range: String,
    #[serde(rename(deserialize = "Primary Industry"), default)]
    pub industry: String,
    #[serde(rename(deserialize = "Primary Sub-Industry"), default)]
    pub sub_industry: String,
    #[serde(rename(deserialize = "Ownership Type"), default)]
    pub ownership_type: String,
    #[serde(rename(deserialize = "Business Model"), default)]
    pub business_model: String,
    #[serde(rename(deserialize = "LinkedIn Company Profile URL"), default)]
    pub linkedin_url: String,
    #[serde(rename(deserialize = "Facebook Company Profile URL"), default)]
    pub facebook_url: String,
    #[serde(rename(deserialize = "Twitter Company Profile URL"), default)]
    pub twitter_url: String,
    #[serde(rename(deserialize = "Company Street Address"), default)]
    pub address: String,
    #[serde(rename(deserialize = "Company City"), default)]
    pub city: String,
    #[serde(rename(deserialize = "Company State"), default)]
    pub state: String,
    #[serde(rename(deserialize = "Company Zip Code"), default)]
    pub zip_code: String,
    #[serde(rename(deserialize = "Company Country"), default)]
    pub country: String,
    #[serde(rename(deserialize = "ZoomInfo Company ID"), default)]
    pub external_id: String,
}

impl CompanyRecord {
    /// Filesystem-safe basename used for this company's output files.
    pub fn basename(&self) -> String {
        safe_basename(&self.company_name)
    }

    /// The configured social-profile targets, labeled. Blank entries are
    /// dropped here; the per-task driver decides whether the rest are
    /// attempted or skipped.
    pub fn social_urls(&self) -> Vec<(&'static str, &str)> {
        [
            ("linkedin", self.linkedin_url.as_str()),
            ("facebook", self.facebook_url.as_str()),
            ("twitter", self.twitter_url.as_str()),
        ]
        .into_iter()
        .filter(|(_, url)| !url.trim().is_empty())
        .collect()
    }
}

/// Per-target result inside a [`CompanyResult`].
///
/// A target that was never attempted (no URL configured, URL not http(s))
/// records why, instead of being silently absent.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetOutcome {
    Fetched(FetchResult),
    Skipped { reason: String },
}

impl TargetOutcome {
    pub fn fetched(&self) -> Option<&FetchResult> {
        match self {
            TargetOutcome::Fetched(result) => Some(result),
            TargetOutcome::Skipped { .. } => None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.fetched().map(|r| r.success).unwrap_or(false)
    }
}

/// Everything the pipeline learned about one company, plus the cost
/// attributable to it.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyResult {
    pub company: CompanyRecord,
    /// Logical target ("main_site", "linkedin", ...) to outcome, in attempt
    /// order.
    pub targets: Vec<(String, TargetOutcome)>,
    /// Sum of `cost` over the successful fetches above.
    pub scraping_cost: f64,
}

impl CompanyResult {
    /// Builds the result and derives `scraping_cost` from the successful
    /// fetches, so the cost invariant holds by construction.
    pub fn new(company: CompanyRecord, targets: Vec<(String, TargetOutcome)>) -> Self {
        let scraping_cost = targets
            .iter()
            .filter_map(|(_, outcome)| outcome.fetched())
            .filter(|r| r.success)
            .map(|r| r.cost)
            .sum();
        CompanyResult {
            company,
            targets,
            scraping_cost,
        }
    }

    pub fn target(&self, label: &str) -> Option<&TargetOutcome> {
        self.targets
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, outcome)| outcome)
    }

    /// Structured fields extracted from the main site, when available.
    pub fn extracted(&self) -> Option<&serde_json::Value> {
        self.target("main_site")
            .and_then(|outcome| outcome.fetched())
            .and_then(|r| r.payload.as_ref())
            .and_then(|p| p.extracted.as_ref())
    }
}
