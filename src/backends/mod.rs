//! Scraping backend adapters behind a uniform fetch contract.
//!
//! Each submodule wraps one external fetch-and-extract capability:
//!
//! | Backend | Module | Cost model | Notes |
//! |---------|--------|------------|-------|
//! | Browser | [`browser`] | per-token estimate | Cheap; extraction quality depends on LLM config |
//! | Firecrawl | [`firecrawl`] | fixed per page | Reliable managed service, used as fallback |
//!
//! Adapters never propagate errors to their caller: every internal failure
//! (transport, render, service) is captured into a failed
//! [`FetchResult`](crate::models::FetchResult). The [`Fetch`] trait is the
//! seam the Smart Router routes across, and what test stubs implement.

use crate::models::{BackendKind, FetchResult};

pub mod browser;
pub mod firecrawl;

/// One external fetch-and-extract capability.
pub trait Fetch {
    /// Which backend this is, for routing logs and the cost ledger.
    fn kind(&self) -> BackendKind;

    /// Fetch one URL and optionally apply extraction instructions.
    ///
    /// Must not panic or return early through an error path; failures come
    /// back as a `FetchResult` with `success == false`.
    async fn fetch(&self, url: &str, instructions: Option<&str>) -> FetchResult;
}
