//! Company-record ingestion from the tabular source CSV.
//!
//! Rows deserialize straight into [`CompanyRecord`] via the header renames
//! declared on the struct. Unparseable rows and rows without a company name
//! are logged and skipped rather than failing the whole load; the pipeline
//! should run with whatever is usable.

use std::error::Error;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::models::CompanyRecord;

/// Load company records from a CSV file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_companies(path: &Path) -> Result<Vec<CompanyRecord>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut companies = Vec::new();
    for (row, result) in reader.deserialize::<CompanyRecord>().enumerate() {
        match result {
            Ok(record) => {
                if record.company_name.trim().is_empty() {
                    warn!(row = row + 2, "Skipping row without a company name");
                    continue;
                }
                companies.push(record);
            }
            Err(e) => {
                warn!(row = row + 2, error = %e, "Skipping unparseable CSV row");
            }
        }
    }

    info!(count = companies.len(), "Loaded companies from CSV");
    Ok(companies)
}

/// Clean and normalize a website URL from the CSV.
///
/// Trims whitespace, defaults the scheme to https, and drops a trailing
/// slash. Returns `None` for blank input.
pub fn clean_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    let with_scheme = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    Some(with_scheme.trim_end_matches('/').to_string())
}

/// Reject task lists whose names normalize to colliding output basenames.
///
/// Two companies that share a basename would silently overwrite each other's
/// report files, so the run refuses to start and names the collisions.
pub fn validate_unique_basenames(companies: &[CompanyRecord]) -> Result<(), Box<dyn Error>> {
    use std::collections::BTreeMap;
    let mut by_basename: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for company in companies {
        by_basename
            .entry(company.basename())
            .or_default()
            .push(company.company_name.as_str());
    }
    let collisions: Vec<String> = by_basename
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(basename, names)| format!("{} <- {}", basename, names.join(", ")))
        .collect();
    if collisions.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "company names collide after filename normalization:\n{}",
            collisions.join("\n")
        )
        .into())
    }
}
