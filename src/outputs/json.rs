//! Machine-readable JSON record for one company.
//!
//! The record carries the untouched company metadata, the per-target
//! web-intelligence outcomes, and a research-metadata block with the cost
//! breakdown. Downstream tooling sums `researchMetadata` across persisted
//! records to recover cumulative spend, so those keys are part of the
//! contract.

use chrono::Local;
use serde_json::{Map, Value, json};

use crate::models::CompanyResult;

/// Build the JSON record for one researched company.
pub fn company_record(result: &CompanyResult) -> Value {
    let mut web_intelligence = Map::new();
    for (label, outcome) in &result.targets {
        web_intelligence.insert(
            label.clone(),
            serde_json::to_value(outcome).unwrap_or(Value::Null),
        );
    }

    json!({
        "companyName": result.company.company_name,
        "companyData": result.company,
        "webIntelligence": Value::Object(web_intelligence),
        "researchMetadata": {
            "researchDate": Local::now().to_rfc3339(),
            "scrapingCost": result.scraping_cost,
            "totalCost": result.scraping_cost,
        }
    })
}
