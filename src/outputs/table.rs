//! Aggregate master CSV across all processed companies.
//!
//! One row per company: identifying metadata, bounded previews of the key
//! extraction fields (500 characters, to keep the table reviewable in a
//! spreadsheet), and the cost columns.

use chrono::Local;
use std::error::Error;

use crate::models::CompanyResult;
use crate::utils::truncate_preview;

/// Bound on extraction-field preview cells.
const PREVIEW_CHARS: usize = 500;

const HEADERS: [&str; 17] = [
    "Company Name",
    "Website",
    "Founded Year",
    "Revenue Range",
    "Employee Range",
    "Industry",
    "Sub-Industry",
    "Ownership Type",
    "LinkedIn URL",
    "City",
    "State",
    "Country",
    "Technology Stack",
    "Recent News",
    "Digital Initiatives",
    "Web Scraping Cost",
    "Research Date",
];

/// Render the cumulative results as CSV bytes.
pub fn master_table_csv(results: &[CompanyResult]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    let research_date = Local::now().date_naive().to_string();
    for result in results {
        let company = &result.company;
        let technology_stack = extraction_preview(result, "technology_stack");
        let recent_news = extraction_preview(result, "recent_news");
        let digital_initiatives = extraction_preview(result, "digital_initiatives");
        let scraping_cost = format!("${:.4}", result.scraping_cost);
        writer.write_record([
            company.company_name.as_str(),
            company.website.as_str(),
            company.founded_year.as_str(),
            company.revenue_range.as_str(),
            company.employee_range.as_str(),
            company.industry.as_str(),
            company.sub_industry.as_str(),
            company.ownership_type.as_str(),
            company.linkedin_url.as_str(),
            company.city.as_str(),
            company.state.as_str(),
            company.country.as_str(),
            technology_stack.as_str(),
            recent_news.as_str(),
            digital_initiatives.as_str(),
            scraping_cost.as_str(),
            research_date.as_str(),
        ])?;
    }

    Ok(writer.into_inner().map_err(|e| e.to_string())?)
}

/// Pull one extracted field as a bounded plain-text preview.
fn extraction_preview(result: &CompanyResult, key: &str) -> String {
    let Some(value) = result.extracted().and_then(|fields| fields.get(key)) else {
        return String::new();
    };
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_preview(&text, PREVIEW_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BackendKind, CompanyRecord, FetchResult, PagePayload, TargetOutcome,
    };

    fn result_with(extracted: serde_json::Value) -> CompanyResult {
        let company = CompanyRecord {
            company_name: "Acme Corp".to_string(),
            website: "https://acme.example".to_string(),
            industry: "Construction".to_string(),
            ..CompanyRecord::default()
        };
        let payload = PagePayload {
            markdown: "# Acme".to_string(),
            extracted: Some(extracted),
            links: vec![],
        };
        CompanyResult::new(
            company,
            vec![(
                "main_site".to_string(),
                TargetOutcome::Fetched(FetchResult::ok(BackendKind::Browser, 0.002, payload, None)),
            )],
        )
    }

    #[test]
    fn test_table_has_header_and_one_row_per_company() {
        let results = vec![
            result_with(serde_json::json!({"technology_stack": "Procore"})),
            result_with(serde_json::json!({})),
        ];
        let bytes = master_table_csv(&results).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Company Name,Website"));
        assert!(lines[1].contains("Procore"));
        assert!(lines[1].contains("$0.0020"));
    }

    #[test]
    fn test_previews_are_bounded() {
        let long = "x".repeat(2_000);
        let results = vec![result_with(serde_json::json!({ "recent_news": long }))];
        let bytes = master_table_csv(&results).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let news_cell_len = text
            .lines()
            .nth(1)
            .unwrap()
            .split(',')
            .find(|cell| cell.starts_with('x'))
            .unwrap()
            .len();
        assert_eq!(news_cell_len, 500);
    }

    #[test]
    fn test_empty_results_render_header_only() {
        let bytes = master_table_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
