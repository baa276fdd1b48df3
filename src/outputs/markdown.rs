//! Human-readable Markdown report for one company.

use chrono::Local;
use std::fmt::Write;

use crate::models::{CompanyResult, TargetOutcome};

/// Render the full report for one researched company.
pub fn company_report(result: &CompanyResult) -> String {
    let company = &result.company;
    let mut report = format!("# {}\n\n", company.company_name);

    report.push_str("## Company Overview\n");
    push_field(&mut report, "Founded", &company.founded_year);
    push_field(&mut report, "Industry", &company.industry);
    push_field(&mut report, "Sub-Industry", &company.sub_industry);
    push_field(&mut report, "Revenue", &company.revenue_range);
    push_field(&mut report, "Employees", &company.employee_range);
    push_field(&mut report, "Ownership", &company.ownership_type);
    push_field(&mut report, "Business Model", &company.business_model);
    push_field(&mut report, "Website", &company.website);

    report.push_str("\n## Location\n");
    push_field(&mut report, "Address", &company.address);
    writeln!(
        report,
        "- **City:** {}, {}",
        or_na(&company.city),
        or_na(&company.state)
    )
    .unwrap();
    push_field(&mut report, "Country", &company.country);

    report.push_str("\n## Social Media\n");
    push_field(&mut report, "LinkedIn", &company.linkedin_url);
    push_field(&mut report, "Twitter", &company.twitter_url);

    if let Some(extracted) = result.extracted() {
        report.push_str("\n## Web Intelligence\n");
        if let Some(fields) = extracted.as_object() {
            for (key, value) in fields {
                let rendered = render_value(value);
                if rendered.is_empty() {
                    continue;
                }
                writeln!(report, "\n### {}\n{}", title_case(key), rendered).unwrap();
            }
        }
    }

    let failed: Vec<&str> = result
        .targets
        .iter()
        .filter(|(_, outcome)| matches!(outcome, TargetOutcome::Fetched(r) if !r.success))
        .map(|(label, _)| label.as_str())
        .collect();
    if !failed.is_empty() {
        writeln!(report, "\n## Unavailable Sources\n- {}", failed.join("\n- ")).unwrap();
    }

    writeln!(
        report,
        "\n## Research Metadata\n\
         - **Research Date:** {}\n\
         - **Web Scraping Cost:** ${:.4}\n\
         - **Total Cost:** ${:.2}",
        Local::now().date_naive(),
        result.scraping_cost,
        result.scraping_cost
    )
    .unwrap();

    report
}

fn push_field(report: &mut String, label: &str, value: &str) {
    writeln!(report, "- **{}:** {}", label, or_na(value)).unwrap();
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() { "N/A" } else { value }
}

/// Render one extracted JSON value as report prose.
pub(crate) fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| format!("- {}", render_value(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
