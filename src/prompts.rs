//! Extraction instruction builders.
//!
//! Plain prompt text handed to whichever backend performs structured
//! extraction. Industry-specific additions are keyed off the company's
//! primary industry; tune these for the vertical being researched.

/// Default instructions used when a caller supplies none.
pub fn generic_extraction_prompt() -> String {
    "Extract concise business intelligence:\n\
     - company_description (1-2 sentences)\n\
     - products_services (bullet list)\n\
     - leadership (C-suite names and titles if present)\n\
     - technology_mentions (keywords like Procore, P6, Autodesk, Oracle, AI, cloud)\n\
     - recent_news (last 12 months)\n\
     Return valid JSON with these keys."
        .to_string()
}

/// Company-site instructions, with industry-specific extraction appended
/// when the industry is recognized.
pub fn company_extraction_prompt(company_name: &str, industry: &str) -> String {
    let mut prompt = format!(
        "Extract comprehensive information about {}:\n\
         1. Company overview and mission\n\
         2. Products and services offered\n\
         3. Technology stack and tools used\n\
         4. Recent projects and achievements\n\
         5. Leadership team and key executives\n\
         6. News and announcements from the last 12 months\n\
         7. Digital transformation initiatives\n\
         8. Pain points or challenges mentioned\n\
         9. Contact information\n\
         Return valid JSON keyed by snake_case field names \
         (company_overview, products_services, technology_stack, recent_news, \
         leadership, digital_initiatives, pain_points, contact_information).",
        company_name
    );

    let industry = industry.to_lowercase();
    if industry.contains("construction") {
        prompt.push_str(
            "\nAlso extract:\n\
             10. Project management tools used (Procore, ACC, Primavera P6, etc.)\n\
             11. Types of construction projects\n\
             12. Safety initiatives and certifications",
        );
    } else if industry.contains("healthcare") {
        prompt.push_str(
            "\nAlso extract:\n\
             10. EHR/EMR systems used\n\
             11. Patient management systems\n\
             12. Compliance and certifications (HIPAA, etc.)",
        );
    } else if industry.contains("technology") {
        prompt.push_str(
            "\nAlso extract:\n\
             10. Development stack and frameworks\n\
             11. Cloud infrastructure providers\n\
             12. Open source contributions",
        );
    }

    prompt
}

/// Instructions for social-profile pages.
pub fn social_profile_prompt() -> &'static str {
    "Extract company size, recent posts, and employee count"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_prompt_names_the_company() {
        let prompt = company_extraction_prompt("Acme Corp", "");
        assert!(prompt.contains("Acme Corp"));
        assert!(prompt.contains("Company overview"));
        assert!(!prompt.contains("Also extract"));
    }

    #[test]
    fn test_industry_specific_sections() {
        assert!(
            company_extraction_prompt("Acme", "Commercial Construction").contains("Primavera P6")
        );
        assert!(company_extraction_prompt("Acme", "Healthcare Services").contains("HIPAA"));
        assert!(
            company_extraction_prompt("Acme", "Information Technology")
                .contains("Cloud infrastructure")
        );
    }

    #[test]
    fn test_generic_prompt_requests_json() {
        assert!(generic_extraction_prompt().contains("Return valid JSON"));
    }
}
