//! Managed extraction service client (Firecrawl scrape API).
//!
//! The fallback backend hands the URL to Firecrawl's `/v1/scrape` endpoint
//! and charges a fixed price per page regardless of content size. When
//! extraction instructions are supplied they are forwarded as an extract
//! prompt so the service returns structured fields alongside the markdown.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::Fetch;
use crate::config::FirecrawlSettings;
use crate::models::{BackendKind, FetchResult, PagePayload};

const SCRAPE_TIMEOUT: Duration = Duration::from_secs(90);

/// Fixed-cost fallback scraping backend.
pub struct FirecrawlClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    cost_per_page: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: Vec<&'static str>,
    only_main_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    extract: Option<ExtractSpec<'a>>,
}

#[derive(Serialize)]
struct ExtractSpec<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize, Default)]
struct ScrapeData {
    markdown: Option<String>,
    #[serde(default)]
    links: Vec<String>,
    #[serde(alias = "json")]
    extract: Option<serde_json::Value>,
}

impl FirecrawlClient {
    pub fn new(settings: &FirecrawlSettings) -> Self {
        FirecrawlClient {
            client: reqwest::Client::new(),
            api_key: settings.api_key.clone(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            cost_per_page: settings.cost_per_page,
        }
    }

    async fn try_fetch(
        &self,
        url: &str,
        instructions: Option<&str>,
    ) -> Result<FetchResult, Box<dyn Error>> {
        let request = ScrapeRequest {
            url,
            formats: match instructions {
                Some(_) => vec!["markdown", "links", "extract"],
                None => vec!["markdown", "links"],
            },
            only_main_content: true,
            extract: instructions.map(|prompt| ExtractSpec { prompt }),
        };

        let response = self
            .client
            .post(format!("{}/v1/scrape", self.api_url))
            .bearer_auth(&self.api_key)
            .timeout(SCRAPE_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("scrape API returned {}: {}", status, body).into());
        }

        let parsed: ScrapeResponse = response.json().await?;
        if !parsed.success {
            return Err(parsed
                .error
                .unwrap_or_else(|| "scrape API reported failure without detail".to_string())
                .into());
        }
        let data = parsed.data.unwrap_or_default();
        debug!(%url, links = data.links.len(), "Firecrawl scrape succeeded");

        Ok(FetchResult::ok(
            BackendKind::Firecrawl,
            self.cost_per_page,
            PagePayload {
                markdown: data.markdown.unwrap_or_default(),
                extracted: data.extract,
                links: data.links,
            },
            None,
        ))
    }
}

impl Fetch for FirecrawlClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Firecrawl
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str, instructions: Option<&str>) -> FetchResult {
        match self.try_fetch(url, instructions).await {
            Ok(result) => result,
            Err(e) => {
                error!(%url, error = %e, "Firecrawl fetch failed");
                FetchResult::failed(BackendKind::Firecrawl, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = ScrapeRequest {
            url: "https://example.com",
            formats: vec!["markdown", "links", "extract"],
            only_main_content: true,
            extract: Some(ExtractSpec { prompt: "who are they" }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"onlyMainContent\":true"));
        assert!(json.contains("\"prompt\":\"who are they\""));
    }

    #[test]
    fn test_request_omits_extract_without_instructions() {
        let request = ScrapeRequest {
            url: "https://example.com",
            formats: vec!["markdown", "links"],
            only_main_content: true,
            extract: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("extract"));
    }

    #[test]
    fn test_response_parses_success_shape() {
        let raw = r##"{
            "success": true,
            "data": {
                "markdown": "# Acme",
                "links": ["https://example.com/about"],
                "extract": {"company_description": "anvils"}
            }
        }"##;
        let parsed: ScrapeResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.success);
        let data = parsed.data.unwrap();
        assert_eq!(data.markdown.as_deref(), Some("# Acme"));
        assert_eq!(data.links.len(), 1);
        assert!(data.extract.is_some());
    }

    #[test]
    fn test_response_parses_failure_shape() {
        let raw = r#"{"success": false, "error": "Rate limited"}"#;
        let parsed: ScrapeResponse = serde_json::from_str(raw).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.error.as_deref(), Some("Rate limited"));
    }
}
