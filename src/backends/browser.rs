//! Cheap browser-style fetch with optional LLM extraction.
//!
//! The primary backend renders a page with a plain HTTP fetch under a
//! desktop user agent (optionally tunneled through a pool-selected proxy)
//! and reduces the HTML to readable text plus outbound links. When an LLM
//! provider is configured, the rendered text goes through it for structured
//! field extraction. A failed or unparseable extraction degrades to raw
//! content; only the fetch itself failing makes the whole attempt fail.
//!
//! Cost is estimated from rendered content length via
//! [`approximate_token_count`], priced at the provider's per-million rate.

use itertools::Itertools;
use scraper::{Html, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use url::Url;

use super::Fetch;
use crate::costs::approximate_token_count;
use crate::llm::{LlmClient, parse_structured};
use crate::models::{BackendKind, FetchResult, PagePayload};
use crate::prompts::generic_extraction_prompt;
use crate::proxy::{ProxyEntry, ProxyPool};
use crate::utils::truncate_for_log;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Primary scraping backend.
pub struct BrowserFetcher {
    proxy_pool: ProxyPool,
    llm: Option<LlmClient>,
}

/// Text + links pulled out of one HTML document.
struct RenderedPage {
    text: String,
    links: Vec<String>,
}

impl BrowserFetcher {
    pub fn new(proxy_pool: ProxyPool, llm: Option<LlmClient>) -> Self {
        if let Some(ref llm) = llm {
            info!(provider = llm.provider().as_str(), model = llm.model(), "Browser backend with LLM extraction");
        } else {
            info!("Browser backend without LLM extraction (raw content only)");
        }
        BrowserFetcher { proxy_pool, llm }
    }

    async fn try_fetch(
        &self,
        url: &str,
        instructions: Option<&str>,
    ) -> Result<FetchResult, Box<dyn Error>> {
        let proxy = self.proxy_pool.select().cloned();
        if let Some(ref entry) = proxy {
            debug!(proxy = %entry.url, rotating = entry.rotating, "Fetching through proxy");
        }
        let client = build_client(proxy.as_ref())?;

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("GET {} returned {}", url, status).into());
        }
        let html = response.text().await?;
        // Html is parsed and dropped inside the sync helper; nothing
        // non-Send is held across the await points below.
        let page = render_page(&html, url);
        debug!(bytes = page.text.len(), links = page.links.len(), "Rendered page");

        let mut extracted = None;
        let mut cost = 0.0;
        if let Some(ref llm) = self.llm {
            let default_prompt;
            let instructions = match instructions {
                Some(text) => text,
                None => {
                    default_prompt = generic_extraction_prompt();
                    default_prompt.as_str()
                }
            };
            match llm.extract(instructions, &page.text).await {
                Ok(reply) => {
                    extracted = parse_structured(&reply);
                    if extracted.is_none() {
                        debug!(
                            %url,
                            reply_preview = %truncate_for_log(&reply, 300),
                            "Extraction reply was not a JSON object; keeping raw content only"
                        );
                    }
                }
                Err(e) => {
                    debug!(%url, error = %e, "LLM extraction skipped");
                }
            }
            cost = (approximate_token_count(&page.text) / 1_000_000.0) * llm.price_per_million;
        }

        Ok(FetchResult::ok(
            BackendKind::Browser,
            cost,
            PagePayload {
                markdown: page.text,
                extracted,
                links: page.links,
            },
            proxy.map(|p| p.url),
        ))
    }
}

impl Fetch for BrowserFetcher {
    fn kind(&self) -> BackendKind {
        BackendKind::Browser
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str, instructions: Option<&str>) -> FetchResult {
        match self.try_fetch(url, instructions).await {
            Ok(result) => result,
            Err(e) => {
                error!(%url, error = %e, "Browser fetch failed");
                FetchResult::failed(BackendKind::Browser, e.to_string())
            }
        }
    }
}

fn build_client(proxy: Option<&ProxyEntry>) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut builder = reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(FETCH_TIMEOUT);
    if let Some(entry) = proxy {
        let mut configured = reqwest::Proxy::all(&entry.url)?;
        if let (Some(user), Some(pass)) = (&entry.username, &entry.password) {
            configured = configured.basic_auth(user, pass);
        }
        builder = builder.proxy(configured);
    }
    Ok(builder.build()?)
}

/// Reduce an HTML document to readable, markdown-ish text plus its outbound
/// links. Synchronous on purpose: the parsed document never crosses an await.
fn render_page(html: &str, base_url: &str) -> RenderedPage {
    let document = Html::parse_document(html);

    let text_selector =
        Selector::parse("title, h1, h2, h3, h4, h5, h6, p, li, td, th, blockquote").unwrap();
    let mut text = String::new();
    for element in document.select(&text_selector) {
        let line = element.text().collect::<Vec<_>>().join(" ");
        let line = line.split_whitespace().join(" ");
        if line.is_empty() {
            continue;
        }
        let prefix = match element.value().name() {
            "h1" => "# ",
            "h2" => "## ",
            "h3" | "h4" | "h5" | "h6" => "### ",
            _ => "",
        };
        text.push_str(prefix);
        text.push_str(&line);
        text.push('\n');
    }

    let base = Url::parse(base_url).ok();
    let link_selector = Selector::parse("a[href]").unwrap();
    let links = document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok(),
            None => Url::parse(href).ok(),
        })
        .filter(|resolved| matches!(resolved.scheme(), "http" | "https"))
        .map(|resolved| resolved.to_string())
        .unique()
        .collect();

    RenderedPage { text, links }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html>
          <head><title>Acme Corp</title><script>ignore_me()</script></head>
          <body>
            <h1>Acme Corp</h1>
            <p>We make   anvils.</p>
            <ul><li>Anvils</li><li></li></ul>
            <a href="/about">About</a>
            <a href="https://example.com/careers">Careers</a>
            <a href="https://example.com/careers">Careers again</a>
            <a href="mailto:hi@example.com">Mail</a>
          </body>
        </html>"#;

    #[test]
    fn test_render_page_extracts_headed_text() {
        let page = render_page(SAMPLE, "https://example.com");
        assert!(page.text.contains("# Acme Corp"));
        assert!(page.text.contains("We make anvils."));
        assert!(page.text.contains("Anvils"));
        assert!(!page.text.contains("ignore_me"));
    }

    #[test]
    fn test_render_page_resolves_and_dedupes_links() {
        let page = render_page(SAMPLE, "https://example.com");
        assert!(page.links.contains(&"https://example.com/about".to_string()));
        assert_eq!(
            page.links
                .iter()
                .filter(|l| l.as_str() == "https://example.com/careers")
                .count(),
            1
        );
        assert!(!page.links.iter().any(|l| l.starts_with("mailto:")));
    }

    #[test]
    fn test_build_client_with_proxy_credentials() {
        let entry = ProxyEntry {
            url: "http://proxy.example:8080".to_string(),
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            rotating: false,
        };
        assert!(build_client(Some(&entry)).is_ok());
        assert!(build_client(None).is_ok());
    }
}
